//! Scoped sudo context
//!
//! Sudo is never requested for the entire process. Instead:
//! 1. All probes run unprivileged
//! 2. Sudo is acquired right before a single mutation
//! 3. Sudo is released (`sudo -k`) as soon as that mutation is done
//!
//! When the process already runs as root, commands run directly and there
//! is nothing to acquire or release.

use anyhow::{Context, Result, bail};
use declarative::Privileged;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Check whether the current process runs as root
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

/// Output of a privileged command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stderr: Vec<u8>,
    pub success: bool,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stderr: output.stderr,
            success: output.status.success(),
        }
    }
}

impl CommandOutput {
    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Scoped sudo context - automatically invalidates on drop
#[derive(Debug)]
pub struct SudoContext {
    /// Commands are prefixed with `sudo` and the timestamp is dropped on release
    via_sudo: bool,
}

impl SudoContext {
    /// Acquire sudo privileges with a reason shown to user
    pub fn acquire(reason: &str) -> Result<Self> {
        if is_root() {
            log::debug!("Running as root, no sudo needed for: {reason}");
            return Ok(Self { via_sudo: false });
        }

        log::info!("Sudo required: {reason}");

        // Validate sudo (will prompt for password)
        let status = Command::new("sudo")
            .args(["-v"])
            .status()
            .context("Failed to execute sudo")?;

        if !status.success() {
            bail!("Failed to acquire sudo privileges");
        }

        Ok(Self { via_sudo: true })
    }

    fn command(&self, cmd: &str, args: &[&str]) -> Command {
        if self.via_sudo {
            let mut command = Command::new("sudo");
            command.arg(cmd).args(args);
            command
        } else {
            let mut command = Command::new(cmd);
            command.args(args);
            command
        }
    }

    /// Run a command with elevated privileges
    pub fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput> {
        log::debug!("privileged: {} {}", cmd, args.join(" "));
        let output = self
            .command(cmd, args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))?;
        Ok(output.into())
    }

    /// Run a command with elevated privileges, feeding `input` on stdin
    pub fn run_with_input(&self, cmd: &str, args: &[&str], input: &[u8]) -> Result<CommandOutput> {
        log::debug!("privileged: {} {} (<{} bytes)", cmd, args.join(" "), input.len());
        let mut child = self
            .command(cmd, args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .with_context(|| format!("Failed to write to {cmd}"))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for {cmd}"))?;
        Ok(output.into())
    }

    /// Run a command and fail with its stderr if it exits non-zero
    fn run_checked(&self, cmd: &str, args: &[&str]) -> Result<()> {
        let output = self.run(cmd, args)?;
        if !output.success {
            bail!("{} {} failed: {}", cmd, args.join(" "), output.stderr_str().trim());
        }
        Ok(())
    }

    fn tee(&self, path: &Path, content: &[u8], append: bool) -> Result<()> {
        let path = path.to_string_lossy().to_string();
        let args: Vec<&str> = if append {
            vec!["-a", path.as_str()]
        } else {
            vec![path.as_str()]
        };

        let output = self.run_with_input("tee", &args, content)?;
        if !output.success {
            bail!("tee {} failed: {}", path, output.stderr_str().trim());
        }
        Ok(())
    }
}

impl Privileged for SudoContext {
    fn install_package(&self, package: &str) -> Result<()> {
        self.run_checked("apt-get", &["update", "-q"])?;
        self.run_checked(
            "env",
            &[
                "DEBIAN_FRONTEND=noninteractive",
                "apt-get",
                "install",
                "-y",
                "-q",
                package,
            ],
        )
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        let path = path.to_string_lossy();
        self.run_checked("mkdir", &["-p", path.as_ref()])
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        self.tee(path, content, false)
    }

    fn append_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        self.tee(path, content, true)
    }

    fn set_service_enabled(&self, service: &str, enabled: bool) -> Result<()> {
        let verb = if enabled { "enable" } else { "disable" };
        self.run_checked("systemctl", &[verb, service])
    }

    fn set_service_running(&self, service: &str, running: bool) -> Result<()> {
        let verb = if running { "start" } else { "stop" };
        self.run_checked("systemctl", &[verb, service])
    }

    fn restart_service(&self, service: &str) -> Result<()> {
        self.run_checked("systemctl", &["restart", service])
    }
}

impl Drop for SudoContext {
    fn drop(&mut self) {
        if self.via_sudo {
            // Invalidate sudo timestamp to release privileges
            let _ = Command::new("sudo").args(["-k"]).status();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct() -> SudoContext {
        SudoContext { via_sudo: false }
    }

    #[test]
    fn test_command_prefix() {
        let sudo = SudoContext { via_sudo: true };
        let cmd = sudo.command("systemctl", &["restart", "systemd-resolved"]);
        assert_eq!(cmd.get_program(), "sudo");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["systemctl", "restart", "systemd-resolved"]);
        // never acquired, so skip the `sudo -k` in Drop
        std::mem::forget(sudo);

        let cmd = direct().command("mkdir", &["-p", "/tmp/x"]);
        assert_eq!(cmd.get_program(), "mkdir");
    }

    #[test]
    fn test_direct_write_and_append() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("dnsR.conf");
        let ctx = direct();

        ctx.write_file(&path, b"[Resolve]\n").unwrap();
        ctx.append_file(&path, b"DNS=127.0.0.1:1053\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[Resolve]\nDNS=127.0.0.1:1053\n");
    }

    #[test]
    fn test_direct_create_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("a/b/c");
        direct().create_dir(&path).unwrap();
        assert!(path.is_dir());
    }

    #[test]
    fn test_failed_command_reports_stderr() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("missing/dir/file");
        let err = direct().write_file(&path, b"x").unwrap_err();
        assert!(err.to_string().contains("tee"));
    }
}
