//! The real host: dpkg/apt, the local filesystem and systemd
//!
//! Queries run unprivileged. Mutations go through a [`SudoContext`]
//! acquired per operation.

use anyhow::{Context, Result, bail};
use declarative::{Host, Privileged, ServiceStatus};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::sudo::SudoContext;

/// Messages systemctl prints when it cannot reach the service manager
const SERVICE_MANAGER_DOWN: &[&str] = &[
    "Failed to connect to bus",
    "System has not been booted with systemd",
    "Failed to get D-Bus connection",
];

#[derive(Debug, Default)]
pub struct SystemHost;

impl SystemHost {
    pub fn new() -> Self {
        Self
    }

    /// Run `systemctl <verb> <service>` and return the state word it prints
    fn systemctl_state(verb: &str, service: &str) -> Result<String> {
        let output = Command::new("systemctl")
            .args([verb, service])
            .stdin(Stdio::null())
            .output()
            .context("Failed to run systemctl")?;

        if let Some(reason) = manager_down(&String::from_utf8_lossy(&output.stderr)) {
            bail!("service manager unreachable: {reason}");
        }

        Ok(parse_state(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Which unreachable-manager message, if any, systemctl printed
///
/// Anything else on stderr (an unknown unit, for one) is a normal answer.
fn manager_down(stderr: &str) -> Option<&'static str> {
    SERVICE_MANAGER_DOWN
        .iter()
        .copied()
        .find(|m| stderr.contains(m))
}

/// First line of systemctl output, trimmed
fn parse_state(stdout: &str) -> String {
    stdout.lines().next().unwrap_or("").trim().to_string()
}

/// `dpkg-query -f '${Status}'` reports "install ok installed" for installed packages
fn status_installed(status: &str) -> bool {
    status.trim() == "install ok installed"
}

/// Interpret a `dpkg-query -W -f='${Status}'` run
///
/// Exit 1 means the package is unknown, which is absence. Any other failure
/// means the package database could not be queried.
fn dpkg_installed(code: Option<i32>, stdout: &str, stderr: &str) -> Result<bool> {
    match code {
        Some(0) => Ok(status_installed(stdout)),
        Some(1) => Ok(false),
        Some(code) => bail!("dpkg-query failed (exit {code}): {}", stderr.trim()),
        None => bail!("dpkg-query killed by a signal: {}", stderr.trim()),
    }
}

/// `is-enabled` prints "not-found" (or nothing, on older systemd) for units
/// it has no file for
fn unit_known(state: &str) -> bool {
    !state.is_empty() && state != "not-found"
}

fn state_enabled(state: &str) -> bool {
    matches!(state, "enabled" | "enabled-runtime" | "alias")
}

impl Host for SystemHost {
    fn package_installed(&self, package: &str) -> Result<bool> {
        let output = Command::new("dpkg-query")
            .args(["-W", "-f=${Status}", package])
            .stdin(Stdio::null())
            .output()
            .context("Failed to run dpkg-query")?;

        dpkg_installed(
            output.status.code(),
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
        )
    }

    fn is_dir(&self, path: &Path) -> Result<bool> {
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to stat {}", path.display())),
        }
    }

    fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn service_status(&self, service: &str) -> Result<ServiceStatus> {
        let active = Self::systemctl_state("is-active", service)?;
        let enabled = Self::systemctl_state("is-enabled", service)?;
        log::debug!("{service}: is-active={active} is-enabled={enabled}");

        Ok(ServiceStatus {
            known: unit_known(&enabled),
            active: active == "active",
            enabled: state_enabled(&enabled),
        })
    }

    fn elevate(&self, reason: &str) -> Result<Box<dyn Privileged + '_>> {
        Ok(Box::new(SudoContext::acquire(reason)?))
    }
}
