//! In-memory host
//!
//! A [`Host`] whose package index, filesystem and service manager are plain
//! collections. Used to exercise plans without touching the real system:
//! tests, and rehearsing a plan against a described machine.
//!
//! The model is intentionally small but keeps the rules that make ordering
//! matter on a real host: writing a file needs its parent directory, and a
//! service can only be started or enabled once its unit is known (shipped
//! by an installed package or present as a `<name>.service` file).

use crate::context::{Host, Privileged};
use crate::types::ServiceStatus;
use anyhow::{Result, bail};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Observable state of a [`MemoryHost`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryState {
    /// Installed packages
    pub installed: BTreeSet<String>,
    /// Installable packages and the units each one ships
    pub available: BTreeMap<String, Vec<String>>,
    /// Units known to the service manager
    pub units: BTreeSet<String>,
    pub dirs: BTreeSet<PathBuf>,
    pub files: BTreeMap<PathBuf, Vec<u8>>,
    pub active: BTreeSet<String>,
    pub enabled: BTreeSet<String>,
    /// Every mutation applied, in order, e.g. "restart systemd-resolved"
    pub journal: Vec<String>,
    /// Number of times privileges were acquired
    pub elevations: usize,
    /// Privilege handles currently alive
    pub held: usize,
    /// Highest number of simultaneously alive privilege handles
    pub max_held: usize,
}

#[derive(Debug, Default)]
struct Faults {
    package_index_unavailable: bool,
    service_manager_unavailable: bool,
    elevation_denied: bool,
    failing_targets: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<MemoryState>,
    faults: Faults,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_installed_package(self, name: &str) -> Self {
        self.lock().installed.insert(name.to_string());
        self
    }

    /// Make `name` installable; installing it registers `units`
    pub fn with_available_package(self, name: &str, units: &[&str]) -> Self {
        self.lock().available.insert(
            name.to_string(),
            units.iter().map(ToString::to_string).collect(),
        );
        self
    }

    pub fn with_dir(self, path: impl AsRef<Path>) -> Self {
        self.lock().dirs.insert(path.as_ref().to_path_buf());
        self
    }

    pub fn with_file(self, path: impl AsRef<Path>, content: impl AsRef<[u8]>) -> Self {
        self.lock()
            .files
            .insert(path.as_ref().to_path_buf(), content.as_ref().to_vec());
        self
    }

    /// Register a known unit with the given flags
    pub fn with_service(self, name: &str, active: bool, enabled: bool) -> Self {
        {
            let mut state = self.lock();
            state.units.insert(name.to_string());
            if active {
                state.active.insert(name.to_string());
            }
            if enabled {
                state.enabled.insert(name.to_string());
            }
        }
        self
    }

    /// Package index queries fail
    pub fn with_package_index_unavailable(mut self) -> Self {
        self.faults.package_index_unavailable = true;
        self
    }

    /// Service manager queries fail
    pub fn with_service_manager_unavailable(mut self) -> Self {
        self.faults.service_manager_unavailable = true;
        self
    }

    /// Privilege acquisition fails
    pub fn with_elevation_denied(mut self) -> Self {
        self.faults.elevation_denied = true;
        self
    }

    /// Any mutation whose target (package, path or service) equals `target` fails
    pub fn fail_mutations_on(mut self, target: &str) -> Self {
        self.faults.failing_targets.insert(target.to_string());
        self
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> MemoryState {
        self.lock().clone()
    }

    /// Content of a file as text, if present
    pub fn file_text(&self, path: impl AsRef<Path>) -> Option<String> {
        self.lock()
            .files
            .get(path.as_ref())
            .map(|c| String::from_utf8_lossy(c).to_string())
    }

    /// How many times `service` has been restarted
    pub fn restarts(&self, service: &str) -> usize {
        let entry = format!("restart {service}");
        self.lock().journal.iter().filter(|e| **e == entry).count()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check_target(&self, target: &str) -> Result<()> {
        if self.faults.failing_targets.contains(target) {
            bail!("injected failure for {target}");
        }
        Ok(())
    }
}

impl MemoryState {
    fn unit_known(&self, service: &str) -> bool {
        let unit_file = format!("{service}.service");
        self.units.contains(service)
            || self
                .files
                .keys()
                .any(|p| p.file_name().is_some_and(|f| f == unit_file.as_str()))
    }

    fn parent_exists(&self, path: &Path) -> bool {
        match path.parent() {
            None => true,
            Some(parent) if parent.as_os_str().is_empty() || parent == Path::new("/") => true,
            Some(parent) => self.dirs.contains(parent),
        }
    }
}

impl Host for MemoryHost {
    fn package_installed(&self, package: &str) -> Result<bool> {
        if self.faults.package_index_unavailable {
            bail!("package index unavailable");
        }
        Ok(self.lock().installed.contains(package))
    }

    fn is_dir(&self, path: &Path) -> Result<bool> {
        Ok(self.lock().dirs.contains(path))
    }

    fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        Ok(self.lock().files.get(path).cloned())
    }

    fn service_status(&self, service: &str) -> Result<ServiceStatus> {
        if self.faults.service_manager_unavailable {
            bail!("Failed to connect to bus: No such file or directory");
        }
        let state = self.lock();
        Ok(ServiceStatus {
            known: state.unit_known(service),
            active: state.active.contains(service),
            enabled: state.enabled.contains(service),
        })
    }

    fn elevate(&self, reason: &str) -> Result<Box<dyn Privileged + '_>> {
        if self.faults.elevation_denied {
            bail!("elevation denied: {reason}");
        }
        let mut state = self.lock();
        state.elevations += 1;
        state.held += 1;
        state.max_held = state.max_held.max(state.held);
        Ok(Box::new(MemoryPrivileges { host: self }))
    }
}

/// Privilege handle for a [`MemoryHost`]; releases on drop
struct MemoryPrivileges<'a> {
    host: &'a MemoryHost,
}

impl Drop for MemoryPrivileges<'_> {
    fn drop(&mut self) {
        let mut state = self.host.lock();
        state.held = state.held.saturating_sub(1);
    }
}

impl Privileged for MemoryPrivileges<'_> {
    fn install_package(&self, package: &str) -> Result<()> {
        self.host.check_target(package)?;
        let mut state = self.host.lock();
        let Some(units) = state.available.get(package).cloned() else {
            bail!("E: Unable to locate package {package}");
        };
        state.installed.insert(package.to_string());
        state.units.extend(units);
        state.journal.push(format!("install {package}"));
        Ok(())
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        self.host.check_target(&path.display().to_string())?;
        let mut state = self.host.lock();
        if state.files.contains_key(path) {
            bail!("mkdir: cannot create directory '{}': File exists", path.display());
        }
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() || ancestor == Path::new("/") {
                break;
            }
            state.dirs.insert(ancestor.to_path_buf());
        }
        state.journal.push(format!("mkdir {}", path.display()));
        Ok(())
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        self.host.check_target(&path.display().to_string())?;
        let mut state = self.host.lock();
        if !state.parent_exists(path) {
            bail!("{}: No such file or directory", path.display());
        }
        state.files.insert(path.to_path_buf(), content.to_vec());
        state.journal.push(format!("write {}", path.display()));
        Ok(())
    }

    fn append_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        self.host.check_target(&path.display().to_string())?;
        let mut state = self.host.lock();
        if !state.parent_exists(path) {
            bail!("{}: No such file or directory", path.display());
        }
        state
            .files
            .entry(path.to_path_buf())
            .or_default()
            .extend_from_slice(content);
        state.journal.push(format!("append {}", path.display()));
        Ok(())
    }

    fn set_service_enabled(&self, service: &str, enabled: bool) -> Result<()> {
        self.host.check_target(service)?;
        let mut state = self.host.lock();
        if !state.unit_known(service) {
            bail!("Unit {service}.service does not exist");
        }
        if enabled {
            state.enabled.insert(service.to_string());
            state.journal.push(format!("enable {service}"));
        } else {
            state.enabled.remove(service);
            state.journal.push(format!("disable {service}"));
        }
        Ok(())
    }

    fn set_service_running(&self, service: &str, running: bool) -> Result<()> {
        self.host.check_target(service)?;
        let mut state = self.host.lock();
        if running {
            if !state.unit_known(service) {
                bail!("Unit {service}.service not found.");
            }
            state.active.insert(service.to_string());
            state.journal.push(format!("start {service}"));
        } else {
            state.active.remove(service);
            state.journal.push(format!("stop {service}"));
        }
        Ok(())
    }

    fn restart_service(&self, service: &str) -> Result<()> {
        self.host.check_target(service)?;
        let mut state = self.host.lock();
        if !state.unit_known(service) {
            bail!("Unit {service}.service not found.");
        }
        state.active.insert(service.to_string());
        state.journal.push(format!("restart {service}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_handle_released_on_drop() {
        let host = MemoryHost::new();
        {
            let _p = host.elevate("test").unwrap();
            assert_eq!(host.snapshot().held, 1);
        }
        assert_eq!(host.snapshot().held, 0);
        assert_eq!(host.snapshot().elevations, 1);
    }

    #[test]
    fn test_write_requires_parent_directory() {
        let host = MemoryHost::new();
        let p = host.elevate("test").unwrap();
        assert!(p.write_file(Path::new("/etc/x/y.conf"), b"a").is_err());
        p.create_dir(Path::new("/etc/x")).unwrap();
        p.write_file(Path::new("/etc/x/y.conf"), b"a").unwrap();
        drop(p);
        assert_eq!(host.file_text("/etc/x/y.conf").as_deref(), Some("a"));
    }

    #[test]
    fn test_installed_package_registers_units() {
        let host = MemoryHost::new().with_available_package("systemd-resolved", &["systemd-resolved"]);
        let p = host.elevate("test").unwrap();
        assert!(p.set_service_running("systemd-resolved", true).is_err());
        p.install_package("systemd-resolved").unwrap();
        p.set_service_running("systemd-resolved", true).unwrap();
        drop(p);
        assert!(host.snapshot().active.contains("systemd-resolved"));
    }

    #[test]
    fn test_unknown_package_fails() {
        let host = MemoryHost::new();
        let p = host.elevate("test").unwrap();
        assert!(p.install_package("nope").is_err());
    }

    #[test]
    fn test_unit_file_makes_service_known() {
        let host = MemoryHost::new().with_file("/etc/systemd/system/dnsR.service", "[Unit]\n");
        let p = host.elevate("test").unwrap();
        p.set_service_enabled("dnsR", true).unwrap();
        p.set_service_running("dnsR", true).unwrap();
    }
}
