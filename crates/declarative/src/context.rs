//! Host seams and apply context
//!
//! These traits let the engine run against any host implementation: the
//! real system (package manager, filesystem, service manager) or an
//! in-memory one.

use crate::types::{ExecutionRecord, PlannedOperation, ServiceStatus};
use anyhow::Result;
use std::path::Path;

/// Read-only view of a host, plus the door to privileged mutation
///
/// Query methods report absence as a normal value (`false`, `None`). They
/// return `Err` only when the query mechanism itself is unavailable.
pub trait Host: Send + Sync {
    /// Whether `package` is present in the installed-package index
    fn package_installed(&self, package: &str) -> Result<bool>;

    /// Whether `path` exists and is a directory
    fn is_dir(&self, path: &Path) -> Result<bool>;

    /// Content of the file at `path`, `None` if it does not exist
    fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Active/enabled flags of `service`
    fn service_status(&self, service: &str) -> Result<ServiceStatus>;

    /// Acquire elevated privileges for a single mutation
    ///
    /// Privileges are released when the returned handle is dropped.
    fn elevate(&self, reason: &str) -> Result<Box<dyn Privileged + '_>>;
}

/// Scoped capability for privileged host mutations
pub trait Privileged {
    /// Install a package through the package manager
    fn install_package(&self, package: &str) -> Result<()>;

    /// Create a directory and any missing parents
    fn create_dir(&self, path: &Path) -> Result<()>;

    /// Replace the content of a file, creating it if needed
    fn write_file(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Append bytes to a file, creating it if needed
    fn append_file(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Enable or disable a service at boot
    fn set_service_enabled(&self, service: &str, enabled: bool) -> Result<()>;

    /// Start or stop a service
    fn set_service_running(&self, service: &str, running: bool) -> Result<()>;

    /// Restart a service, starting it if it is stopped
    fn restart_service(&self, service: &str) -> Result<()>;
}

/// Context passed to resource apply operations
pub struct ApplyContext<'a> {
    /// Host for re-reading state needed to shape the mutation
    pub host: &'a dyn Host,
    /// Privileges held for the duration of this one apply
    pub privileged: &'a dyn Privileged,
}

impl<'a> ApplyContext<'a> {
    pub fn new(host: &'a dyn Host, privileged: &'a dyn Privileged) -> Self {
        Self { host, privileged }
    }
}

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called once the plan is known, before anything is applied
    fn on_plan(&mut self, _plan: &[PlannedOperation]) {}

    /// Called when starting an operation
    fn on_operation_start(&mut self, index: usize, total: usize, planned: &PlannedOperation);

    /// Called when an operation has been recorded
    fn on_operation_complete(&mut self, index: usize, total: usize, record: &ExecutionRecord);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_operation_start(&mut self, _index: usize, _total: usize, _planned: &PlannedOperation) {}
    fn on_operation_complete(&mut self, _index: usize, _total: usize, _record: &ExecutionRecord) {
    }
}
