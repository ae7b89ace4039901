//! Resource trait for desired-state convergence
//!
//! A Resource is one kind of host state that can be probed and, when it
//! differs from what is wanted, changed. Each kind lives in its own module.

use crate::context::{ApplyContext, Host};
use crate::types::ProbeResult;
use anyhow::Result;
use std::fmt;

pub mod directory;
pub mod file;
pub mod line;
pub mod package;
pub mod service;

pub use directory::Directory;
pub use file::RenderedFile;
pub use line::FileLine;
pub use package::Package;
pub use service::Service;

/// Core trait for convergeable resources
///
/// Every resource kind implements this trait, which provides:
/// - Identity (id, description, type)
/// - Read-only state detection (probe)
/// - The decision rule turning a probe into "change required"
/// - The privileged mutation (apply)
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique identifier, stable across runs
    ///
    /// Examples:
    /// - "package:systemd-resolved"
    /// - "line:/etc/systemd/resolved.conf.d/dnsR.conf:DNS=127.0.0.1:1053"
    fn id(&self) -> String;

    /// Human-readable description of what this resource asserts
    fn description(&self) -> String;

    /// Resource type category, used for grouping and display
    fn resource_type(&self) -> &'static str;

    /// Detect the current state of this resource
    ///
    /// Must not mutate the host. A missing resource is a normal result;
    /// `Err` means the query mechanism itself is unavailable.
    fn probe(&self, host: &dyn Host) -> Result<ProbeResult>;

    /// Decide whether a change is required given a probe result
    ///
    /// Default: required whenever the observed state does not match.
    fn is_required(&self, probe: &ProbeResult) -> bool {
        !probe.matches_desired
    }

    /// Apply the change that brings the host to the desired state
    ///
    /// Only called when [`Resource::is_required`] said so, with privileges
    /// held for exactly this call.
    fn apply(&self, ctx: &mut ApplyContext) -> Result<()>;
}
