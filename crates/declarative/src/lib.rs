//! # Declarative
//!
//! Idempotent host convergence: declare the end state of a handful of system
//! resources, detect the current state, and apply only the changes needed.
//!
//! ## Core Concepts
//!
//! - **Operation**: a desired-state assertion over one resource (package
//!   installed, directory present, file rendered, line in file, service state)
//! - **ProbeResult**: the observed state of that resource, read-only
//! - **Planner**: probes every operation in order and marks the ones that
//!   need a change
//! - **Executor**: applies required changes in order, each under its own
//!   privilege scope, stopping at the first failure
//!
//! ## Example
//!
//! ```
//! use declarative::{MemoryHost, NoProgress, Operation, Service, execute, plan};
//!
//! let host = MemoryHost::new()
//!     .with_available_package("systemd-resolved", &["systemd-resolved"]);
//!
//! let ops = vec![
//!     Operation::package("systemd-resolved"),
//!     Operation::service(Service::new("systemd-resolved").running(true).enabled(true)),
//! ];
//!
//! let planned = plan(&ops, &host)?;
//! let report = execute(planned, &host, &mut NoProgress).into_result()?;
//! assert_eq!(report.summary().changed, 2);
//! # Ok::<(), declarative::ConvergeError>(())
//! ```
//!
//! ## Host Traits
//!
//! - [`Host`]: read-only queries plus [`Host::elevate`]
//! - [`Privileged`]: mutations, only reachable through a scoped elevation
//! - [`ProgressCallback`]: receives progress updates
//!
//! Probes never need privileges. Each mutation acquires them right before it
//! runs and drops them right after, so no two operations share an elevation.

pub mod context;
pub mod error;
pub mod executor;
pub mod memory;
pub mod operation;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{ApplyContext, Host, NoProgress, Privileged, ProgressCallback};
pub use error::ConvergeError;
pub use executor::{ExecutionReport, execute};
pub use memory::{MemoryHost, MemoryState};
pub use operation::Operation;
pub use planner::{pending_changes, plan};
pub use resource::{Directory, FileLine, Package, RenderedFile, Resource, Service};
pub use types::{
    Action, ExecuteSummary, ExecutionRecord, PlannedOperation, ProbeResult, ServiceStatus,
};
