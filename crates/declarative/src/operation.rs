//! Operation - the tagged union of desired-state assertions
//!
//! Operations are plain data: built once per run, never mutated, and each
//! one carries everything needed to probe and apply it.

use crate::context::{ApplyContext, Host};
use crate::resource::{Directory, FileLine, Package, RenderedFile, Resource, Service};
use crate::types::ProbeResult;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    PackageInstalled(Package),
    DirectoryPresent(Directory),
    FileRendered(RenderedFile),
    LineInFile(FileLine),
    ServiceState(Service),
}

impl Operation {
    pub fn package(name: &str) -> Self {
        Self::PackageInstalled(Package::new(name))
    }

    pub fn directory(path: impl AsRef<Path>) -> Self {
        Self::DirectoryPresent(Directory::new(path))
    }

    pub fn file(path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        Self::FileRendered(RenderedFile::new(path, content))
    }

    pub fn line(path: impl AsRef<Path>, line: impl Into<String>) -> Self {
        Self::LineInFile(FileLine::new(path, line))
    }

    pub fn service(service: Service) -> Self {
        Self::ServiceState(service)
    }

    /// The resource implementation behind this operation
    pub fn as_resource(&self) -> &dyn Resource {
        match self {
            Self::PackageInstalled(r) => r,
            Self::DirectoryPresent(r) => r,
            Self::FileRendered(r) => r,
            Self::LineInFile(r) => r,
            Self::ServiceState(r) => r,
        }
    }

    /// Whether this operation is an action rather than a state assertion
    pub fn is_forced(&self) -> bool {
        matches!(self, Self::ServiceState(s) if s.restarted)
    }
}

impl Resource for Operation {
    fn id(&self) -> String {
        self.as_resource().id()
    }

    fn description(&self) -> String {
        self.as_resource().description()
    }

    fn resource_type(&self) -> &'static str {
        self.as_resource().resource_type()
    }

    fn probe(&self, host: &dyn Host) -> Result<ProbeResult> {
        self.as_resource().probe(host)
    }

    fn is_required(&self, probe: &ProbeResult) -> bool {
        self.as_resource().is_required(probe)
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<()> {
        self.as_resource().apply(ctx)
    }
}
