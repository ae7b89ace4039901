//! Directory resource

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::Resource;
use crate::context::{ApplyContext, Host};
use crate::types::ProbeResult;

/// A directory that must exist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    pub path: PathBuf,
}

impl Directory {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Resource for Directory {
    fn id(&self) -> String {
        format!("directory:{}", self.path.display())
    }

    fn description(&self) -> String {
        format!("Ensure directory {} exists", self.path.display())
    }

    fn resource_type(&self) -> &'static str {
        "directory"
    }

    fn probe(&self, host: &dyn Host) -> Result<ProbeResult> {
        if host.is_dir(&self.path)? {
            Ok(ProbeResult::in_sync())
        } else {
            Ok(ProbeResult::absent().with_details("missing"))
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<()> {
        ctx.privileged
            .create_dir(&self.path)
            .with_context(|| format!("Failed to create directory: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;

    #[test]
    fn test_existing_directory_not_required() {
        let host = MemoryHost::new().with_dir("/etc/systemd/resolved.conf.d");
        let dir = Directory::new("/etc/systemd/resolved.conf.d");
        assert!(!dir.is_required(&dir.probe(&host).unwrap()));
    }

    #[test]
    fn test_regular_file_in_the_way_is_required() {
        let host = MemoryHost::new().with_file("/etc/systemd/resolved.conf.d", "oops");
        let dir = Directory::new("/etc/systemd/resolved.conf.d");
        assert!(dir.is_required(&dir.probe(&host).unwrap()));
    }
}
