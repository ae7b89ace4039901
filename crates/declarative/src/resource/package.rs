//! Installed-package resource

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::Resource;
use crate::context::{ApplyContext, Host};
use crate::types::ProbeResult;

/// A package that must be installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
}

impl Package {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Resource for Package {
    fn id(&self) -> String {
        format!("package:{}", self.name)
    }

    fn description(&self) -> String {
        format!("Install package {}", self.name)
    }

    fn resource_type(&self) -> &'static str {
        "package"
    }

    fn probe(&self, host: &dyn Host) -> Result<ProbeResult> {
        let installed = host
            .package_installed(&self.name)
            .with_context(|| format!("Failed to query package index for {}", self.name))?;

        if installed {
            Ok(ProbeResult::in_sync().with_details("installed"))
        } else {
            Ok(ProbeResult::absent().with_details("not installed"))
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<()> {
        ctx.privileged
            .install_package(&self.name)
            .with_context(|| format!("Failed to install {}", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;

    #[test]
    fn test_probe_missing_package_is_not_an_error() {
        let host = MemoryHost::new();
        let probe = Package::new("systemd-resolved").probe(&host).unwrap();
        assert!(!probe.exists);
        assert!(Package::new("systemd-resolved").is_required(&probe));
    }

    #[test]
    fn test_probe_installed_package() {
        let host = MemoryHost::new().with_installed_package("systemd-resolved");
        let probe = Package::new("systemd-resolved").probe(&host).unwrap();
        assert!(probe.matches_desired);
        assert!(!Package::new("systemd-resolved").is_required(&probe));
    }

    #[test]
    fn test_probe_fails_when_index_unavailable() {
        let host = MemoryHost::new().with_package_index_unavailable();
        assert!(Package::new("systemd-resolved").probe(&host).is_err());
    }
}
