//! Service resource - running/enabled flags and forced restarts

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::Resource;
use crate::context::{ApplyContext, Host};
use crate::types::{ProbeResult, ServiceStatus};

/// Desired state of a managed service
///
/// `running` and `enabled` are state assertions and are left alone when
/// `None`. `restarted` is an action: it is required on every run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub restarted: bool,
}

impl Service {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn running(mut self, running: bool) -> Self {
        self.running = Some(running);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn restarted(mut self) -> Self {
        self.restarted = true;
        self
    }

    fn flags_match(&self, status: ServiceStatus) -> bool {
        self.running.is_none_or(|r| r == status.active)
            && self.enabled.is_none_or(|e| e == status.enabled)
    }
}

fn describe(status: ServiceStatus) -> String {
    if !status.known {
        return "unit not found".to_string();
    }
    format!(
        "{}, {}",
        if status.active { "active" } else { "inactive" },
        if status.enabled { "enabled" } else { "disabled" }
    )
}

impl Resource for Service {
    fn id(&self) -> String {
        format!("service:{}", self.name)
    }

    fn description(&self) -> String {
        let mut wants = Vec::new();
        if let Some(enabled) = self.enabled {
            wants.push(if enabled { "enabled" } else { "disabled" });
        }
        if self.restarted {
            wants.push("restarted");
        } else if let Some(running) = self.running {
            wants.push(if running { "running" } else { "stopped" });
        }
        format!("Service {} {}", self.name, wants.join(" and "))
    }

    fn resource_type(&self) -> &'static str {
        "service"
    }

    fn probe(&self, host: &dyn Host) -> Result<ProbeResult> {
        let status = host
            .service_status(&self.name)
            .with_context(|| format!("Failed to query service manager for {}", self.name))?;

        let probe = if self.flags_match(status) {
            ProbeResult::in_sync()
        } else {
            ProbeResult::drifted()
        };

        Ok(ProbeResult {
            exists: status.known || status.active || status.enabled,
            ..probe.with_details(describe(status))
        })
    }

    fn is_required(&self, probe: &ProbeResult) -> bool {
        self.restarted || !probe.matches_desired
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<()> {
        let status = ctx.host.service_status(&self.name)?;

        if let Some(enabled) = self.enabled
            && enabled != status.enabled
        {
            ctx.privileged
                .set_service_enabled(&self.name, enabled)
                .with_context(|| format!("Failed to change boot state of {}", self.name))?;
        }

        if self.restarted {
            ctx.privileged
                .restart_service(&self.name)
                .with_context(|| format!("Failed to restart {}", self.name))?;
        } else if let Some(running) = self.running
            && running != status.active
        {
            ctx.privileged
                .set_service_running(&self.name, running)
                .with_context(|| {
                    format!(
                        "Failed to {} {}",
                        if running { "start" } else { "stop" },
                        self.name
                    )
                })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;

    #[test]
    fn test_matching_flags_not_required() {
        let host = MemoryHost::new().with_service("systemd-resolved", true, true);
        let svc = Service::new("systemd-resolved").running(true).enabled(true);
        let probe = svc.probe(&host).unwrap();
        assert!(probe.matches_desired);
        assert!(!svc.is_required(&probe));
    }

    #[test]
    fn test_enabled_mismatch_required() {
        let host = MemoryHost::new().with_service("systemd-resolved", true, false);
        let svc = Service::new("systemd-resolved").running(true).enabled(true);
        assert!(svc.is_required(&svc.probe(&host).unwrap()));
    }

    #[test]
    fn test_restart_always_required() {
        let host = MemoryHost::new().with_service("systemd-resolved", true, true);
        let svc = Service::new("systemd-resolved").restarted();
        let probe = svc.probe(&host).unwrap();
        assert!(probe.matches_desired);
        assert!(svc.is_required(&probe));
    }

    #[test]
    fn test_unset_flags_are_ignored() {
        let host = MemoryHost::new().with_service("systemd-resolved", false, true);
        let svc = Service::new("systemd-resolved").enabled(true);
        assert!(!svc.is_required(&svc.probe(&host).unwrap()));
    }

    #[test]
    fn test_stopped_disabled_unit_exists() {
        let host = MemoryHost::new().with_service("dnsR", false, false);
        let svc = Service::new("dnsR").running(true).enabled(true);
        let probe = svc.probe(&host).unwrap();
        assert!(probe.exists);
        assert!(!probe.matches_desired);
        assert_eq!(probe.details.as_deref(), Some("inactive, disabled"));

        let probe = Service::new("missing").running(true).probe(&host).unwrap();
        assert!(!probe.exists);
        assert_eq!(probe.details.as_deref(), Some("unit not found"));
    }

    #[test]
    fn test_description() {
        let svc = Service::new("dnsR").running(true).enabled(true);
        assert_eq!(svc.description(), "Service dnsR enabled and running");
        let restart = Service::new("systemd-resolved").restarted();
        assert_eq!(restart.description(), "Service systemd-resolved restarted");
    }
}
