//! Core types for host convergence

use crate::operation::Operation;
use serde::{Deserialize, Serialize};

/// Observed state of one resource, compared against what an operation wants
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Whether the resource exists at all
    pub exists: bool,
    /// Whether the observed state already equals the desired state
    pub matches_desired: bool,
    /// Short human-readable detail (flags, digests, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Unified diff between current and desired content, for text files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl ProbeResult {
    /// Resource does not exist
    pub fn absent() -> Self {
        Self::default()
    }

    /// Resource exists and already matches
    pub fn in_sync() -> Self {
        Self {
            exists: true,
            matches_desired: true,
            ..Self::default()
        }
    }

    /// Resource exists but differs from desired
    pub fn drifted() -> Self {
        Self {
            exists: true,
            matches_desired: false,
            ..Self::default()
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_diff(mut self, diff: String) -> Self {
        self.diff = Some(diff);
        self
    }
}

/// Current flags of a managed service as reported by the service manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// The service manager has a unit by this name, whatever its state
    pub known: bool,
    pub active: bool,
    pub enabled: bool,
}

/// One planner output entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedOperation {
    pub operation: Operation,
    pub probe: ProbeResult,
    pub required: bool,
}

/// What the executor did with one planned operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Already converged, nothing done
    Skipped,
    /// Mutation applied
    Changed,
    /// Mutation attempted and failed; the run stopped here
    Failed,
}

/// Outcome of one operation within a single run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Zero-based position in the plan
    pub index: usize,
    pub operation: Operation,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionRecord {
    pub fn is_change(&self) -> bool {
        self.action == Action::Changed
    }

    pub fn is_failure(&self) -> bool {
        self.action == Action::Failed
    }
}

/// Counts of actions taken during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub skipped: usize,
    pub changed: usize,
    pub failed: usize,
    /// Operations never reached because an earlier one failed
    pub not_run: usize,
}

impl ExecuteSummary {
    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of operations in the plan
    pub fn total(&self) -> usize {
        self.skipped + self.changed + self.failed + self.not_run
    }

    /// Add a record to the summary
    pub fn add_record(&mut self, record: &ExecutionRecord) {
        match record.action {
            Action::Skipped => self.skipped += 1,
            Action::Changed => self.changed += 1,
            Action::Failed => self.failed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_constructors() {
        let absent = ProbeResult::absent();
        assert!(!absent.exists);
        assert!(!absent.matches_desired);

        let synced = ProbeResult::in_sync().with_details("active, enabled");
        assert!(synced.exists && synced.matches_desired);
        assert_eq!(synced.details.as_deref(), Some("active, enabled"));

        let drifted = ProbeResult::drifted();
        assert!(drifted.exists);
        assert!(!drifted.matches_desired);
    }

    #[test]
    fn test_summary_counts() {
        let op = Operation::package("curl");
        let mut summary = ExecuteSummary::default();
        for action in [Action::Skipped, Action::Changed, Action::Changed] {
            summary.add_record(&ExecutionRecord {
                index: 0,
                operation: op.clone(),
                action,
                error: None,
            });
        }
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.changed, 2);
        assert!(summary.is_success());
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn test_action_serializes_snake_case() {
        let json = serde_json::to_string(&Action::Skipped).unwrap();
        assert_eq!(json, "\"skipped\"");
    }
}
