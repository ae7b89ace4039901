//! Execution engine - applies a plan in order with per-operation privileges

use crate::context::{ApplyContext, Host, ProgressCallback};
use crate::error::ConvergeError;
use crate::resource::Resource;
use crate::types::{Action, ExecuteSummary, ExecutionRecord, PlannedOperation};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Records of one run, in plan order
///
/// Holds one record per operation that was reached. After a failure the
/// list ends with the failed record and `total` exceeds its length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub records: Vec<ExecutionRecord>,
    pub total: usize,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        !self.records.iter().any(ExecutionRecord::is_failure)
    }

    pub fn summary(&self) -> ExecuteSummary {
        let mut summary = ExecuteSummary::default();
        for record in &self.records {
            summary.add_record(record);
        }
        summary.not_run = self.total - self.records.len();
        summary
    }

    /// The failure that stopped the run, if any
    pub fn failure(&self) -> Option<ConvergeError> {
        self.records.iter().find(|r| r.is_failure()).map(|r| {
            ConvergeError::MutationFailed {
                index: r.index,
                total: self.total,
                id: r.operation.id(),
                message: r.error.clone().unwrap_or_default(),
            }
        })
    }

    pub fn into_result(self) -> Result<Self, ConvergeError> {
        match self.failure() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

/// Execute a plan against the host
///
/// Entries are processed strictly in order. Entries not required are
/// recorded as skipped. Required entries get privileges acquired just before
/// the mutation and released right after it. The first failure is recorded
/// and ends the run; nothing is rolled back.
pub fn execute<P: ProgressCallback + ?Sized>(
    plan: Vec<PlannedOperation>,
    host: &dyn Host,
    progress: &mut P,
) -> ExecutionReport {
    let total = plan.len();
    progress.on_plan(&plan);

    let mut report = ExecutionReport {
        records: Vec::with_capacity(total),
        total,
    };

    for (index, planned) in plan.into_iter().enumerate() {
        progress.on_operation_start(index, total, &planned);

        let record = if planned.required {
            match apply_operation(&planned, host) {
                Ok(()) => {
                    log::info!("changed {}", planned.operation.id());
                    ExecutionRecord {
                        index,
                        operation: planned.operation,
                        action: Action::Changed,
                        error: None,
                    }
                }
                Err(e) => {
                    log::error!("failed {}: {e:#}", planned.operation.id());
                    ExecutionRecord {
                        index,
                        operation: planned.operation,
                        action: Action::Failed,
                        error: Some(format!("{e:#}")),
                    }
                }
            }
        } else {
            log::debug!("skipped {}", planned.operation.id());
            ExecutionRecord {
                index,
                operation: planned.operation,
                action: Action::Skipped,
                error: None,
            }
        };

        progress.on_operation_complete(index, total, &record);

        let failed = record.is_failure();
        report.records.push(record);
        if failed {
            break;
        }
    }

    report
}

/// Apply a single operation under its own privilege scope
fn apply_operation(planned: &PlannedOperation, host: &dyn Host) -> Result<()> {
    let operation = &planned.operation;
    let privileged = host.elevate(&operation.description())?;

    let mut ctx = ApplyContext::new(host, privileged.as_ref());
    operation.apply(&mut ctx)
    // privileges dropped here
}
