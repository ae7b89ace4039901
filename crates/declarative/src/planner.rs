//! Planner - probes every operation and decides which ones need a change

use crate::context::Host;
use crate::error::ConvergeError;
use crate::operation::Operation;
use crate::resource::Resource;
use crate::types::PlannedOperation;

/// Plan an ordered list of operations against the host
///
/// Probes run read-only, strictly in input order. The output keeps that
/// order, one entry per operation. The first probe whose query mechanism is
/// unavailable aborts planning; nothing has been changed at that point.
pub fn plan(ops: &[Operation], host: &dyn Host) -> Result<Vec<PlannedOperation>, ConvergeError> {
    let total = ops.len();

    ops.iter()
        .enumerate()
        .map(|(index, operation)| {
            let probe = operation
                .probe(host)
                .map_err(|e| ConvergeError::ProbeUnavailable {
                    index,
                    total,
                    id: operation.id(),
                    message: format!("{e:#}"),
                })?;

            let required = operation.is_required(&probe);
            log::debug!(
                "probe {}: exists={} matches={} required={}",
                operation.id(),
                probe.exists,
                probe.matches_desired,
                required
            );

            Ok(PlannedOperation {
                operation: operation.clone(),
                probe,
                required,
            })
        })
        .collect()
}

/// Number of entries that will change the host
pub fn pending_changes(plan: &[PlannedOperation]) -> usize {
    plan.iter().filter(|p| p.required).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;
    use crate::resource::Service;

    fn ops() -> Vec<Operation> {
        vec![
            Operation::package("systemd-resolved"),
            Operation::directory("/etc/systemd/resolved.conf.d"),
            Operation::line("/etc/systemd/resolved.conf.d/dnsR.conf", "[Resolve]"),
            Operation::service(Service::new("systemd-resolved").restarted()),
        ]
    }

    #[test]
    fn test_plan_keeps_input_order() {
        let host = MemoryHost::new();
        let planned = plan(&ops(), &host).unwrap();
        let ids: Vec<_> = planned.iter().map(|p| p.operation.id()).collect();
        let expected: Vec<_> = ops().iter().map(Resource::id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_plan_marks_converged_entries() {
        let host = MemoryHost::new()
            .with_installed_package("systemd-resolved")
            .with_dir("/etc/systemd/resolved.conf.d")
            .with_service("systemd-resolved", true, true);

        let planned = plan(&ops(), &host).unwrap();
        let required: Vec<_> = planned.iter().map(|p| p.required).collect();
        assert_eq!(required, vec![false, false, true, true]);
        assert_eq!(pending_changes(&planned), 2);
    }

    #[test]
    fn test_plan_does_not_touch_host() {
        let host = MemoryHost::new();
        let before = host.snapshot();
        plan(&ops(), &host).unwrap();
        assert_eq!(host.snapshot(), before);
        assert_eq!(host.snapshot().elevations, 0);
    }

    #[test]
    fn test_unavailable_service_manager_aborts_planning() {
        let host = MemoryHost::new().with_service_manager_unavailable();
        let err = plan(&ops(), &host).unwrap_err();
        assert!(matches!(
            err,
            ConvergeError::ProbeUnavailable { index: 3, total: 4, .. }
        ));
    }

    #[test]
    fn test_empty_plan() {
        let host = MemoryHost::new();
        assert!(plan(&[], &host).unwrap().is_empty());
    }
}
