//! Error taxonomy for a convergence run.
//!
//! A run fails in exactly two ways. Either a probe could not query the host
//! at all (nothing has been changed yet), or a required mutation could not be
//! applied (earlier changes of the same run stay in place). A missing
//! resource is never an error; it is an ordinary probe outcome.

use thiserror::Error;

/// Fatal failure of a convergence run.
///
/// `index` is zero-based; the rendered message counts from one so it reads
/// as "operation 3 of 10".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvergeError {
    /// The query mechanism behind a probe is unavailable
    #[error("operation {} of {total} failed: {id}: probe unavailable: {message}", .index + 1)]
    ProbeUnavailable {
        index: usize,
        total: usize,
        id: String,
        message: String,
    },

    /// A required change could not be applied
    #[error("operation {} of {total} failed: {id}: {message}", .index + 1)]
    MutationFailed {
        index: usize,
        total: usize,
        id: String,
        message: String,
    },
}

impl ConvergeError {
    /// Zero-based position of the failing operation
    pub fn index(&self) -> usize {
        match self {
            Self::ProbeUnavailable { index, .. } | Self::MutationFailed { index, .. } => *index,
        }
    }

    /// Identity of the failing operation
    pub fn id(&self) -> &str {
        match self {
            Self::ProbeUnavailable { id, .. } | Self::MutationFailed { id, .. } => id,
        }
    }

    /// Whether host state may have been changed before the failure
    pub fn host_touched(&self) -> bool {
        matches!(self, Self::MutationFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_failed_message_counts_from_one() {
        let err = ConvergeError::MutationFailed {
            index: 2,
            total: 10,
            id: "directory:/etc/systemd/resolved.conf.d".to_string(),
            message: "mkdir failed: read-only file system".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "operation 3 of 10 failed: directory:/etc/systemd/resolved.conf.d: mkdir failed: read-only file system"
        );
        assert!(err.host_touched());
        assert_eq!(err.index(), 2);
    }

    #[test]
    fn test_probe_unavailable_message() {
        let err = ConvergeError::ProbeUnavailable {
            index: 0,
            total: 10,
            id: "package:systemd-resolved".to_string(),
            message: "dpkg-query not found".to_string(),
        };
        assert!(err.to_string().starts_with("operation 1 of 10 failed"));
        assert!(err.to_string().contains("probe unavailable"));
        assert!(!err.host_touched());
        assert_eq!(err.id(), "package:systemd-resolved");
    }
}
