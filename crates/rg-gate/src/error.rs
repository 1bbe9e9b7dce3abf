// error.rs: Error taxonomy for the gate and its delegate.
//
// Gating violations, unknown operations, and bad arguments are
// InvalidRequest class. Everything the delegate reports, and anything else
// unexpected, is InternalError class with the original message kept.

use thiserror::Error;

use crate::delegate::DelegateOp;

/// Failure reported by the filesystem delegate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DelegateError {
    /// The delegate says the path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other delegate failure (I/O, transport, tool error).
    #[error("{0}")]
    Failed(String),
}

/// Coarse category of a [`GateError`], as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    InternalError,
}

/// Errors surfaced by [`crate::ReadGate`] and request routing.
#[derive(Debug, Error)]
pub enum GateError {
    /// Write to an existing file that has not been read through the gate.
    #[error("Blind write prevented: File \"{path}\" exists. Please use checked_read_file to verify the file before modifying it.")]
    BlindWrite { path: String },

    /// Diff against a file that has not been read through the gate.
    #[error("Blind diff prevented: File \"{path}\" must be read using checked_read_file before applying a diff.")]
    BlindDiff { path: String },

    /// Tool name not served by the gate.
    #[error("Unknown tool: {name}")]
    UnknownOperation { name: String },

    /// Tool arguments missing or of the wrong type.
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The delegate failed during an operation the gate allowed.
    #[error("{operation} failed for \"{path}\": {source}")]
    Delegate {
        operation: DelegateOp,
        path: String,
        #[source]
        source: DelegateError,
    },

    /// Anything else unexpected, e.g. a poisoned lock.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GateError {
    pub fn delegate(operation: DelegateOp, path: impl Into<String>, source: DelegateError) -> Self {
        GateError::Delegate {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::BlindWrite { .. }
            | GateError::BlindDiff { .. }
            | GateError::UnknownOperation { .. }
            | GateError::InvalidArguments { .. } => ErrorKind::InvalidRequest,
            GateError::Delegate { .. } | GateError::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// True for the two read-before-write rejections.
    pub fn is_gating_violation(&self) -> bool {
        matches!(
            self,
            GateError::BlindWrite { .. } | GateError::BlindDiff { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gating_messages_name_path_and_remedy() {
        let write = GateError::BlindWrite {
            path: "a.txt".into(),
        };
        let diff = GateError::BlindDiff {
            path: "b.txt".into(),
        };
        for (err, path) in [(write, "a.txt"), (diff, "b.txt")] {
            let msg = err.to_string();
            assert!(msg.contains(path), "{msg}");
            assert!(msg.contains("checked_read_file"), "{msg}");
            assert!(err.is_gating_violation());
            assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        }
    }

    #[test]
    fn delegate_errors_are_internal_and_keep_message() {
        let err = GateError::delegate(
            DelegateOp::Write,
            "c.txt",
            DelegateError::Failed("disk full".into()),
        );
        assert_eq!(err.kind(), ErrorKind::InternalError);
        assert!(!err.is_gating_violation());
        assert!(err.to_string().contains("disk full"));
        assert!(err.to_string().contains("c.txt"));
    }

    #[test]
    fn unknown_operation_is_invalid_request() {
        let err = GateError::UnknownOperation {
            name: "rm_rf".into(),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.to_string(), "Unknown tool: rm_rf");
    }
}
