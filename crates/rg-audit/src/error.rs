// error.rs: Error types for the gate decision log.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing or verifying the decision log.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to open or create the log file.
    #[error("failed to open audit log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write an event.
    #[error("failed to append event: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// A line could not be serialized or parsed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The hash chain is broken at the given line.
    #[error("integrity check failed at line {line}: expected hash {expected}, got {actual}")]
    IntegrityViolation {
        line: usize,
        expected: String,
        actual: String,
    },
}
