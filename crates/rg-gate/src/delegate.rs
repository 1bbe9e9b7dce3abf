// delegate.rs: The filesystem capability the gate forwards to.
//
// The gate never touches files itself. Results are opaque JSON payloads
// that the gate passes through (reads) or augments (mutations).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DelegateError;

/// Delegate operation, used in error messages and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelegateOp {
    Read,
    Stat,
    Write,
    ApplyDiff,
}

impl fmt::Display for DelegateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DelegateOp::Read => "read",
            DelegateOp::Stat => "stat",
            DelegateOp::Write => "write",
            DelegateOp::ApplyDiff => "apply_diff",
        };
        f.write_str(name)
    }
}

/// External filesystem service.
///
/// Implementations report a missing file as [`DelegateError::NotFound`]
/// where they can tell; everything else is [`DelegateError::Failed`].
#[async_trait]
pub trait FsDelegate: Send + Sync {
    async fn read(&self, path: &str) -> Result<Value, DelegateError>;

    /// Existence metadata. Any `Ok` means the file exists.
    async fn stat(&self, path: &str) -> Result<Value, DelegateError>;

    async fn write(&self, path: &str, content: &str, line_count: u64)
        -> Result<Value, DelegateError>;

    async fn apply_diff(&self, path: &str, diff: &str) -> Result<Value, DelegateError>;
}

#[async_trait]
impl<D: FsDelegate + ?Sized> FsDelegate for Arc<D> {
    async fn read(&self, path: &str) -> Result<Value, DelegateError> {
        (**self).read(path).await
    }

    async fn stat(&self, path: &str) -> Result<Value, DelegateError> {
        (**self).stat(path).await
    }

    async fn write(
        &self,
        path: &str,
        content: &str,
        line_count: u64,
    ) -> Result<Value, DelegateError> {
        (**self).write(path, content, line_count).await
    }

    async fn apply_diff(&self, path: &str, diff: &str) -> Result<Value, DelegateError> {
        (**self).apply_diff(path, diff).await
    }
}
