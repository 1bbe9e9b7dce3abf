// gate.rs: ReadGate, the read-before-write state machine.
//
// Per path:  Unknown --checked_read--> Cleared --write/diff dispatched--> Unknown
//
// A credential is consumed as soon as a mutation is dispatched, win or lose:
// a failed or cancelled delegate write still requires a fresh read before
// the next try.
// Rejections happen before any mutating delegate call.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use rg_audit::hasher::hash_str;
use rg_audit::{AuditLog, GateAction, GateEvent, GateOutcome};

use crate::delegate::{DelegateOp, FsDelegate};
use crate::error::{DelegateError, GateError};
use crate::guidance::with_guidance;
use crate::locks::PathLocks;

/// How a failed `stat` during `checked_write` is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatFailurePolicy {
    /// Any stat failure means the file does not exist, so no read is needed.
    #[default]
    TreatAsAbsent,
    /// Only `DelegateError::NotFound` means absent; other stat failures
    /// abort the write as internal errors.
    NotFoundOnly,
}

/// The read-gate tracker. Owns the cleared-set for its lifetime.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct ReadGate<D> {
    delegate: D,
    cleared: Mutex<HashSet<String>>,
    locks: PathLocks,
    stat_failure: StatFailurePolicy,
    audit_log: Option<Arc<Mutex<AuditLog>>>,
}

impl<D: FsDelegate> ReadGate<D> {
    pub fn new(delegate: D) -> Self {
        Self {
            delegate,
            cleared: Mutex::new(HashSet::new()),
            locks: PathLocks::new(),
            stat_failure: StatFailurePolicy::default(),
            audit_log: None,
        }
    }

    pub fn with_stat_failure(mut self, policy: StatFailurePolicy) -> Self {
        self.stat_failure = policy;
        self
    }

    /// Record every decision to a hash-chained decision log.
    pub fn with_audit_log(mut self, log: AuditLog) -> Self {
        self.audit_log = Some(Arc::new(Mutex::new(log)));
        self
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn stat_failure(&self) -> StatFailurePolicy {
        self.stat_failure
    }

    /// Whether `path` currently holds an unused read credential.
    pub fn is_cleared(&self, path: &str) -> Result<bool, GateError> {
        Ok(self.cleared_set()?.contains(path))
    }

    /// Cleared paths, sorted.
    pub fn cleared_paths(&self) -> Result<Vec<String>, GateError> {
        let mut paths: Vec<String> = self.cleared_set()?.iter().cloned().collect();
        paths.sort();
        Ok(paths)
    }

    /// Read through the delegate and grant a credential for `path`.
    ///
    /// Reads are never gated. A failed read grants nothing.
    pub async fn checked_read(&self, path: &str) -> Result<Value, GateError> {
        let _guard = self.locks.acquire(path).await?;

        match self.delegate.read(path).await {
            Ok(result) => {
                self.cleared_set()?.insert(path.to_string());
                debug!(path, "read credential granted");
                self.record(GateEvent::new(GateAction::Read, path, GateOutcome::Allowed))
                    .await;
                Ok(result)
            }
            Err(source) => {
                let err = GateError::delegate(DelegateOp::Read, path, source);
                self.record(
                    GateEvent::new(GateAction::Read, path, GateOutcome::Failed)
                        .with_detail(err.to_string()),
                )
                .await;
                Err(err)
            }
        }
    }

    /// Write `content` to `path`.
    ///
    /// Existing files need a credential; new files do not. Existence comes
    /// from the delegate's `stat`, interpreted per [`StatFailurePolicy`].
    pub async fn checked_write(
        &self,
        path: &str,
        content: &str,
        line_count: u64,
    ) -> Result<Value, GateError> {
        let _guard = self.locks.acquire(path).await?;
        let input_hash = hash_str(content);

        let exists = match self.exists(path).await {
            Ok(exists) => exists,
            Err(err) => {
                self.record(
                    GateEvent::new(GateAction::Write, path, GateOutcome::Failed)
                        .with_input_hash(input_hash)
                        .with_detail(err.to_string()),
                )
                .await;
                return Err(err);
            }
        };

        let cleared = self.is_cleared(path)?;
        if exists && !cleared {
            let err = GateError::BlindWrite {
                path: path.to_string(),
            };
            warn!(path, "blind write rejected");
            self.record(
                GateEvent::new(GateAction::Write, path, GateOutcome::Denied)
                    .with_input_hash(input_hash)
                    .with_detail(err.to_string()),
            )
            .await;
            return Err(err);
        }

        // Consumed before the await: a cancelled call may already be in flight.
        let consumed = self.consume(path)?;
        let outcome = self.delegate.write(path, content, line_count).await;

        match outcome {
            Ok(result) => {
                info!(path, line_count, existed = exists, "write dispatched");
                self.record(
                    GateEvent::new(GateAction::Write, path, GateOutcome::Allowed)
                        .with_input_hash(input_hash)
                        .with_credential_consumed(consumed),
                )
                .await;
                Ok(with_guidance(result))
            }
            Err(source) => {
                let err = GateError::delegate(DelegateOp::Write, path, source);
                self.record(
                    GateEvent::new(GateAction::Write, path, GateOutcome::Failed)
                        .with_input_hash(input_hash)
                        .with_credential_consumed(consumed)
                        .with_detail(err.to_string()),
                )
                .await;
                Err(err)
            }
        }
    }

    /// Apply `diff` to `path`. Requires a credential; never stats.
    pub async fn checked_diff(&self, path: &str, diff: &str) -> Result<Value, GateError> {
        let _guard = self.locks.acquire(path).await?;
        let input_hash = hash_str(diff);

        if !self.is_cleared(path)? {
            let err = GateError::BlindDiff {
                path: path.to_string(),
            };
            warn!(path, "blind diff rejected");
            self.record(
                GateEvent::new(GateAction::Diff, path, GateOutcome::Denied)
                    .with_input_hash(input_hash)
                    .with_detail(err.to_string()),
            )
            .await;
            return Err(err);
        }

        let consumed = self.consume(path)?;
        let outcome = self.delegate.apply_diff(path, diff).await;

        match outcome {
            Ok(result) => {
                info!(path, "diff dispatched");
                self.record(
                    GateEvent::new(GateAction::Diff, path, GateOutcome::Allowed)
                        .with_input_hash(input_hash)
                        .with_credential_consumed(consumed),
                )
                .await;
                Ok(with_guidance(result))
            }
            Err(source) => {
                let err = GateError::delegate(DelegateOp::ApplyDiff, path, source);
                self.record(
                    GateEvent::new(GateAction::Diff, path, GateOutcome::Failed)
                        .with_input_hash(input_hash)
                        .with_credential_consumed(consumed)
                        .with_detail(err.to_string()),
                )
                .await;
                Err(err)
            }
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, GateError> {
        match self.delegate.stat(path).await {
            Ok(_) => Ok(true),
            Err(DelegateError::NotFound(_)) => Ok(false),
            Err(source) => match self.stat_failure {
                StatFailurePolicy::TreatAsAbsent => {
                    debug!(path, error = %source, "stat failed, treating file as absent");
                    Ok(false)
                }
                StatFailurePolicy::NotFoundOnly => {
                    Err(GateError::delegate(DelegateOp::Stat, path, source))
                }
            },
        }
    }

    /// Drop the credential for `path`. Returns whether one was held.
    fn consume(&self, path: &str) -> Result<bool, GateError> {
        let consumed = self.cleared_set()?.remove(path);
        if consumed {
            debug!(path, "read credential consumed");
        }
        Ok(consumed)
    }

    fn cleared_set(&self) -> Result<MutexGuard<'_, HashSet<String>>, GateError> {
        self.cleared
            .lock()
            .map_err(|e| GateError::Internal(format!("cleared-set lock poisoned: {}", e)))
    }

    /// Append to the decision log off the async worker. Failures are logged,
    /// never surfaced.
    async fn record(&self, mut event: GateEvent) {
        let Some(log) = &self.audit_log else {
            return;
        };
        let log = Arc::clone(log);
        let path = event.path.clone();
        let result = tokio::task::spawn_blocking(move || match log.lock() {
            Ok(mut log) => log.append(&mut event).map_err(|e| e.to_string()),
            Err(e) => Err(format!("audit log lock poisoned: {}", e)),
        })
        .await
        .unwrap_or_else(|e| Err(format!("audit append task failed: {}", e)));
        if let Err(e) = result {
            warn!(path = %path, "failed to record gate decision: {}", e);
        }
    }
}
