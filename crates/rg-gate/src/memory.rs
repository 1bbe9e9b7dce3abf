// memory.rs: In-memory FsDelegate for tests and dry runs.
//
// Holds files in a map, records every call, and can be told to fail a
// given operation on a given path until `clear_failures` is called. Diffs
// are recorded, not applied.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::delegate::{DelegateOp, FsDelegate};
use crate::error::DelegateError;

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<String, String>,
    diffs: Vec<(String, String)>,
    failures: HashMap<(DelegateOp, String), DelegateError>,
    calls: Vec<(DelegateOp, String)>,
}

/// Fake filesystem delegate.
#[derive(Debug, Default)]
pub struct MemoryDelegate {
    state: Mutex<MemoryState>,
}

impl MemoryDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_file(&self, path: impl Into<String>, content: impl Into<String>) {
        self.state().files.insert(path.into(), content.into());
    }

    pub fn remove_file(&self, path: &str) -> Option<String> {
        self.state().files.remove(path)
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.state().files.get(path).cloned()
    }

    /// Make `op` on `path` fail with `error` until cleared.
    pub fn fail(&self, op: DelegateOp, path: impl Into<String>, error: DelegateError) {
        self.state().failures.insert((op, path.into()), error);
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<(DelegateOp, String)> {
        self.state().calls.clone()
    }

    pub fn count(&self, op: DelegateOp) -> usize {
        self.state().calls.iter().filter(|(o, _)| *o == op).count()
    }

    /// Diffs received, as `(path, diff)`.
    pub fn diffs(&self) -> Vec<(String, String)> {
        self.state().diffs.clone()
    }

    /// The payload `read` returns for `path` in its current state.
    pub fn read_payload(&self, path: &str) -> Value {
        match self.file(path) {
            Some(content) => json!({ "path": path, "content": content }),
            None => Value::Null,
        }
    }

    // A panic while holding this lock can only come from a test thread;
    // recover the data rather than cascading the poison.
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the call and return the injected failure, if any.
    fn enter(&self, op: DelegateOp, path: &str) -> Result<MutexGuard<'_, MemoryState>, DelegateError> {
        let mut state = self.state();
        state.calls.push((op, path.to_string()));
        if let Some(err) = state.failures.get(&(op, path.to_string())).cloned() {
            return Err(err);
        }
        Ok(state)
    }
}

#[async_trait]
impl FsDelegate for MemoryDelegate {
    async fn read(&self, path: &str) -> Result<Value, DelegateError> {
        let state = self.enter(DelegateOp::Read, path)?;
        let content = state
            .files
            .get(path)
            .ok_or_else(|| DelegateError::NotFound(path.to_string()))?;
        Ok(json!({ "path": path, "content": content }))
    }

    async fn stat(&self, path: &str) -> Result<Value, DelegateError> {
        let state = self.enter(DelegateOp::Stat, path)?;
        let content = state
            .files
            .get(path)
            .ok_or_else(|| DelegateError::NotFound(path.to_string()))?;
        Ok(json!({
            "path": path,
            "size": content.len(),
            "lines": content.lines().count(),
        }))
    }

    async fn write(
        &self,
        path: &str,
        content: &str,
        line_count: u64,
    ) -> Result<Value, DelegateError> {
        let mut state = self.enter(DelegateOp::Write, path)?;
        state.files.insert(path.to_string(), content.to_string());
        Ok(json!({
            "path": path,
            "bytesWritten": content.len(),
            "lineCount": line_count,
        }))
    }

    async fn apply_diff(&self, path: &str, diff: &str) -> Result<Value, DelegateError> {
        let mut state = self.enter(DelegateOp::ApplyDiff, path)?;
        if !state.files.contains_key(path) {
            return Err(DelegateError::NotFound(path.to_string()));
        }
        state.diffs.push((path.to_string(), diff.to_string()));
        Ok(json!({ "path": path, "applied": true }))
    }
}
