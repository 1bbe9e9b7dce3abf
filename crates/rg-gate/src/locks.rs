// locks.rs: Per-path async locks.
//
// Each gate operation holds its path's lock from the first delegate call to
// the last cleared-set update, which makes check-then-act atomic per path
// while different paths proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::GateError;

/// Table of per-path locks. Entries nobody holds or waits on are pruned
/// on the next acquisition.
#[derive(Debug, Default)]
pub struct PathLocks {
    entries: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `path`. Released when the guard drops.
    pub async fn acquire(&self, path: &str) -> Result<OwnedMutexGuard<()>, GateError> {
        let lock = {
            let mut entries = self
                .entries
                .lock()
                .map_err(|e| GateError::Internal(format!("path lock table poisoned: {}", e)))?;
            // Holders and waiters each own a clone, so count 1 means idle.
            entries.retain(|_, lock| Arc::strong_count(lock) > 1);
            entries.entry(path.to_string()).or_default().clone()
        };
        Ok(lock.lock_owned().await)
    }

    /// Number of tracked entries (held, awaited, or not yet pruned).
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_path_is_exclusive() {
        let locks = Arc::new(PathLocks::new());
        let guard = locks.acquire("a.txt").await.unwrap();

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.acquire("a.txt").await.unwrap();
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_paths_do_not_block() {
        let locks = PathLocks::new();
        let _a = locks.acquire("a.txt").await.unwrap();
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b.txt")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = PathLocks::new();
        for i in 0..10 {
            let _g = locks.acquire(&format!("file-{i}.txt")).await.unwrap();
        }
        // Only the entry for the most recent acquisition survives.
        let _g = locks.acquire("last.txt").await.unwrap();
        assert_eq!(locks.len(), 1);
    }
}
