//! Per-key async locks
//!
//! Serializes read-modify-write cycles on one daily completion within this
//! process. Cross-process writers are still caught by the document version.

use bson::oid::ObjectId;
use chrono::NaiveDate;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub type CompletionKey = (ObjectId, NaiveDate);

type LockMap = DashMap<CompletionKey, Arc<Mutex<()>>>;

#[derive(Default)]
pub struct KeyedLocks {
    locks: Arc<LockMap>,
}

/// Exclusive access to one key. Dropping it (including when the owning
/// future is cancelled) removes the map entry once nobody else holds or
/// waits on it.
pub struct KeyGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
    key: CompletionKey,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // Unlock first so the mutex Arc held by the guard is gone
        self.guard.take();
        prune(&self.locks, &self.key);
    }
}

/// Removes the entry on drop unless a guard was obtained. Covers futures
/// cancelled while still waiting for the mutex.
struct PendingLock {
    locks: Arc<LockMap>,
    key: CompletionKey,
    armed: bool,
}

impl Drop for PendingLock {
    fn drop(&mut self) {
        if self.armed {
            prune(&self.locks, &self.key);
        }
    }
}

fn prune(locks: &LockMap, key: &CompletionKey) {
    locks.remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub async fn lock(&self, key: CompletionKey) -> KeyGuard {
        let mutex = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let mut pending = PendingLock {
            locks: Arc::clone(&self.locks),
            key,
            armed: true,
        };
        let guard = mutex.lock_owned().await;
        pending.armed = false;

        KeyGuard {
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
            key,
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
