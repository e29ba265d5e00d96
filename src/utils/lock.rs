use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub const LP_LOCK_KEY: &str = "sync:lps";
pub const DIRECTORY_LOCK_KEY: &str = "sync:listener:lock:markets";
pub const SWAP_EVENTS_LOCK_KEY: &str = "sync:swap_events";

pub fn interval_lock_key(market_id: &str) -> String {
    format!("sync:interval:{market_id}")
}

pub fn history_lock_key(market_id: &str) -> String {
    format!("sync:history:{market_id}")
}

pub fn order_lock_key(market_id: &str) -> String {
    format!("sync:order:{market_id}")
}

/// Keyed mutual exclusion: one async mutex per distinct key, created on first use.
///
/// The per-key mutex is looked up or inserted through the dashmap entry API,
/// which holds the shard lock for the whole lookup-or-insert, so two tasks
/// racing on a fresh key always end up sharing one mutex.
#[derive(Debug, Default)]
pub struct NamedLocker {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Held lock for one key; released on drop.
pub struct NamedLockGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl NamedLockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for NamedLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedLockGuard").field("key", &self.key).finish()
    }
}

impl NamedLocker {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex(&self, key: &str) -> Arc<Mutex<()>> {
        // the shard guard is dropped before anyone awaits the mutex
        self.locks.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Waits until `key` is free and takes it.
    pub async fn lock(&self, key: &str) -> NamedLockGuard {
        let guard = self.mutex(key).lock_owned().await;
        NamedLockGuard { key: key.to_string(), _guard: guard }
    }

    pub fn try_lock(&self, key: &str) -> Option<NamedLockGuard> {
        let guard = self.mutex(key).try_lock_owned().ok()?;
        Some(NamedLockGuard { key: key.to_string(), _guard: guard })
    }

    pub fn is_locked(&self, key: &str) -> bool {
        let Some(mutex) = self.locks.get(key).map(|mutex| Arc::clone(&mutex)) else {
            return false;
        };
        mutex.try_lock().is_err()
    }

    /// Number of keys ever locked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
