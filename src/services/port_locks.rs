//! Per-connection mutual exclusion
//!
//! A serial port or FTP endpoint is driven by at most one request at a time.
//! Guards are owned so they can be held across awaits and are released on
//! every exit path when dropped. Entries nobody holds or waits on are pruned
//! on the next acquire.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

#[derive(Debug, Default)]
pub struct PortLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl PortLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of the link identified by `key`
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // The map's own reference is the only one left on idle links
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };

        if lock.try_lock().is_err() {
            log::debug!("⏳ Waiting for {} to become free", key);
        }
        lock.lock_owned().await
    }

    /// Number of links currently tracked
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True while some request holds `key`
    pub fn is_busy(&self, key: &str) -> bool {
        let locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .get(key)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }
}
