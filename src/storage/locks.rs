//! Exclusive row locks.
//!
//! Every lockable row is represented by an async mutex slot. A transaction
//! acquiring a row receives an owned guard and keeps it until it commits,
//! rolls back or is dropped. Slots are created on first use and pruned once
//! nobody holds or waits for them.

use crate::core::{DocketError, Result, StoreError};
use crate::storage::engine::RowKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct LockKey {
    pub table: String,
    pub key: RowKey,
}

impl LockKey {
    pub fn new(table: &str, key: &RowKey) -> Self {
        Self {
            table: table.to_string(),
            key: key.clone(),
        }
    }
}

/// A held row lock. Dropping it releases the row.
pub(crate) struct RowLockGuard {
    _guard: OwnedMutexGuard<()>,
}

#[derive(Default)]
pub(crate) struct LockTable {
    slots: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive ownership of `key`.
    ///
    /// With a timeout, a wait that does not complete in time fails with
    /// `StoreError::LockTimeout` and leaves the lock untouched.
    pub async fn acquire(&self, key: &LockKey, timeout: Option<Duration>) -> Result<RowLockGuard> {
        let slot = {
            let mut slots = self.slots.lock()?;
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let started = Instant::now();
        let guard = match timeout {
            Some(limit) => match tokio::time::timeout(limit, slot.lock_owned()).await {
                Ok(guard) => guard,
                Err(_) => {
                    // The slot stays; whoever releases the row prunes it.
                    return Err(DocketError::Store(StoreError::LockTimeout {
                        table: key.table.clone(),
                        key: key.key.to_string(),
                        waited_ms: started.elapsed().as_millis(),
                    }));
                }
            },
            None => slot.lock_owned().await,
        };

        Ok(RowLockGuard { _guard: guard })
    }

    /// Drop the slot for `key` if no guard or waiter references it.
    pub fn prune(&self, key: &LockKey) -> Result<()> {
        let mut slots = self.slots.lock()?;
        if slots
            .get(key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(key);
        }
        Ok(())
    }

    /// Number of rows that currently have a slot (held, awaited or not yet pruned).
    pub fn slot_count(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }
}
