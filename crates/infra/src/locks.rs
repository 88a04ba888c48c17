//! Per-aggregate mutual exclusion.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use crate::error::LedgerError;

/// One mutex per key, created on first use and never removed.
///
/// Callers only lock keys of existing accounts, so the registry grows with the
/// number of accounts, like the event store itself.
///
/// Every saga step that reads-then-writes an account runs inside
/// [`KeyedLocks::with_lock`] for that account, so steps touching the same
/// account are serialized while steps on different accounts run in parallel.
/// A step never holds more than one key.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Copy + Eq + Hash + Display> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, key: K) -> Option<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().ok()?;
        Some(locks.entry(key).or_default().clone())
    }

    /// Number of keys that have been locked at least once.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<T>(
        &self,
        key: K,
        f: impl FnOnce() -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let lock = self
            .lock_for(key)
            .ok_or_else(|| LedgerError::LockPoisoned(key.to_string()))?;
        let _guard = lock
            .lock()
            .map_err(|_| LedgerError::LockPoisoned(key.to_string()))?;
        f()
    }
}
