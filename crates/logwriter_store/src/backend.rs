//! Shared store trait definition.

use crate::error::StoreResult;
use std::time::Duration;

/// A key/value store shared by every writer that must coordinate.
///
/// Entries carry a time-to-live and are expired by the store itself;
/// clients never poll for expiry. No atomic compare-and-swap is required:
/// the cross-process mutex built on top tolerates racing writers by
/// reading back what it wrote.
///
/// # Invariants
///
/// - `get` never returns an entry whose TTL has elapsed
/// - `set_with_expiry` overwrites any existing value and resets its TTL
/// - `delete` of an absent key is not an error
/// - Stores must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For writers inside one process, and tests
/// - [`super::FileStore`] - For independent processes sharing a directory
pub trait SharedStore: Send + Sync {
    /// Returns true if `key` currently holds an unexpired value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Stores `value` under `key`, expiring after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written.
    fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Returns the unexpired value under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry exists but cannot be removed.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Atomically stores `value` under `key` only if the key is absent.
    ///
    /// Returns `Some(true)` if the value was stored, `Some(false)` if the
    /// key was already held, and `None` if this store has no atomic
    /// insert-if-absent. The default implementation returns `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be accessed.
    fn try_insert(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<Option<bool>> {
        let _ = (key, value, ttl);
        Ok(None)
    }
}

impl<S: SharedStore + ?Sized> SharedStore for std::sync::Arc<S> {
    fn exists(&self, key: &str) -> StoreResult<bool> {
        (**self).exists(key)
    }

    fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        (**self).set_with_expiry(key, value, ttl)
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key)
    }

    fn try_insert(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<Option<bool>> {
        (**self).try_insert(key, value, ttl)
    }
}
