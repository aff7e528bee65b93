//! In-memory store for writers inside a single process.

use crate::backend::SharedStore;
use crate::error::StoreResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: &str, now: Instant, ttl: Duration) -> Self {
        Self {
            value: value.to_owned(),
            expires_at: now.checked_add(ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// An in-memory expiring store.
///
/// Clones share the same underlying map, so one store can be handed to
/// every writer thread. Expired entries are dropped lazily when touched.
///
/// # Example
///
/// ```rust
/// use logwriter_store::{InMemoryStore, SharedStore};
/// use std::time::Duration;
///
/// let store = InMemoryStore::new();
/// store.set_with_expiry("k", "v", Duration::from_secs(60)).unwrap();
/// assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    atomic_insert: bool,
}

impl InMemoryStore {
    /// Creates an empty store that supports atomic insert-if-absent.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            atomic_insert: true,
        }
    }

    /// Creates an empty store that reports no atomic insert, forcing
    /// callers onto the write-then-verify path.
    #[must_use]
    pub fn without_atomic_insert() -> Self {
        Self {
            atomic_insert: false,
            ..Self::new()
        }
    }

    /// Number of unexpired entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|e| e.is_live(now)).count()
    }

    /// Returns true if no unexpired entries remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStore for InMemoryStore {
    fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let entry = Entry::new(value, Instant::now(), ttl);
        self.entries.lock().insert(key.to_owned(), entry);
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn try_insert(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<Option<bool>> {
        if !self.atomic_insert {
            return Ok(None);
        }

        let now = Instant::now();
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|e| e.is_live(now)) {
            return Ok(Some(false));
        }
        entries.insert(key.to_owned(), Entry::new(value, now, ttl));
        Ok(Some(true))
    }
}
