//! Cross-process mutex over a shared expiring store.
//!
//! Processes that share no memory serialize through a single key in a
//! [`SharedStore`]. The holder's ticket lives under `semaphore-<name>` with
//! a TTL, so a crashed holder blocks others for at most that long.
//!
//! ## Acquire
//!
//! 1. Mint a fresh ticket (clock nanos plus a random UUID).
//! 2. While the key holds any value, sleep a randomized backoff.
//! 3. Write the ticket with the TTL.
//! 4. Read the key back. Our ticket means we hold the mutex; anything else
//!    means another writer raced us, so go back to step 2.
//!
//! Stores with an atomic insert-if-absent skip the read-back. There is no
//! fairness: any waiter may win next.

use crate::backoff::Backoff;
use crate::error::LogResult;
use logwriter_store::SharedStore;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Proof of holding a [`CrossProcessMutex`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticket(String);

impl Ticket {
    /// Mints a ticket that is unique with overwhelming probability.
    #[must_use]
    pub fn generate() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self(format!("{nanos:x}-{}", uuid::Uuid::new_v4().simple()))
    }

    /// Wraps an existing ticket value.
    #[must_use]
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the ticket value as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of [`CrossProcessMutex::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The ticket was current and the slot is now free.
    Released,
    /// The slot had expired or been reassigned; nothing was changed.
    Stale,
}

/// A named, TTL-bounded mutex shared through a [`SharedStore`].
#[derive(Clone)]
pub struct CrossProcessMutex {
    store: Arc<dyn SharedStore>,
    key: String,
    ttl: Duration,
    backoff: Backoff,
}

impl fmt::Debug for CrossProcessMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossProcessMutex")
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl CrossProcessMutex {
    /// Creates a mutex for resource `name`.
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>, name: &str, ttl: Duration, backoff: Backoff) -> Self {
        Self {
            store,
            key: format!("semaphore-{name}"),
            ttl,
            backoff,
        }
    }

    /// Returns the store key this mutex occupies.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Blocks until the mutex is held and returns the ticket proving it.
    ///
    /// There is no timeout; liveness relies on holders releasing or on
    /// their tickets expiring.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store itself fails.
    pub fn acquire(&self) -> LogResult<Ticket> {
        let ticket = Ticket::generate();
        loop {
            while self.store.exists(&self.key)? {
                debug!(key = %self.key, "mutex busy; backing off");
                self.backoff.sleep();
            }

            match self.store.try_insert(&self.key, ticket.as_str(), self.ttl)? {
                Some(true) => return Ok(ticket),
                Some(false) => continue,
                None => {}
            }

            self.store
                .set_with_expiry(&self.key, ticket.as_str(), self.ttl)?;
            if self.store.get(&self.key)?.as_deref() == Some(ticket.as_str()) {
                return Ok(ticket);
            }
            debug!(key = %self.key, "lost mutex race; retrying");
        }
    }

    /// Releases the mutex if `ticket` still holds it.
    ///
    /// A stale ticket (expired, or the slot reassigned after expiry) is
    /// logged and otherwise ignored, so a slow holder can never free a
    /// slot someone else now owns.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store itself fails.
    pub fn release(&self, ticket: &Ticket) -> LogResult<ReleaseOutcome> {
        if self.store.get(&self.key)?.as_deref() == Some(ticket.as_str()) {
            self.store.delete(&self.key)?;
            return Ok(ReleaseOutcome::Released);
        }
        warn!(key = %self.key, ticket = %ticket, "stale mutex release; slot no longer held by this ticket");
        Ok(ReleaseOutcome::Stale)
    }
}
