//! # Log Writer Store
//!
//! The expiring key/value store contract that the cross-process mutex is
//! built on, and two implementations of it.
//!
//! The store is the only coordination medium between writers that share
//! no memory. It must expire entries on its own; atomic compare-and-swap
//! is optional and advertised through [`SharedStore::try_insert`].
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For threads of one process, and for testing
//! - [`FileStore`] - For independent processes sharing a directory
//!
//! ## Example
//!
//! ```rust
//! use logwriter_store::{InMemoryStore, SharedStore};
//! use std::time::Duration;
//!
//! let store = InMemoryStore::new();
//! store.set_with_expiry("semaphore-log", "t1", Duration::from_secs(5)).unwrap();
//! assert!(store.exists("semaphore-log").unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::SharedStore;
pub use error::{StoreError, StoreResult};
pub use file::{is_valid_key, FileStore};
pub use memory::InMemoryStore;
