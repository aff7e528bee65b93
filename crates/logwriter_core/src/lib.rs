//! # Log Writer Core
//!
//! Append-only binary log writer with time-based rotation, safe for
//! concurrent writers within one process and across independent processes.
//!
//! This crate provides:
//! - [`LogWriter`], the append entry point
//! - [`RotationManager`], which archives the active file once it outlives
//!   its configured lifetime
//! - [`CrossProcessMutex`], a TTL-bounded mutex over a shared expiring store
//! - [`LockedFile`], an OS advisory lock retried with jittered backoff
//!
//! ## Invariants
//!
//! - At most one active file per directory; archives are never reopened
//! - Rotation decisions are made only while the cross-process mutex is held
//! - Bytes reach the active file only while the OS lock is held
//! - A rejected record performs no I/O

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backoff;
mod clock;
mod config;
mod dir;
mod error;
mod file_lock;
mod rotation;
mod semaphore;
mod writer;

pub use backoff::Backoff;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use dir::LogDir;
pub use error::{LogError, LogResult};
pub use file_lock::LockedFile;
pub use rotation::{RotationManager, RotationOutcome};
pub use semaphore::{CrossProcessMutex, ReleaseOutcome, Ticket};
pub use writer::{Appended, LogWriter};

pub use logwriter_codec::{LegacyCharset, LogRecord};
pub use logwriter_store::{FileStore, InMemoryStore, SharedStore};
