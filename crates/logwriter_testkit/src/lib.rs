//! # Log Writer Testkit
//!
//! Test utilities for the rotating log writer.
//!
//! This crate provides:
//! - Fixtures that pair a writer with a temporary directory, an in-memory
//!   store and a manual clock
//! - Property-based generators for records and legacy-charset input
//! - Golden file helpers for the on-disk format
//! - Shareable JSON test vectors
//! - Crash simulation (torn writes, abandoned mutexes, lost markers)
//! - Stress runners for concurrent appenders
//!
//! ## Usage
//!
//! ```rust,ignore
//! use logwriter_testkit::prelude::*;
//!
//! #[test]
//! fn appends_are_readable() {
//!     with_temp_log(|log| {
//!         log.writer.append("users", None, "hello").unwrap();
//!         assert_eq!(log.active_records().len(), 1);
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;
pub mod golden;
pub mod integration;
pub mod stress;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
    pub use crate::vectors::*;
}

pub use fixtures::*;
pub use generators::*;
pub use golden::*;
pub use integration::*;
pub use stress::*;
pub use vectors::*;
