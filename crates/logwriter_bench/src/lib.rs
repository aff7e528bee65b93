//! Shared helpers for the log writer benchmarks.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
