//! Advisory exclusive lock on an open file.
//!
//! Serializes appends host-wide, including writers that bypass the
//! cross-process mutex. The lock is tied to the open file description and
//! is released by the OS if the process dies.

use crate::backoff::Backoff;
use fs2::FileExt;
use std::fs::File;
use std::io::{self, Write};
use tracing::debug;

/// A file held under an exclusive advisory lock.
///
/// The lock is released by [`LockedFile::unlock`] or, failing that, on drop.
#[derive(Debug)]
pub struct LockedFile {
    file: File,
    locked: bool,
}

impl LockedFile {
    /// Locks `file`, retrying with `backoff` while another holder has it.
    ///
    /// # Errors
    ///
    /// Returns any lock error other than contention.
    pub fn acquire(file: File, backoff: &Backoff) -> io::Result<Self> {
        let contended = fs2::lock_contended_error().raw_os_error();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Self { file, locked: true });
                }
                Err(e) if e.raw_os_error() == contended || e.kind() == io::ErrorKind::WouldBlock => {
                    debug!("log file locked by another writer; backing off");
                    backoff.sleep();
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Returns the underlying file.
    #[must_use]
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Writes all of `data` and flushes it.
    ///
    /// # Errors
    ///
    /// Returns the first write or flush error.
    pub fn write_all_and_flush(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data)?;
        self.file.flush()
    }

    /// Releases the lock and closes the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the unlock call fails.
    pub fn unlock(mut self) -> io::Result<()> {
        self.locked = false;
        FileExt::unlock(&self.file)
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        if self.locked {
            let _ = FileExt::unlock(&self.file);
        }
    }
}
