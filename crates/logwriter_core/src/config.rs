//! Writer configuration.

use crate::backoff::Backoff;
use crate::error::{LogError, LogResult};
use chrono::format::{Item, StrftimeItems};
use logwriter_codec::LegacyCharset;
use logwriter_store::is_valid_key;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for opening a [`crate::LogWriter`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the active file, the rotation marker and archives.
    pub dir: PathBuf,

    /// Extension shared by `current-<ext>`, `time-<ext>` and archives.
    pub extension: String,

    /// strftime pattern used to name archived files (evaluated in UTC).
    pub archive_pattern: String,

    /// Age after which the active file is rotated on the next append.
    pub file_lifetime: Duration,

    /// Resource name of the cross-process mutex guarding this log stream.
    pub mutex_name: String,

    /// How long a mutex ticket survives if its holder never releases it.
    pub mutex_ttl: Duration,

    /// Delay range between cross-process mutex attempts.
    pub mutex_backoff: Backoff,

    /// Delay range between OS file lock attempts.
    pub lock_backoff: Backoff,

    /// Whether to `fsync` file data after every append.
    pub sync_on_append: bool,

    /// Charset of input passed to [`crate::LogWriter::append_legacy`].
    pub source_charset: LegacyCharset,
}

impl Config {
    /// Creates a configuration with default values writing into `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: "log".into(),
            archive_pattern: "%Y%m%dT%H%M%S".into(),
            file_lifetime: Duration::from_secs(300),
            mutex_name: "log-writer".into(),
            mutex_ttl: Duration::from_secs(300),
            mutex_backoff: Backoff::from_millis(10, 200),
            lock_backoff: Backoff::from_millis(10, 100),
            sync_on_append: false,
            source_charset: LegacyCharset::WINDOWS_1251,
        }
    }

    /// Sets the file extension.
    #[must_use]
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = ext.into();
        self
    }

    /// Sets the archive name pattern.
    #[must_use]
    pub fn archive_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.archive_pattern = pattern.into();
        self
    }

    /// Sets the active file lifetime.
    #[must_use]
    pub const fn file_lifetime(mut self, lifetime: Duration) -> Self {
        self.file_lifetime = lifetime;
        self
    }

    /// Sets the mutex resource name.
    #[must_use]
    pub fn mutex_name(mut self, name: impl Into<String>) -> Self {
        self.mutex_name = name.into();
        self
    }

    /// Sets the mutex ticket TTL.
    #[must_use]
    pub const fn mutex_ttl(mut self, ttl: Duration) -> Self {
        self.mutex_ttl = ttl;
        self
    }

    /// Sets the mutex retry delay range.
    #[must_use]
    pub const fn mutex_backoff(mut self, backoff: Backoff) -> Self {
        self.mutex_backoff = backoff;
        self
    }

    /// Sets the file lock retry delay range.
    #[must_use]
    pub const fn lock_backoff(mut self, backoff: Backoff) -> Self {
        self.lock_backoff = backoff;
        self
    }

    /// Sets whether to sync after every append.
    #[must_use]
    pub const fn sync_on_append(mut self, value: bool) -> Self {
        self.sync_on_append = value;
        self
    }

    /// Sets the legacy input charset.
    #[must_use]
    pub const fn source_charset(mut self, charset: LegacyCharset) -> Self {
        self.source_charset = charset;
        self
    }

    /// Checks that the configuration can be used.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> LogResult<()> {
        if self.extension.is_empty() || self.extension.contains(is_separator) {
            return Err(LogError::invalid_config(format!(
                "extension must be a non-empty file name component, got {:?}",
                self.extension
            )));
        }
        if self.archive_pattern.is_empty() || self.archive_pattern.contains(is_separator) {
            return Err(LogError::invalid_config(format!(
                "archive pattern must be non-empty and contain no path separator, got {:?}",
                self.archive_pattern
            )));
        }
        if StrftimeItems::new(&self.archive_pattern).any(|item| matches!(item, Item::Error)) {
            return Err(LogError::invalid_config(format!(
                "archive pattern is not a valid strftime pattern: {:?}",
                self.archive_pattern
            )));
        }
        if self.mutex_name.is_empty() {
            return Err(LogError::invalid_config("mutex name must not be empty"));
        }
        if !is_valid_key(&self.mutex_name) {
            return Err(LogError::invalid_config(format!(
                "mutex name may only use ASCII letters, digits, '-', '_' and '.', got {:?}",
                self.mutex_name
            )));
        }
        if self.mutex_ttl.is_zero() {
            return Err(LogError::invalid_config("mutex TTL must be positive"));
        }
        for (name, backoff) in [("mutex", self.mutex_backoff), ("lock", self.lock_backoff)] {
            if backoff.min > backoff.max {
                return Err(LogError::invalid_config(format!(
                    "{name} backoff minimum exceeds maximum"
                )));
            }
        }
        Ok(())
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}
