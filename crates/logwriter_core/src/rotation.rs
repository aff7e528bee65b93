//! Time-based rotation of the active file.
//!
//! Before each append the active file must either be freshly created (with
//! its header) or still within its lifetime. Otherwise it is renamed to a
//! timestamped archive and a new active file is started.
//!
//! ## Decision rule
//!
//! - No active file: create the directory and stamp the marker with `now`.
//! - Active file present: rotate if the marker is missing, unreadable,
//!   not a number, or `now >= marker + lifetime`. The boundary instant
//!   rotates.
//! - Finally, if no active file exists, create it holding only the header.
//!
//! Rotation decisions are only safe while the cross-process mutex is held.

use crate::dir::LogDir;
use crate::error::{LogError, LogResult};
use chrono::{DateTime, Utc};
use logwriter_codec::encode_header;
use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What [`RotationManager::ensure_current_file`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationOutcome {
    /// Where the previous active file was archived, if it was rotated.
    pub archived: Option<PathBuf>,
    /// Whether a new active file was created.
    pub created: bool,
}

impl RotationOutcome {
    /// Returns true if the active file was archived.
    #[must_use]
    pub fn rotated(&self) -> bool {
        self.archived.is_some()
    }
}

/// Decides and performs rotation of the active file.
#[derive(Debug, Clone)]
pub struct RotationManager {
    dir: LogDir,
    pattern: String,
    lifetime: Duration,
}

impl RotationManager {
    /// Creates a manager for `dir`, naming archives with the strftime
    /// `pattern` and rotating files older than `lifetime`.
    #[must_use]
    pub fn new(dir: LogDir, pattern: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            dir,
            pattern: pattern.into(),
            lifetime,
        }
    }

    /// Returns the directory layout.
    #[must_use]
    pub fn dir(&self) -> &LogDir {
        &self.dir
    }

    /// Makes sure an active file exists and is within its lifetime at `now`
    /// (UNIX seconds).
    ///
    /// # Errors
    ///
    /// Directory creation, rename, marker write and file creation failures
    /// are returned as-is; nothing is retried and completed steps are not
    /// rolled back.
    pub fn ensure_current_file(&self, now: u64) -> LogResult<RotationOutcome> {
        let active = self.dir.active_path();
        let mut outcome = RotationOutcome::default();

        if active.try_exists()? {
            if self.is_expired(now) {
                outcome.archived = Some(self.rotate(now)?);
            }
        } else {
            fs::create_dir_all(self.dir.path())?;
            self.write_marker(now)?;
        }

        if !active.try_exists()? {
            outcome.created = self.create_active()?;
        }

        Ok(outcome)
    }

    /// Reads the rotation marker. `None` if missing or corrupt.
    #[must_use]
    pub fn read_marker(&self) -> Option<u64> {
        let path = self.dir.marker_path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "rotation marker unreadable");
                return None;
            }
        };
        match contents.trim().parse::<u64>() {
            Ok(secs) => Some(secs),
            Err(_) => {
                warn!(
                    path = %path.display(),
                    contents = %contents.trim(),
                    "rotation marker is corrupt; treating active file as expired"
                );
                None
            }
        }
    }

    fn is_expired(&self, now: u64) -> bool {
        match self.read_marker() {
            Some(stamped) => now >= stamped.saturating_add(self.lifetime.as_secs()),
            None => true,
        }
    }

    fn rotate(&self, now: u64) -> LogResult<PathBuf> {
        let stem = self.archive_stem(now)?;
        let target = self.dir.unused_archive_path(&stem);
        fs::rename(self.dir.active_path(), &target)?;
        self.write_marker(now)?;
        info!(archive = %target.display(), "rotated active log file");
        Ok(target)
    }

    fn archive_stem(&self, now: u64) -> LogResult<String> {
        let at = i64::try_from(now)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .ok_or_else(|| {
                LogError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("timestamp {now} out of range"),
                ))
            })?;

        let mut stem = String::new();
        write!(stem, "{}", at.format(&self.pattern)).map_err(|_| {
            LogError::invalid_config(format!("cannot format archive pattern {:?}", self.pattern))
        })?;
        Ok(stem)
    }

    fn write_marker(&self, now: u64) -> LogResult<()> {
        fs::write(self.dir.marker_path(), now.to_string())?;
        Ok(())
    }

    /// Publishes a header-only active file.
    ///
    /// The header is written to a staging file first and hard-linked into
    /// place, so the active file never exists without its header.
    fn create_active(&self) -> LogResult<bool> {
        self.publish_active(|file| {
            file.write_all(&encode_header())?;
            file.flush()
        })
    }

    /// Stages the active file through `fill`, then links it into place.
    ///
    /// The staging file is removed on every path, including a failed fill.
    fn publish_active(
        &self,
        fill: impl FnOnce(&mut File) -> io::Result<()>,
    ) -> LogResult<bool> {
        let path = self.dir.active_path();
        let staging = self.dir.staging_path();

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging)?;
        let filled = fill(&mut file);
        drop(file);

        let linked = filled.and_then(|()| fs::hard_link(&staging, &path));
        if let Err(e) = fs::remove_file(&staging) {
            warn!(path = %staging.display(), error = %e, "failed to remove staging file");
        }

        match linked {
            Ok(()) => {
                info!(path = %path.display(), "created active log file");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const T0: u64 = 1_700_000_000;

    fn manager(path: &std::path::Path, lifetime: u64) -> RotationManager {
        RotationManager::new(
            LogDir::new(path, "log"),
            "%Y%m%dT%H%M%S",
            Duration::from_secs(lifetime),
        )
    }

    #[test]
    fn first_call_creates_dir_marker_and_header() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("a").join("b");
        let rm = manager(&root, 300);

        let outcome = rm.ensure_current_file(T0).unwrap();
        assert!(outcome.created);
        assert!(!outcome.rotated());

        assert_eq!(fs::read(rm.dir().active_path()).unwrap(), vec![0, 0, 0, 1]);
        assert_eq!(rm.read_marker(), Some(T0));
    }

    #[test]
    fn fresh_file_is_left_alone() {
        let temp = tempdir().unwrap();
        let rm = manager(temp.path(), 300);
        rm.ensure_current_file(T0).unwrap();

        let outcome = rm.ensure_current_file(T0 + 299).unwrap();
        assert_eq!(outcome, RotationOutcome::default());
        assert_eq!(rm.read_marker(), Some(T0));
        assert!(rm.dir().list_archives().unwrap().is_empty());
    }

    #[test]
    fn boundary_instant_rotates() {
        let temp = tempdir().unwrap();
        let rm = manager(temp.path(), 300);
        rm.ensure_current_file(T0).unwrap();

        let outcome = rm.ensure_current_file(T0 + 300).unwrap();
        assert!(outcome.rotated());
        assert!(outcome.created);
        assert_eq!(rm.read_marker(), Some(T0 + 300));

        // 2023-11-14T22:18:20Z
        let archived = outcome.archived.unwrap();
        assert_eq!(archived, temp.path().join("20231114T221820.log"));
        assert_eq!(fs::read(&archived).unwrap(), vec![0, 0, 0, 1]);
    }

    #[test]
    fn missing_marker_forces_rotation() {
        let temp = tempdir().unwrap();
        let rm = manager(temp.path(), 300);
        rm.ensure_current_file(T0).unwrap();
        fs::remove_file(rm.dir().marker_path()).unwrap();

        let outcome = rm.ensure_current_file(T0 + 1).unwrap();
        assert!(outcome.rotated());
        assert_eq!(rm.read_marker(), Some(T0 + 1));
    }

    #[test]
    fn corrupt_marker_forces_rotation() {
        let temp = tempdir().unwrap();
        let rm = manager(temp.path(), 300);
        rm.ensure_current_file(T0).unwrap();
        fs::write(rm.dir().marker_path(), "garbage").unwrap();

        assert_eq!(rm.read_marker(), None);
        assert!(rm.ensure_current_file(T0 + 1).unwrap().rotated());
    }

    #[test]
    fn marker_whitespace_is_tolerated() {
        let temp = tempdir().unwrap();
        let rm = manager(temp.path(), 300);
        rm.ensure_current_file(T0).unwrap();
        fs::write(rm.dir().marker_path(), format!("{T0}\n")).unwrap();

        assert_eq!(rm.read_marker(), Some(T0));
        assert!(!rm.ensure_current_file(T0 + 10).unwrap().rotated());
    }

    #[test]
    fn same_second_rotations_do_not_overwrite() {
        let temp = tempdir().unwrap();
        let rm = manager(temp.path(), 0);
        rm.ensure_current_file(T0).unwrap();

        let first = rm.ensure_current_file(T0).unwrap().archived.unwrap();
        let second = rm.ensure_current_file(T0).unwrap().archived.unwrap();
        assert_ne!(first, second);
        assert_eq!(rm.dir().list_archives().unwrap().len(), 2);
    }

    #[test]
    fn existing_active_file_is_not_truncated() {
        let temp = tempdir().unwrap();
        let rm = manager(temp.path(), 300);
        rm.ensure_current_file(T0).unwrap();

        let mut contents = fs::read(rm.dir().active_path()).unwrap();
        contents.extend_from_slice(b"data");
        fs::write(rm.dir().active_path(), &contents).unwrap();

        rm.ensure_current_file(T0 + 1).unwrap();
        assert_eq!(fs::read(rm.dir().active_path()).unwrap(), contents);
    }

    #[test]
    fn occupied_archive_name_is_skipped() {
        let temp = tempdir().unwrap();
        let rm = RotationManager::new(
            LogDir::new(temp.path(), "log"),
            "%Y%m%dT%H%M%S",
            Duration::ZERO,
        );
        rm.ensure_current_file(T0).unwrap();
        // A directory squatting on the archive name.
        let squat = temp.path().join("20231114T221320.log");
        fs::create_dir(&squat).unwrap();
        fs::write(squat.join("f"), b"").unwrap();

        // unused_archive_path skips it, so rotation still succeeds
        let outcome = rm.ensure_current_file(T0).unwrap();
        assert_eq!(
            outcome.archived.unwrap(),
            temp.path().join("20231114T221320-1.log")
        );
    }

    #[test]
    fn directory_creation_failure_propagates() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let rm = manager(&blocker.join("logs"), 300);
        assert!(matches!(
            rm.ensure_current_file(T0),
            Err(LogError::Io(_))
        ));
    }

    #[test]
    fn failed_header_write_leaves_no_staging_file() {
        let temp = tempdir().unwrap();
        let rm = manager(temp.path(), 300);

        let result = rm.publish_active(|_| Err(io::Error::new(io::ErrorKind::Other, "disk full")));
        assert!(matches!(result, Err(LogError::Io(e)) if e.kind() == io::ErrorKind::Other));

        assert!(!rm.dir().active_path().exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
