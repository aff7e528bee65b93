//! Log directory layout.
//!
//! ```text
//! <dir>/
//! ├─ current-<ext>            # Active file, receives appends
//! ├─ time-<ext>               # Rotation marker: decimal UNIX seconds
//! ├─ .current-<ext>.<id>.tmp  # Header staged before it becomes active
//! └─ <formatted time>.<ext>   # Archived files, never written again
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Prefix of the active file name.
const ACTIVE_PREFIX: &str = "current-";
/// Prefix of the rotation marker name.
const MARKER_PREFIX: &str = "time-";

/// Names the files of one log stream within its directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDir {
    path: PathBuf,
    extension: String,
}

impl LogDir {
    /// Creates a layout for `path` using `extension`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            extension: extension.into(),
        }
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file extension.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Returns the path of the active file.
    #[must_use]
    pub fn active_path(&self) -> PathBuf {
        self.path.join(format!("{ACTIVE_PREFIX}{}", self.extension))
    }

    /// Returns the path of the rotation marker.
    #[must_use]
    pub fn marker_path(&self) -> PathBuf {
        self.path.join(format!("{MARKER_PREFIX}{}", self.extension))
    }

    /// Returns a fresh hidden path for staging a new active file.
    ///
    /// Staging names end in `.tmp` so they are never listed as archives.
    #[must_use]
    pub fn staging_path(&self) -> PathBuf {
        self.path.join(format!(
            ".{ACTIVE_PREFIX}{}.{}.tmp",
            self.extension,
            Uuid::new_v4().simple()
        ))
    }

    /// Returns the archive path for a formatted timestamp.
    #[must_use]
    pub fn archive_path(&self, stem: &str) -> PathBuf {
        self.path.join(format!("{stem}.{}", self.extension))
    }

    /// Returns the first archive path for `stem` that does not exist yet.
    ///
    /// Falls back to `<stem>-1.<ext>`, `<stem>-2.<ext>`, ... so that two
    /// rotations within one formatted instant never overwrite an archive.
    #[must_use]
    pub fn unused_archive_path(&self, stem: &str) -> PathBuf {
        let first = self.archive_path(stem);
        if !first.exists() {
            return first;
        }
        (1u32..)
            .map(|n| self.archive_path(&format!("{stem}-{n}")))
            .find(|p| !p.exists())
            .unwrap_or(first)
    }

    /// Lists archived file names oldest first.
    ///
    /// Names sort by stem, and a `-N` collision suffix added by
    /// [`unused_archive_path`](Self::unused_archive_path) sorts numerically
    /// right after its base archive. Returns an empty list if the directory does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn list_archives(&self) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let suffix = format!(".{}", self.extension);
        let active = format!("{ACTIVE_PREFIX}{}", self.extension);
        let marker = format!("{MARKER_PREFIX}{}", self.extension);

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.ends_with(&suffix) && name != active && name != marker {
                names.push(name);
            }
        }
        let stems: HashSet<&str> = names
            .iter()
            .filter_map(|name| name.strip_suffix(suffix.as_str()))
            .collect();
        let mut keyed: Vec<((String, u32), &String)> = names
            .iter()
            .map(|name| (archive_order(name, &suffix, &stems), name))
            .collect();
        keyed.sort();
        Ok(keyed.into_iter().map(|(_, name)| name.clone()).collect())
    }
}

/// Sort key for an archive name: its base stem and collision number.
///
/// A trailing `-N` counts as a collision number only when the base archive
/// is also present, so stems that end in digits keep their own order.
fn archive_order(name: &str, suffix: &str, stems: &HashSet<&str>) -> (String, u32) {
    let stem = name.strip_suffix(suffix).unwrap_or(name);
    if let Some((base, n)) = stem.rsplit_once('-') {
        if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) && stems.contains(base) {
            if let Ok(n) = n.parse() {
                return (base.to_owned(), n);
            }
        }
    }
    (stem.to_owned(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn paths_are_correct() {
        let dir = LogDir::new("/var/log/app", "bin");
        assert_eq!(dir.active_path(), PathBuf::from("/var/log/app/current-bin"));
        assert_eq!(dir.marker_path(), PathBuf::from("/var/log/app/time-bin"));
        assert_eq!(
            dir.archive_path("20240101T000000"),
            PathBuf::from("/var/log/app/20240101T000000.bin")
        );
    }

    #[test]
    fn unused_archive_path_skips_existing() {
        let temp = tempdir().unwrap();
        let dir = LogDir::new(temp.path(), "log");

        let first = dir.unused_archive_path("stamp");
        assert_eq!(first, temp.path().join("stamp.log"));
        fs::write(&first, b"x").unwrap();

        let second = dir.unused_archive_path("stamp");
        assert_eq!(second, temp.path().join("stamp-1.log"));
        fs::write(&second, b"x").unwrap();

        assert_eq!(
            dir.unused_archive_path("stamp"),
            temp.path().join("stamp-2.log")
        );
    }

    #[test]
    fn list_archives_excludes_active_and_marker() {
        let temp = tempdir().unwrap();
        let dir = LogDir::new(temp.path(), "log");

        fs::write(dir.active_path(), b"").unwrap();
        fs::write(dir.marker_path(), b"0").unwrap();
        fs::write(dir.archive_path("b"), b"").unwrap();
        fs::write(dir.archive_path("a"), b"").unwrap();
        fs::write(temp.path().join("other.txt"), b"").unwrap();

        assert_eq!(dir.list_archives().unwrap(), vec!["a.log", "b.log"]);
    }

    #[test]
    fn list_archives_of_missing_dir_is_empty() {
        let temp = tempdir().unwrap();
        let dir = LogDir::new(temp.path().join("missing"), "log");
        assert!(dir.list_archives().unwrap().is_empty());
    }

    #[test]
    fn staging_files_are_not_archives() {
        let temp = tempdir().unwrap();
        let dir = LogDir::new(temp.path(), "log");
        let a = dir.staging_path();
        let b = dir.staging_path();
        assert_ne!(a, b);

        fs::write(&a, b"x").unwrap();
        assert!(dir.list_archives().unwrap().is_empty());
    }

    #[test]
    fn collision_suffixes_sort_numerically() {
        let temp = tempdir().unwrap();
        let dir = LogDir::new(temp.path(), "log");

        for _ in 0..11 {
            let path = dir.unused_archive_path("stamp");
            fs::write(path, b"").unwrap();
        }
        fs::write(dir.archive_path("stamq"), b"").unwrap();

        let mut expected = vec!["stamp.log".to_owned()];
        expected.extend((1..=10).map(|n| format!("stamp-{n}.log")));
        expected.push("stamq.log".to_owned());
        assert_eq!(dir.list_archives().unwrap(), expected);
    }

    #[test]
    fn dated_stems_keep_their_order() {
        let temp = tempdir().unwrap();
        let dir = LogDir::new(temp.path(), "log");

        fs::write(dir.archive_path("2024-01-02"), b"").unwrap();
        fs::write(dir.archive_path("2024-01-01"), b"").unwrap();
        fs::write(dir.unused_archive_path("2024-01-01"), b"").unwrap();

        assert_eq!(
            dir.list_archives().unwrap(),
            vec!["2024-01-01.log", "2024-01-01-1.log", "2024-01-02.log"]
        );
    }
}
