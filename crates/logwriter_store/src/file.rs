//! Directory-backed store for coordination between processes.

use crate::backend::SharedStore;
use crate::error::{StoreError, StoreResult};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Suffix of committed entry files.
const ENTRY_SUFFIX: &str = "entry";

/// An expiring store kept in a directory on a shared filesystem.
///
/// Each key is one file holding `<expiry unix millis>\n<value>`. Values
/// are written to a uniquely named temporary file and renamed over the
/// entry, so a concurrent reader sees either the old or the new value,
/// never a torn one. Entries past their expiry, or that cannot be parsed,
/// read as absent; they are replaced by the next write.
///
/// Keys are limited to ASCII letters, digits, `-`, `_` and `.`, and must
/// not start with a dot.
///
/// # Example
///
/// ```no_run
/// use logwriter_store::{FileStore, SharedStore};
/// use std::path::Path;
/// use std::time::Duration;
///
/// let store = FileStore::open(Path::new("/var/run/logwriter")).unwrap();
/// store.set_with_expiry("semaphore-log", "ticket", Duration::from_secs(300)).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{ENTRY_SUFFIX}")))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        let nonce = uuid::Uuid::new_v4().simple();
        self.dir.join(format!(".{key}.{nonce}.tmp"))
    }
}

impl SharedStore for FileStore {
    fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let path = self.entry_path(key)?;
        let ttl_millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let expires_at = now_millis().saturating_add(ttl_millis);

        let temp = self.temp_path(key);
        let written = File::create(&temp).and_then(|mut file| {
            write!(file, "{expires_at}\n{value}")?;
            file.flush()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&temp, &path)) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.entry_path(key)?;
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                debug!(key, "store entry is not UTF-8; treating as absent");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let Some((expiry, value)) = contents.split_once('\n') else {
            debug!(key, "store entry has no expiry line; treating as absent");
            return Ok(None);
        };
        let Ok(expires_at) = expiry.trim().parse::<u64>() else {
            debug!(key, expiry, "store entry expiry unparsable; treating as absent");
            return Ok(None);
        };

        if now_millis() >= expires_at {
            return Ok(None);
        }
        Ok(Some(value.to_owned()))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let path = self.entry_path(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Returns whether `key` can name a [`FileStore`] entry.
///
/// Keys are non-empty, do not start with `.`, and use only ASCII
/// alphanumerics, `-`, `_` and `.`.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

fn validate_key(key: &str) -> StoreResult<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_owned()))
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::tempdir;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn open_creates_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store");

        let store = FileStore::open(&path).unwrap();
        assert!(path.is_dir());
        assert_eq!(store.path(), path);
    }

    #[test]
    fn set_get_delete() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert!(!store.exists("sem").unwrap());
        store.set_with_expiry("sem", "ticket-1", MINUTE).unwrap();
        assert!(store.exists("sem").unwrap());
        assert_eq!(store.get("sem").unwrap().as_deref(), Some("ticket-1"));

        store.set_with_expiry("sem", "ticket-2", MINUTE).unwrap();
        assert_eq!(store.get("sem").unwrap().as_deref(), Some("ticket-2"));

        store.delete("sem").unwrap();
        assert_eq!(store.get("sem").unwrap(), None);
        assert!(store.delete("sem").is_ok());
    }

    #[test]
    fn values_may_contain_newlines() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set_with_expiry("k", "a\nb", MINUTE).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("a\nb"));
    }

    #[test]
    fn entries_expire() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store
            .set_with_expiry("k", "v", Duration::from_millis(20))
            .unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(!store.exists("k").unwrap());
    }

    #[test]
    fn separate_handles_see_each_other() {
        let dir = tempdir().unwrap();
        let a = FileStore::open(dir.path()).unwrap();
        let b = FileStore::open(dir.path()).unwrap();
        a.set_with_expiry("k", "from-a", MINUTE).unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("from-a"));
    }

    #[test]
    fn malformed_entry_reads_as_absent() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("k.entry"), "not-a-number\nv").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        fs::write(dir.path().join("k.entry"), "no newline").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set_with_expiry("k", "v", MINUTE).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["k.entry".to_string()]);
    }

    #[test]
    fn rejects_unsafe_keys() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        for key in ["", "../escape", "a/b", ".hidden", "space key"] {
            assert!(
                matches!(store.get(key), Err(StoreError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn no_atomic_insert() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.try_insert("k", "v", MINUTE).unwrap(), None);
    }

    #[test]
    fn huge_ttl_saturates_instead_of_expiring() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store
            .set_with_expiry("k", "v", Duration::from_secs(1 << 61))
            .unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.set_with_expiry("k", "w", Duration::MAX).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("w"));
    }
}
