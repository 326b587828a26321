//! Durable key-value storage.
//!
//! The sync queue persists its pending list and last-sync time through the
//! [`DurableStore`] trait. Values are opaque strings; callers serialize.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{StudyError, StudyResult};

/// A string key-value store that survives process restarts.
pub trait DurableStore: Send + Sync {
    /// Read a value, `None` if the key was never written or was removed.
    fn get(&self, key: &str) -> StudyResult<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> StudyResult<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StudyResult<()>;
}

/// Process-local store, for tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StudyResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| StudyError::Store("memory store lock poisoned".into()))
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> StudyResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StudyResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StudyResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Directory-backed store: one file per key.
///
/// Writes go to a sibling temp file that is then renamed over the target,
/// so a reader never observes a half-written value.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StudyResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StudyError::Store(format!("invalid store key: {key:?}")));
        }
        Ok(self.dir.join(key))
    }

    fn ensure_dir(&self) -> StudyResult<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700))?;
            }
        }
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> StudyResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> StudyResult<()> {
        let path = self.path_for(key)?;
        self.ensure_dir()?;

        let tmp = self.dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, value)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StudyResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
