use crate::session::{SessionError, SessionResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory-backed key/value store
///
/// Each key lives in `<dir>/<key>.json`. Values are written whole to a
/// temporary sibling and renamed into place, so a reader sees either the old
/// value or the new one. Nothing expires.
#[derive(Debug)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    /// Opens the store, creating its directory if needed
    pub fn open(dir: &Path) -> SessionResult<Self> {
        fs::create_dir_all(dir)?;
        tracing::debug!("Opened key/value store at {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads and deserializes a value; `Ok(None)` if the key was never written
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> SessionResult<Option<T>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Serializes a value, replacing whatever the key held before
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> SessionResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Deletes a key; returns whether it existed
    pub fn remove(&self, key: &str) -> SessionResult<bool> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Releases the handle
    pub fn close(self) {
        tracing::debug!("Closed key/value store at {}", self.dir.display());
    }

    fn path_for(&self, key: &str) -> SessionResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(SessionError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}
