use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StorageError;

/// Client-local key/value storage that outlives a session.
///
/// Each key is one JSON document inside `dir`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| StorageError::from_io(&dir, err))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::from_io(path, err)),
        }
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        fs::write(&path, value).map_err(|err| StorageError::from_io(path, err))
    }

    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::from_io(path, err)),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct VersionedDocument<T> {
    version: u32,
    value: T,
}

/// One value in [`LocalStorage`] tagged with a schema version.
///
/// Documents written under another version, or that no longer parse, are
/// discarded and the default is returned instead of guessing at their shape.
#[derive(Debug, Clone)]
pub struct VersionedStore<T> {
    storage: LocalStorage,
    key: String,
    version: u32,
    _value: PhantomData<fn() -> T>,
}

impl<T> VersionedStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(storage: LocalStorage, key: impl Into<String>, version: u32) -> Self {
        Self {
            storage,
            key: key.into(),
            version,
            _value: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the stored value, or `None` when missing or incompatible.
    pub fn load(&self) -> Option<T> {
        let raw = match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %self.key, %err, "failed to read local storage");
                return None;
            }
        };

        match serde_json::from_str::<VersionedDocument<T>>(&raw) {
            Ok(doc) if doc.version == self.version => Some(doc.value),
            Ok(doc) => {
                debug!(key = %self.key, stored = doc.version, expected = self.version, "discarding stored value from another version");
                self.discard();
                None
            }
            Err(err) => {
                debug!(key = %self.key, %err, "discarding unreadable stored value");
                self.discard();
                None
            }
        }
    }

    pub fn save(&self, value: &T) -> Result<(), StorageError> {
        let doc = VersionedDocument {
            version: self.version,
            value,
        };
        let raw = serde_json::to_string(&doc).map_err(|err| StorageError::Encode {
            key: self.key.clone(),
            message: err.to_string(),
        })?;
        self.storage.set_item(&self.key, &raw)
    }

    pub fn remove(&self) -> Result<(), StorageError> {
        self.storage.remove_item(&self.key)
    }

    fn discard(&self) {
        if let Err(err) = self.remove() {
            warn!(key = %self.key, %err, "failed to discard stored value");
        }
    }
}
