//! Key/blob storage backends.

use std::collections::HashMap;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::StoreError;

/// Opaque string storage addressed by key.
///
/// Implementations only need whole-value load and save; the record store
/// provides all locking.
pub trait BlobStorage: Send + Sync {
    /// Load the blob for `key`, or `None` if nothing was ever saved.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the blob for `key`.
    fn save(&self, key: &str, contents: &str) -> Result<(), StoreError>;
}

/// One file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileBlobStorage {
    dir: PathBuf,
}

impl FileBlobStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the blob files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

fn io_error(key: &str, source: io::Error) -> StoreError {
    StoreError::Io {
        key: key.to_string(),
        source,
    }
}

impl BlobStorage for FileBlobStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, e)),
        }
    }

    fn save(&self, key: &str, contents: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(key, e))?;

        // Write to temp file first, then rename for atomicity
        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, contents).map_err(|e| io_error(key, e))?;
        fs::rename(&temp_path, &path).map_err(|e| io_error(key, e))?;
        Ok(())
    }
}

/// In-process storage, used for tests and throwaway sessions.
///
/// Can be switched to read-only to simulate a storage medium that rejects
/// writes.
#[derive(Debug, Default)]
pub struct MemoryBlobStorage {
    blobs: Mutex<HashMap<String, String>>,
    read_only: AtomicBool,
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage pre-seeded with a blob.
    pub fn with_blob(key: impl Into<String>, contents: impl Into<String>) -> Self {
        let storage = Self::new();
        storage.blobs.lock().insert(key.into(), contents.into());
        storage
    }

    /// Make subsequent saves fail with `PermissionDenied`.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Raw blob contents, for inspection.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.blobs.lock().get(key).cloned()
    }
}

impl BlobStorage for MemoryBlobStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.blobs.lock().get(key).cloned())
    }

    fn save(&self, key: &str, contents: &str) -> Result<(), StoreError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(io_error(
                key,
                io::Error::new(ErrorKind::PermissionDenied, "storage is read-only"),
            ));
        }
        self.blobs
            .lock()
            .insert(key.to_string(), contents.to_string());
        Ok(())
    }
}
