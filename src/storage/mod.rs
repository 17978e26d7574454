//! Durable Blob Storage
//!
//! The baseline engine persists three kinds of artifacts per series: a raw
//! binary sample log, a finalized baseline record, and a rolling-window
//! record. All of them are opaque byte blobs keyed by name, so the storage
//! boundary is a small trait over a durable key-value store:
//!
//! - `SledStore`: sled-backed store for on-device deployments
//! - `MemStore`: in-memory store for testing and minimal deployments
//!
//! The store is mounted once at process startup and the open handle is
//! passed to the engine; no per-call open/close happens anywhere.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Trait for pluggable blob storage backends
///
/// Implementations must be thread-safe (Send + Sync) so a future
/// per-key-locked embedding can share one handle across threads.
pub trait BlobStore: Send + Sync {
    /// Whether a blob exists under this key
    fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Read the full blob, or None if the key is absent
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the blob under this key
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Append bytes to the blob, creating it if absent
    fn append(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Stored byte length of the blob (0 if absent)
    ///
    /// This is the authoritative size — element counts are always derived
    /// from it, never inferred from blob contents.
    fn blob_len(&self, key: &str) -> Result<usize, StorageError>;

    /// Delete the blob. Removing an absent key is a no-op.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Sled-backed blob store
///
/// One sled database holds every series artifact, keyed by the
/// `{sensor}-{patient}` naming convention. Durability relies on sled's
/// background flushing; on crash, at most the last few writes may be lost,
/// which the engine tolerates by re-accumulating history.
#[derive(Clone)]
pub struct SledStore {
    db: Arc<sled::Db>,
}

impl SledStore {
    /// Mount (open or create) the store at the given path.
    ///
    /// Called once at startup; the returned handle is shared for the life
    /// of the process.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;
        tracing::info!(path = %path_ref.display(), "Blob store mounted");
        Ok(Self { db: Arc::new(db) })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl BlobStore for SledStore {
    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.db.contains_key(key.as_bytes())?)
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.db.get(key.as_bytes())?.map(|ivec| ivec.to_vec()))
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.db.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    fn append(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut blob = self
            .db
            .get(key.as_bytes())?
            .map(|ivec| ivec.to_vec())
            .unwrap_or_default();
        blob.extend_from_slice(bytes);
        self.db.insert(key.as_bytes(), blob)?;
        Ok(())
    }

    fn blob_len(&self, key: &str) -> Result<usize, StorageError> {
        Ok(self.db.get(key.as_bytes())?.map_or(0, |ivec| ivec.len()))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.db.remove(key.as_bytes())?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }
}

/// In-memory blob store for testing and minimal deployments
///
/// Thread-safe via `RwLock`. Not durable — data lost on restart.
#[derive(Default)]
pub struct MemStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemStore {
    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(blobs.contains_key(key))
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(blobs.get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn append(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        blobs
            .entry(key.to_string())
            .or_default()
            .extend_from_slice(bytes);
        Ok(())
    }

    fn blob_len(&self, key: &str) -> Result<usize, StorageError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(blobs.get(key).map_or(0, Vec::len))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        blobs.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_store_append_and_len() {
        let store = MemStore::new();
        store.append("a.bin", &[1, 2]).unwrap();
        store.append("a.bin", &[3, 4]).unwrap();

        assert_eq!(store.blob_len("a.bin").unwrap(), 4);
        assert_eq!(store.read("a.bin").unwrap().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_mem_store_remove_is_idempotent() {
        let store = MemStore::new();
        store.write("x", &[9]).unwrap();
        store.remove("x").unwrap();
        store.remove("x").unwrap();

        assert!(!store.exists("x").unwrap());
        assert_eq!(store.blob_len("x").unwrap(), 0);
    }

    #[test]
    fn test_sled_store_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(temp_dir.path()).unwrap();

        assert!(!store.exists("hr-1.bin").unwrap());
        store.append("hr-1.bin", &42.0_f32.to_le_bytes()).unwrap();
        store.append("hr-1.bin", &43.0_f32.to_le_bytes()).unwrap();

        assert_eq!(store.blob_len("hr-1.bin").unwrap(), 8);
        assert!(store.exists("hr-1.bin").unwrap());

        store.remove("hr-1.bin").unwrap();
        assert_eq!(store.blob_len("hr-1.bin").unwrap(), 0);
        assert!(store.read("hr-1.bin").unwrap().is_none());
    }

    #[test]
    fn test_trait_object() {
        let store: Box<dyn BlobStore> = Box::new(MemStore::new());
        assert_eq!(store.backend_name(), "memory");
        store.write("k", b"v").unwrap();
        assert_eq!(store.read("k").unwrap().unwrap(), b"v");
    }
}
