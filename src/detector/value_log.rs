//! Bounded Persistent Sample Log
//!
//! Append-only history for the frozen-baseline strategies. Samples encode
//! as 4-byte IEEE-754 single-precision floats concatenated with no header;
//! the recorded sample count is always `byte length / 4`, reported by the
//! store itself. Length is never inferred from sample values — a zero is a
//! legitimate reading, not an empty slot.
//!
//! The log lives from the first append until a baseline is finalized from
//! it, at which point it is deleted and the samples belong to the computed
//! bounds.

use super::SeriesKey;
use crate::storage::{BlobStore, StorageError};

const SAMPLE_BYTES: usize = 4;

/// Capacity-bounded view over a series' persisted sample log.
#[derive(Debug, Clone, Copy)]
pub struct BoundedValueLog {
    capacity: usize,
}

impl BoundedValueLog {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Durably append one sample to the series' log.
    ///
    /// Values are narrowed to `f32` on disk; statistics are computed in
    /// `f64` after read-back.
    pub fn append(
        &self,
        store: &dyn BlobStore,
        key: &SeriesKey,
        value: f64,
    ) -> Result<(), StorageError> {
        store.append(&key.log_key(), &(value as f32).to_le_bytes())
    }

    /// The true number of recorded samples, from the stored byte length.
    pub fn recorded_len(
        &self,
        store: &dyn BlobStore,
        key: &SeriesKey,
    ) -> Result<usize, StorageError> {
        Ok(store.blob_len(&key.log_key())? / SAMPLE_BYTES)
    }

    /// Whether enough samples exist to compute a baseline.
    pub fn is_full(&self, store: &dyn BlobStore, key: &SeriesKey) -> Result<bool, StorageError> {
        Ok(self.recorded_len(store, key)? >= self.capacity)
    }

    /// Read back at most the most recent `capacity` samples, oldest first.
    ///
    /// Only as many samples as actually exist are returned; a trailing
    /// partial sample (torn write) is ignored.
    pub fn read_all(
        &self,
        store: &dyn BlobStore,
        key: &SeriesKey,
    ) -> Result<Vec<f64>, StorageError> {
        let blob = store.read(&key.log_key())?.unwrap_or_default();
        let whole = blob.len() - blob.len() % SAMPLE_BYTES;
        let start = whole.saturating_sub(self.capacity * SAMPLE_BYTES);

        let samples = blob[start..whole]
            .chunks_exact(SAMPLE_BYTES)
            .map(|chunk| {
                // chunks_exact guarantees 4 bytes
                let mut bytes = [0u8; SAMPLE_BYTES];
                bytes.copy_from_slice(chunk);
                f64::from(f32::from_le_bytes(bytes))
            })
            .collect();
        Ok(samples)
    }

    /// Drop the log's storage entirely. Called once a baseline has been
    /// finalized from it; clearing an already-absent log is a no-op.
    pub fn clear(&self, store: &dyn BlobStore, key: &SeriesKey) -> Result<(), StorageError> {
        store.remove(&key.log_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStore;

    fn key() -> SeriesKey {
        SeriesKey::new("9", "heart_rate")
    }

    #[test]
    fn test_append_and_read_preserve_order() {
        let store = MemStore::new();
        let log = BoundedValueLog::new(10);

        for v in [61.0, 75.5, 80.25] {
            log.append(&store, &key(), v).unwrap();
        }

        assert_eq!(log.recorded_len(&store, &key()).unwrap(), 3);
        assert_eq!(log.read_all(&store, &key()).unwrap(), vec![61.0, 75.5, 80.25]);
    }

    #[test]
    fn test_zero_valued_samples_count_toward_fullness() {
        let store = MemStore::new();
        let log = BoundedValueLog::new(3);

        log.append(&store, &key(), 0.0).unwrap();
        log.append(&store, &key(), 0.0).unwrap();
        assert!(!log.is_full(&store, &key()).unwrap());

        log.append(&store, &key(), 0.0).unwrap();
        assert!(log.is_full(&store, &key()).unwrap());
        assert_eq!(log.read_all(&store, &key()).unwrap(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_read_all_caps_at_most_recent_capacity() {
        let store = MemStore::new();
        let log = BoundedValueLog::new(3);

        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            log.append(&store, &key(), v).unwrap();
        }

        // Five recorded, but only the newest three are read back
        assert_eq!(log.recorded_len(&store, &key()).unwrap(), 5);
        assert_eq!(log.read_all(&store, &key()).unwrap(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_clear_empties_the_log() {
        let store = MemStore::new();
        let log = BoundedValueLog::new(4);

        log.append(&store, &key(), 70.0).unwrap();
        log.clear(&store, &key()).unwrap();

        assert_eq!(log.recorded_len(&store, &key()).unwrap(), 0);
        assert!(log.read_all(&store, &key()).unwrap().is_empty());

        // Re-clearing an empty log is a no-op
        log.clear(&store, &key()).unwrap();
    }

    #[test]
    fn test_torn_trailing_write_is_ignored() {
        let store = MemStore::new();
        let log = BoundedValueLog::new(4);

        log.append(&store, &key(), 70.0).unwrap();
        store.append(&key().log_key(), &[0xAA, 0xBB]).unwrap();

        assert_eq!(log.recorded_len(&store, &key()).unwrap(), 1);
        assert_eq!(log.read_all(&store, &key()).unwrap(), vec![70.0]);
    }
}
