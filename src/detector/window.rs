//! Rolling Window with Derived Statistics
//!
//! FIFO-bounded sample window for the rolling z-score strategy. The window
//! plus its derived mean and population standard deviation are one persisted
//! record, fully rewritten after every push — the highest per-call I/O cost
//! of the three strategies, traded for a baseline that adapts forever.
//!
//! Mean and standard deviation are recomputed over the whole window on each
//! push (O(W), small W). They are stored alongside the values under the
//! `average` / `stdDev` field names the device fleet already uses.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{DetectorError, SeriesKey};
use crate::stats;
use crate::storage::BlobStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingWindow {
    values: VecDeque<f64>,
    average: f64,
    #[serde(rename = "stdDev")]
    std_dev: f64,
    #[serde(skip)]
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity.min(4096)),
            average: 0.0,
            std_dev: 0.0,
            capacity,
        }
    }

    /// Load the persisted window for a series, or an empty one if no record
    /// exists. A malformed record is treated as absent (logged) so a corrupt
    /// file costs history, never availability.
    pub fn load(
        store: &dyn BlobStore,
        key: &SeriesKey,
        capacity: usize,
    ) -> Result<Self, DetectorError> {
        let bytes = store
            .read(&key.record_key())
            .map_err(|e| DetectorError::StorageUnavailable(e.to_string()))?;

        let Some(bytes) = bytes else {
            return Ok(Self::new(capacity));
        };

        match serde_json::from_slice::<Self>(&bytes) {
            Ok(mut window) => {
                window.capacity = capacity;
                Ok(window)
            }
            Err(e) => {
                warn!(
                    series = %key,
                    error = %DetectorError::MalformedRecord(e.to_string()),
                    "Malformed rolling-window record — starting a fresh window"
                );
                Ok(Self::new(capacity))
            }
        }
    }

    /// Append a value, evicting oldest-first down to capacity, then
    /// recompute mean and population standard deviation over the current
    /// contents.
    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }

        let contents = self.values.make_contiguous();
        self.average = stats::mean(contents);
        self.std_dev = stats::population_std_dev(contents, self.average);
    }

    /// Persist the full window plus derived statistics.
    pub fn persist(&self, store: &dyn BlobStore, key: &SeriesKey) -> Result<(), DetectorError> {
        let bytes =
            serde_json::to_vec(self).map_err(|e| DetectorError::WriteFailure(e.to_string()))?;
        store
            .write(&key.record_key(), &bytes)
            .map_err(|e| DetectorError::WriteFailure(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f64 {
        self.average
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Current window contents plus derived statistics, oldest first.
    pub fn snapshot(&self) -> (Vec<f64>, f64, f64) {
        (
            self.values.iter().copied().collect(),
            self.average,
            self.std_dev,
        )
    }
}
