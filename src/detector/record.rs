//! Persisted Baseline Records
//!
//! A baseline record is the small derived artifact a frozen strategy keeps
//! per series: two bound values plus the "baseline finalized" flag. It is
//! created implicitly (unfinalized, zero bounds) on first access, mutated
//! exactly once at finalization, and never rewritten afterward.
//!
//! The JSON field names are a compatibility contract with records already
//! on deployed devices and differ per strategy, so encoding goes through a
//! per-format wire struct.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{DetectorError, SeriesKey};
use crate::storage::BlobStore;

/// On-disk field layout, selected by the strategy that owns the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordFormat {
    /// `lowerBound` / `upperBound` (IQR strategy)
    IqrBounds,
    /// `percentile1` / `percentile99` (extreme-percentile strategy)
    ExtremePercentiles,
}

#[derive(Serialize, Deserialize)]
struct IqrWire {
    #[serde(rename = "lowerBound")]
    lower_bound: f64,
    #[serde(rename = "upperBound")]
    upper_bound: f64,
    #[serde(rename = "initialCalculationDone")]
    initial_calculation_done: bool,
}

#[derive(Serialize, Deserialize)]
struct PercentileWire {
    percentile1: f64,
    percentile99: f64,
    #[serde(rename = "initialCalculationDone")]
    initial_calculation_done: bool,
}

/// In-memory form of a persisted baseline: frozen bounds + finalized flag.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineRecord {
    pub lower: f64,
    pub upper: f64,
    pub finalized: bool,
}

impl Default for BaselineRecord {
    /// The implicit record for a series with no persisted state.
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 0.0,
            finalized: false,
        }
    }
}

impl BaselineRecord {
    /// Load the record for a series, applying the recovery policy: a missing
    /// record is the default, and a malformed record is treated as missing
    /// (logged, then warm-up behavior resumes). Only a storage read failure
    /// propagates.
    pub(crate) fn load(
        store: &dyn BlobStore,
        key: &SeriesKey,
        format: RecordFormat,
    ) -> Result<Self, DetectorError> {
        let bytes = store
            .read(&key.record_key())
            .map_err(|e| DetectorError::StorageUnavailable(e.to_string()))?;

        match bytes {
            None => Ok(Self::default()),
            Some(bytes) => match Self::decode(&bytes, format) {
                Ok(record) => Ok(record),
                Err(e) => {
                    warn!(
                        series = %key,
                        error = %e,
                        "Malformed baseline record — falling back to warm-up defaults"
                    );
                    Ok(Self::default())
                }
            },
        }
    }

    /// Persist the record, overwriting any previous version.
    pub(crate) fn persist(
        &self,
        store: &dyn BlobStore,
        key: &SeriesKey,
        format: RecordFormat,
    ) -> Result<(), DetectorError> {
        let bytes = self.encode(format)?;
        store
            .write(&key.record_key(), &bytes)
            .map_err(|e| DetectorError::WriteFailure(e.to_string()))
    }

    pub(crate) fn decode(bytes: &[u8], format: RecordFormat) -> Result<Self, DetectorError> {
        match format {
            RecordFormat::IqrBounds => {
                let wire: IqrWire = serde_json::from_slice(bytes)
                    .map_err(|e| DetectorError::MalformedRecord(e.to_string()))?;
                Ok(Self {
                    lower: wire.lower_bound,
                    upper: wire.upper_bound,
                    finalized: wire.initial_calculation_done,
                })
            }
            RecordFormat::ExtremePercentiles => {
                let wire: PercentileWire = serde_json::from_slice(bytes)
                    .map_err(|e| DetectorError::MalformedRecord(e.to_string()))?;
                Ok(Self {
                    lower: wire.percentile1,
                    upper: wire.percentile99,
                    finalized: wire.initial_calculation_done,
                })
            }
        }
    }

    pub(crate) fn encode(&self, format: RecordFormat) -> Result<Vec<u8>, DetectorError> {
        let encoded = match format {
            RecordFormat::IqrBounds => serde_json::to_vec(&IqrWire {
                lower_bound: self.lower,
                upper_bound: self.upper,
                initial_calculation_done: self.finalized,
            }),
            RecordFormat::ExtremePercentiles => serde_json::to_vec(&PercentileWire {
                percentile1: self.lower,
                percentile99: self.upper,
                initial_calculation_done: self.finalized,
            }),
        };
        encoded.map_err(|e| DetectorError::WriteFailure(e.to_string()))
    }
}
