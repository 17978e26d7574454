//! Shared WARMUP → CALCULATED flow for the frozen-baseline strategies.
//!
//! IQR and extreme-percentile detection differ only in how bounds are
//! derived from the accumulated samples and in the record's wire fields;
//! everything else — the bounded log, the one-shot finalization, the
//! default-range fallback — is this flow.

use tracing::{info, warn};

use super::record::{BaselineRecord, RecordFormat};
use super::value_log::BoundedValueLog;
use super::{CheckResult, DetectionPhase, DetectorError, SeriesKey};
use crate::config::DetectorConfig;
use crate::storage::BlobStore;

/// Run one frozen-baseline check cycle.
///
/// State machine per series:
/// - finalized record present → judge against frozen bounds, touch nothing
/// - otherwise append, and if the log just reached capacity, derive bounds
///   (including the triggering sample), persist the finalized record, and
///   clear the raw log — this transition fires exactly once
/// - still warming up → judge against the configured default range
///
/// Finalization is idempotent: a crash between persisting the record and
/// clearing the log leaves a finalized record, which short-circuits every
/// later call before any log access. A failed record persist keeps the log
/// so the next call re-derives the same bounds.
pub(crate) fn check_with_frozen_baseline(
    store: &dyn BlobStore,
    config: &DetectorConfig,
    key: &SeriesKey,
    value: f64,
    format: RecordFormat,
    derive_bounds: impl Fn(&[f64]) -> (f64, f64),
) -> Result<CheckResult, DetectorError> {
    let record = BaselineRecord::load(store, key, format)?;
    if record.finalized {
        return Ok(CheckResult::judge(
            value,
            record.lower,
            record.upper,
            DetectionPhase::Calculated,
        ));
    }

    let log = BoundedValueLog::new(config.log_capacity);
    if let Err(e) = log.append(store, key, value) {
        // Tolerated: the verdict below still reflects this call, but the
        // sample may have to be re-accumulated later.
        warn!(
            series = %key,
            error = %DetectorError::WriteFailure(e.to_string()),
            "Failed to append sample to bounded log"
        );
    }

    let recorded = log
        .recorded_len(store, key)
        .map_err(|e| DetectorError::StorageUnavailable(e.to_string()))?;

    if recorded >= config.log_capacity {
        let samples = log
            .read_all(store, key)
            .map_err(|e| DetectorError::StorageUnavailable(e.to_string()))?;
        let (lower, upper) = derive_bounds(&samples);
        let finalized = BaselineRecord {
            lower,
            upper,
            finalized: true,
        };

        match finalized.persist(store, key, format) {
            Ok(()) => {
                info!(
                    series = %key,
                    samples = samples.len(),
                    lower,
                    upper,
                    "Baseline finalized — raw sample log released"
                );
                if let Err(e) = log.clear(store, key) {
                    warn!(
                        series = %key,
                        error = %e,
                        "Failed to clear sample log after finalization"
                    );
                }
            }
            Err(e) => {
                // Keep the raw log; the next call reruns this derivation.
                warn!(
                    series = %key,
                    error = %e,
                    "Failed to persist finalized baseline — will retry next call"
                );
            }
        }

        return Ok(CheckResult::judge(
            value,
            lower,
            upper,
            DetectionPhase::Calculated,
        ));
    }

    Ok(CheckResult::judge(
        value,
        config.default_lower_threshold,
        config.default_upper_threshold,
        DetectionPhase::Warmup,
    ))
}
