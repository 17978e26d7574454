//! IQR Baseline Strategy
//!
//! Freezes outlier bounds with the classic 1.5×IQR rule once a full bounded
//! log of history exists: `[Q1 - 1.5·IQR, Q3 + 1.5·IQR]`.

use super::frozen::check_with_frozen_baseline;
use super::record::RecordFormat;
use super::{BaselineStrategy, CheckResult, DetectorError, SeriesKey, StrategyKind};
use crate::config::DetectorConfig;
use crate::stats;
use crate::storage::BlobStore;

pub struct IqrStrategy;

/// Bounds from the 1.5×IQR rule over the accumulated samples.
pub(crate) fn derive_iqr_bounds(samples: &[f64]) -> (f64, f64) {
    let q1 = stats::percentile(samples, 0.25);
    let q3 = stats::percentile(samples, 0.75);
    let iqr = q3 - q1;
    (q1 - 1.5 * iqr, q3 + 1.5 * iqr)
}

impl BaselineStrategy for IqrStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Iqr
    }

    fn check(
        &self,
        store: &dyn BlobStore,
        config: &DetectorConfig,
        key: &SeriesKey,
        value: f64,
    ) -> Result<CheckResult, DetectorError> {
        check_with_frozen_baseline(
            store,
            config,
            key,
            value,
            RecordFormat::IqrBounds,
            derive_iqr_bounds,
        )
    }
}
