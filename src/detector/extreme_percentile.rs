//! Extreme-Percentile Baseline Strategy
//!
//! Freezes the 1st and 99th interpolated percentiles of the accumulated
//! history as the bounds directly — anything outside the middle 98% of the
//! warm-up distribution is flagged.

use super::frozen::check_with_frozen_baseline;
use super::record::RecordFormat;
use super::{BaselineStrategy, CheckResult, DetectorError, SeriesKey, StrategyKind};
use crate::config::DetectorConfig;
use crate::stats;
use crate::storage::BlobStore;

pub struct ExtremePercentileStrategy;

pub(crate) fn derive_percentile_bounds(samples: &[f64]) -> (f64, f64) {
    (
        stats::percentile(samples, 0.01),
        stats::percentile(samples, 0.99),
    )
}

impl BaselineStrategy for ExtremePercentileStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ExtremePercentile
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
            RecordFormat::ExtremePercentiles,
            derive_percentile_bounds,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_bounds_over_uniform_ramp() {
        // 101 samples 0..=100: p1 = 1.0, p99 = 99.0 exactly
        let samples: Vec<f64> = (0..=100).map(f64::from).collect();
        let (lower, upper) = derive_percentile_bounds(&samples);
        assert!((lower - 1.0).abs() < 1e-12);
        assert!((upper - 99.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_bounds_interpolate() {
        let samples = [10.0, 20.0];
        let (lower, upper) = derive_percentile_bounds(&samples);
        assert!((lower - 10.1).abs() < 1e-12);
        assert!((upper - 19.9).abs() < 1e-12);
    }
}
