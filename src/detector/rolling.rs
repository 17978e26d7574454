//! Rolling Z-Score Strategy
//!
//! Permanently adaptive: every value joins a FIFO-bounded window whose mean
//! and population standard deviation define the thresholds `mean ± kσ`
//! (k = `rolling_sigma`, historically 2). There is no finalized state and
//! no frozen bounds — the baseline drifts with the patient.
//!
//! A window below `min_rolling_samples` has a degenerate (near-zero) σ that
//! would flag any deviation from the first sample, so short histories
//! report "not anomalous" under warm-up semantics instead.

use super::window::RollingWindow;
use super::{BaselineStrategy, CheckResult, DetectionPhase, DetectorError, SeriesKey, StrategyKind};
use crate::config::DetectorConfig;
use crate::storage::BlobStore;
use tracing::warn;

pub struct RollingZScoreStrategy;

impl BaselineStrategy for RollingZScoreStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RollingZScore
    }

    fn check(
        &self,
        store: &dyn BlobStore,
        config: &DetectorConfig,
        key: &SeriesKey,
        value: f64,
    ) -> Result<CheckResult, DetectorError> {
        let mut window = RollingWindow::load(store, key, config.window_capacity)?;
        window.push(value);

        // Full-window re-persist per push; a failed write costs durability,
        // not this call's verdict.
        if let Err(e) = window.persist(store, key) {
            warn!(
                series = %key,
                error = %e,
                "Failed to persist rolling window — continuing with in-memory statistics"
            );
        }

        let lower = window.mean() - config.rolling_sigma * window.std_dev();
        let upper = window.mean() + config.rolling_sigma * window.std_dev();

        if window.len() < config.min_rolling_samples {
            return Ok(CheckResult {
                anomalous: false,
                phase: DetectionPhase::Warmup,
                lower,
                upper,
                value,
                storage_degraded: false,
            });
        }

        Ok(CheckResult::judge(
            value,
            lower,
            upper,
            DetectionPhase::Calculated,
        ))
    }
}
