//! Anomaly Detection Engine — Baseline Strategies & Verdicts
//!
//! One anomaly check is one synchronous function call: the caller supplies a
//! (patient, sensor) series key and a sensor value, the engine answers "is
//! this value anomalous given everything seen so far for that series".
//!
//! Three interchangeable baseline strategies share that shape:
//!
//! - `IqrStrategy`: frozen bounds from the 1.5×IQR rule
//! - `ExtremePercentileStrategy`: frozen bounds from the 1st/99th percentiles
//! - `RollingZScoreStrategy`: adaptive mean ± kσ over a FIFO window
//!
//! The frozen strategies run a two-phase state machine per series: WARMUP
//! (accumulating into a bounded persistent log, judging against a
//! conservative default range) transitions exactly once to CALCULATED when
//! the log reaches capacity, after which the computed bounds are frozen and
//! the raw log is discarded. The rolling strategy never finalizes — it is
//! permanently adaptive.
//!
//! ## Failure policy
//!
//! No panic crosses this boundary. Storage failures degrade to a verdict:
//! - unavailable store → fail open ("not anomalous") with a diagnostic
//! - malformed persisted record → treated as absent (warm-up defaults)
//! - write failure → logged, current call still uses the in-memory result

mod extreme_percentile;
mod frozen;
mod iqr;
mod record;
mod rolling;
mod value_log;
mod window;

pub use extreme_percentile::ExtremePercentileStrategy;
pub use iqr::IqrStrategy;
pub use record::BaselineRecord;
pub use rolling::RollingZScoreStrategy;
pub use value_log::BoundedValueLog;
pub use window::RollingWindow;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::DetectorConfig;
use crate::storage::BlobStore;

/// Detection failures, all locally recoverable — none abort the caller.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    /// Mount/open/read failure. The engine fails open on this class.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A persisted record exists but does not parse. Recovered silently by
    /// falling back to warm-up behavior.
    #[error("malformed persisted record: {0}")]
    MalformedRecord(String),

    /// Persisting a sample or baseline failed. Logged and tolerated; the
    /// current call's verdict still uses the in-memory computation, at the
    /// cost of re-accumulating history later.
    #[error("write failure: {0}")]
    WriteFailure(String),
}

/// Identifies one logical time series: one sensor on one patient.
///
/// Stable for the lifetime of the pairing; only ever used as a lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    patient_id: String,
    sensor_type: String,
}

impl SeriesKey {
    pub fn new(patient_id: impl Into<String>, sensor_type: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            sensor_type: sensor_type.into(),
        }
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn sensor_type(&self) -> &str {
        &self.sensor_type
    }

    /// Storage key of the raw binary sample log.
    ///
    /// The `{sensor}-{patient}` naming matches the data already on deployed
    /// devices and must not change.
    pub fn log_key(&self) -> String {
        format!("{}-{}.bin", self.sensor_type, self.patient_id)
    }

    /// Storage key of the derived record (frozen baseline or rolling window).
    pub fn record_key(&self) -> String {
        format!("{}-{}.json", self.sensor_type, self.patient_id)
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.sensor_type, self.patient_id)
    }
}

/// Which baseline strategy a detector runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Iqr,
    ExtremePercentile,
    RollingZScore,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Iqr => write!(f, "iqr"),
            StrategyKind::ExtremePercentile => write!(f, "extreme-percentile"),
            StrategyKind::RollingZScore => write!(f, "rolling-zscore"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iqr" => Ok(StrategyKind::Iqr),
            "extreme-percentile" | "percentile" => Ok(StrategyKind::ExtremePercentile),
            "rolling-zscore" | "rolling" => Ok(StrategyKind::RollingZScore),
            other => Err(format!(
                "unknown strategy '{other}' (expected iqr, extreme-percentile, or rolling-zscore)"
            )),
        }
    }
}

/// Which decision regime produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionPhase {
    /// Not enough history — judged against the configured default range
    Warmup,
    /// Judged against a computed baseline (frozen bounds or rolling stats)
    Calculated,
}

/// Result of checking one value against a series baseline.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// The verdict: outside the active bounds
    pub anomalous: bool,
    /// Whether computed bounds or warm-up defaults were used
    pub phase: DetectionPhase,
    /// Lower bound the value was judged against
    pub lower: f64,
    /// Upper bound the value was judged against
    pub upper: f64,
    /// The value that was checked
    pub value: f64,
    /// True when storage failed and the verdict is the fail-open default
    pub storage_degraded: bool,
}

impl CheckResult {
    /// Judge a value against a bounds pair.
    pub(crate) fn judge(value: f64, lower: f64, upper: f64, phase: DetectionPhase) -> Self {
        Self {
            anomalous: value < lower || value > upper,
            phase,
            lower,
            upper,
            value,
            storage_degraded: false,
        }
    }
}

/// One baseline strategy: ingest a value, decide whether enough history
/// exists to trust a computed baseline, evaluate, and persist state.
///
/// Implementations share the statistics and record-codec helpers rather
/// than duplicating them per variant.
pub trait BaselineStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Run one full ingest-and-evaluate cycle for a series.
    fn check(
        &self,
        store: &dyn BlobStore,
        config: &DetectorConfig,
        key: &SeriesKey,
        value: f64,
    ) -> Result<CheckResult, DetectorError>;
}

/// The anomaly detection engine: an already-mounted store handle, a
/// configuration, and one strategy.
///
/// Construct once at startup and reuse for every call — the engine never
/// mounts or unmounts storage itself.
pub struct AnomalyDetector {
    store: Arc<dyn BlobStore>,
    config: DetectorConfig,
    strategy: Box<dyn BaselineStrategy>,
}

impl AnomalyDetector {
    pub fn new(store: Arc<dyn BlobStore>, config: DetectorConfig, kind: StrategyKind) -> Self {
        let strategy: Box<dyn BaselineStrategy> = match kind {
            StrategyKind::Iqr => Box::new(IqrStrategy),
            StrategyKind::ExtremePercentile => Box::new(ExtremePercentileStrategy),
            StrategyKind::RollingZScore => Box::new(RollingZScoreStrategy),
        };
        Self {
            store,
            config,
            strategy,
        }
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Check one sensor value. Never fails: storage trouble degrades to a
    /// fail-open "not anomalous" verdict with a logged diagnostic.
    ///
    /// Fail-open is a deliberate policy choice for this monitoring context:
    /// an unreachable store must not turn every reading into an alert.
    pub fn check(&self, key: &SeriesKey, value: f64) -> CheckResult {
        match self
            .strategy
            .check(self.store.as_ref(), &self.config, key, value)
        {
            Ok(result) => {
                debug!(
                    series = %key,
                    strategy = %self.strategy.kind(),
                    value,
                    anomalous = result.anomalous,
                    phase = ?result.phase,
                    "Anomaly check complete"
                );
                result
            }
            Err(e) => {
                warn!(
                    series = %key,
                    strategy = %self.strategy.kind(),
                    backend = self.store.backend_name(),
                    error = %e,
                    "Storage failure during anomaly check — failing open"
                );
                CheckResult {
                    anomalous: false,
                    phase: DetectionPhase::Warmup,
                    lower: self.config.default_lower_threshold,
                    upper: self.config.default_upper_threshold,
                    value,
                    storage_degraded: true,
                }
            }
        }
    }

    /// Convenience wrapper: a bare boolean verdict for a
    /// (patient, sensor, value) triple.
    pub fn is_anomalous(&self, patient_id: &str, sensor_type: &str, value: f64) -> bool {
        self.check(&SeriesKey::new(patient_id, sensor_type), value)
            .anomalous
    }
}
