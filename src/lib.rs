//! VitalGuard: Streaming Vital-Sign Anomaly Detection
//!
//! Per-(patient, sensor) anomaly classification for storage-constrained
//! devices. Each incoming reading is judged against a statistical baseline
//! that is either computed once from accumulated history and frozen across
//! power cycles, or continuously recomputed from a sliding window.
//!
//! ## Architecture
//!
//! - **Detector**: the baseline engine — three strategies (IQR,
//!   extreme-percentile, rolling z-score) over a shared warm-up state
//!   machine
//! - **Storage**: a durable blob store mounted once at startup (sled on
//!   device, in-memory for tests)
//! - **Stats**: pure percentile / mean / standard-deviation primitives
//! - **Config**: operator-tunable capacities and thresholds (TOML)

pub mod config;
pub mod detector;
pub mod reading;
pub mod stats;
pub mod storage;

// Re-export the engine surface
pub use config::{ConfigError, DetectorConfig};
pub use detector::{
    AnomalyDetector, BaselineRecord, BaselineStrategy, BoundedValueLog, CheckResult,
    DetectionPhase, DetectorError, ExtremePercentileStrategy, IqrStrategy, RollingWindow,
    RollingZScoreStrategy, SeriesKey, StrategyKind,
};
pub use reading::{ReadingParseError, SensorReading};
pub use storage::{BlobStore, MemStore, SledStore, StorageError};
