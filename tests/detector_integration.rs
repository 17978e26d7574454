//! End-to-End Detector Scenarios
//!
//! Exercises the full engine — strategy, bounded log / window, record
//! persistence, and failure policy — against in-memory and sled-backed
//! stores, including reboot survival of a finalized baseline.

use std::sync::Arc;

use vitalguard::{
    AnomalyDetector, BlobStore, DetectionPhase, DetectorConfig, MemStore, SeriesKey, SledStore,
    StorageError, StrategyKind,
};

fn test_config(log_capacity: usize) -> DetectorConfig {
    DetectorConfig {
        log_capacity,
        ..Default::default()
    }
}

fn key() -> SeriesKey {
    SeriesKey::new("12", "heart_rate")
}

#[test]
fn iqr_warmup_finalization_and_frozen_bounds() {
    let store = Arc::new(MemStore::new());
    let detector = AnomalyDetector::new(store.clone(), test_config(4), StrategyKind::Iqr);

    // Warm-up: judged against the default [60, 100] range
    for v in [10.0, 12.0, 11.0] {
        let result = detector.check(&key(), v);
        assert_eq!(result.phase, DetectionPhase::Warmup);
        assert!(result.anomalous, "{v} is outside the default range");
        assert_eq!(result.lower, 60.0);
        assert_eq!(result.upper, 100.0);
    }
    assert_eq!(store.blob_len(&key().log_key()).unwrap(), 3 * 4);

    // Fourth sample fills the log and triggers the one-shot finalization.
    // Sorted history [10, 11, 12, 100]: Q1 = 10.75, Q3 = 34.0, IQR = 23.25,
    // bounds [-24.125, 68.875]. The triggering sample is part of its own
    // baseline and is judged against the frozen bounds, not the defaults.
    let result = detector.check(&key(), 100.0);
    assert_eq!(result.phase, DetectionPhase::Calculated);
    assert!((result.lower - -24.125).abs() < 1e-9);
    assert!((result.upper - 68.875).abs() < 1e-9);
    assert!(result.anomalous);

    // Raw log released the moment the baseline froze
    assert_eq!(store.blob_len(&key().log_key()).unwrap(), 0);

    // Frozen bounds drive later verdicts; the log stays empty
    let result = detector.check(&key(), 50.0);
    assert_eq!(result.phase, DetectionPhase::Calculated);
    assert!(!result.anomalous);
    let result = detector.check(&key(), -30.0);
    assert!(result.anomalous);
    assert_eq!(store.blob_len(&key().log_key()).unwrap(), 0);
}

#[test]
fn finalized_record_is_never_mutated_again() {
    let store = Arc::new(MemStore::new());
    let detector = AnomalyDetector::new(store.clone(), test_config(3), StrategyKind::Iqr);

    for v in [70.0, 72.0, 74.0] {
        detector.check(&key(), v);
    }
    let frozen = store.read(&key().record_key()).unwrap().unwrap();

    for v in [70.0, 300.0, -40.0, 71.0] {
        detector.check(&key(), v);
    }
    assert_eq!(store.read(&key().record_key()).unwrap().unwrap(), frozen);
    assert_eq!(store.blob_len(&key().log_key()).unwrap(), 0);
}

#[test]
fn extreme_percentile_bounds_are_the_percentiles_directly() {
    let store = Arc::new(MemStore::new());
    let detector = AnomalyDetector::new(
        store.clone(),
        test_config(4),
        StrategyKind::ExtremePercentile,
    );

    for v in [60.0, 70.0, 80.0] {
        assert_eq!(detector.check(&key(), v).phase, DetectionPhase::Warmup);
    }
    // Sorted [60, 70, 80, 90]: p1 = 60.3, p99 = 89.7
    let result = detector.check(&key(), 90.0);
    assert_eq!(result.phase, DetectionPhase::Calculated);
    assert!((result.lower - 60.3).abs() < 1e-9);
    assert!((result.upper - 89.7).abs() < 1e-9);
    assert!(result.anomalous, "90 exceeds its own p99 bound");

    assert!(!detector.is_anomalous("12", "heart_rate", 75.0));
    assert!(detector.is_anomalous("12", "heart_rate", 55.0));
}

#[test]
fn zero_valued_samples_fill_the_log() {
    // A flatlined sensor reporting 0.0 must still accumulate history —
    // lengths come from the store, never from scanning for non-zero slots
    let store = Arc::new(MemStore::new());
    let detector = AnomalyDetector::new(store.clone(), test_config(3), StrategyKind::Iqr);

    detector.check(&key(), 0.0);
    detector.check(&key(), 0.0);
    assert_eq!(detector.check(&key(), 0.0).phase, DetectionPhase::Calculated);
    assert_eq!(store.blob_len(&key().log_key()).unwrap(), 0);
}

#[test]
fn series_are_isolated_per_patient_and_sensor() {
    let store = Arc::new(MemStore::new());
    let detector = AnomalyDetector::new(store, test_config(2), StrategyKind::Iqr);

    let alice_hr = SeriesKey::new("alice", "heart_rate");
    let alice_spo2 = SeriesKey::new("alice", "spo2");
    let bob_hr = SeriesKey::new("bob", "heart_rate");

    detector.check(&alice_hr, 70.0);
    assert_eq!(
        detector.check(&alice_hr, 72.0).phase,
        DetectionPhase::Calculated
    );

    // Other series are untouched by alice's heart-rate baseline
    assert_eq!(detector.check(&alice_spo2, 97.0).phase, DetectionPhase::Warmup);
    assert_eq!(detector.check(&bob_hr, 80.0).phase, DetectionPhase::Warmup);
}

#[test]
fn rolling_zscore_window_scenario() {
    let store = Arc::new(MemStore::new());
    let config = DetectorConfig {
        window_capacity: 3,
        ..Default::default()
    };
    let detector = AnomalyDetector::new(store, config, StrategyKind::RollingZScore);

    for v in [10.0, 10.0, 10.0] {
        assert!(!detector.check(&key(), v).anomalous);
    }

    // Fourth push evicts the oldest: window [10, 10, 50], mean 23.33,
    // population σ 18.86 — 50 lands inside mean + 2σ ≈ 61.05
    let result = detector.check(&key(), 50.0);
    let mean: f64 = 70.0 / 3.0;
    let std_dev =
        ((2.0 * (10.0 - mean).powi(2) + (50.0 - mean).powi(2)) / 3.0_f64).sqrt();
    assert!((result.upper - (mean + 2.0 * std_dev)).abs() < 1e-9);
    assert!(!result.anomalous);
    assert_eq!(result.phase, DetectionPhase::Calculated);
}

#[test]
fn frozen_baseline_survives_reboot() {
    let temp_dir = tempfile::tempdir().unwrap();

    {
        let store = Arc::new(SledStore::open(temp_dir.path()).unwrap());
        let detector = AnomalyDetector::new(store.clone(), test_config(3), StrategyKind::Iqr);
        for v in [70.0, 72.0, 74.0] {
            detector.check(&key(), v);
        }
        store.flush().unwrap();
    }

    // "Power cycle": remount and keep judging against the frozen bounds
    // without re-accumulating any history
    let store = Arc::new(SledStore::open(temp_dir.path()).unwrap());
    let detector = AnomalyDetector::new(store.clone(), test_config(3), StrategyKind::Iqr);

    let result = detector.check(&key(), 73.0);
    assert_eq!(result.phase, DetectionPhase::Calculated);
    assert!(!result.anomalous);
    assert_eq!(store.blob_len(&key().log_key()).unwrap(), 0);

    let result = detector.check(&key(), 200.0);
    assert!(result.anomalous);
}

#[test]
fn rolling_window_survives_reboot() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = DetectorConfig {
        window_capacity: 10,
        ..Default::default()
    };

    {
        let store = Arc::new(SledStore::open(temp_dir.path()).unwrap());
        let detector =
            AnomalyDetector::new(store.clone(), config.clone(), StrategyKind::RollingZScore);
        for v in [70.0, 71.0, 69.0, 70.0, 72.0] {
            detector.check(&key(), v);
        }
        store.flush().unwrap();
    }

    let store = Arc::new(SledStore::open(temp_dir.path()).unwrap());
    let detector = AnomalyDetector::new(store, config, StrategyKind::RollingZScore);

    // The remounted window still carries the stable history, so a spike
    // stands out immediately
    assert!(detector.check(&key(), 160.0).anomalous);
}

#[test]
fn malformed_baseline_record_falls_back_to_warmup() {
    let store = Arc::new(MemStore::new());
    store.write(&key().record_key(), b"{ definitely not json").unwrap();

    let detector = AnomalyDetector::new(store, test_config(100), StrategyKind::Iqr);
    let result = detector.check(&key(), 75.0);

    assert_eq!(result.phase, DetectionPhase::Warmup);
    assert!(!result.anomalous);
    assert!(!result.storage_degraded);
}

/// Store whose every operation fails, for the fail-open path.
struct BrokenStore;

impl BlobStore for BrokenStore {
    fn exists(&self, _key: &str) -> Result<bool, StorageError> {
        Err(StorageError::Database("flash offline".into()))
    }
    fn read(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Err(StorageError::Database("flash offline".into()))
    }
    fn write(&self, _key: &str, _bytes: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::Database("flash offline".into()))
    }
    fn append(&self, _key: &str, _bytes: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::Database("flash offline".into()))
    }
    fn blob_len(&self, _key: &str) -> Result<usize, StorageError> {
        Err(StorageError::Database("flash offline".into()))
    }
    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Database("flash offline".into()))
    }
    fn backend_name(&self) -> &'static str {
        "broken"
    }
}

#[test]
fn unavailable_storage_fails_open() {
    for kind in [
        StrategyKind::Iqr,
        StrategyKind::ExtremePercentile,
        StrategyKind::RollingZScore,
    ] {
        let detector = AnomalyDetector::new(Arc::new(BrokenStore), test_config(4), kind);

        // Even a wildly out-of-range value is waved through when the store
        // is unreachable — the documented fail-open trade-off
        let result = detector.check(&key(), 100_000.0);
        assert!(!result.anomalous, "{kind}: fail-open must not flag");
        assert!(result.storage_degraded);
        assert_eq!(result.phase, DetectionPhase::Warmup);
    }
}
