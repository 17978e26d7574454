//! Vital-Sign Stream Simulation
//!
//! Generates realistic per-patient heart-rate streams and replays them
//! through a sled-backed anomaly detector, so the baseline lifecycle can be
//! exercised end to end without hardware: warm-up against the default
//! range, one-shot finalization (frozen strategies), and adaptive tracking
//! (rolling strategy).
//!
//! # Usage
//! ```bash
//! ./simulation --strategy rolling-zscore --patients 3 --samples 2000 --seed 7
//! ```

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};

use vitalguard::{
    AnomalyDetector, DetectionPhase, DetectorConfig, SensorReading, SeriesKey, SledStore,
    StrategyKind,
};

/// Resting heart rate of the simulated population (bpm)
const BASE_HEART_RATE: f64 = 74.0;
/// Normal beat-to-beat spread (bpm)
const HEART_RATE_JITTER: f64 = 4.0;
/// Injected anomaly magnitude (bpm, added or subtracted)
const SPIKE_MAGNITUDE: f64 = 60.0;

#[derive(Parser, Debug)]
#[command(name = "vitals-simulation")]
#[command(about = "Vital-sign stream generator for VitalGuard testing")]
#[command(version = "1.0")]
struct Args {
    /// Baseline strategy: iqr, extreme-percentile, or rolling-zscore
    #[arg(short = 'S', long, default_value = "rolling-zscore")]
    strategy: StrategyKind,

    /// Number of simulated patients
    #[arg(short, long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=100))]
    patients: u32,

    /// Samples to generate per patient
    #[arg(short = 'n', long, default_value = "2000")]
    samples: u32,

    /// Fraction of samples that carry an injected spike
    #[arg(long, default_value = "0.01")]
    anomaly_rate: f64,

    /// Warm-up log capacity override (the on-device default of 86400 makes
    /// short demo runs never finalize)
    #[arg(long, default_value = "500")]
    warmup_capacity: usize,

    /// Directory for the sled store
    #[arg(long, env = "VITALGUARD_DATA_DIR", default_value = "data/vitalguard-sim")]
    data_dir: String,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Print every verdict, not just flagged readings
    #[arg(short, long)]
    verbose: bool,
}

struct PatientStream {
    key: SeriesKey,
    resting_rate: f64,
    rng: StdRng,
    beat_noise: Normal<f64>,
}

impl PatientStream {
    fn new(patient_id: u32, seed: Option<u64>) -> anyhow::Result<Self> {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s.wrapping_add(u64::from(patient_id))),
            None => StdRng::from_entropy(),
        };
        // Each patient gets their own resting rate a few bpm off the base
        let resting_rate = BASE_HEART_RATE + rng.gen_range(-6.0..6.0);
        let beat_noise =
            Normal::new(0.0, HEART_RATE_JITTER).context("invalid noise distribution")?;
        Ok(Self {
            key: SeriesKey::new(patient_id.to_string(), "heart_rate"),
            resting_rate,
            rng,
            beat_noise,
        })
    }

    /// Next reading, with `true` when a spike was injected.
    fn next_reading(&mut self, anomaly_rate: f64) -> (f64, bool) {
        let baseline = self.resting_rate + self.beat_noise.sample(&mut self.rng);
        if self.rng.gen_bool(anomaly_rate.clamp(0.0, 1.0)) {
            let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            (baseline + sign * SPIKE_MAGNITUDE, true)
        } else {
            (baseline, false)
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = DetectorConfig::load();
    config.log_capacity = args.warmup_capacity;
    config.validate().context("invalid detector config")?;

    let store = Arc::new(SledStore::open(&args.data_dir).context("failed to mount blob store")?);
    let detector = AnomalyDetector::new(store.clone(), config, args.strategy);

    let mut streams: Vec<PatientStream> = (1..=args.patients)
        .map(|id| PatientStream::new(id, args.seed))
        .collect::<anyhow::Result<_>>()?;

    println!(
        "VitalGuard simulation: {} patients × {} samples, strategy {}",
        args.patients, args.samples, args.strategy
    );

    let mut injected = 0u64;
    let mut flagged = 0u64;
    let mut flagged_injected = 0u64;
    let mut warmup_calls = 0u64;

    for tick in 0..args.samples {
        for stream in &mut streams {
            let (value, was_injected) = stream.next_reading(args.anomaly_rate);

            // Exercise the same wire format the monitors send
            let line = format!(
                "{}#{}:{value:.2}",
                stream.key.patient_id(),
                stream.key.sensor_type()
            );
            let reading: SensorReading = line
                .parse()
                .with_context(|| format!("failed to parse generated line '{line}'"))?;

            let result = detector.check(&stream.key, reading.value);

            injected += u64::from(was_injected);
            flagged += u64::from(result.anomalous);
            flagged_injected += u64::from(result.anomalous && was_injected);
            warmup_calls += u64::from(result.phase == DetectionPhase::Warmup);

            if result.anomalous || args.verbose {
                println!(
                    "[{tick:>6}] {} value={:>7.2} bounds=[{:.2}, {:.2}] {:?}{}{}",
                    stream.key,
                    result.value,
                    result.lower,
                    result.upper,
                    result.phase,
                    if result.anomalous { " ANOMALY" } else { "" },
                    if was_injected { " (injected)" } else { "" },
                );
            }
        }
    }

    store.flush().context("failed to flush blob store")?;

    let total = u64::from(args.samples) * u64::from(args.patients);
    println!();
    println!("SUMMARY");
    println!("  readings:          {total}");
    println!("  warm-up verdicts:  {warmup_calls}");
    println!("  injected spikes:   {injected}");
    println!("  flagged anomalous: {flagged}");
    if injected > 0 {
        println!(
            "  spike recall:      {:.1}%",
            100.0 * flagged_injected as f64 / injected as f64
        );
    }

    Ok(())
}
