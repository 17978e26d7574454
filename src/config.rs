//! Detector Configuration
//!
//! Every capacity and threshold that was historically a hardcoded constant
//! is an operator-tunable TOML value here. `Default` matches the constants the
//! device fleet shipped with, so behavior is unchanged when no config file is
//! present. The config is passed to the engine at construction — there is
//! no global.
//!
//! ## Loading Order
//!
//! 1. `VITALGUARD_CONFIG` environment variable (path to TOML file)
//! 2. `vitalguard.toml` in the current working directory
//! 3. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration load/validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to parse {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

fn default_log_capacity() -> usize {
    // One sample per second for a full day
    86_400
}

fn default_window_capacity() -> usize {
    500
}

fn default_lower_threshold() -> f64 {
    60.0
}

fn default_upper_threshold() -> f64 {
    100.0
}

fn default_min_rolling_samples() -> usize {
    2
}

fn default_rolling_sigma() -> f64 {
    2.0
}

/// Tunable parameters for the baseline engine.
///
/// Capacities bound every persisted artifact; the default thresholds are the
/// conservative vital-sign range used while a frozen baseline is still
/// warming up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Bounded sample log capacity for the IQR / extreme-percentile
    /// strategies (samples retained before the baseline is computed once)
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Rolling window capacity for the z-score strategy (FIFO-bounded)
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Lower bound of the warm-up default range
    #[serde(default = "default_lower_threshold")]
    pub default_lower_threshold: f64,

    /// Upper bound of the warm-up default range
    #[serde(default = "default_upper_threshold")]
    pub default_upper_threshold: f64,

    /// Minimum rolling-window size before z-score verdicts are trusted.
    /// Below this the rolling strategy reports "not anomalous", avoiding
    /// the over-flagging a near-zero-variance short window produces.
    #[serde(default = "default_min_rolling_samples")]
    pub min_rolling_samples: usize,

    /// Sigma multiplier for the rolling z-score thresholds (mean ± kσ)
    #[serde(default = "default_rolling_sigma")]
    pub rolling_sigma: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
            window_capacity: default_window_capacity(),
            default_lower_threshold: default_lower_threshold(),
            default_upper_threshold: default_upper_threshold(),
            min_rolling_samples: default_min_rolling_samples(),
            rolling_sigma: default_rolling_sigma(),
        }
    }
}

impl DetectorConfig {
    /// Load configuration using the standard search order:
    /// 1. `VITALGUARD_CONFIG` environment variable
    /// 2. `./vitalguard.toml` in the current working directory
    /// 3. Built-in defaults (the shipped device constants)
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("VITALGUARD_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded detector config from VITALGUARD_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from VITALGUARD_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "VITALGUARD_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("vitalguard.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded detector config from ./vitalguard.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./vitalguard.toml, using defaults");
                }
            }
        }

        info!("No vitalguard.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path and validate.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_capacity == 0 {
            return Err(ConfigError::Invalid("log_capacity must be > 0".into()));
        }
        if self.window_capacity == 0 {
            return Err(ConfigError::Invalid("window_capacity must be > 0".into()));
        }
        if self.default_lower_threshold >= self.default_upper_threshold {
            return Err(ConfigError::Invalid(format!(
                "default threshold range is inverted: [{}, {}]",
                self.default_lower_threshold, self.default_upper_threshold
            )));
        }
        if !self.rolling_sigma.is_finite() || self.rolling_sigma <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "rolling_sigma must be a positive finite number, got {}",
                self.rolling_sigma
            )));
        }
        Ok(())
    }
}
