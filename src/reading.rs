//! Sensor Reading Wire Format
//!
//! Patient monitors deliver one reading per line as
//! `{patientId}#{sensorType}:{value}`. Transport is out of scope here —
//! this module only parses the line into a typed reading the detector can
//! consume.

use std::str::FromStr;

/// One decoded sensor reading.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub patient_id: String,
    pub sensor_type: String,
    pub value: f64,
}

/// Reading line parse failures
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReadingParseError {
    #[error("missing '#' separator between patient id and sensor type")]
    MissingPatientSeparator,
    #[error("missing ':' separator before the value")]
    MissingValueSeparator,
    #[error("empty patient id")]
    EmptyPatientId,
    #[error("empty sensor type")]
    EmptySensorType,
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl FromStr for SensorReading {
    type Err = ReadingParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (patient_id, rest) = line
            .split_once('#')
            .ok_or(ReadingParseError::MissingPatientSeparator)?;
        let (sensor_type, raw_value) = rest
            .split_once(':')
            .ok_or(ReadingParseError::MissingValueSeparator)?;

        if patient_id.is_empty() {
            return Err(ReadingParseError::EmptyPatientId);
        }
        if sensor_type.is_empty() {
            return Err(ReadingParseError::EmptySensorType);
        }

        let value: f64 = raw_value
            .trim()
            .parse()
            .map_err(|_| ReadingParseError::InvalidValue(raw_value.to_string()))?;
        if !value.is_finite() {
            return Err(ReadingParseError::InvalidValue(raw_value.to_string()));
        }

        Ok(Self {
            patient_id: patient_id.to_string(),
            sensor_type: sensor_type.to_string(),
            value,
        })
    }
}
