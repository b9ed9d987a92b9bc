//! Measurement records and the JSON measurement log.
//!
//! Each accepted measurement becomes one [`MeasurementRecord`]; a
//! session's log is a JSON array of them. Remeasuring an image replaces
//! its previous record in place, so the log always holds the latest
//! accepted value per image and stays stable in order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ExportError;

/// Dataset tier an image was sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Directory name of this tier inside a dataset root.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Difficulty {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(ExportError::UnknownDifficulty(other.to_string())),
        }
    }
}

/// One accepted measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Identifier of the measured image, conventionally the file stem.
    pub image_id: String,
    /// Dataset tier the image came from.
    pub difficulty: Difficulty,
    /// Calibrated length in micrometres.
    pub length_um: f64,
    /// Local wall-clock time of the measurement, `YYYY-MM-DD HH:MM:SS`,
    /// preformatted by the caller. This crate has no clock of its own.
    pub timestamp: String,
}

/// Insert `record` into `records`, replacing any entry with the same
/// `image_id`.
///
/// Replacement happens in place, so remeasuring keeps the log order;
/// genuinely new images append at the end.
pub fn upsert(records: &mut Vec<MeasurementRecord>, record: MeasurementRecord) {
    if let Some(existing) = records
        .iter_mut()
        .find(|existing| existing.image_id == record.image_id)
    {
        *existing = record;
    } else {
        records.push(record);
    }
}

/// Serialize records as a pretty-printed JSON array, the on-disk log
/// format.
///
/// # Errors
///
/// Returns [`ExportError::Json`] when serialization fails.
pub fn to_json(records: &[MeasurementRecord]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Parse a JSON array of records, e.g. a previously written log.
///
/// # Errors
///
/// Returns [`ExportError::Json`] when the input is not a valid record
/// array.
pub fn from_json(json: &str) -> Result<Vec<MeasurementRecord>, ExportError> {
    Ok(serde_json::from_str(json)?)
}
