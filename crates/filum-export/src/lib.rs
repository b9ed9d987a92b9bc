//! Measurement persistence formats (sans-IO).
//!
//! Serializes accepted measurements to a JSON log and skeleton masks to
//! PNG bytes. Nothing here touches the filesystem -- callers receive
//! strings and byte vectors and decide where they land, which keeps the
//! formats testable without temp directories.

pub mod png;
pub mod record;

pub use png::{skeleton_file_name, skeleton_png};
pub use record::{Difficulty, MeasurementRecord, from_json, to_json, upsert};

/// Errors surfaced by the export serializers.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Measurement log (de)serialization failed.
    #[error("measurement log serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Skeleton PNG encoding failed.
    #[error("skeleton image encoding failed: {0}")]
    PngEncode(#[from] image::ImageError),

    /// A difficulty label was not `easy`, `medium`, or `hard`.
    #[error("unknown difficulty: {0:?}")]
    UnknownDifficulty(String),
}
