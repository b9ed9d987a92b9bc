//! Shared types for the measurement pipeline.
//!
//! Everything here is plain data: configuration, coordinates, statuses,
//! results, and the error taxonomy. The processing stages themselves
//! live in their own modules and operate on these types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export so downstream crates can name mask buffers without
/// depending on `image` directly.
pub use image::GrayImage;

/// Pixel value marking mask foreground.
pub const FOREGROUND: u8 = 255;

/// Pixel value marking mask background.
pub const BACKGROUND: u8 = 0;

/// A seed or erase location in mask coordinates.
///
/// Order matches array indexing: `row` counts down from the top edge,
/// `col` counts right from the left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPoint {
    /// Row index, `0..height`.
    pub row: u32,
    /// Column index, `0..width`.
    pub col: u32,
}

impl SeedPoint {
    /// Create a point at `(row, col)`.
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Width and height of an image or mask, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an existing mask.
    #[must_use]
    pub fn of(image: &GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count.
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One interactive tracing gesture, replayed in order by
/// [`process`](crate::process).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceAction {
    /// Flood-fill the candidate component under the seed and union it
    /// into the accumulated mask.
    Grow(SeedPoint),
    /// Clear a disk of the configured radius from the accumulated mask.
    Erase(SeedPoint),
}

/// Outcome of a single grow.
///
/// A seed landing on background is an ordinary status, not an error:
/// the caller decides whether to re-prompt for a better click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrowStatus {
    /// The seed's 4-connected component was unioned into the mask.
    Grown {
        /// Pixels in the seed's connected component.
        region_pixels: usize,
        /// Pixels newly added to the accumulated mask.
        added_pixels: usize,
    },
    /// The seed hit a background pixel; the mask is unchanged.
    SeedNotOnForeground,
}

impl GrowStatus {
    /// `true` when the grow unioned a component into the mask.
    #[must_use]
    pub const fn is_grown(&self) -> bool {
        matches!(self, Self::Grown { .. })
    }
}

/// Configuration for the measurement pipeline.
///
/// Defaults mirror the interactive tool the pipeline drives; see the
/// `DEFAULT_*` constants. [`validate`](Self::validate) checks every
/// field and rejects out-of-range values rather than silently
/// correcting them, so a bad slider binding surfaces immediately.
///
/// # Unit caution
///
/// `calibration_factor` is pixels per micrometre and lengths come out
/// in micrometres. Historical measurement logs produced with this very
/// factor labelled lengths as millimetres; the numbers match, the label
/// did not. Compare against old records by value, not by unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Morphological closing repetitions. At least 1.
    pub iterations: u32,
    /// Side of the square closing kernel, in pixels. Odd, in `3..=255`.
    pub kernel_size: u32,
    /// Side of the adaptive-threshold window, in pixels. Odd, in
    /// `3..=255`.
    pub block_size: u32,
    /// Offset subtracted from the local weighted mean before the
    /// threshold comparison. Larger values mark more pixels as
    /// foreground; the default is slightly strict.
    pub c_value: i32,
    /// Radius of the erase disk, in pixels. At least 1.
    pub erase_radius: u32,
    /// Pixels per micrometre of physical length. Finite and positive.
    pub calibration_factor: f64,
}

impl PipelineConfig {
    /// Default closing repetitions.
    pub const DEFAULT_ITERATIONS: u32 = 1;
    /// Default closing kernel side.
    pub const DEFAULT_KERNEL_SIZE: u32 = 3;
    /// Default adaptive-threshold window side.
    pub const DEFAULT_BLOCK_SIZE: u32 = 51;
    /// Default threshold offset.
    pub const DEFAULT_C_VALUE: i32 = -3;
    /// Default erase radius.
    pub const DEFAULT_ERASE_RADIUS: u32 = 10;
    /// Default calibration, px/um, for the 20x objective the bundled
    /// datasets were captured with.
    pub const DEFAULT_CALIBRATION_FACTOR: f64 = 3.06;

    /// Check every field against its documented constraint.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.iterations < 1 {
            return Err(PipelineError::InvalidParameter(format!(
                "iterations must be at least 1, got {}",
                self.iterations
            )));
        }
        validate_window("kernel_size", self.kernel_size)?;
        validate_window("block_size", self.block_size)?;
        if self.erase_radius < 1 {
            return Err(PipelineError::InvalidParameter(format!(
                "erase_radius must be at least 1, got {}",
                self.erase_radius
            )));
        }
        if !self.calibration_factor.is_finite() || self.calibration_factor <= 0.0 {
            return Err(PipelineError::InvalidParameter(format!(
                "calibration_factor must be a positive finite number, got {}",
                self.calibration_factor
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            iterations: Self::DEFAULT_ITERATIONS,
            kernel_size: Self::DEFAULT_KERNEL_SIZE,
            block_size: Self::DEFAULT_BLOCK_SIZE,
            c_value: Self::DEFAULT_C_VALUE,
            erase_radius: Self::DEFAULT_ERASE_RADIUS,
            calibration_factor: Self::DEFAULT_CALIBRATION_FACTOR,
        }
    }
}

/// Window sides must be odd so the window has a centre pixel, and small
/// enough for the morphology radius to fit in a `u8`.
fn validate_window(name: &str, value: u32) -> Result<(), PipelineError> {
    if !(3..=255).contains(&value) || value % 2 == 0 {
        return Err(PipelineError::InvalidParameter(format!(
            "{name} must be an odd integer in 3..=255, got {value}"
        )));
    }
    Ok(())
}

/// Result of running the full measurement pipeline.
///
/// Carries every artifact a presenting or persisting caller needs.
/// Masks hold exactly two values, [`FOREGROUND`] and [`BACKGROUND`],
/// and share the source image's dimensions.
///
/// Not serializable as a whole: raster masks serialize poorly as JSON.
/// Persistence encodes the pieces separately (see the export crate).
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// Candidate mask from segmentation.
    pub candidate: GrayImage,
    /// Accumulated trace after replaying every action.
    pub accumulated: GrayImage,
    /// Skeleton of the accumulated trace.
    pub skeleton: GrayImage,
    /// Calibrated length of the skeleton, in micrometres.
    pub length: f64,
    /// Outcome of each grow action, in action order.
    pub grow_statuses: Vec<GrowStatus>,
    /// Source image dimensions.
    pub dimensions: Dimensions,
}

/// Errors surfaced by the measurement pipeline.
///
/// Every variant is recoverable by correcting input or parameters and
/// retrying. A grow seed that misses the foreground is deliberately not
/// here; see [`GrowStatus::SeedNotOnForeground`].
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image bytes.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input byte slice was empty, or the decoded image has a zero
    /// dimension.
    #[error("input image is empty")]
    EmptyInput,

    /// A configuration field violates its documented constraint.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A seed or erase point lies outside the mask.
    #[error("point ({row}, {col}) is outside the {dimensions} mask")]
    OutOfBounds {
        row: u32,
        col: u32,
        dimensions: Dimensions,
    },

    /// Source and accumulated masks disagree on dimensions.
    ///
    /// The first field is deliberately not named `source`; thiserror
    /// would infer it as the error's cause.
    #[error("mask size mismatch: source is {source_mask}, accumulated is {accumulated}")]
    MaskSizeMismatch {
        source_mask: Dimensions,
        accumulated: Dimensions,
    },

    /// A length was requested over a mask with no foreground pixels.
    #[error("no traced region to measure")]
    EmptyRegion,
}
