//! Caller-driven measurement session.
//!
//! [`crate::process`] replays a fixed action list in one call. A
//! [`Session`] instead hands control back between steps, which is what
//! an interactive front-end needs: grow and erase apply one user
//! gesture at a time, parameters can be retuned mid-trace without
//! losing work, and all state lives in the stage value the caller
//! threads along.
//!
//! Stages form a one-way chain; each transition consumes the previous
//! stage, so an out-of-order call is a compile error rather than a
//! runtime surprise:
//!
//! ```rust
//! # use filum_pipeline::{PipelineConfig, PipelineError, SeedPoint, Session};
//! # fn run(png_bytes: Vec<u8>) -> Result<(), PipelineError> {
//! let tracing = Session::new(png_bytes, PipelineConfig::default())
//!     .load()?
//!     .segment()?;
//! let (tracing, status) = tracing.grow(SeedPoint::new(120, 88))?;
//! let measured = tracing.skeletonize().measure()?;
//! println!("{status:?}: {:.2} um", measured.length());
//! # Ok(())
//! # }
//! ```

use image::DynamicImage;

use crate::types::{
    Dimensions, GrayImage, GrowStatus, PipelineConfig, PipelineError, ProcessResult, SeedPoint,
};
use crate::{grayscale, measure, skeleton, trace};

/// Entry point for a stage-by-stage measurement session.
pub struct Session;

impl Session {
    /// Start a session over encoded image bytes.
    #[allow(clippy::new_ret_no_self)]
    #[must_use]
    pub const fn new(image_bytes: Vec<u8>, config: PipelineConfig) -> Pending {
        Pending {
            bytes: image_bytes,
            config,
        }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Raw bytes waiting to be decoded.
#[must_use = "session stages are consumed by advancing — call .load() to continue"]
pub struct Pending {
    bytes: Vec<u8>,
    config: PipelineConfig,
}

impl Pending {
    /// The encoded source bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode the source image and advance to [`Loaded`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] for empty bytes or a
    /// zero-sized image and [`PipelineError::ImageDecode`] when
    /// decoding fails.
    pub fn load(self) -> Result<Loaded, PipelineError> {
        let image = grayscale::decode(&self.bytes)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(PipelineError::EmptyInput);
        }
        Ok(Loaded {
            image,
            config: self.config,
        })
    }
}

// ───────────────────────── Stage 1: Loaded ───────────────────────────

/// A decoded image waiting for segmentation.
#[must_use = "session stages are consumed by advancing — call .segment() to continue"]
pub struct Loaded {
    image: DynamicImage,
    config: PipelineConfig,
}

impl Loaded {
    /// Source image dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    /// Segment a candidate mask and advance to [`Tracing`] with an
    /// empty accumulated mask.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] when the
    /// configuration fails validation.
    pub fn segment(self) -> Result<Tracing, PipelineError> {
        let candidate = crate::preprocess(&self.image, &self.config)?;
        let accumulated = GrayImage::new(candidate.width(), candidate.height());
        Ok(Tracing {
            image: self.image,
            config: self.config,
            candidate,
            accumulated,
            statuses: Vec::new(),
        })
    }
}

// ───────────────────────── Stage 2: Tracing ──────────────────────────

/// The interactive stage: grow, erase, retune, reset, repeat.
#[must_use = "session stages are consumed by advancing — call .grow()/.erase() or .skeletonize()"]
pub struct Tracing {
    image: DynamicImage,
    config: PipelineConfig,
    candidate: GrayImage,
    accumulated: GrayImage,
    statuses: Vec<GrowStatus>,
}

impl Tracing {
    /// The segmentation candidate the user picks regions from.
    #[must_use]
    pub const fn candidate(&self) -> &GrayImage {
        &self.candidate
    }

    /// The accumulated trace so far.
    #[must_use]
    pub const fn accumulated(&self) -> &GrayImage {
        &self.accumulated
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Grow the candidate component under `seed` into the trace.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::OutOfBounds`] when the seed lies
    /// outside the image.
    pub fn grow(mut self, seed: SeedPoint) -> Result<(Self, GrowStatus), PipelineError> {
        let (accumulated, status) = trace::grow(&self.candidate, &self.accumulated, seed)?;
        self.accumulated = accumulated;
        self.statuses.push(status);
        Ok((self, status))
    }

    /// Erase a disk of the configured radius from the trace.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::OutOfBounds`] when the point lies
    /// outside the image.
    pub fn erase(mut self, point: SeedPoint) -> Result<Self, PipelineError> {
        self.accumulated = trace::erase(&self.accumulated, point, self.config.erase_radius)?;
        Ok(self)
    }

    /// Re-segment with new parameters, keeping the accumulated trace.
    ///
    /// This is the slider-adjustment path: the candidate mask is
    /// recomputed from the kept source image while traced work
    /// survives untouched.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] when `config` fails
    /// validation. The stage is consumed either way; pre-check slider
    /// values with [`PipelineConfig::validate`] when the session must
    /// survive bad input.
    pub fn retune(mut self, config: PipelineConfig) -> Result<Self, PipelineError> {
        self.candidate = crate::preprocess(&self.image, &config)?;
        self.config = config;
        Ok(self)
    }

    /// Drop the accumulated trace and its grow history, keeping the
    /// image and candidate.
    pub fn reset(mut self) -> Self {
        self.accumulated = GrayImage::new(self.candidate.width(), self.candidate.height());
        self.statuses.clear();
        self
    }

    /// Thin the accumulated trace and advance to [`Thinned`].
    ///
    /// The source image is dropped here; nothing after this point can
    /// re-segment.
    pub fn skeletonize(self) -> Thinned {
        let skeleton = skeleton::skeletonize(&self.accumulated);
        Thinned {
            config: self.config,
            candidate: self.candidate,
            accumulated: self.accumulated,
            skeleton,
            statuses: self.statuses,
        }
    }
}

// ───────────────────────── Stage 3: Thinned ──────────────────────────

/// A thinned trace waiting for measurement.
#[must_use = "session stages are consumed by advancing — call .measure() to continue"]
pub struct Thinned {
    config: PipelineConfig,
    candidate: GrayImage,
    accumulated: GrayImage,
    skeleton: GrayImage,
    statuses: Vec<GrowStatus>,
}

impl Thinned {
    /// The skeleton mask.
    #[must_use]
    pub const fn skeleton(&self) -> &GrayImage {
        &self.skeleton
    }

    /// Measure the skeleton and advance to [`Measured`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyRegion`] when nothing was traced
    /// and [`PipelineError::InvalidParameter`] for a bad calibration
    /// factor.
    pub fn measure(self) -> Result<Measured, PipelineError> {
        let length = measure::measure(&self.skeleton, self.config.calibration_factor)?;
        let dimensions = Dimensions::of(&self.candidate);
        Ok(Measured {
            result: ProcessResult {
                candidate: self.candidate,
                accumulated: self.accumulated,
                skeleton: self.skeleton,
                length,
                grow_statuses: self.statuses,
                dimensions,
            },
        })
    }
}

// ───────────────────────── Stage 4: Measured ─────────────────────────

/// A finished measurement.
#[must_use = "holds the finished measurement — read .length() or take .into_result()"]
pub struct Measured {
    result: ProcessResult,
}

impl Measured {
    /// Calibrated length in micrometres.
    #[must_use]
    pub const fn length(&self) -> f64 {
        self.result.length
    }

    /// The skeleton the length was measured over.
    #[must_use]
    pub const fn skeleton(&self) -> &GrayImage {
        &self.result.skeleton
    }

    /// Take ownership of the full result.
    #[must_use]
    pub fn into_result(self) -> ProcessResult {
        self.result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder, Luma};

    use crate::types::TraceAction;

    use super::*;

    /// A dark frame with one bright horizontal bar, PNG-encoded.
    fn bar_png() -> Vec<u8> {
        let image = GrayImage::from_fn(60, 40, |x, y| {
            let in_bar = (5..55).contains(&x) && (18..23).contains(&y);
            Luma([if in_bar { 220 } else { 20 }])
        });
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(image.as_raw(), 60, 40, ExtendedColorType::L8)
            .unwrap();
        bytes
    }

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            block_size: 15,
            erase_radius: 4,
            calibration_factor: 1.0,
            ..PipelineConfig::default()
        }
    }

    fn foreground_count(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p.0[0] == 255).count()
    }

    #[test]
    fn full_session_measures_the_bar() {
        let loaded = Session::new(bar_png(), small_config()).load().unwrap();
        assert_eq!(
            loaded.dimensions(),
            Dimensions {
                width: 60,
                height: 40
            }
        );

        let tracing = loaded.segment().unwrap();
        assert!(foreground_count(tracing.candidate()) > 0);
        assert_eq!(foreground_count(tracing.accumulated()), 0);

        let (tracing, status) = tracing.grow(SeedPoint::new(20, 30)).unwrap();
        assert!(status.is_grown());
        assert!(foreground_count(tracing.accumulated()) > 0);

        let measured = tracing.skeletonize().measure().unwrap();
        assert!(
            measured.length() > 20.0,
            "bar length came out at {}",
            measured.length()
        );
    }

    #[test]
    fn missed_seed_leaves_the_trace_empty() {
        let tracing = Session::new(bar_png(), small_config())
            .load()
            .unwrap()
            .segment()
            .unwrap();
        let (tracing, status) = tracing.grow(SeedPoint::new(2, 2)).unwrap();
        assert_eq!(status, GrowStatus::SeedNotOnForeground);
        assert_eq!(foreground_count(tracing.accumulated()), 0);

        let result = tracing.skeletonize().measure();
        assert!(matches!(result, Err(PipelineError::EmptyRegion)));
    }

    #[test]
    fn erase_trims_the_trace() {
        let tracing = Session::new(bar_png(), small_config())
            .load()
            .unwrap()
            .segment()
            .unwrap();
        let (tracing, _) = tracing.grow(SeedPoint::new(20, 30)).unwrap();
        let before = foreground_count(tracing.accumulated());

        let tracing = tracing.erase(SeedPoint::new(20, 30)).unwrap();
        let after = foreground_count(tracing.accumulated());
        assert!(after < before, "erase removed nothing ({before} -> {after})");
    }

    #[test]
    fn retune_keeps_the_accumulated_trace() {
        let tracing = Session::new(bar_png(), small_config())
            .load()
            .unwrap()
            .segment()
            .unwrap();
        let (tracing, _) = tracing.grow(SeedPoint::new(20, 30)).unwrap();
        let traced = tracing.accumulated().clone();

        let retuned = tracing
            .retune(PipelineConfig {
                c_value: -5,
                ..small_config()
            })
            .unwrap();
        assert_eq!(retuned.accumulated(), &traced);
        assert_eq!(retuned.config().c_value, -5);
    }

    #[test]
    fn retune_rejects_bad_parameters() {
        let tracing = Session::new(bar_png(), small_config())
            .load()
            .unwrap()
            .segment()
            .unwrap();
        let result = tracing.retune(PipelineConfig {
            block_size: 10,
            ..small_config()
        });
        assert!(matches!(result, Err(PipelineError::InvalidParameter(_))));
    }

    #[test]
    fn reset_clears_trace_and_history() {
        let tracing = Session::new(bar_png(), small_config())
            .load()
            .unwrap()
            .segment()
            .unwrap();
        let (tracing, _) = tracing.grow(SeedPoint::new(20, 30)).unwrap();
        let tracing = tracing.reset();
        assert_eq!(foreground_count(tracing.accumulated()), 0);

        // The candidate survives, so the same seed grows again.
        let (tracing, status) = tracing.grow(SeedPoint::new(20, 30)).unwrap();
        assert!(status.is_grown());
        let result = tracing.skeletonize().measure().unwrap().into_result();
        assert_eq!(result.grow_statuses.len(), 1, "history restarted at reset");
    }

    #[test]
    fn session_matches_batch_processing() {
        let seed = SeedPoint::new(20, 30);
        let batch = crate::process(
            &bar_png(),
            &small_config(),
            &[TraceAction::Grow(seed)],
        )
        .unwrap();

        let (tracing, _) = Session::new(bar_png(), small_config())
            .load()
            .unwrap()
            .segment()
            .unwrap()
            .grow(seed)
            .unwrap();
        let session = tracing.skeletonize().measure().unwrap().into_result();

        assert_eq!(session.candidate, batch.candidate);
        assert_eq!(session.accumulated, batch.accumulated);
        assert_eq!(session.skeleton, batch.skeleton);
        assert!((session.length - batch.length).abs() < f64::EPSILON);
        assert_eq!(session.grow_statuses, batch.grow_statuses);
    }

    #[test]
    fn empty_bytes_fail_to_load() {
        let result = Session::new(Vec::new(), PipelineConfig::default()).load();
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }
}
