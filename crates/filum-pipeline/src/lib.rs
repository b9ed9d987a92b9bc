//! Cell-length measurement pipeline (sans-IO).
//!
//! Turns a microscopy image into a calibrated cell length in four
//! steps: segment a candidate mask, trace the cell by seeded growing
//! and disk erasing, thin the trace to a one-pixel skeleton, and count
//! calibrated pixels.
//!
//! Segmentation itself is a five-stage chain: grayscale reduction,
//! contrast stretch, Gaussian smoothing, adaptive threshold, and
//! morphological closing. Every stage is pure and deterministic, so a
//! recorded action list replays to the identical length.
//!
//! This crate has **no I/O dependencies** -- it consumes in-memory byte
//! slices and image buffers and returns structured data. File handling,
//! persistence, and presentation live with the caller (see the export
//! crate and the CLI).
//!
//! Three entry points, from coarse to fine:
//!
//! - [`process`] -- decode, segment, replay actions, measure, one call.
//! - [`process_with_diagnostics`] -- the same with per-stage timing.
//! - [`Session`] -- stage-by-stage control for interactive callers.

pub mod blur;
pub mod diagnostics;
pub mod grayscale;
pub mod measure;
pub mod morphology;
pub mod rescale;
pub mod session;
pub mod skeleton;
pub mod threshold;
pub mod trace;
pub mod types;

pub use session::{Loaded, Measured, Pending, Session, Thinned, Tracing};
pub use skeleton::skeletonize;
pub use trace::{erase, grow};
pub use types::{
    BACKGROUND, Dimensions, FOREGROUND, GrayImage, GrowStatus, PipelineConfig, PipelineError,
    ProcessResult, SeedPoint, TraceAction,
};

use diagnostics::{Clock, PipelineDiagnostics, PipelineSummary, StageDiagnostics, StageMetrics};

/// Segment an image into a binary candidate mask.
///
/// Runs the five-stage preprocessing chain:
///
/// 1. Luminance grayscale reduction
/// 2. Contrast stretch to the full 0..=255 range
/// 3. Fixed 5x5 Gaussian smoothing
/// 4. Adaptive threshold against the local weighted mean
///    (`block_size`, `c_value`)
/// 5. Morphological closing (`kernel_size`), repeated `iterations`
///    times
///
/// The output holds exactly [`FOREGROUND`] and [`BACKGROUND`] and
/// matches the input dimensions.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] when `config` violates a
/// field constraint and [`PipelineError::EmptyInput`] when the image
/// has a zero dimension.
pub fn preprocess(
    image: &image::DynamicImage,
    config: &PipelineConfig,
) -> Result<GrayImage, PipelineError> {
    config.validate()?;
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::EmptyInput);
    }

    // 1. Collapse to single-channel grayscale.
    let gray = grayscale::to_grayscale(image);

    // 2. Stretch contrast to the full representable range.
    let stretched = rescale::stretch_contrast(&gray);

    // 3. Suppress sensor noise with the fixed smoothing kernel.
    let smoothed = blur::smooth(&stretched);

    // 4. Binarize against the local weighted mean.
    let candidate = threshold::adaptive_threshold(&smoothed, config.block_size, config.c_value);

    // 5. Seal pinholes and hairline breaks.
    Ok(morphology::close_gaps(
        &candidate,
        config.kernel_size,
        config.iterations,
    ))
}

/// Run the full measurement pipeline in one call.
///
/// Decodes `image_bytes`, segments a candidate mask, replays `actions`
/// in order against an initially empty accumulated mask, thins the
/// result, and measures it. Interactive callers that need control
/// between actions use [`Session`] instead.
///
/// Grow actions landing on background are recorded in
/// [`ProcessResult::grow_statuses`] and change nothing, mirroring how
/// an interactive trace shrugs off a missed click.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] when `config` is
/// invalid, [`PipelineError::EmptyInput`] or
/// [`PipelineError::ImageDecode`] for unusable input bytes,
/// [`PipelineError::OutOfBounds`] when an action points outside the
/// image, and [`PipelineError::EmptyRegion`] when no traced pixels
/// remain to measure after the replay.
pub fn process(
    image_bytes: &[u8],
    config: &PipelineConfig,
    actions: &[TraceAction],
) -> Result<ProcessResult, PipelineError> {
    config.validate()?;

    let image = grayscale::decode(image_bytes)?;
    let candidate = preprocess(&image, config)?;
    let dimensions = Dimensions::of(&candidate);

    let mut accumulated = GrayImage::new(dimensions.width, dimensions.height);
    let mut grow_statuses = Vec::new();
    for action in actions {
        match *action {
            TraceAction::Grow(seed) => {
                let (merged, status) = trace::grow(&candidate, &accumulated, seed)?;
                accumulated = merged;
                grow_statuses.push(status);
            }
            TraceAction::Erase(point) => {
                accumulated = trace::erase(&accumulated, point, config.erase_radius)?;
            }
        }
    }

    let skeleton = skeleton::skeletonize(&accumulated);
    let length = measure::measure(&skeleton, config.calibration_factor)?;

    Ok(ProcessResult {
        candidate,
        accumulated,
        skeleton,
        length,
        grow_statuses,
        dimensions,
    })
}

/// Like [`process`], additionally timing each stage and reporting
/// per-stage metrics.
///
/// `clock` supplies the timestamps; see [`diagnostics::Clock`]. The
/// pipeline semantics are identical to [`process`].
///
/// # Errors
///
/// Same failure modes as [`process`].
#[allow(clippy::too_many_lines)] // one linear block per stage
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &PipelineConfig,
    actions: &[TraceAction],
    clock: &C,
) -> Result<(ProcessResult, PipelineDiagnostics), PipelineError> {
    config.validate()?;

    let run_start = clock.now();

    let start = clock.now();
    let image = grayscale::decode(image_bytes)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::EmptyInput);
    }
    let dimensions = Dimensions {
        width: image.width(),
        height: image.height(),
    };
    let decode = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Decode {
            input_bytes: image_bytes.len(),
            width: dimensions.width,
            height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
        },
    };

    let start = clock.now();
    let gray = grayscale::to_grayscale(&image);
    let grayscale_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Grayscale {
            width: dimensions.width,
            height: dimensions.height,
        },
    };

    let start = clock.now();
    let (input_min, input_max) = rescale::intensity_range(&gray).unwrap_or((0, 0));
    let stretched = rescale::stretch_contrast(&gray);
    let rescale_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Rescale {
            input_min,
            input_max,
        },
    };

    let start = clock.now();
    let smoothed = blur::smooth(&stretched);
    let blur_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Blur {
            kernel_width: blur::SMOOTHING_KERNEL_WIDTH,
        },
    };

    let start = clock.now();
    let thresholded = threshold::adaptive_threshold(&smoothed, config.block_size, config.c_value);
    let threshold_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Threshold {
            block_size: config.block_size,
            c_value: config.c_value,
            foreground_pixels: measure::foreground_count(&thresholded),
            total_pixels: dimensions.pixel_count(),
        },
    };

    let start = clock.now();
    let candidate = morphology::close_gaps(&thresholded, config.kernel_size, config.iterations);
    let close_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Close {
            kernel_size: config.kernel_size,
            iterations: config.iterations,
            foreground_pixels: measure::foreground_count(&candidate),
        },
    };

    let start = clock.now();
    let mut accumulated = GrayImage::new(dimensions.width, dimensions.height);
    let mut grow_statuses = Vec::new();
    let mut grows = 0_usize;
    let mut erases = 0_usize;
    for action in actions {
        match *action {
            TraceAction::Grow(seed) => {
                let (merged, status) = trace::grow(&candidate, &accumulated, seed)?;
                accumulated = merged;
                grow_statuses.push(status);
                grows += 1;
            }
            TraceAction::Erase(point) => {
                accumulated = trace::erase(&accumulated, point, config.erase_radius)?;
                erases += 1;
            }
        }
    }
    let traced_pixels = measure::foreground_count(&accumulated);
    let seeds_off_foreground = grow_statuses
        .iter()
        .filter(|status| !status.is_grown())
        .count();
    let trace_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Trace {
            grows,
            erases,
            seeds_off_foreground,
            foreground_pixels: traced_pixels,
        },
    };

    let start = clock.now();
    let thinning = skeleton::thin(&accumulated);
    let skeleton_pixels = measure::foreground_count(&thinning.skeleton);
    let thin_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Thin {
            passes: thinning.passes,
            pixels_before: traced_pixels,
            pixels_after: skeleton_pixels,
        },
    };

    let start = clock.now();
    let length = measure::measure(&thinning.skeleton, config.calibration_factor)?;
    let measure_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Measure {
            skeleton_pixels,
            calibration_factor: config.calibration_factor,
            length,
        },
    };

    let diagnostics = PipelineDiagnostics {
        decode,
        grayscale: grayscale_stage,
        rescale: rescale_stage,
        blur: blur_stage,
        threshold: threshold_stage,
        close: close_stage,
        trace: trace_stage,
        thin: thin_stage,
        measure: measure_stage,
        total_duration: clock.elapsed(&run_start),
        summary: PipelineSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            traced_pixels,
            skeleton_pixels,
            length,
        },
    };

    let result = ProcessResult {
        candidate,
        accumulated,
        skeleton: thinning.skeleton,
        length,
        grow_statuses,
        dimensions,
    };

    Ok((result, diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder, Luma};

    use super::*;

    /// Fixed-step clock for deterministic diagnostics tests.
    struct TickClock;

    impl Clock for TickClock {
        type Instant = ();

        fn now(&self) {}

        fn elapsed(&self, _since: &()) -> Duration {
            Duration::from_millis(1)
        }
    }

    fn encode_png(image: &GrayImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::L8,
            )
            .unwrap();
        bytes
    }

    /// Dark frame with a bright bar across the middle.
    fn bar_png() -> Vec<u8> {
        encode_png(&GrayImage::from_fn(60, 40, |x, y| {
            let in_bar = (5..55).contains(&x) && (18..23).contains(&y);
            Luma([if in_bar { 220 } else { 20 }])
        }))
    }

    fn bar_config() -> PipelineConfig {
        PipelineConfig {
            block_size: 15,
            calibration_factor: 1.0,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn invalid_config_wins_over_bad_bytes() {
        // Validation runs before any decode work.
        let config = PipelineConfig {
            kernel_size: 4,
            ..PipelineConfig::default()
        };
        let result = process(&[], &config, &[]);
        assert!(matches!(result, Err(PipelineError::InvalidParameter(_))));
    }

    #[test]
    fn empty_bytes_are_rejected() {
        let result = process(&[], &PipelineConfig::default(), &[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_are_rejected() {
        let result = process(&[0x00, 0x01, 0x02], &PipelineConfig::default(), &[]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn no_actions_means_nothing_to_measure() {
        let result = process(&bar_png(), &bar_config(), &[]);
        assert!(matches!(result, Err(PipelineError::EmptyRegion)));
    }

    #[test]
    fn grow_then_measure_reports_the_bar_length() {
        let actions = [TraceAction::Grow(SeedPoint::new(20, 30))];
        let result = process(&bar_png(), &bar_config(), &actions).unwrap();

        assert_eq!(result.dimensions.width, 60);
        assert_eq!(result.dimensions.height, 40);
        assert_eq!(result.grow_statuses.len(), 1);
        assert!(result.grow_statuses[0].is_grown());
        assert!(
            result.length > 20.0 && result.length < 60.0,
            "length {} out of range",
            result.length
        );
    }

    #[test]
    fn missed_seed_is_a_status_not_an_error() {
        let actions = [
            TraceAction::Grow(SeedPoint::new(2, 2)),
            TraceAction::Grow(SeedPoint::new(20, 30)),
        ];
        let result = process(&bar_png(), &bar_config(), &actions).unwrap();
        assert_eq!(result.grow_statuses[0], GrowStatus::SeedNotOnForeground);
        assert!(result.grow_statuses[1].is_grown());
    }

    #[test]
    fn out_of_bounds_action_is_an_error() {
        let actions = [TraceAction::Grow(SeedPoint::new(500, 500))];
        let result = process(&bar_png(), &bar_config(), &actions);
        assert!(matches!(result, Err(PipelineError::OutOfBounds { .. })));
    }

    #[test]
    fn replay_is_deterministic() {
        let actions = [
            TraceAction::Grow(SeedPoint::new(20, 30)),
            TraceAction::Erase(SeedPoint::new(20, 10)),
        ];
        let first = process(&bar_png(), &bar_config(), &actions).unwrap();
        let second = process(&bar_png(), &bar_config(), &actions).unwrap();
        assert_eq!(first.skeleton, second.skeleton);
        assert!((first.length - second.length).abs() < f64::EPSILON);
    }

    #[test]
    fn masks_are_binary_and_sized_like_the_input() {
        let actions = [TraceAction::Grow(SeedPoint::new(20, 30))];
        let result = process(&bar_png(), &bar_config(), &actions).unwrap();

        for mask in [&result.candidate, &result.accumulated, &result.skeleton] {
            assert_eq!(mask.dimensions(), (60, 40));
            assert!(
                mask.pixels()
                    .all(|p| p.0[0] == FOREGROUND || p.0[0] == BACKGROUND)
            );
        }
    }

    #[test]
    fn skeleton_is_a_subset_of_the_trace() {
        let actions = [TraceAction::Grow(SeedPoint::new(20, 30))];
        let result = process(&bar_png(), &bar_config(), &actions).unwrap();
        for (x, y, pixel) in result.skeleton.enumerate_pixels() {
            if pixel.0[0] == FOREGROUND {
                assert_eq!(result.accumulated.get_pixel(x, y).0[0], FOREGROUND);
            }
        }
    }

    #[test]
    fn diagnostics_cover_the_run() {
        let actions = [
            TraceAction::Grow(SeedPoint::new(2, 2)),
            TraceAction::Grow(SeedPoint::new(20, 30)),
            TraceAction::Erase(SeedPoint::new(20, 52)),
        ];
        let (result, diagnostics) =
            process_with_diagnostics(&bar_png(), &bar_config(), &actions, &TickClock).unwrap();

        assert!(matches!(
            diagnostics.trace.metrics,
            StageMetrics::Trace {
                grows: 2,
                erases: 1,
                seeds_off_foreground: 1,
                ..
            }
        ));
        if let StageMetrics::Thin {
            passes,
            pixels_before,
            pixels_after,
        } = diagnostics.thin.metrics
        {
            assert!(passes >= 1);
            assert!(pixels_after <= pixels_before);
        } else {
            unreachable!("thin stage carries thin metrics");
        }
        assert_eq!(diagnostics.summary.pixel_count, 2400);
        assert!((diagnostics.summary.length - result.length).abs() < f64::EPSILON);
        assert_eq!(diagnostics.decode.duration, Duration::from_millis(1));

        let report = diagnostics.report();
        assert!(report.contains("threshold"));
        assert!(report.contains("block=15"));
    }

    #[test]
    fn diagnostics_match_plain_processing() {
        let actions = [TraceAction::Grow(SeedPoint::new(20, 30))];
        let plain = process(&bar_png(), &bar_config(), &actions).unwrap();
        let (timed, _) =
            process_with_diagnostics(&bar_png(), &bar_config(), &actions, &TickClock).unwrap();

        assert_eq!(plain.candidate, timed.candidate);
        assert_eq!(plain.accumulated, timed.accumulated);
        assert_eq!(plain.skeleton, timed.skeleton);
        assert!((plain.length - timed.length).abs() < f64::EPSILON);
    }
}
