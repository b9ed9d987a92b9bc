//! Pipeline diagnostics: timing and stage metrics for parameter tuning.
//!
//! Every call to
//! [`process_with_diagnostics`](crate::process_with_diagnostics)
//! collects one [`StageDiagnostics`] per stage alongside the pipeline
//! result. The numbers answer the questions that come up when a
//! segmentation misbehaves: how dense was the candidate mask, how many
//! clicks missed, how many thinning passes ran, where did the time go.
//!
//! Timing is abstracted behind the [`Clock`] trait so this crate never
//! touches platform timers itself; the CLI supplies one backed by
//! `std::time::Instant`. Durations serialize as fractional seconds
//! because `std::time::Duration` has no serde representation of its
//! own.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Source of relative timestamps for stage timing.
pub trait Clock {
    /// Opaque instant produced by [`now`](Self::now).
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(seconds)
            .map_err(|_| serde::de::Error::custom(format!("invalid duration: {seconds}")))
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Byte decode into a raster image.
    pub decode: StageDiagnostics,
    /// Luminance reduction.
    pub grayscale: StageDiagnostics,
    /// Contrast stretch.
    pub rescale: StageDiagnostics,
    /// Fixed Gaussian smoothing.
    pub blur: StageDiagnostics,
    /// Adaptive threshold.
    pub threshold: StageDiagnostics,
    /// Morphological closing.
    pub close: StageDiagnostics,
    /// Replay of grow and erase actions.
    pub trace: StageDiagnostics,
    /// Thinning to a skeleton.
    pub thin: StageDiagnostics,
    /// Calibrated measurement.
    pub measure: StageDiagnostics,
    /// Wall-clock time for the whole run, including glue.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Headline numbers for the run.
    pub summary: PipelineSummary,
}

/// Timing and metrics for one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock time spent in the stage.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific measurements.
    pub metrics: StageMetrics,
}

/// Per-stage measurements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Byte decode.
    Decode {
        /// Size of the encoded input.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
        /// Total pixels decoded.
        pixel_count: u64,
    },
    /// Luminance reduction.
    Grayscale {
        width: u32,
        height: u32,
    },
    /// Contrast stretch.
    Rescale {
        /// Darkest input intensity.
        input_min: u8,
        /// Brightest input intensity.
        input_max: u8,
    },
    /// Gaussian smoothing.
    Blur {
        /// Width of the separable kernel.
        kernel_width: u32,
    },
    /// Adaptive threshold.
    Threshold {
        block_size: u32,
        c_value: i32,
        /// Foreground pixels in the raw threshold output.
        foreground_pixels: u64,
        /// Total pixels, for density.
        total_pixels: u64,
    },
    /// Morphological closing.
    Close {
        kernel_size: u32,
        iterations: u32,
        /// Foreground pixels in the candidate mask.
        foreground_pixels: u64,
    },
    /// Action replay.
    Trace {
        /// Grow actions replayed.
        grows: usize,
        /// Erase actions replayed.
        erases: usize,
        /// Grow seeds that landed on background.
        seeds_off_foreground: usize,
        /// Foreground pixels in the accumulated mask afterwards.
        foreground_pixels: u64,
    },
    /// Thinning.
    Thin {
        /// Full passes that deleted at least one pixel. The terminating
        /// no-op sweep is not counted, so an already-thin trace
        /// reports 0.
        passes: usize,
        /// Foreground pixels before thinning.
        pixels_before: u64,
        /// Foreground pixels after thinning.
        pixels_after: u64,
    },
    /// Measurement.
    Measure {
        skeleton_pixels: u64,
        calibration_factor: f64,
        /// Calibrated length in micrometres.
        length: f64,
    },
}

/// Headline numbers for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub image_width: u32,
    pub image_height: u32,
    pub pixel_count: u64,
    /// Foreground pixels in the final accumulated mask.
    pub traced_pixels: u64,
    /// Foreground pixels in the skeleton.
    pub skeleton_pixels: u64,
    /// Calibrated length in micrometres.
    pub length: f64,
}

impl PipelineDiagnostics {
    /// Render a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();
        lines.push("Measurement Diagnostics".to_string());
        lines.push("=".repeat(60));
        lines.push(format!("{:<12} {:>9} {}", "stage", "ms", "metrics"));
        lines.push("-".repeat(60));

        for (name, stage) in [
            ("decode", &self.decode),
            ("grayscale", &self.grayscale),
            ("rescale", &self.rescale),
            ("blur", &self.blur),
            ("threshold", &self.threshold),
            ("close", &self.close),
            ("trace", &self.trace),
            ("thin", &self.thin),
            ("measure", &self.measure),
        ] {
            lines.push(format!(
                "{:<12} {:>9.3} {}",
                name,
                duration_ms(stage.duration),
                format_metrics(&stage.metrics)
            ));
        }

        lines.push("-".repeat(60));
        lines.push(format!("{:<12} {:>9.3}", "total", duration_ms(self.total_duration)));
        lines.push(format!(
            "{}x{} px | traced {} px | skeleton {} px | length {:.2} um",
            self.summary.image_width,
            self.summary.image_height,
            self.summary.traced_pixels,
            self.summary.skeleton_pixels,
            self.summary.length
        ));
        lines.join("\n")
    }
}

fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[allow(clippy::cast_precision_loss)] // pixel counts sit far below 2^52
fn format_metrics(metrics: &StageMetrics) -> String {
    match *metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            pixel_count,
        } => format!("{input_bytes} B -> {width}x{height} ({pixel_count} px)"),
        StageMetrics::Grayscale { width, height } => format!("{width}x{height}"),
        StageMetrics::Rescale {
            input_min,
            input_max,
        } => format!("range {input_min}..{input_max} -> 0..255"),
        StageMetrics::Blur { kernel_width } => format!("kernel={kernel_width}"),
        StageMetrics::Threshold {
            block_size,
            c_value,
            foreground_pixels,
            total_pixels,
        } => {
            let density = if total_pixels == 0 {
                0.0
            } else {
                100.0 * foreground_pixels as f64 / total_pixels as f64
            };
            format!("block={block_size} c={c_value} fg={foreground_pixels} ({density:.1}%)")
        }
        StageMetrics::Close {
            kernel_size,
            iterations,
            foreground_pixels,
        } => format!("kernel={kernel_size} iters={iterations} fg={foreground_pixels}"),
        StageMetrics::Trace {
            grows,
            erases,
            seeds_off_foreground,
            foreground_pixels,
        } => format!(
            "{grows} grows, {erases} erases, {seeds_off_foreground} off-target, fg={foreground_pixels}"
        ),
        StageMetrics::Thin {
            passes,
            pixels_before,
            pixels_after,
        } => format!("{passes} passes, {pixels_before} -> {pixels_after} px"),
        StageMetrics::Measure {
            skeleton_pixels,
            calibration_factor,
            length,
        } => format!("{skeleton_pixels} px / {calibration_factor} px/um = {length:.2} um"),
    }
}
