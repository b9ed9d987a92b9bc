//! Locally adaptive binarization.
//!
//! A single global cutoff fails on microscopy frames with uneven
//! illumination, so each pixel is compared against the Gaussian-weighted
//! mean of its own `block_size` window instead: a pixel becomes
//! foreground exactly when it is strictly brighter than `mean -
//! c_value`. Thin bright structures light up fully because their
//! windows are dominated by dark surround; broad flat areas stay
//! background because each pixel sits at its own local mean.
//!
//! The weighted mean reuses the separable filter from the blur stage
//! and is quantized to 8 bits before an integer comparison, keeping the
//! binarization exactly reproducible.

use image::GrayImage;
use imageproc::filter::separable_filter_equal;

use crate::blur::gaussian_kernel;
use crate::types::{BACKGROUND, FOREGROUND};

/// Binarize against a Gaussian-weighted local mean.
///
/// The window is `block_size` pixels on a side with weights falling off
/// under a Gaussian profile; at image borders the window is clamped to
/// the nearest row or column. Output holds exactly [`FOREGROUND`] and
/// [`BACKGROUND`] and matches the input dimensions.
///
/// Callers are expected to have validated `block_size` (odd, in
/// `3..=255`); see
/// [`PipelineConfig::validate`](crate::PipelineConfig::validate).
#[must_use = "returns the binarized mask"]
pub fn adaptive_threshold(image: &GrayImage, block_size: u32, c_value: i32) -> GrayImage {
    let local_mean = separable_filter_equal(image, &gaussian_kernel(block_size));

    let mut mask = GrayImage::new(image.width(), image.height());
    for (out, (pixel, mean)) in mask
        .pixels_mut()
        .zip(image.pixels().zip(local_mean.pixels()))
    {
        let lit = i32::from(pixel.0[0]) > i32::from(mean.0[0]) - c_value;
        out.0[0] = if lit { FOREGROUND } else { BACKGROUND };
    }
    mask
}
