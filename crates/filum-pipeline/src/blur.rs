//! Gaussian smoothing before thresholding.
//!
//! A small fixed separable Gaussian suppresses the sensor noise that
//! would otherwise punch pinholes through the adaptive threshold. The
//! kernel generator also serves the threshold stage, which needs much
//! wider windows for its local weighted mean.

use image::GrayImage;
use imageproc::filter::separable_filter_equal;

/// Width of the fixed smoothing kernel.
pub const SMOOTHING_KERNEL_WIDTH: u32 = 5;

/// Smooth an image with the fixed 5x5 separable Gaussian.
///
/// Borders replicate the nearest edge pixel, so output dimensions match
/// the input exactly.
#[must_use = "returns the smoothed image"]
pub fn smooth(image: &GrayImage) -> GrayImage {
    separable_filter_equal(image, &gaussian_kernel(SMOOTHING_KERNEL_WIDTH))
}

/// One-dimensional Gaussian kernel of odd `width`, normalized to sum 1.
///
/// Widths up to 7 use the classic binomial tap tables; wider kernels
/// are sampled from a Gaussian with `sigma = 0.3 * ((width - 1)/2 - 1)
/// + 0.8`, the conventional width-derived sigma when no explicit
/// deviation is given. Taps are computed in `f64` and narrowed once at
/// the end.
pub(crate) fn gaussian_kernel(width: u32) -> Vec<f32> {
    debug_assert!(width % 2 == 1, "kernel width must be odd");
    match width {
        0 | 1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![
            0.031_25, 0.109_375, 0.218_75, 0.281_25, 0.218_75, 0.109_375, 0.031_25,
        ],
        _ => sampled_kernel(width),
    }
}

#[allow(clippy::cast_possible_truncation)] // f64 taps narrow to f32 once
fn sampled_kernel(width: u32) -> Vec<f32> {
    let half = f64::from(width - 1) / 2.0;
    let sigma = 0.3_f64.mul_add(half - 1.0, 0.8);
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut taps: Vec<f64> = (0..width)
        .map(|i| {
            let d = f64::from(i) - half;
            (-d * d / two_sigma_sq).exp()
        })
        .collect();
    let sum: f64 = taps.iter().sum();
    for tap in &mut taps {
        *tap /= sum;
    }

    taps.into_iter().map(|tap| tap as f32).collect()
}
