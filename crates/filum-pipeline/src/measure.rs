//! Calibrated length extraction.
//!
//! The skeleton reduces a traced cell to a one-pixel-wide path, so its
//! pixel count approximates the cell's path length in pixels. Dividing
//! by the calibration factor (pixels per micrometre) converts that to a
//! physical length.

use image::GrayImage;

use crate::types::{FOREGROUND, PipelineError};

/// Count of foreground pixels in a mask.
#[must_use]
pub fn foreground_count(mask: &GrayImage) -> u64 {
    mask.pixels()
        .map(|p| u64::from(u8::from(p.0[0] == FOREGROUND)))
        .sum()
}

/// Convert a skeleton to a physical length.
///
/// Each skeleton pixel contributes `1 / calibration_factor`
/// micrometres. Changing the calibration scales the result exactly
/// inversely; the pixel count itself is untouched.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] when
/// `calibration_factor` is not a positive finite number, and
/// [`PipelineError::EmptyRegion`] when the skeleton holds no foreground
/// pixels. An empty trace has no length; reporting 0.0 would look like
/// a measured cell of zero size.
pub fn measure(skeleton: &GrayImage, calibration_factor: f64) -> Result<f64, PipelineError> {
    if !calibration_factor.is_finite() || calibration_factor <= 0.0 {
        return Err(PipelineError::InvalidParameter(format!(
            "calibration_factor must be a positive finite number, got {calibration_factor}"
        )));
    }

    let pixels = foreground_count(skeleton);
    if pixels == 0 {
        return Err(PipelineError::EmptyRegion);
    }

    #[allow(clippy::cast_precision_loss)] // pixel counts sit far below 2^52
    let length = pixels as f64 / calibration_factor;
    Ok(length)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Luma;

    use super::*;

    fn line_of(pixels: u32) -> GrayImage {
        let mut mask = GrayImage::new(pixels + 4, 5);
        for x in 0..pixels {
            mask.put_pixel(x + 2, 2, Luma([FOREGROUND]));
        }
        mask
    }

    #[test]
    fn counts_only_foreground() {
        let mut mask = line_of(10);
        mask.put_pixel(0, 0, Luma([128]));
        assert_eq!(foreground_count(&mask), 10);
    }

    #[test]
    fn divides_by_the_calibration_factor() {
        let length = measure(&line_of(10), 2.5).unwrap();
        assert!((length - 4.0).abs() < 1e-12);
    }

    #[test]
    fn unit_calibration_returns_the_pixel_count() {
        let length = measure(&line_of(153), 1.0).unwrap();
        assert!((length - 153.0).abs() < 1e-12);
    }

    #[test]
    fn calibration_scales_inversely() {
        let at_one = measure(&line_of(90), 1.0).unwrap();
        let at_three = measure(&line_of(90), 3.0).unwrap();
        assert!((at_one / at_three - 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_skeleton_is_an_error() {
        let empty = GrayImage::new(12, 12);
        let result = measure(&empty, 3.06);
        assert!(matches!(result, Err(PipelineError::EmptyRegion)));
    }

    #[test]
    fn bad_calibration_is_rejected() {
        for bad in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let result = measure(&line_of(5), bad);
            assert!(
                matches!(result, Err(PipelineError::InvalidParameter(_))),
                "accepted {bad}"
            );
        }
    }
}
