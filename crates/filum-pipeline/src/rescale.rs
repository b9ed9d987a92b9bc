//! Contrast stretch to the full intensity range.
//!
//! Microscopy captures vary in exposure; stretching every image so its
//! darkest pixel sits at 0 and its brightest at 255 keeps the adaptive
//! threshold's offset meaningful across the dataset.
//!
//! ```text
//! out = round((v - min) * 255 / (max - min))
//! ```
//!
//! A flat image (`max == min`) maps to all zeros rather than dividing
//! by zero; a later threshold then sees pure background, which is the
//! useful answer for a featureless frame.

use image::GrayImage;

/// Stretch pixel intensities so the observed minimum maps to 0 and the
/// observed maximum to 255.
///
/// Intermediate values remap linearly with round-to-nearest through a
/// 256-entry lookup table, so identical inputs produce identical
/// outputs on every platform. Zero-sized images pass through.
#[must_use = "returns the rescaled image"]
pub fn stretch_contrast(image: &GrayImage) -> GrayImage {
    let Some((min, max)) = intensity_range(image) else {
        return image.clone();
    };

    if min == max {
        // Flat frame: collapse to background.
        return GrayImage::new(image.width(), image.height());
    }

    let span = f64::from(max - min);
    let mut lut = [0_u8; 256];
    for value in u16::from(min)..=u16::from(max) {
        let scaled = f64::from(value - u16::from(min)) * 255.0 / span;
        // The rounded value always lands in 0..=255.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mapped = scaled.round() as u8;
        lut[usize::from(value)] = mapped;
    }

    let mut stretched = image.clone();
    for pixel in stretched.pixels_mut() {
        pixel.0[0] = lut[usize::from(pixel.0[0])];
    }
    stretched
}

/// Minimum and maximum intensity over the image, or `None` when the
/// image has no pixels.
pub(crate) fn intensity_range(image: &GrayImage) -> Option<(u8, u8)> {
    let mut values = image.pixels().map(|p| p.0[0]);
    let first = values.next()?;
    let (mut min, mut max) = (first, first);
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    Some((min, max))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Luma;

    use super::*;

    #[test]
    fn flat_image_collapses_to_zeros() {
        let image = GrayImage::from_pixel(6, 4, Luma([137]));
        let stretched = stretch_contrast(&image);
        assert!(stretched.pixels().all(|p| p.0[0] == 0));
        assert_eq!(stretched.dimensions(), (6, 4));
    }

    #[test]
    fn full_range_input_is_unchanged() {
        // With 0 and 255 both present the mapping is the identity.
        let image = GrayImage::from_fn(16, 16, |x, y| Luma([(x * 17 + y) as u8]));
        assert!(intensity_range(&image).unwrap().0 == 0);
        assert_eq!(intensity_range(&image).unwrap().1, 255);
        assert_eq!(stretch_contrast(&image), image);
    }

    #[test]
    fn extremes_map_to_extremes() {
        let mut image = GrayImage::from_pixel(4, 4, Luma([90]));
        image.put_pixel(0, 0, Luma([50]));
        image.put_pixel(3, 3, Luma([150]));
        let stretched = stretch_contrast(&image);
        assert_eq!(stretched.get_pixel(0, 0).0[0], 0);
        assert_eq!(stretched.get_pixel(3, 3).0[0], 255);
        // (90 - 50) * 255 / 100 = 102.
        assert_eq!(stretched.get_pixel(1, 1).0[0], 102);
    }

    #[test]
    fn midpoint_rounds_to_nearest() {
        let mut image = GrayImage::from_pixel(3, 1, Luma([100]));
        image.put_pixel(0, 0, Luma([50]));
        image.put_pixel(2, 0, Luma([150]));
        // (100 - 50) * 255 / 100 = 127.5, rounded away from zero.
        assert_eq!(stretch_contrast(&image).get_pixel(1, 0).0[0], 128);
    }

    #[test]
    fn ordering_is_preserved() {
        let image = GrayImage::from_fn(8, 1, |x, _| Luma([40 + (x as u8) * 9]));
        let stretched = stretch_contrast(&image);
        for x in 1..8 {
            assert!(
                stretched.get_pixel(x, 0).0[0] > stretched.get_pixel(x - 1, 0).0[0],
                "stretch must be monotonic"
            );
        }
    }

    #[test]
    fn intensity_range_of_empty_image_is_none() {
        let image = GrayImage::new(0, 0);
        assert!(intensity_range(&image).is_none());
        assert_eq!(stretch_contrast(&image).dimensions(), (0, 0));
    }
}
