//! Image decoding and luminance reduction.
//!
//! The pipeline operates on single-channel 8-bit images. Colour input
//! collapses to grayscale with the Rec. 601 luma weights
//! `0.299 R + 0.587 G + 0.114 B`, computed in integer arithmetic so the
//! reduction is bit-for-bit reproducible across platforms.

use image::{DynamicImage, GrayImage, Luma};

use crate::types::PipelineError;

/// Decode raw image bytes into a [`DynamicImage`].
///
/// The supported formats are whatever the `image` crate is built with;
/// this workspace enables PNG, JPEG, and TIFF.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] when `bytes` is empty and
/// [`PipelineError::ImageDecode`] when the data cannot be decoded.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Collapse a decoded image to single-channel grayscale.
///
/// Already-gray input passes through with at most a bit-depth
/// conversion. Colour input is reduced channel-wise with integer
/// Rec. 601 weights, rounding half up, ignoring any alpha channel.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLumaA16(_) => image.to_luma8(),
        _ => {
            let rgb = image.to_rgb8();
            GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let [r, g, b] = rgb.get_pixel(x, y).0;
                Luma([luma601(r, g, b)])
            })
        }
    }
}

/// Integer Rec. 601 luma: `(299 R + 587 G + 114 B + 500) / 1000`.
#[allow(clippy::cast_possible_truncation)] // quotient is at most 255
const fn luma601(r: u8, g: u8, b: u8) -> u8 {
    let weighted = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
    ((weighted + 500) / 1000) as u8
}
