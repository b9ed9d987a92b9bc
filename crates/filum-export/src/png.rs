//! Skeleton raster export.
//!
//! Persisting the exact pixels a measurement was computed from makes a
//! recorded length auditable later: the PNG decodes back to the
//! identical mask.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder};

use crate::ExportError;

/// Encode a mask as a complete 8-bit grayscale PNG file.
///
/// The caller decides where, and whether, the bytes land on disk.
///
/// # Errors
///
/// Returns [`ExportError::PngEncode`] when encoding fails.
pub fn skeleton_png(mask: &GrayImage) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        mask.as_raw(),
        mask.width(),
        mask.height(),
        ExtendedColorType::L8,
    )?;
    Ok(bytes)
}

/// Conventional file name for a persisted skeleton:
/// `<image_id>_skeleton.png`.
#[must_use]
pub fn skeleton_file_name(image_id: &str) -> String {
    format!("{image_id}_skeleton.png")
}
