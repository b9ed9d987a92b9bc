//! Gap closing on the candidate mask.
//!
//! Thresholding a noisy frame leaves pinholes and hairline breaks along
//! cell bodies. A morphological closing (dilation then erosion) with a
//! square structuring element seals gaps narrower than the kernel
//! without inflating the region outline.

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology::close;

/// Close gaps with a square kernel of side `kernel_size`, repeated
/// `iterations` times.
///
/// Each iteration is a full closing applied to the previous iteration's
/// output. The `LInf` norm makes the structuring element square: radius
/// `k` covers `(2k + 1) x (2k + 1)` pixels, so side `kernel_size` means
/// `k = (kernel_size - 1) / 2`.
///
/// Callers are expected to have validated `kernel_size` (odd, in
/// `3..=255`) and `iterations` (at least 1); see
/// [`PipelineConfig::validate`](crate::PipelineConfig::validate).
#[must_use = "returns the closed mask"]
pub fn close_gaps(mask: &GrayImage, kernel_size: u32, iterations: u32) -> GrayImage {
    #[allow(clippy::cast_possible_truncation)] // validated sides cap the radius at 127
    let radius = ((kernel_size - 1) / 2) as u8;

    let mut closed = mask.clone();
    for _ in 0..iterations {
        closed = close(&closed, Norm::LInf, radius);
    }
    closed
}
