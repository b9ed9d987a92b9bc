//! Interactive region tracing over a candidate mask.
//!
//! [`grow`] flood-fills the 4-connected foreground component under a
//! seed and unions it into the caller's accumulated mask. [`erase`]
//! clears a Euclidean disk. Both take masks by reference and return
//! fresh buffers; the caller owns the accumulated state and threads it
//! between calls.
//!
//! Connectivity is exactly 4-neighbour. Two blobs touching only
//! corner-to-corner are separate components, and growing one never
//! picks up the other.

use std::collections::VecDeque;

use image::{GrayImage, Luma};

use crate::types::{BACKGROUND, Dimensions, FOREGROUND, GrowStatus, PipelineError, SeedPoint};

/// Flood-fill from `seed` over `source` and union the component into
/// `accumulated`.
///
/// The union is a pixel-wise maximum, which makes growing idempotent
/// and order-independent: re-growing a covered component changes
/// nothing, and two seeds inside one component produce the same mask as
/// either alone.
///
/// A seed on a background pixel is not an error; the mask comes back
/// unchanged with [`GrowStatus::SeedNotOnForeground`].
///
/// # Errors
///
/// Returns [`PipelineError::MaskSizeMismatch`] when the masks disagree
/// on dimensions and [`PipelineError::OutOfBounds`] when the seed lies
/// outside them.
pub fn grow(
    source: &GrayImage,
    accumulated: &GrayImage,
    seed: SeedPoint,
) -> Result<(GrayImage, GrowStatus), PipelineError> {
    ensure_same_size(source, accumulated)?;
    ensure_in_bounds(source, seed)?;

    if source.get_pixel(seed.col, seed.row).0[0] != FOREGROUND {
        return Ok((accumulated.clone(), GrowStatus::SeedNotOnForeground));
    }

    let (width, height) = source.dimensions();
    let index = |col: u32, row: u32| (row as usize) * (width as usize) + (col as usize);

    let mut merged = accumulated.clone();
    let mut visited = vec![false; (width as usize) * (height as usize)];
    let mut queue = VecDeque::new();

    visited[index(seed.col, seed.row)] = true;
    queue.push_back((seed.col, seed.row));

    let mut region_pixels = 0_usize;
    let mut added_pixels = 0_usize;

    while let Some((col, row)) = queue.pop_front() {
        region_pixels += 1;
        let target = merged.get_pixel_mut(col, row);
        if target.0[0] != FOREGROUND {
            target.0[0] = FOREGROUND;
            added_pixels += 1;
        }

        for (ncol, nrow) in neighbors4(col, row, width, height) {
            let i = index(ncol, nrow);
            if !visited[i] && source.get_pixel(ncol, nrow).0[0] == FOREGROUND {
                visited[i] = true;
                queue.push_back((ncol, nrow));
            }
        }
    }

    Ok((
        merged,
        GrowStatus::Grown {
            region_pixels,
            added_pixels,
        },
    ))
}

/// Clear a filled disk of `radius` around `point`.
///
/// Every pixel whose centre lies within Euclidean distance `radius` of
/// `point` becomes background; the disk is clipped at mask borders.
/// Erasing is unconditional and does not inspect what the pixels held.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] when `radius` is zero
/// and [`PipelineError::OutOfBounds`] when `point` lies outside the
/// mask.
pub fn erase(
    accumulated: &GrayImage,
    point: SeedPoint,
    radius: u32,
) -> Result<GrayImage, PipelineError> {
    if radius == 0 {
        return Err(PipelineError::InvalidParameter(
            "erase_radius must be at least 1, got 0".to_string(),
        ));
    }
    ensure_in_bounds(accumulated, point)?;

    let (width, height) = accumulated.dimensions();
    let mut cleared = accumulated.clone();

    let r = i64::from(radius);
    let radius_sq = r * r;
    let centre_row = i64::from(point.row);
    let centre_col = i64::from(point.col);

    for drow in -r..=r {
        for dcol in -r..=r {
            if drow * drow + dcol * dcol > radius_sq {
                continue;
            }
            let row = centre_row + drow;
            let col = centre_col + dcol;
            if row < 0 || col < 0 || row >= i64::from(height) || col >= i64::from(width) {
                continue;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            // bounds-checked just above
            cleared.put_pixel(col as u32, row as u32, Luma([BACKGROUND]));
        }
    }

    Ok(cleared)
}

/// The in-bounds 4-neighbours of a pixel: north, south, west, east.
fn neighbors4(col: u32, row: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let mut out = [None; 4];
    if row > 0 {
        out[0] = Some((col, row - 1));
    }
    if row + 1 < height {
        out[1] = Some((col, row + 1));
    }
    if col > 0 {
        out[2] = Some((col - 1, row));
    }
    if col + 1 < width {
        out[3] = Some((col + 1, row));
    }
    out.into_iter().flatten()
}

fn ensure_same_size(source: &GrayImage, accumulated: &GrayImage) -> Result<(), PipelineError> {
    if source.dimensions() != accumulated.dimensions() {
        return Err(PipelineError::MaskSizeMismatch {
            source_mask: Dimensions::of(source),
            accumulated: Dimensions::of(accumulated),
        });
    }
    Ok(())
}

fn ensure_in_bounds(mask: &GrayImage, point: SeedPoint) -> Result<(), PipelineError> {
    if point.row >= mask.height() || point.col >= mask.width() {
        return Err(PipelineError::OutOfBounds {
            row: point.row,
            col: point.col,
            dimensions: Dimensions::of(mask),
        });
    }
    Ok(())
}
