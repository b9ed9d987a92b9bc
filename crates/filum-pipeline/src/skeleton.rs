//! Topological thinning to a one-pixel skeleton.
//!
//! Implements the classic two-subiteration thinning scheme. Each pass
//! scans the interior of the current mask, collects every deletable
//! pixel, then removes them all at once; deleting mid-scan would make
//! the result depend on scan order and can sever thin structures.
//! Passes repeat until one removes nothing, which happens within a
//! bounded number of passes because every earlier pass removes at least
//! one pixel.
//!
//! Neighbours are indexed clockwise from north:
//!
//! ```text
//! n7 n0 n1        NW N NE
//! n6  .  n2   =    W .  E
//! n5 n4 n3        SW S SE
//! ```
//!
//! A pixel is deletable when it sits on a region boundary (2 to 6
//! foreground neighbours), its neighbourhood is locally continuous
//! (exactly one 0-to-1 transition around the ring), and the directional
//! products for the running subiteration vanish. The first subiteration
//! eats from the south-east, the second from the north-west, which is
//! what keeps the final line centred.

use image::{GrayImage, Luma};

use crate::types::{BACKGROUND, FOREGROUND};

/// Thin a mask to its one-pixel-wide skeleton.
///
/// Connectivity of every foreground component is preserved; area is
/// not. Pixels on the array border are never candidates (they lack a
/// full 8-neighbourhood), so a mask running into the border keeps its
/// rim. An empty mask thins to an empty skeleton, and a skeleton is a
/// fixed point: thinning it again changes nothing.
#[must_use = "returns the skeleton mask"]
pub fn skeletonize(mask: &GrayImage) -> GrayImage {
    thin(mask).skeleton
}

/// Thinning output with pass statistics for diagnostics.
///
/// `passes` counts the full passes that deleted at least one pixel; the
/// terminating no-op sweep is excluded, so an already-thin input
/// reports zero.
pub(crate) struct Thinning {
    pub skeleton: GrayImage,
    pub passes: usize,
}

pub(crate) fn thin(mask: &GrayImage) -> Thinning {
    let (width, height) = mask.dimensions();
    let w = width as usize;
    let h = height as usize;

    // Work on a {0, 1} copy; anything not FOREGROUND counts as background.
    let mut grid: Vec<u8> = mask
        .pixels()
        .map(|p| u8::from(p.0[0] == FOREGROUND))
        .collect();

    let mut passes = 0_usize;
    let mut candidates = Vec::new();

    if w >= 3 && h >= 3 {
        loop {
            let removed = subiteration(&mut grid, w, h, Phase::First, &mut candidates)
                + subiteration(&mut grid, w, h, Phase::Second, &mut candidates);
            if removed == 0 {
                break;
            }
            passes += 1;
        }
    }

    let skeleton = GrayImage::from_fn(width, height, |x, y| {
        let lit = grid[(y as usize) * w + (x as usize)] == 1;
        Luma([if lit { FOREGROUND } else { BACKGROUND }])
    });

    Thinning { skeleton, passes }
}

/// Which directional products apply.
#[derive(Clone, Copy)]
enum Phase {
    First,
    Second,
}

/// One subiteration: scan the frozen grid for deletable interior
/// pixels, then clear them together. Returns how many were cleared.
fn subiteration(
    grid: &mut [u8],
    w: usize,
    h: usize,
    phase: Phase,
    candidates: &mut Vec<usize>,
) -> usize {
    for row in 1..h - 1 {
        for col in 1..w - 1 {
            let idx = row * w + col;
            if grid[idx] == 0 {
                continue;
            }

            let n = neighborhood(grid, w, idx);
            let count: u8 = n.iter().sum();
            if !(2..=6).contains(&count) {
                continue;
            }
            if transitions(&n) != 1 {
                continue;
            }

            // n = [N, NE, E, SE, S, SW, W, NW]
            let (first, second) = match phase {
                Phase::First => (n[0] * n[2] * n[4], n[2] * n[4] * n[6]),
                Phase::Second => (n[0] * n[2] * n[6], n[0] * n[4] * n[6]),
            };
            if first == 0 && second == 0 {
                candidates.push(idx);
            }
        }
    }

    let removed = candidates.len();
    for idx in candidates.drain(..) {
        grid[idx] = 0;
    }
    removed
}

/// The 8-neighbourhood of interior pixel `idx`, clockwise from north.
fn neighborhood(grid: &[u8], w: usize, idx: usize) -> [u8; 8] {
    [
        grid[idx - w],     // N
        grid[idx - w + 1], // NE
        grid[idx + 1],     // E
        grid[idx + w + 1], // SE
        grid[idx + w],     // S
        grid[idx + w - 1], // SW
        grid[idx - 1],     // W
        grid[idx - w - 1], // NW
    ]
}

/// Number of 0-to-1 transitions around the cyclic neighbour ring.
fn transitions(n: &[u8; 8]) -> u8 {
    let mut count = 0;
    for i in 0..8 {
        if n[i] == 0 && n[(i + 1) % 8] == 1 {
            count += 1;
        }
    }
    count
}
