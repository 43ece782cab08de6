//! Morphology kernels for selection masks: grow, shrink, border, feather,
//! threshold and invert.
//!
//! The kernels work in place on a [`RasterMask`] and only rewrite the
//! given working rectangle. They read from a snapshot of the mask, so the
//! result never depends on the order rows are processed in. Rows are
//! processed in parallel with Rayon.
//!
//! ## Structuring element
//!
//! Grow, shrink and border use an elliptical disk with radii `(rx, ry)`:
//! at row offset `dy` the disk spans `round(rx * sqrt(1 - (dy / ry)^2))`
//! pixels to each side. Each output row is built from `2 * ry + 1`
//! sliding-window passes, so the cost is O(pixels * ry) independent of `rx`.

use std::collections::VecDeque;

use log::trace;
use rayon::prelude::*;

use super::raster::{RasterMask, MASK_HALF, MASK_MAX};
use crate::geometry::Rect;

/// Half-width of the elliptical structuring element at row offset `dy`.
fn disk_half_width(rx: i32, ry: i32, dy: i32) -> i32 {
    let rx = rx.max(0);
    if ry <= 0 {
        return rx;
    }
    let t = dy as f64 / ry as f64;
    (rx as f64 * (1.0 - t * t).max(0.0).sqrt()).round() as i32
}

/// Half-widths of the elliptical structuring element, indexed by `dy + ry`.
pub fn disk_half_widths(rx: i32, ry: i32) -> Vec<i32> {
    let ry = ry.max(0);
    (-ry..=ry).map(|dy| disk_half_width(rx, ry, dy)).collect()
}

// ============================================================================
// Sliding window
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum Extreme {
    Max,
    Min,
}

/// Running max or min of `row` over windows `[x - k, x + k]` (clipped to
/// the row) for every `x` in `x_start..x_end`. Monotonic deque, O(n).
fn sliding_extreme(row: &[u8], k: usize, x_start: usize, x_end: usize, which: Extreme, out: &mut [u8]) {
    let w = row.len();
    let mut window: VecDeque<usize> = VecDeque::with_capacity(2 * k + 1);
    let mut next = x_start.saturating_sub(k);

    for x in x_start..x_end {
        let right = (x + k).min(w - 1);
        while next <= right {
            let v = row[next];
            while let Some(&back) = window.back() {
                let dominated = match which {
                    Extreme::Max => v >= row[back],
                    Extreme::Min => v <= row[back],
                };
                if dominated {
                    window.pop_back();
                } else {
                    break;
                }
            }
            window.push_back(next);
            next += 1;
        }

        let left = x.saturating_sub(k);
        while window.front().is_some_and(|&f| f < left) {
            window.pop_front();
        }

        out[x - x_start] = window.front().map_or(0, |&i| row[i]);
    }
}

/// Shared driver for grow and shrink over `region`.
///
/// With `Extreme::Min`, `edge_lock == false` treats everything beyond the
/// canvas as unselected; `edge_lock == true` ignores it.
fn morph_rows(src: &RasterMask, region: Rect, rx: i32, ry: i32, which: Extreme, edge_lock: bool) -> Vec<u8> {
    let ry = ry.max(0);
    let width = src.width();
    let height = src.height();
    // Rows further away than the canvas height are off-canvas for every y,
    // and a window wider than the canvas already spans every row.
    let reach = ry.min(height);
    let rw = region.width as usize;
    let init = match which {
        Extreme::Max => 0u8,
        Extreme::Min => MASK_MAX,
    };

    let mut output = vec![init; region.area()];
    output.par_chunks_mut(rw).enumerate().for_each(|(i, out_row)| {
        let y = region.y + i as i32;
        let mut scratch = vec![0u8; rw];

        for dy in -reach..=reach {
            let sy = y + dy;
            let k = disk_half_width(rx, ry, dy).min(width);

            if sy < 0 || sy >= height {
                if which == Extreme::Min && !edge_lock {
                    out_row.fill(0);
                    return;
                }
                continue;
            }

            sliding_extreme(
                src.row(sy),
                k as usize,
                region.x as usize,
                region.x2() as usize,
                which,
                &mut scratch,
            );

            for (j, (o, &s)) in out_row.iter_mut().zip(scratch.iter()).enumerate() {
                let x = region.x + j as i32;
                *o = match which {
                    Extreme::Max => (*o).max(s),
                    Extreme::Min if !edge_lock && (x - k < 0 || x + k >= width) => 0,
                    Extreme::Min => (*o).min(s),
                };
            }
        }
    });

    output
}

fn write_region(mask: &mut RasterMask, region: Rect, data: &[u8]) {
    let rw = region.width as usize;
    let x1 = region.x as usize;
    for (i, chunk) in data.chunks_exact(rw).enumerate() {
        mask.row_mut(region.y + i as i32)[x1..x1 + rw].copy_from_slice(chunk);
    }
}

// ============================================================================
// Grow / Shrink / Border
// ============================================================================

/// Dilate the mask inside `region` by `(rx, ry)`. Pixels outside the
/// canvas never contribute.
pub fn grow_region(mask: &mut RasterMask, region: Rect, rx: i32, ry: i32) {
    let region = mask.intersect_rect(region);
    if region.is_empty() {
        return;
    }
    trace!("grow_region {:?} r=({}, {})", region, rx, ry);

    let out = morph_rows(mask, region, rx, ry, Extreme::Max, false);
    write_region(mask, region, &out);
}

/// Erode the mask inside `region` by `(rx, ry)`.
pub fn shrink_region(mask: &mut RasterMask, region: Rect, rx: i32, ry: i32, edge_lock: bool) {
    let region = mask.intersect_rect(region);
    if region.is_empty() {
        return;
    }
    trace!("shrink_region {:?} r=({}, {}) edge_lock={}", region, rx, ry, edge_lock);

    let out = morph_rows(mask, region, rx, ry, Extreme::Min, edge_lock);
    write_region(mask, region, &out);
}

/// Replace the mask inside `region` with the ring between its grown and
/// shrunk versions. With `feather` the ring is blurred afterwards using
/// the same radii.
pub fn border_region(mask: &mut RasterMask, region: Rect, rx: i32, ry: i32, feather: bool, edge_lock: bool) {
    let region = mask.intersect_rect(region);
    if region.is_empty() {
        return;
    }
    trace!(
        "border_region {:?} r=({}, {}) feather={} edge_lock={}",
        region,
        rx,
        ry,
        feather,
        edge_lock
    );

    let grown = morph_rows(mask, region, rx, ry, Extreme::Max, false);
    let shrunk = morph_rows(mask, region, rx, ry, Extreme::Min, edge_lock);
    let ring: Vec<u8> = grown
        .iter()
        .zip(shrunk.iter())
        .map(|(&g, &s)| g.saturating_sub(s))
        .collect();
    write_region(mask, region, &ring);

    if feather {
        feather_mask(mask, rx as f64, ry as f64);
    }
}

// ============================================================================
// Feather
// ============================================================================

/// Feather radii map to a Gaussian standard deviation of `radius / 3.5`.
pub const FEATHER_SIGMA_DIVISOR: f64 = 3.5;

/// Generate a normalized 1D Gaussian kernel covering 3 sigma each side.
/// A non-finite or non-positive sigma gives the identity kernel.
pub fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return vec![1.0];
    }

    // Kernel size = 6 sigma (covers 99.7% of distribution), ensure odd
    let kernel_size = ((sigma * 6.0).ceil() as usize) | 1;
    let half = kernel_size / 2;

    let mut kernel: Vec<f32> = (0..kernel_size)
        .map(|i| {
            let x = i as f32 - half as f32;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }

    kernel
}

/// `radius / 3.5`, at most `extent`. NaN stays NaN.
fn feather_sigma(radius: f64, extent: i32) -> f32 {
    let sigma = radius / FEATHER_SIGMA_DIVISOR;
    if sigma > extent as f64 {
        extent as f32
    } else {
        sigma as f32
    }
}

/// Separable Gaussian blur of the whole mask with standard deviation
/// `radius / 3.5` per axis. Canvas edges are clamped. Non-positive radii
/// leave that axis untouched. Sigma is capped at the canvas size on each
/// axis, past which the blur is already flat across the canvas.
pub fn feather_mask(mask: &mut RasterMask, radius_x: f64, radius_y: f64) {
    let kx = gaussian_kernel_1d(feather_sigma(radius_x, mask.width()));
    let ky = gaussian_kernel_1d(feather_sigma(radius_y, mask.height()));
    if kx.len() == 1 && ky.len() == 1 {
        return;
    }
    trace!("feather_mask kernels x={} y={}", kx.len(), ky.len());

    let width = mask.width() as usize;
    let height = mask.height() as usize;
    let half_x = (kx.len() / 2) as isize;
    let half_y = (ky.len() / 2) as isize;

    // Horizontal pass
    let src = mask.as_slice();
    let mut temp = vec![0.0f32; width * height];
    temp.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let src_row = &src[y * width..(y + 1) * width];
        for (x, out) in row.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for (ki, &kv) in kx.iter().enumerate() {
                let sx = (x as isize + ki as isize - half_x).clamp(0, width as isize - 1) as usize;
                sum += src_row[sx] as f32 * kv;
            }
            *out = sum;
        }
    });

    // Vertical pass
    let dst = mask.as_slice_mut();
    dst.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, out) in row.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for (ki, &kv) in ky.iter().enumerate() {
                let sy = (y as isize + ki as isize - half_y).clamp(0, height as isize - 1) as usize;
                sum += temp[sy * width + x] * kv;
            }
            *out = sum.round().clamp(0.0, 255.0) as u8;
        }
    });
}

// ============================================================================
// Threshold / Invert
// ============================================================================

/// Hard threshold: `v >= level` becomes fully selected, the rest 0.
pub fn threshold(mask: &mut RasterMask, level: u8) {
    mask.as_slice_mut()
        .par_iter_mut()
        .for_each(|v| *v = if *v >= level { MASK_MAX } else { 0 });
}

/// Threshold at half intensity, dropping all partial selection.
pub fn sharpen(mask: &mut RasterMask) {
    threshold(mask, MASK_HALF);
}

/// `v -> MASK_MAX - v` for every pixel.
pub fn invert(mask: &mut RasterMask) {
    mask.as_slice_mut().par_iter_mut().for_each(|v| *v = MASK_MAX - *v);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_mask(w: i32, h: i32, rect: Rect) -> RasterMask {
        let mut mask = RasterMask::new(w, h).unwrap();
        mask.fill_full(Some(rect));
        mask
    }

    #[test]
    fn test_disk_half_widths() {
        assert_eq!(disk_half_widths(3, 3), vec![0, 2, 3, 3, 3, 2, 0]);
        assert_eq!(disk_half_widths(4, 0), vec![4]);
        assert_eq!(disk_half_widths(0, 2), vec![0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_sliding_extreme_matches_naive() {
        let row = [3u8, 9, 1, 7, 7, 0, 5, 2];
        let mut out = [0u8; 8];
        sliding_extreme(&row, 2, 0, 8, Extreme::Max, &mut out);
        for x in 0..8usize {
            let lo = x.saturating_sub(2);
            let hi = (x + 2).min(7);
            assert_eq!(out[x], *row[lo..=hi].iter().max().unwrap());
        }
        sliding_extreme(&row, 1, 2, 6, Extreme::Min, &mut out[..4]);
        assert_eq!(&out[..4], &[1, 1, 0, 0]);
    }

    #[test]
    fn test_grow_single_pixel_is_diamond_like_disk() {
        let mut mask = rect_mask(9, 9, Rect::new(4, 4, 1, 1));
        let extent = mask.extent();
        grow_region(&mut mask, extent, 2, 2);
        // r=2 disk half-widths are [0, 2, 2, 2, 0]
        assert_eq!(mask.get(4, 2), MASK_MAX);
        assert_eq!(mask.get(3, 2), 0);
        assert_eq!(mask.get(2, 3), MASK_MAX);
        assert_eq!(mask.get(6, 5), MASK_MAX);
        assert_eq!(mask.nonzero_bounds(), Some(Rect::new(2, 2, 5, 5)));
    }

    #[test]
    fn test_shrink_edge_lock_keeps_canvas_edge() {
        let mut locked = rect_mask(10, 10, Rect::new(0, 0, 10, 10));
        let extent = locked.extent();
        shrink_region(&mut locked, extent, 2, 2, true);
        assert_eq!(locked.nonzero_bounds(), Some(Rect::new(0, 0, 10, 10)));

        let mut open = rect_mask(10, 10, Rect::new(0, 0, 10, 10));
        let extent = open.extent();
        shrink_region(&mut open, extent, 2, 2, false);
        assert_eq!(open.nonzero_bounds(), Some(Rect::new(2, 2, 6, 6)));
    }

    #[test]
    fn test_shrink_removes_thin_lines() {
        let mut mask = rect_mask(20, 20, Rect::new(5, 5, 10, 2));
        let extent = mask.extent();
        shrink_region(&mut mask, extent, 2, 2, false);
        assert!(mask.is_all_zero());
    }

    #[test]
    fn test_border_is_ring() {
        let mut mask = rect_mask(30, 30, Rect::new(10, 10, 10, 10));
        let extent = mask.extent();
        border_region(&mut mask, extent, 2, 2, false, false);
        assert_eq!(mask.get(15, 15), 0);
        assert_eq!(mask.get(10, 15), MASK_MAX);
        assert_eq!(mask.get(8, 15), MASK_MAX);
        assert_eq!(mask.get(7, 15), 0);
        assert_eq!(mask.get(12, 15), 0);
    }

    #[test]
    fn test_feather_softens_edges() {
        let mut mask = rect_mask(40, 40, Rect::new(10, 10, 20, 20));
        feather_mask(&mut mask, 7.0, 7.0);
        assert_eq!(mask.get(20, 20), MASK_MAX);
        assert_eq!(mask.get(0, 0), 0);
        let edge = mask.get(10, 20);
        assert!(edge > 64 && edge < 192, "edge value {}", edge);
    }

    #[test]
    fn test_feather_zero_radius_is_identity() {
        let mut mask = rect_mask(8, 8, Rect::new(1, 1, 3, 3));
        let before = mask.clone();
        feather_mask(&mut mask, 0.0, -2.0);
        assert_eq!(mask, before);
    }

    #[test]
    fn test_huge_radii_are_bounded_by_canvas() {
        let mut grown = rect_mask(20, 20, Rect::new(5, 5, 2, 2));
        let extent = grown.extent();
        grow_region(&mut grown, extent, i32::MAX, 0);
        assert_eq!(grown.nonzero_bounds(), Some(Rect::new(0, 5, 20, 2)));

        let mut locked = rect_mask(20, 20, Rect::new(0, 0, 20, 20));
        let extent = locked.extent();
        shrink_region(&mut locked, extent, 0, i32::MAX, true);
        assert!(locked.as_slice().iter().all(|&v| v == MASK_MAX));

        let mut open = rect_mask(20, 20, Rect::new(0, 0, 20, 20));
        let extent = open.extent();
        shrink_region(&mut open, extent, i32::MAX, i32::MAX, false);
        assert!(open.is_all_zero());
    }

    #[test]
    fn test_huge_feather_stays_within_canvas() {
        let mut mask = rect_mask(20, 20, Rect::new(5, 5, 2, 2));
        feather_mask(&mut mask, 1e12, 0.0);
        assert!(mask.row(5).iter().all(|&v| v > 0));
        assert!(mask.row(0).iter().all(|&v| v == 0));

        let mut nan = rect_mask(8, 8, Rect::new(1, 1, 3, 3));
        let before = nan.clone();
        feather_mask(&mut nan, f64::NAN, f64::NAN);
        assert_eq!(nan, before);
        assert_eq!(gaussian_kernel_1d(f32::INFINITY), vec![1.0]);
    }

    #[test]
    fn test_sharpen_threshold() {
        let mut mask = RasterMask::from_vec(4, 1, vec![0, 127, 128, 255]).unwrap();
        sharpen(&mut mask);
        assert_eq!(mask.as_slice(), &[0, 0, 255, 255]);
    }

    #[test]
    fn test_invert_pixels() {
        let mut mask = RasterMask::from_vec(3, 1, vec![0, 100, 255]).unwrap();
        invert(&mut mask);
        assert_eq!(mask.as_slice(), &[255, 155, 0]);
    }
}
