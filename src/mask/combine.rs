//! Combining shapes into a mask.
//!
//! Every combiner writes its shape into the mask according to a
//! [`ChannelOp`] and returns the rectangle it affected, already clamped to
//! the mask. For `Add` and `Replace` the returned rect is the tightest box
//! around the pixels that received non-zero coverage, so callers can use
//! it to grow cached bounds without a rescan. `Subtract` returns the
//! clamped shape box and `Intersect` returns the whole canvas.
//!
//! `Replace` writes exactly like `Add`; clearing the previous selection is
//! the caller's job.

use log::debug;
use ndarray::ArrayView2;

use super::raster::{RasterMask, MASK_MAX};
use crate::error::{MaskError, Result};
use crate::geometry::Rect;

/// How a new shape is merged into the existing selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChannelOp {
    Add,
    Subtract,
    #[default]
    Replace,
    Intersect,
}

/// Sub-scanlines per pixel row when antialiasing shapes.
pub(crate) const AA_SUBSAMPLES: usize = 5;

/// Tracks the tight bounds of written pixels.
#[derive(Default)]
struct Touched {
    rect: Option<Rect>,
}

impl Touched {
    fn include_span(&mut self, y: i32, x1: i32, x2: i32) {
        let span = Rect::from_corners(x1, y, x2, y + 1);
        self.rect = Some(match self.rect {
            Some(r) => r.union(&span),
            None => span,
        });
    }

    fn finish(self, fallback: Rect) -> Rect {
        self.rect.unwrap_or(Rect::new(fallback.x, fallback.y, 0, 0))
    }
}

/// Apply `op` for one shape sample against one mask sample.
#[inline]
fn apply_op(op: ChannelOp, dst: u8, src: u8) -> u8 {
    match op {
        ChannelOp::Add | ChannelOp::Replace => dst.max(src),
        ChannelOp::Subtract => dst.saturating_sub(src),
        ChannelOp::Intersect => dst.min(src),
    }
}

/// Combine an axis-aligned rectangle.
pub fn combine_rect(mask: &mut RasterMask, op: ChannelOp, rect: Rect) -> Rect {
    let clamped = mask.intersect_rect(rect);
    debug!("combine_rect {:?} {:?} -> {:?}", op, rect, clamped);

    match op {
        ChannelOp::Add | ChannelOp::Replace => {
            mask.fill_full(Some(clamped));
            if clamped.is_empty() {
                Rect::new(clamped.x, clamped.y, 0, 0)
            } else {
                clamped
            }
        }
        ChannelOp::Subtract => {
            mask.clear(Some(clamped));
            clamped
        }
        ChannelOp::Intersect => {
            clear_outside(mask, clamped);
            mask.extent()
        }
    }
}

/// Zero every pixel outside `keep`.
fn clear_outside(mask: &mut RasterMask, keep: Rect) {
    if keep.is_empty() {
        mask.clear(None);
        return;
    }

    let width = mask.width();
    let height = mask.height();
    mask.clear(Some(Rect::from_corners(0, 0, width, keep.y)));
    mask.clear(Some(Rect::from_corners(0, keep.y2(), width, height)));
    mask.clear(Some(Rect::from_corners(0, keep.y, keep.x, keep.y2())));
    mask.clear(Some(Rect::from_corners(keep.x2(), keep.y, width, keep.y2())));
}

/// Combine an ellipse inscribed in `rect`.
pub fn combine_ellipse(mask: &mut RasterMask, op: ChannelOp, rect: Rect, antialias: bool) -> Result<Rect> {
    combine_ellipse_rect(
        mask,
        op,
        rect,
        rect.width as f64 / 2.0,
        rect.height as f64 / 2.0,
        antialias,
    )
}

/// Horizontal extent of a rounded rectangle at height `py`.
///
/// The corners are elliptical arcs with radii `(a, b)`; with
/// `a = w / 2, b = h / 2` the shape is a full ellipse.
fn rounded_rect_span(rect: Rect, a: f64, b: f64, py: f64) -> Option<(f64, f64)> {
    let top = rect.y as f64;
    let bottom = rect.y2() as f64;
    if py < top || py > bottom {
        return None;
    }

    let half_w = rect.width as f64 / 2.0;
    let half_h = rect.height as f64 / 2.0;
    let cx = rect.x as f64 + half_w;
    let cy = top + half_h;

    let dy = ((py - cy).abs() - (half_h - b)).max(0.0);
    let ext = if dy <= 0.0 {
        a
    } else if b > 0.0 {
        let t = dy / b;
        if t >= 1.0 {
            return None;
        }
        a * (1.0 - t * t).sqrt()
    } else {
        return None;
    };

    let half_span = (half_w - a) + ext;
    Some((cx - half_span, cx + half_span))
}

/// Spread horizontal coverage of `[xl, xr)` over the pixels of one row.
///
/// `coverage[i]` belongs to pixel `x0 + i`.
pub(crate) fn accumulate_span(coverage: &mut [f32], x0: i32, xl: f64, xr: f64, weight: f32) {
    if xr <= xl || coverage.is_empty() {
        return;
    }
    let first = (xl.floor() as i64).max(x0 as i64);
    let last = (xr.ceil() as i64).min(x0 as i64 + coverage.len() as i64);

    for px in first..last {
        let left = (px as f64).max(xl);
        let right = ((px + 1) as f64).min(xr);
        if right > left {
            coverage[(px - x0 as i64) as usize] += weight * (right - left) as f32;
        }
    }
}

/// Mark pixels whose centre lies inside `[xl, xr)`.
pub(crate) fn fill_span_centres(coverage: &mut [f32], x0: i32, xl: f64, xr: f64) {
    for (i, c) in coverage.iter_mut().enumerate() {
        let centre = (x0 + i as i32) as f64 + 0.5;
        if centre >= xl && centre < xr {
            *c = 1.0;
        }
    }
}

/// Write one row of float coverage into the mask with `op`.
///
/// Returns the inclusive-exclusive x range that received coverage.
pub(crate) fn write_coverage_row(
    mask: &mut RasterMask,
    op: ChannelOp,
    y: i32,
    x0: i32,
    coverage: &[f32],
) -> Option<(i32, i32)> {
    let row = mask.row_mut(y);
    let mut written: Option<(i32, i32)> = None;

    for (i, &c) in coverage.iter().enumerate() {
        let value = (c.clamp(0.0, 1.0) * MASK_MAX as f32).round() as u8;
        if value == 0 {
            continue;
        }
        let x = x0 + i as i32;
        let dst = &mut row[x as usize];
        *dst = apply_op(op, *dst, value);
        written = Some(match written {
            Some((a, _)) => (a, x + 1),
            None => (x, x + 1),
        });
    }

    written
}

/// Combine a rounded rectangle (an ellipse when the corner radii are half
/// the rect size). `Intersect` is not supported here.
pub fn combine_ellipse_rect(
    mask: &mut RasterMask,
    op: ChannelOp,
    rect: Rect,
    corner_a: f64,
    corner_b: f64,
    antialias: bool,
) -> Result<Rect> {
    if op == ChannelOp::Intersect {
        return Err(MaskError::UnsupportedOperation {
            op,
            combiner: "combine_ellipse_rect",
        });
    }

    let clamped = mask.intersect_rect(rect);
    if clamped.is_empty() {
        return Ok(Rect::new(clamped.x, clamped.y, 0, 0));
    }

    let a = corner_a.clamp(0.0, rect.width as f64 / 2.0);
    let b = corner_b.clamp(0.0, rect.height as f64 / 2.0);
    debug!(
        "combine_ellipse_rect {:?} {:?} corners=({:.2}, {:.2}) aa={}",
        op, rect, a, b, antialias
    );

    let mut coverage = vec![0.0f32; clamped.width as usize];
    let mut touched = Touched::default();

    for y in clamped.y..clamped.y2() {
        coverage.fill(0.0);

        if antialias {
            let weight = 1.0 / AA_SUBSAMPLES as f32;
            for s in 0..AA_SUBSAMPLES {
                let py = y as f64 + (s as f64 + 0.5) / AA_SUBSAMPLES as f64;
                if let Some((xl, xr)) = rounded_rect_span(rect, a, b, py) {
                    accumulate_span(&mut coverage, clamped.x, xl, xr, weight);
                }
            }
        } else if let Some((xl, xr)) = rounded_rect_span(rect, a, b, y as f64 + 0.5) {
            fill_span_centres(&mut coverage, clamped.x, xl, xr);
        }

        if let Some((x1, x2)) = write_coverage_row(mask, op, y, clamped.x, &coverage) {
            touched.include_span(y, x1, x2);
        }
    }

    Ok(match op {
        ChannelOp::Subtract => clamped,
        _ => touched.finish(clamped),
    })
}

/// Composite a raw intensity buffer into the mask with its top-left
/// corner at `(offset_x, offset_y)`.
pub fn combine_buffer(
    mask: &mut RasterMask,
    add_on: ArrayView2<u8>,
    op: ChannelOp,
    offset_x: i32,
    offset_y: i32,
) -> Rect {
    let (add_h, add_w) = add_on.dim();
    let footprint = mask.intersect_rect(Rect::new(offset_x, offset_y, add_w as i32, add_h as i32));
    debug!("combine_buffer {:?} at ({}, {}) -> {:?}", op, offset_x, offset_y, footprint);

    if op == ChannelOp::Intersect {
        clear_outside(mask, footprint);
    }
    if footprint.is_empty() {
        return match op {
            ChannelOp::Intersect => mask.extent(),
            _ => Rect::new(footprint.x, footprint.y, 0, 0),
        };
    }

    let mut touched = Touched::default();
    for y in footprint.y..footprint.y2() {
        let src_y = (y - offset_y) as usize;
        let row = mask.row_mut(y);
        let mut span: Option<(i32, i32)> = None;

        for x in footprint.x..footprint.x2() {
            let src = add_on[[src_y, (x - offset_x) as usize]];
            let dst = &mut row[x as usize];
            *dst = apply_op(op, *dst, src);
            if src != 0 {
                span = Some(match span {
                    Some((a, _)) => (a, x + 1),
                    None => (x, x + 1),
                });
            }
        }

        if let Some((x1, x2)) = span {
            touched.include_span(y, x1, x2);
        }
    }

    match op {
        ChannelOp::Add | ChannelOp::Replace => touched.finish(footprint),
        ChannelOp::Subtract => footprint,
        ChannelOp::Intersect => mask.extent(),
    }
}

/// Composite another mask into `mask`.
pub fn combine_mask(
    mask: &mut RasterMask,
    other: &RasterMask,
    op: ChannelOp,
    offset_x: i32,
    offset_y: i32,
) -> Rect {
    combine_buffer(mask, other.view(), op, offset_x, offset_y)
}
