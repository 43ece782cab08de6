//! Polygon scan conversion into a mask.
//!
//! Closed polygons are filled with the even-odd rule. With antialiasing,
//! every pixel row is sampled on several sub-scanlines and horizontal
//! coverage is computed exactly from the span ends.

use log::debug;

use super::combine::{accumulate_span, fill_span_centres, write_coverage_row, ChannelOp, AA_SUBSAMPLES};
use super::raster::RasterMask;
use crate::error::{MaskError, Result};
use crate::geometry::Rect;

/// Sorted x positions where the polygon's edges cross the line `y = py`.
fn crossings(points: &[(f64, f64)], py: f64, out: &mut Vec<f64>) {
    out.clear();
    let n = points.len();
    for i in 0..n {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % n];
        if (y0 <= py && py < y1) || (y1 <= py && py < y0) {
            let t = (py - y0) / (y1 - y0);
            out.push(x0 + t * (x1 - x0));
        }
    }
    out.sort_by(|a, b| a.total_cmp(b));
}

fn polygon_box(points: &[(f64, f64)]) -> Rect {
    let (mut x1, mut y1) = (f64::MAX, f64::MAX);
    let (mut x2, mut y2) = (f64::MIN, f64::MIN);
    for &(x, y) in points {
        x1 = x1.min(x);
        y1 = y1.min(y);
        x2 = x2.max(x);
        y2 = y2.max(y);
    }
    Rect::from_corners(
        x1.floor() as i32,
        y1.floor() as i32,
        x2.ceil() as i32,
        y2.ceil() as i32,
    )
}

/// Fill a closed polygon into `mask` with `op`.
///
/// Returns the affected rect with the same conventions as the other
/// combiners. `Intersect` is not supported.
pub fn combine_polygon(
    mask: &mut RasterMask,
    op: ChannelOp,
    points: &[(f64, f64)],
    antialias: bool,
) -> Result<Rect> {
    if points.len() < 3 {
        return Err(MaskError::InvalidPolygon(points.len()));
    }
    if op == ChannelOp::Intersect {
        return Err(MaskError::UnsupportedOperation {
            op,
            combiner: "combine_polygon",
        });
    }

    let clamped = mask.intersect_rect(polygon_box(points));
    debug!("combine_polygon {:?} n={} box={:?} aa={}", op, points.len(), clamped, antialias);
    if clamped.is_empty() {
        return Ok(clamped);
    }

    let mut coverage = vec![0.0f32; clamped.width as usize];
    let mut xs = Vec::new();
    let mut touched: Option<Rect> = None;

    for y in clamped.y..clamped.y2() {
        coverage.fill(0.0);

        if antialias {
            let weight = 1.0 / AA_SUBSAMPLES as f32;
            for s in 0..AA_SUBSAMPLES {
                let py = y as f64 + (s as f64 + 0.5) / AA_SUBSAMPLES as f64;
                crossings(points, py, &mut xs);
                for pair in xs.chunks_exact(2) {
                    accumulate_span(&mut coverage, clamped.x, pair[0], pair[1], weight);
                }
            }
        } else {
            crossings(points, y as f64 + 0.5, &mut xs);
            for pair in xs.chunks_exact(2) {
                fill_span_centres(&mut coverage, clamped.x, pair[0], pair[1]);
            }
        }

        if let Some((x1, x2)) = write_coverage_row(mask, op, y, clamped.x, &coverage) {
            let span = Rect::from_corners(x1, y, x2, y + 1);
            touched = Some(touched.map_or(span, |r| r.union(&span)));
        }
    }

    Ok(match op {
        ChannelOp::Subtract => clamped,
        _ => touched.unwrap_or(Rect::new(clamped.x, clamped.y, 0, 0)),
    })
}
