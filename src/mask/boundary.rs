//! Boundary tracing for marching-ants rendering and stroking.
//!
//! Boundaries run along the pixel grid lines between an inside pixel
//! (intensity `>= MASK_HALF`) and an outside one. Each segment is oriented
//! so the inside lies on its right in y-down coordinates:
//!
//! - top edges of a selected run go +x
//! - right edges go +y
//! - bottom edges go -x
//! - left edges go -y
//!
//! Unit edges are merged into maximal straight runs and chained into
//! closed loops. Every loop is stored contiguously in the output, so the
//! end point of a segment is the start point of the next one and the last
//! segment of a loop ends where its first one starts.

use std::collections::HashMap;

use log::trace;

use super::bounds::BoundsCache;
use super::raster::{RasterMask, MASK_HALF};
use crate::geometry::Rect;

/// Whether a segment is a real selection edge or a stand-in where the
/// traced rectangle cut through selected pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    #[default]
    Edge,
    Clip,
}

/// One straight, axis-aligned boundary segment in grid coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Segment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub kind: SegmentKind,
}

impl Segment {
    pub fn start(&self) -> (i32, i32) {
        (self.x1, self.y1)
    }

    pub fn end(&self) -> (i32, i32) {
        (self.x2, self.y2)
    }

    /// Unit direction, one of the four axis directions.
    fn direction(&self) -> (i32, i32) {
        ((self.x2 - self.x1).signum(), (self.y2 - self.y1).signum())
    }

    pub fn length(&self) -> i32 {
        (self.x2 - self.x1).abs() + (self.y2 - self.y1).abs()
    }
}

/// How pixels outside the traced rectangle are treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryPolicy {
    /// Outside pixels are unselected; every segment is an [`SegmentKind::Edge`].
    WithinBounds,
    /// The contour is still closed along the rectangle, but segments where
    /// the selection actually continues past it are marked
    /// [`SegmentKind::Clip`]. Pixels beyond the canvas are always outside.
    IgnoreBounds,
}

// ============================================================================
// Tracing
// ============================================================================

struct Tracer<'a> {
    mask: &'a RasterMask,
    rect: Rect,
    policy: BoundaryPolicy,
}

impl Tracer<'_> {
    #[inline]
    fn inside(&self, x: i32, y: i32) -> bool {
        self.rect.contains(x, y) && self.mask.get(x, y) >= MASK_HALF
    }

    /// The real pixel on the far side of the traced rectangle, ignoring
    /// the rectangle but not the canvas.
    #[inline]
    fn continues(&self, x: i32, y: i32) -> bool {
        self.mask.sample(x, y) >= MASK_HALF
    }

    fn kind(&self, clipped: bool) -> SegmentKind {
        if clipped && self.policy == BoundaryPolicy::IgnoreBounds {
            SegmentKind::Clip
        } else {
            SegmentKind::Edge
        }
    }

    /// Maximal horizontal runs on grid line `y`.
    fn horizontal_runs(&self, y: i32, out: &mut Vec<Segment>) {
        let on_top = y == self.rect.y;
        let on_bottom = y == self.rect.y2();
        let mut open: Option<Segment> = None;

        for x in self.rect.x..=self.rect.x2() {
            let edge = if x < self.rect.x2() {
                let above = self.inside(x, y - 1);
                let below = self.inside(x, y);
                if below && !above {
                    let clipped = on_top && self.continues(x, y - 1);
                    Some(Segment { x1: x, y1: y, x2: x + 1, y2: y, kind: self.kind(clipped) })
                } else if above && !below {
                    let clipped = on_bottom && self.continues(x, y);
                    Some(Segment { x1: x + 1, y1: y, x2: x, y2: y, kind: self.kind(clipped) })
                } else {
                    None
                }
            } else {
                None
            };

            open = match (open, edge) {
                (Some(run), Some(e)) if run.kind == e.kind && run.direction() == e.direction() => {
                    if e.x2 > e.x1 {
                        Some(Segment { x2: e.x2, ..run })
                    } else {
                        Some(Segment { x1: e.x1, ..run })
                    }
                }
                (Some(run), e) => {
                    out.push(run);
                    e
                }
                (None, e) => e,
            };
        }
    }

    /// Maximal vertical runs on grid line `x`.
    fn vertical_runs(&self, x: i32, out: &mut Vec<Segment>) {
        let on_left = x == self.rect.x;
        let on_right = x == self.rect.x2();
        let mut open: Option<Segment> = None;

        for y in self.rect.y..=self.rect.y2() {
            let edge = if y < self.rect.y2() {
                let left = self.inside(x - 1, y);
                let right = self.inside(x, y);
                if right && !left {
                    let clipped = on_left && self.continues(x - 1, y);
                    Some(Segment { x1: x, y1: y + 1, x2: x, y2: y, kind: self.kind(clipped) })
                } else if left && !right {
                    let clipped = on_right && self.continues(x, y);
                    Some(Segment { x1: x, y1: y, x2: x, y2: y + 1, kind: self.kind(clipped) })
                } else {
                    None
                }
            } else {
                None
            };

            open = match (open, edge) {
                (Some(run), Some(e)) if run.kind == e.kind && run.direction() == e.direction() => {
                    if e.y2 > e.y1 {
                        Some(Segment { y2: e.y2, ..run })
                    } else {
                        Some(Segment { y1: e.y1, ..run })
                    }
                }
                (Some(run), e) => {
                    out.push(run);
                    e
                }
                (None, e) => e,
            };
        }
    }
}

/// Order runs into closed loops.
///
/// Where two loops touch at a corner the walk turns right, so diagonally
/// adjacent pixels end up in separate loops.
fn chain_loops(runs: Vec<Segment>) -> Vec<Segment> {
    let mut starts: HashMap<(i32, i32), Vec<usize>> = HashMap::with_capacity(runs.len());
    for (i, run) in runs.iter().enumerate() {
        starts.entry(run.start()).or_default().push(i);
    }

    let mut used = vec![false; runs.len()];
    let mut ordered = Vec::with_capacity(runs.len());

    for first in 0..runs.len() {
        if used[first] {
            continue;
        }

        let mut current = first;
        loop {
            used[current] = true;
            ordered.push(runs[current]);

            let (dx, dy) = runs[current].direction();
            let preferred = [(-dy, dx), (dx, dy), (dy, -dx)];
            let candidates = starts.get(&runs[current].end());

            let next = preferred.iter().find_map(|&dir| {
                candidates?
                    .iter()
                    .copied()
                    .find(|&c| !used[c] && runs[c].direction() == dir)
            });

            match next {
                Some(n) => current = n,
                None => break,
            }
        }
    }

    ordered
}

/// Trace the boundary of the mask restricted to `rect` (clamped to the
/// canvas) under `policy`.
pub fn find_boundary(mask: &RasterMask, rect: Rect, policy: BoundaryPolicy) -> Vec<Segment> {
    let rect = mask.intersect_rect(rect);
    if rect.is_empty() {
        return Vec::new();
    }

    let tracer = Tracer { mask, rect, policy };
    let mut runs = Vec::new();
    for y in rect.y..=rect.y2() {
        tracer.horizontal_runs(y, &mut runs);
    }
    for x in rect.x..=rect.x2() {
        tracer.vertical_runs(x, &mut runs);
    }

    trace!("find_boundary {:?} {:?}: {} runs", rect, policy, runs.len());
    chain_loops(runs)
}

// ============================================================================
// Cache
// ============================================================================

/// Lazily traced inner and outer boundaries of a mask.
#[derive(Clone, Debug, Default)]
pub struct BoundaryCache {
    known: bool,
    non_empty: bool,
    inner: Vec<Segment>,
    outer: Vec<Segment>,
}

impl BoundaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        self.known
    }

    /// `(is_non_empty, inner, outer)`.
    ///
    /// `rect` selects the traced area: `None` traces the whole canvas, an
    /// empty rect traces the current bounds. A cached result is returned
    /// as is, whatever rect it was traced for.
    pub fn boundary(
        &mut self,
        mask: &RasterMask,
        bounds: &mut BoundsCache,
        rect: Option<Rect>,
    ) -> (bool, &[Segment], &[Segment]) {
        if self.known {
            trace!("boundary cache hit: {} inner, {} outer", self.inner.len(), self.outer.len());
            return (self.non_empty, &self.inner, &self.outer);
        }

        let (non_empty, mask_bounds) = bounds.bounds(mask);
        if !non_empty {
            self.set_empty();
            return (false, &self.inner, &self.outer);
        }

        let query = match rect {
            None => mask.extent(),
            Some(r) if r.is_empty() => mask_bounds,
            Some(r) => mask.intersect_rect(r),
        };

        self.outer = find_boundary(mask, query, BoundaryPolicy::IgnoreBounds);

        let tight = query.intersect(&mask_bounds);
        self.inner = if tight.is_empty() {
            Vec::new()
        } else {
            find_boundary(mask, tight, BoundaryPolicy::WithinBounds)
        };

        self.known = true;
        self.non_empty = true;
        (true, &self.inner, &self.outer)
    }

    pub fn invalidate(&mut self) {
        self.known = false;
        self.non_empty = false;
        self.inner = Vec::new();
        self.outer = Vec::new();
    }

    /// Known, with no segments.
    pub fn set_empty(&mut self) {
        self.invalidate();
        self.known = true;
    }
}

// ============================================================================
// Outlines
// ============================================================================

/// One closed loop of a boundary as a polyline of grid points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outline {
    pub points: Vec<(i32, i32)>,
    /// True when any segment of the loop is a [`SegmentKind::Clip`].
    pub clipped: bool,
}

impl Outline {
    /// SVG path data for the loop.
    pub fn to_svg_path(&self) -> String {
        let Some(&(x0, y0)) = self.points.first() else {
            return String::new();
        };

        let mut path = format!("M {},{} ", x0, y0);
        for &(x, y) in &self.points[1..] {
            path.push_str(&format!("L {},{} ", x, y));
        }
        path.push('Z');
        path
    }
}

/// Split a chained segment list into its closed loops.
pub fn outlines(segments: &[Segment]) -> Vec<Outline> {
    let mut result = Vec::new();
    let mut current: Option<(Outline, (i32, i32))> = None;

    for seg in segments {
        let (mut outline, loop_start) = match current.take() {
            Some(open) => open,
            None => (
                Outline {
                    points: vec![seg.start()],
                    clipped: false,
                },
                seg.start(),
            ),
        };

        outline.clipped |= seg.kind == SegmentKind::Clip;
        if seg.end() == loop_start {
            result.push(outline);
        } else {
            outline.points.push(seg.end());
            current = Some((outline, loop_start));
        }
    }

    if let Some((outline, _)) = current {
        result.push(outline);
    }

    result
}

/// Flatten outlines for FFI.
///
/// Format: `[num_outlines, num_points_1, x1, y1, x2, y2, ..., num_points_2, ...]`
pub fn outlines_to_flat(outlines: &[Outline]) -> Vec<f32> {
    let mut result = Vec::new();
    result.push(outlines.len() as f32);

    for outline in outlines {
        result.push(outline.points.len() as f32);
        for &(x, y) in &outline.points {
            result.push(x as f32);
            result.push(y as f32);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(w: i32, h: i32, rects: &[Rect]) -> RasterMask {
        let mut mask = RasterMask::new(w, h).unwrap();
        for r in rects {
            mask.fill_full(Some(*r));
        }
        mask
    }

    fn assert_closed(segments: &[Segment]) {
        for outline in outlines(segments) {
            assert!(outline.points.len() >= 4);
        }
        let mut loop_start = None;
        for pair in segments.windows(2) {
            let start = *loop_start.get_or_insert(pair[0].start());
            if pair[0].end() == start {
                loop_start = None;
            } else {
                assert_eq!(pair[0].end(), pair[1].start(), "broken chain at {:?}", pair[0]);
            }
        }
        if let (Some(first), Some(last)) = (loop_start, segments.last()) {
            assert_eq!(last.end(), first);
        }
    }

    #[test]
    fn test_empty_mask_has_no_segments() {
        let mask = RasterMask::new(5, 5).unwrap();
        assert!(find_boundary(&mask, mask.extent(), BoundaryPolicy::WithinBounds).is_empty());
    }

    #[test]
    fn test_single_pixel_square() {
        let mask = mask_with(5, 5, &[Rect::new(2, 2, 1, 1)]);
        let segs = find_boundary(&mask, mask.extent(), BoundaryPolicy::WithinBounds);
        assert_eq!(segs.len(), 4);
        assert_eq!(segs[0], Segment { x1: 2, y1: 2, x2: 3, y2: 2, kind: SegmentKind::Edge });
        assert_eq!(segs[1].end(), (3, 3));
        assert_eq!(segs[2].end(), (2, 3));
        assert_eq!(segs[3].end(), (2, 2));
    }

    #[test]
    fn test_rectangle_runs_are_merged() {
        let mask = mask_with(10, 10, &[Rect::new(2, 3, 4, 5)]);
        let segs = find_boundary(&mask, mask.extent(), BoundaryPolicy::WithinBounds);
        assert_eq!(segs.len(), 4);
        assert_eq!(segs.iter().map(Segment::length).sum::<i32>(), 2 * (4 + 5));
        assert_closed(&segs);
    }

    #[test]
    fn test_half_intensity_is_inside() {
        let mut mask = RasterMask::new(4, 4).unwrap();
        mask.set(1, 1, MASK_HALF);
        mask.set(2, 2, MASK_HALF - 1);
        let segs = find_boundary(&mask, mask.extent(), BoundaryPolicy::WithinBounds);
        assert_eq!(segs.len(), 4);
    }

    #[test]
    fn test_diagonal_pixels_form_two_loops() {
        let mask = mask_with(4, 4, &[Rect::new(0, 0, 1, 1), Rect::new(1, 1, 1, 1)]);
        let segs = find_boundary(&mask, mask.extent(), BoundaryPolicy::WithinBounds);
        assert_closed(&segs);
        assert_eq!(outlines(&segs).len(), 2);
    }

    #[test]
    fn test_hole_gives_inner_loop() {
        let mut mask = mask_with(10, 10, &[Rect::new(1, 1, 8, 8)]);
        mask.clear(Some(Rect::new(4, 4, 2, 2)));
        let segs = find_boundary(&mask, mask.extent(), BoundaryPolicy::WithinBounds);
        assert_closed(&segs);
        assert_eq!(outlines(&segs).len(), 2);
    }

    #[test]
    fn test_ignore_bounds_marks_clipped_edges() {
        let mask = mask_with(10, 10, &[Rect::new(0, 0, 10, 10)]);
        let query = Rect::new(2, 2, 4, 4);

        let within = find_boundary(&mask, query, BoundaryPolicy::WithinBounds);
        assert!(within.iter().all(|s| s.kind == SegmentKind::Edge));

        let ignore = find_boundary(&mask, query, BoundaryPolicy::IgnoreBounds);
        assert_eq!(ignore.len(), 4);
        assert!(ignore.iter().all(|s| s.kind == SegmentKind::Clip));
        assert_closed(&ignore);
    }

    #[test]
    fn test_canvas_edge_is_a_real_edge() {
        let mask = mask_with(6, 6, &[Rect::new(0, 0, 6, 6)]);
        let segs = find_boundary(&mask, mask.extent(), BoundaryPolicy::IgnoreBounds);
        assert_eq!(segs.len(), 4);
        assert!(segs.iter().all(|s| s.kind == SegmentKind::Edge));
    }

    #[test]
    fn test_cache_lifecycle() {
        let mask = mask_with(8, 8, &[Rect::new(1, 1, 3, 3)]);
        let mut bounds = BoundsCache::unknown(mask.extent());
        let mut cache = BoundaryCache::new();

        let (non_empty, inner, outer) = cache.boundary(&mask, &mut bounds, None);
        assert!(non_empty);
        assert_eq!(inner.len(), 4);
        assert_eq!(outer.len(), 4);
        assert!(cache.is_known());

        cache.invalidate();
        assert!(!cache.is_known());

        let empty = RasterMask::new(8, 8).unwrap();
        let mut bounds = BoundsCache::unknown(empty.extent());
        let (non_empty, inner, outer) = cache.boundary(&empty, &mut bounds, None);
        assert!(!non_empty);
        assert!(inner.is_empty() && outer.is_empty());
    }

    #[test]
    fn test_outline_svg_path() {
        let mask = mask_with(4, 4, &[Rect::new(1, 1, 2, 1)]);
        let segs = find_boundary(&mask, mask.extent(), BoundaryPolicy::WithinBounds);
        let outline = &outlines(&segs)[0];
        assert_eq!(outline.to_svg_path(), "M 1,1 L 3,1 L 3,2 L 1,2 Z");
        assert_eq!(outlines_to_flat(&outlines(&segs))[..2], [1.0, 4.0]);
    }
}
