//! The selection mask: a raster plus its bounds and boundary caches.
//!
//! [`SelectionMask`] is the only owner of its [`RasterMask`],
//! [`BoundsCache`] and [`BoundaryCache`]. Every operator follows the same
//! sequence:
//!
//! 1. optionally hand an undo snapshot to the attached [`MaskHost`]
//! 2. invalidate the boundary (and the bounds when they may shrink)
//! 3. run a stateless kernel from [`crate::mask`]
//! 4. update the bounds cache incrementally where that is exact
//! 5. report the changed region and any emptiness flip to observers

use log::debug;
use ndarray::ArrayView2;

use crate::error::{MaskError, Result};
use crate::geometry::Rect;
use crate::mask::boundary::{BoundaryCache, Segment};
use crate::mask::bounds::BoundsCache;
use crate::mask::combine::{self, ChannelOp};
use crate::mask::morphology;
use crate::mask::raster::RasterMask;
use crate::mask::scan_convert;
use crate::mask::transform::{self, Interpolation, Rotation};

// ============================================================================
// Collaborator contracts
// ============================================================================

/// The item that owns a mask: receives repaint and undo requests.
pub trait MaskHost {
    /// Pixels inside `rect` changed and need to be redrawn.
    fn region_dirty(&mut self, rect: Rect);

    /// Store `snapshot`, the state before the operation named by
    /// `description`, on the undo stack.
    fn push_undo(&mut self, description: &'static str, snapshot: MaskSnapshot);
}

/// Notifications for observers registered with
/// [`SelectionMask::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskEvent {
    /// Mask content changed inside the rect.
    RegionChanged(Rect),
    /// The mask went from empty to non-empty or back. Carries the new
    /// emptiness.
    EmptinessChanged(bool),
    /// Color, opacity or display mode changed.
    AppearanceChanged,
}

type Observer = Box<dyn FnMut(&MaskEvent)>;

/// What the mask belongs to. Only affects stroking and resize behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// A saved channel.
    Channel,
    /// The image selection.
    #[default]
    Selection,
    /// A layer mask; keeps its own offset.
    LayerMask,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Undoable operations, named for the undo history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaskAction {
    Combine,
    Feather,
    Sharpen,
    Clear,
    All,
    Invert,
    Border,
    Grow,
    Shrink,
    Translate,
    Flip,
    Resize,
    Scale,
    Rotate,
    Load,
}

impl MaskAction {
    pub fn describe(self, kind: ChannelKind) -> &'static str {
        let selection = kind == ChannelKind::Selection;
        match (self, selection) {
            (MaskAction::Combine, true) => "Modify Selection",
            (MaskAction::Combine, false) => "Modify Channel",
            (MaskAction::Feather, true) => "Feather Selection",
            (MaskAction::Feather, false) => "Feather Channel",
            (MaskAction::Sharpen, true) => "Sharpen Selection",
            (MaskAction::Sharpen, false) => "Sharpen Channel",
            (MaskAction::Clear, true) => "Select None",
            (MaskAction::Clear, false) => "Clear Channel",
            (MaskAction::All, true) => "Select All",
            (MaskAction::All, false) => "Fill Channel",
            (MaskAction::Invert, true) => "Invert Selection",
            (MaskAction::Invert, false) => "Invert Channel",
            (MaskAction::Border, true) => "Border Selection",
            (MaskAction::Border, false) => "Border Channel",
            (MaskAction::Grow, true) => "Grow Selection",
            (MaskAction::Grow, false) => "Grow Channel",
            (MaskAction::Shrink, true) => "Shrink Selection",
            (MaskAction::Shrink, false) => "Shrink Channel",
            (MaskAction::Translate, true) => "Move Selection",
            (MaskAction::Translate, false) => "Move Channel",
            (MaskAction::Flip, true) => "Flip Selection",
            (MaskAction::Flip, false) => "Flip Channel",
            (MaskAction::Resize, true) => "Resize Selection",
            (MaskAction::Resize, false) => "Resize Channel",
            (MaskAction::Scale, true) => "Scale Selection",
            (MaskAction::Scale, false) => "Scale Channel",
            (MaskAction::Rotate, true) => "Rotate Selection",
            (MaskAction::Rotate, false) => "Rotate Channel",
            (MaskAction::Load, true) => "Channel to Selection",
            (MaskAction::Load, false) => "Load Channel",
        }
    }
}

/// Display tint of the mask. Components are in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaskColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Default for MaskColor {
    /// Half-transparent black.
    fn default() -> Self {
        Self {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            a: 0.5,
        }
    }
}

impl MaskColor {
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Sum of absolute component differences.
    pub fn distance(&self, other: &MaskColor) -> f64 {
        (self.r - other.r).abs()
            + (self.g - other.g).abs()
            + (self.b - other.b).abs()
            + (self.a - other.a).abs()
    }
}

/// Color changes at or below this distance are ignored.
const COLOR_EPSILON: f64 = 1e-4;

/// Byte-for-byte copy of a mask taken before an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskSnapshot {
    raster: RasterMask,
    bounds: BoundsCache,
}

impl MaskSnapshot {
    pub fn raster(&self) -> &RasterMask {
        &self.raster
    }

    pub fn width(&self) -> i32 {
        self.raster.width()
    }

    pub fn height(&self) -> i32 {
        self.raster.height()
    }
}

// ============================================================================
// SelectionMask
// ============================================================================

/// A selection or channel mask with cached bounds and boundary.
pub struct SelectionMask {
    raster: RasterMask,
    bounds: BoundsCache,
    boundary: BoundaryCache,
    kind: ChannelKind,
    color: MaskColor,
    show_masked: bool,
    stroking_count: u32,
    offset: (i32, i32),
    last_empty: bool,
    host: Option<Box<dyn MaskHost>>,
    observers: Vec<Observer>,
}

impl std::fmt::Debug for SelectionMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionMask")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("kind", &self.kind)
            .field("bounds", &self.bounds)
            .field("stroking_count", &self.stroking_count)
            .field("attached", &self.host.is_some())
            .finish()
    }
}

impl SelectionMask {
    /// An empty `width x height` mask.
    pub fn new(width: i32, height: i32, kind: ChannelKind) -> Result<Self> {
        let raster = RasterMask::new(width, height)?;
        let bounds = BoundsCache::new_empty(raster.extent());
        Ok(Self::with_state(raster, bounds, kind, true))
    }

    /// Wrap existing pixels. Bounds are computed on first use.
    pub fn from_raster(raster: RasterMask, kind: ChannelKind) -> Self {
        let bounds = BoundsCache::unknown(raster.extent());
        let mut mask = Self::with_state(raster, bounds, kind, true);
        mask.last_empty = mask.raw_is_empty();
        mask
    }

    fn with_state(raster: RasterMask, bounds: BoundsCache, kind: ChannelKind, last_empty: bool) -> Self {
        let mut boundary = BoundaryCache::new();
        if bounds.known_empty() == Some(true) {
            boundary.set_empty();
        }
        Self {
            raster,
            bounds,
            boundary,
            kind,
            color: MaskColor::default(),
            show_masked: false,
            stroking_count: 0,
            offset: (0, 0),
            last_empty,
            host: None,
            observers: Vec::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.raster.width()
    }

    pub fn height(&self) -> i32 {
        self.raster.height()
    }

    pub fn extent(&self) -> Rect {
        self.raster.extent()
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Offset of the mask on its owner. Always `(0, 0)` except for layer
    /// masks that were resized.
    pub fn offset(&self) -> (i32, i32) {
        self.offset
    }

    /// Read-only access to the pixels.
    pub fn raster(&self) -> &RasterMask {
        &self.raster
    }

    pub fn into_raster(self) -> RasterMask {
        self.raster
    }

    // ------------------------------------------------------------------------
    // Collaborators
    // ------------------------------------------------------------------------

    /// Attach the owning item. Undo snapshots are only taken while attached.
    pub fn attach(&mut self, host: Box<dyn MaskHost>) {
        self.host = Some(host);
    }

    pub fn detach(&mut self) -> Option<Box<dyn MaskHost>> {
        self.host.take()
    }

    pub fn is_attached(&self) -> bool {
        self.host.is_some()
    }

    /// Register an observer for [`MaskEvent`]s.
    pub fn subscribe(&mut self, observer: impl FnMut(&MaskEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&mut self, event: MaskEvent) {
        for observer in self.observers.iter_mut() {
            observer(&event);
        }
    }

    /// Hand the current state to the host's undo stack. Does nothing
    /// while detached.
    pub fn push_undo(&mut self, description: &'static str) {
        if self.host.is_none() {
            return;
        }
        let snapshot = self.snapshot();
        if let Some(host) = self.host.as_mut() {
            host.push_undo(description, snapshot);
        }
    }

    /// Take an undo snapshot when asked to, then drop the cached boundary.
    fn begin_edit(&mut self, action: MaskAction, push_undo: bool) {
        if push_undo {
            self.push_undo(action.describe(self.kind));
        }
        self.boundary.invalidate();
    }

    fn region_changed(&mut self, rect: Rect) {
        let rect = self.raster.intersect_rect(rect);
        if rect.is_empty() {
            return;
        }
        if let Some(host) = self.host.as_mut() {
            host.region_dirty(rect);
        }
        self.emit(MaskEvent::RegionChanged(rect));
    }

    fn finish_edit(&mut self, dirty: Rect) {
        self.region_changed(dirty);

        let now_empty = self.raw_is_empty();
        if now_empty != self.last_empty {
            self.last_empty = now_empty;
            self.emit(MaskEvent::EmptinessChanged(now_empty));
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// `(is_non_empty, rect)` of the non-zero pixels. An empty mask
    /// reports the whole canvas.
    pub fn bounds(&mut self) -> (bool, Rect) {
        self.bounds.bounds(&self.raster)
    }

    fn raw_is_empty(&mut self) -> bool {
        let empty = self.bounds.is_empty(&self.raster);
        if empty && !self.boundary.is_known() {
            self.boundary.set_empty();
        }
        empty
    }

    /// Whether nothing is selected. A selection reports empty while it is
    /// being stroked so it does not clip its own stroke.
    pub fn is_empty(&mut self) -> bool {
        if self.kind == ChannelKind::Selection && self.stroking_count > 0 {
            return true;
        }
        self.raw_is_empty()
    }

    /// Whether painting should currently be clipped by this mask.
    pub fn is_masking(&mut self) -> bool {
        !self.is_empty()
    }

    /// `(is_non_empty, inner, outer)` boundary segments; see
    /// [`BoundaryCache::boundary`] for the meaning of `rect`.
    pub fn boundary(&mut self, rect: Option<Rect>) -> (bool, &[Segment], &[Segment]) {
        self.boundary.boundary(&self.raster, &mut self.bounds, rect)
    }

    /// Intensity at `(x, y)`, 0 outside the canvas.
    pub fn sample(&self, x: i32, y: i32) -> u8 {
        self.raster.sample(x, y)
    }

    // ------------------------------------------------------------------------
    // Combine
    // ------------------------------------------------------------------------

    fn combine_with<F>(&mut self, op: ChannelOp, push_undo: bool, write: F) -> Result<()>
    where
        F: FnOnce(&mut RasterMask, ChannelOp) -> Result<Rect>,
    {
        self.begin_edit(MaskAction::Combine, push_undo);

        let extent = self.extent();
        let mut dirty = Rect::default();
        if op == ChannelOp::Replace {
            dirty = match self.bounds.known_empty() {
                Some(true) => Rect::default(),
                Some(false) => self.bounds.bounds(&self.raster).1,
                None => extent,
            };
            self.raster.clear(None);
            self.bounds.set_empty(extent);
        }

        let affected = write(&mut self.raster, op)?;
        self.bounds.update_after_combine(op, affected, extent);

        self.finish_edit(dirty.union(&affected));
        Ok(())
    }

    pub fn combine_rect(&mut self, op: ChannelOp, rect: Rect, push_undo: bool) {
        debug!("SelectionMask::combine_rect {:?} {:?}", op, rect);
        // combine_rect cannot fail
        let _ = self.combine_with(op, push_undo, |raster, op| Ok(combine::combine_rect(raster, op, rect)));
    }

    pub fn combine_ellipse(&mut self, op: ChannelOp, rect: Rect, antialias: bool, push_undo: bool) -> Result<()> {
        let (a, b) = (rect.width as f64 / 2.0, rect.height as f64 / 2.0);
        self.combine_ellipse_rect(op, rect, a, b, antialias, push_undo)
    }

    /// Combine a rectangle with elliptical corners of radii
    /// `(corner_a, corner_b)`. `Intersect` is rejected before anything
    /// is modified.
    pub fn combine_ellipse_rect(
        &mut self,
        op: ChannelOp,
        rect: Rect,
        corner_a: f64,
        corner_b: f64,
        antialias: bool,
        push_undo: bool,
    ) -> Result<()> {
        if op == ChannelOp::Intersect {
            return Err(MaskError::UnsupportedOperation {
                op,
                combiner: "combine_ellipse_rect",
            });
        }
        debug!("SelectionMask::combine_ellipse_rect {:?} {:?} corners=({}, {})", op, rect, corner_a, corner_b);

        self.combine_with(op, push_undo, |raster, op| {
            combine::combine_ellipse_rect(raster, op, rect, corner_a, corner_b, antialias)
        })
    }

    pub fn combine_polygon(&mut self, op: ChannelOp, points: &[(f64, f64)], antialias: bool, push_undo: bool) -> Result<()> {
        if points.len() < 3 {
            return Err(MaskError::InvalidPolygon(points.len()));
        }
        if op == ChannelOp::Intersect {
            return Err(MaskError::UnsupportedOperation {
                op,
                combiner: "combine_polygon",
            });
        }

        self.combine_with(op, push_undo, |raster, op| {
            scan_convert::combine_polygon(raster, op, points, antialias)
        })
    }

    /// Composite a raw buffer with its top-left corner at `(offset_x, offset_y)`.
    pub fn combine_buffer(&mut self, add_on: ArrayView2<u8>, op: ChannelOp, offset_x: i32, offset_y: i32, push_undo: bool) {
        let _ = self.combine_with(op, push_undo, |raster, op| {
            Ok(combine::combine_buffer(raster, add_on, op, offset_x, offset_y))
        });
    }

    pub fn combine_mask(&mut self, other: &RasterMask, op: ChannelOp, offset_x: i32, offset_y: i32, push_undo: bool) {
        self.combine_buffer(other.view(), op, offset_x, offset_y, push_undo);
    }

    // ------------------------------------------------------------------------
    // Morphology
    // ------------------------------------------------------------------------

    /// Dilate by `(radius_x, radius_y)`. Both radii `<= 0` shrinks by the
    /// negated radii instead; mixed signs do nothing.
    pub fn grow(&mut self, radius_x: i32, radius_y: i32, push_undo: bool) {
        if radius_x == 0 && radius_y == 0 {
            debug!("grow: zero radius, nothing to do");
            return;
        }
        if radius_x <= 0 && radius_y <= 0 {
            self.shrink(radius_x.saturating_neg(), radius_y.saturating_neg(), false, push_undo);
            return;
        }
        if radius_x < 0 || radius_y < 0 {
            debug!("grow: mixed-sign radius ({}, {}) ignored", radius_x, radius_y);
            return;
        }

        let (non_empty, bounds) = self.bounds();
        if !non_empty {
            debug!("grow: mask is empty");
            return;
        }
        debug!("grow ({}, {}) from {:?}", radius_x, radius_y, bounds);

        self.begin_edit(MaskAction::Grow, push_undo);
        let region = self.raster.intersect_rect(self.pad_within_canvas(bounds, radius_x, radius_y));
        morphology::grow_region(&mut self.raster, region, radius_x, radius_y);
        self.bounds.invalidate();
        self.finish_edit(region);
    }

    /// Erode by `(radius_x, radius_y)`. See [`morphology::shrink_region`]
    /// for `edge_lock`. Both radii `<= 0` grows instead.
    pub fn shrink(&mut self, radius_x: i32, radius_y: i32, edge_lock: bool, push_undo: bool) {
        if radius_x == 0 && radius_y == 0 {
            debug!("shrink: zero radius, nothing to do");
            return;
        }
        if radius_x <= 0 && radius_y <= 0 {
            self.grow(radius_x.saturating_neg(), radius_y.saturating_neg(), push_undo);
            return;
        }
        if radius_x < 0 || radius_y < 0 {
            debug!("shrink: mixed-sign radius ({}, {}) ignored", radius_x, radius_y);
            return;
        }

        let (non_empty, bounds) = self.bounds();
        if !non_empty {
            debug!("shrink: mask is empty");
            return;
        }
        debug!("shrink ({}, {}) edge_lock={} from {:?}", radius_x, radius_y, edge_lock, bounds);

        self.begin_edit(MaskAction::Shrink, push_undo);
        let region = self.raster.intersect_rect(bounds.pad(1, 1));
        morphology::shrink_region(&mut self.raster, region, radius_x, radius_y, edge_lock);
        self.bounds.invalidate();
        self.finish_edit(region);
    }

    /// Replace the selection by a ring of width `(radius_x, radius_y)`
    /// around its outline.
    pub fn border(&mut self, radius_x: i32, radius_y: i32, feather: bool, edge_lock: bool, push_undo: bool) {
        if radius_x < 0 || radius_y < 0 {
            debug!("border: negative radius ({}, {}) ignored", radius_x, radius_y);
            return;
        }
        if radius_x == 0 && radius_y == 0 {
            debug!("border: zero radius, nothing to do");
            return;
        }

        let (non_empty, bounds) = self.bounds();
        if !non_empty {
            debug!("border: mask is empty");
            return;
        }
        debug!("border ({}, {}) feather={} edge_lock={}", radius_x, radius_y, feather, edge_lock);

        self.begin_edit(MaskAction::Border, push_undo);
        let region = self.raster.intersect_rect(self.pad_within_canvas(bounds, radius_x, radius_y));
        morphology::border_region(&mut self.raster, region, radius_x, radius_y, feather, edge_lock);
        self.bounds.invalidate();

        let dirty = if feather { self.extent() } else { region };
        self.finish_edit(dirty);
    }

    /// `bounds` grown by the radii, which are first clamped to the canvas
    /// size. The kernels still get the full radii.
    fn pad_within_canvas(&self, bounds: Rect, radius_x: i32, radius_y: i32) -> Rect {
        bounds.pad(radius_x.min(self.width()), radius_y.min(self.height()))
    }

    /// Gaussian-soften the mask edges. Non-positive radii leave that axis
    /// alone.
    pub fn feather(&mut self, radius_x: f64, radius_y: f64, push_undo: bool) {
        if radius_x <= 0.0 && radius_y <= 0.0 {
            debug!("feather: degenerate radius ({}, {})", radius_x, radius_y);
            return;
        }
        if !self.bounds().0 {
            debug!("feather: mask is empty");
            return;
        }
        debug!("feather ({}, {})", radius_x, radius_y);

        self.begin_edit(MaskAction::Feather, push_undo);
        morphology::feather_mask(&mut self.raster, radius_x, radius_y);
        self.bounds.invalidate();
        self.finish_edit(self.extent());
    }

    /// Drop partial selection: `v >= half` becomes fully selected.
    pub fn sharpen(&mut self, push_undo: bool) {
        if !self.bounds().0 {
            debug!("sharpen: mask is empty");
            return;
        }
        debug!("sharpen");

        self.begin_edit(MaskAction::Sharpen, push_undo);
        morphology::sharpen(&mut self.raster);
        self.bounds.invalidate();
        self.finish_edit(self.extent());
    }

    /// Deselect everything.
    pub fn clear(&mut self, push_undo: bool) {
        debug!("clear");
        self.begin_edit(MaskAction::Clear, push_undo);

        match self.bounds.known_empty() {
            Some(false) => {
                let (_, bounds) = self.bounds.bounds(&self.raster);
                self.raster.clear(Some(bounds));
            }
            _ => self.raster.clear(None),
        }
        self.bounds.set_empty(self.extent());
        self.boundary.set_empty();
        self.finish_edit(self.extent());
    }

    /// Select the whole canvas.
    #[doc(alias = "fill_full")]
    pub fn all(&mut self, push_undo: bool) {
        debug!("all");
        self.begin_edit(MaskAction::All, push_undo);
        self.raster.fill_full(None);
        self.bounds.set_full(self.extent());
        self.finish_edit(self.extent());
    }

    /// `v -> max - v`. A mask known to be empty becomes fully selected
    /// without touching each pixel.
    pub fn invert(&mut self, push_undo: bool) {
        if self.bounds.known_empty() == Some(true) {
            debug!("invert: known empty, selecting all");
            self.all(push_undo);
            return;
        }
        debug!("invert");

        self.begin_edit(MaskAction::Invert, push_undo);
        morphology::invert(&mut self.raster);
        self.bounds.invalidate();
        self.finish_edit(self.extent());
    }

    // ------------------------------------------------------------------------
    // Stroking guard
    // ------------------------------------------------------------------------

    /// Enter a stroke along this mask. Returns the new depth.
    pub fn push_stroking(&mut self) -> u32 {
        self.stroking_count += 1;
        self.stroking_count
    }

    /// Leave a stroke. Fails if no stroke is in progress.
    pub fn pop_stroking(&mut self) -> Result<u32> {
        if self.stroking_count == 0 {
            return Err(MaskError::NotStroking);
        }
        self.stroking_count -= 1;
        Ok(self.stroking_count)
    }

    pub fn stroking_count(&self) -> u32 {
        self.stroking_count
    }

    /// Run `stroke` with the stroking guard held.
    ///
    /// Fails with [`MaskError::NothingToStroke`] when the mask has no
    /// boundary. The guard is released before returning.
    pub fn stroke_with<T, F>(&mut self, stroke: F) -> Result<T>
    where
        F: FnOnce(&mut SelectionMask) -> T,
    {
        if !self.boundary(None).0 {
            return Err(MaskError::NothingToStroke);
        }

        self.push_stroking();
        let result = stroke(self);
        self.pop_stroking()?;
        Ok(result)
    }

    // ------------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------------

    /// Move the content by `(dx, dy)`. Pixels pushed off the canvas are lost.
    pub fn translate(&mut self, dx: i32, dy: i32, push_undo: bool) {
        if dx == 0 && dy == 0 {
            return;
        }
        let (non_empty, old) = self.bounds();
        debug!("translate ({}, {}) from {:?}", dx, dy, old);

        self.begin_edit(MaskAction::Translate, push_undo);
        if !non_empty {
            return;
        }

        let source = self.raster.clone();
        self.raster.clear(Some(old));
        let moved = old.translate(dx, dy);
        let written = self.raster.copy_region(&source, old, moved.x, moved.y);

        if written.is_empty() {
            self.bounds.set_empty(self.extent());
        } else if written == moved {
            self.bounds.set(written);
        } else {
            // The clipped part may have held the extreme pixels of the
            // other axis as well.
            self.bounds.invalidate();
        }

        self.region_changed(old);
        self.finish_edit(written);
    }

    /// Mirror the content about the canvas centre.
    pub fn flip(&mut self, orientation: Orientation, push_undo: bool) {
        debug!("flip {:?}", orientation);
        self.begin_edit(MaskAction::Flip, push_undo);

        let width = self.width() as usize;
        let height = self.height() as usize;
        match orientation {
            Orientation::Horizontal => {
                for y in 0..height as i32 {
                    self.raster.row_mut(y).reverse();
                }
            }
            Orientation::Vertical => {
                let data = self.raster.as_slice_mut();
                for y in 0..height / 2 {
                    let (top, bottom) = data.split_at_mut((height - 1 - y) * width);
                    top[y * width..(y + 1) * width].swap_with_slice(&mut bottom[..width]);
                }
            }
        }

        if self.bounds.known_empty() == Some(false) {
            let (_, r) = self.bounds.bounds(&self.raster);
            let mirrored = match orientation {
                Orientation::Horizontal => Rect::new(self.width() - r.x2(), r.y, r.width, r.height),
                Orientation::Vertical => Rect::new(r.x, self.height() - r.y2(), r.width, r.height),
            };
            self.bounds.set(mirrored);
        }

        self.finish_edit(self.extent());
    }

    /// Change the canvas to `width x height`, placing the old content with
    /// its top-left corner at `(offset_x, offset_y)`.
    pub fn resize(&mut self, width: i32, height: i32, offset_x: i32, offset_y: i32, push_undo: bool) -> Result<()> {
        let mut resized = RasterMask::new(width, height)?;
        debug!(
            "resize {}x{} -> {}x{} at ({}, {})",
            self.width(),
            self.height(),
            width,
            height,
            offset_x,
            offset_y
        );

        self.begin_edit(MaskAction::Resize, push_undo);
        resized.copy_region(&self.raster, self.raster.extent(), offset_x, offset_y);
        self.raster = resized;
        self.bounds = BoundsCache::unknown(self.raster.extent());

        if self.kind == ChannelKind::LayerMask {
            self.offset = (self.offset.0 - offset_x, self.offset.1 - offset_y);
        } else {
            self.offset = (0, 0);
        }

        self.finish_edit(self.extent());
        Ok(())
    }

    /// Resample the content to a `width x height` canvas. Layer masks take
    /// `(offset_x, offset_y)` as their new offset; other kinds go back to
    /// `(0, 0)`.
    pub fn scale(
        &mut self,
        width: i32,
        height: i32,
        offset_x: i32,
        offset_y: i32,
        interpolation: Interpolation,
        push_undo: bool,
    ) -> Result<()> {
        let known_empty = self.bounds.known_empty() == Some(true);
        // Nothing to resample on a known-empty mask.
        let scaled = if known_empty {
            RasterMask::new(width, height)?
        } else {
            transform::scale(&self.raster, width, height, interpolation)?
        };
        debug!(
            "scale {}x{} -> {}x{} {:?}",
            self.width(),
            self.height(),
            width,
            height,
            interpolation
        );

        self.begin_edit(MaskAction::Scale, push_undo);
        let old_extent = self.extent();
        self.raster = scaled;
        if known_empty {
            self.bounds = BoundsCache::new_empty(self.raster.extent());
            self.boundary.set_empty();
        } else {
            self.bounds = BoundsCache::unknown(self.raster.extent());
        }

        self.offset = match self.kind {
            ChannelKind::LayerMask => (offset_x, offset_y),
            _ => (0, 0),
        };

        self.finish_edit(old_extent.union(&self.extent()));
        Ok(())
    }

    /// Rotate the content about the canvas centre by quarter turns. The
    /// canvas keeps its size, so a non-square mask loses what turns off it.
    pub fn rotate(&mut self, rotation: Rotation, push_undo: bool) {
        debug!("rotate {:?}", rotation);
        self.begin_edit(MaskAction::Rotate, push_undo);

        let old = match self.bounds.known_empty() {
            Some(true) => return,
            Some(false) => Some(self.bounds.bounds(&self.raster).1),
            None => None,
        };
        self.raster = transform::rotate(&self.raster, rotation);

        match old {
            Some(r) => {
                let mapped = rotation.map_rect(r, self.width(), self.height());
                if self.raster.intersect_rect(mapped) == mapped {
                    self.bounds.set(mapped);
                } else {
                    self.bounds.invalidate();
                }
            }
            None => self.bounds.invalidate(),
        }

        self.finish_edit(self.extent());
    }

    // ------------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------------

    pub fn snapshot(&self) -> MaskSnapshot {
        MaskSnapshot {
            raster: self.raster.clone(),
            bounds: self.bounds,
        }
    }

    /// Put `snapshot` back and return the state it replaced, for redo.
    pub fn restore(&mut self, snapshot: MaskSnapshot) -> MaskSnapshot {
        debug!("restore {}x{} snapshot", snapshot.width(), snapshot.height());
        let old_extent = self.extent();
        let replaced = MaskSnapshot {
            raster: std::mem::replace(&mut self.raster, snapshot.raster),
            bounds: std::mem::replace(&mut self.bounds, snapshot.bounds),
        };
        self.boundary.invalidate();

        self.finish_edit(old_extent.union(&self.extent()));
        replaced
    }

    /// Copy another mask of the same size into this one.
    pub fn load(&mut self, source: &RasterMask, push_undo: bool) -> Result<()> {
        if source.width() != self.width() || source.height() != self.height() {
            return Err(MaskError::SizeMismatch {
                expected_width: self.width(),
                expected_height: self.height(),
                width: source.width(),
                height: source.height(),
            });
        }

        self.begin_edit(MaskAction::Load, push_undo);
        self.raster.copy_region(source, source.extent(), 0, 0);
        self.bounds.invalidate();
        self.finish_edit(self.extent());
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Appearance
    // ------------------------------------------------------------------------

    pub fn color(&self) -> MaskColor {
        self.color
    }

    pub fn set_color(&mut self, color: MaskColor) {
        if self.color.distance(&color) <= COLOR_EPSILON {
            return;
        }
        self.color = color;
        self.appearance_changed();
    }

    pub fn opacity(&self) -> f64 {
        self.color.a
    }

    /// Set the tint alpha, clamped to `0.0..=1.0`.
    pub fn set_opacity(&mut self, opacity: f64) {
        let opacity = opacity.clamp(0.0, 1.0);
        if self.color.a == opacity {
            return;
        }
        self.color.a = opacity;
        self.appearance_changed();
    }

    pub fn show_masked(&self) -> bool {
        self.show_masked
    }

    pub fn set_show_masked(&mut self, show_masked: bool) {
        if self.show_masked == show_masked {
            return;
        }
        self.show_masked = show_masked;
        self.appearance_changed();
    }

    fn appearance_changed(&mut self) {
        self.region_changed(self.extent());
        self.emit(MaskEvent::AppearanceChanged);
    }
}
