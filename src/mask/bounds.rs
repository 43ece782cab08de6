//! Lazily computed bounding box of a mask's non-zero pixels.

use log::trace;

use super::combine::ChannelOp;
use super::raster::RasterMask;
use crate::geometry::Rect;

/// Cached bounds of a [`RasterMask`].
///
/// When `known` is set, `rect` is the tightest box around every non-zero
/// pixel, or `empty` is set and `rect` is the whole canvas. When `known`
/// is clear nothing is trusted and the next query rescans the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundsCache {
    known: bool,
    empty: bool,
    rect: Rect,
}

impl BoundsCache {
    /// Cache for a freshly allocated (all zero) mask.
    pub fn new_empty(extent: Rect) -> Self {
        Self {
            known: true,
            empty: true,
            rect: extent,
        }
    }

    /// Cache that knows nothing yet.
    pub fn unknown(extent: Rect) -> Self {
        Self {
            known: false,
            empty: false,
            rect: extent,
        }
    }

    pub fn is_known(&self) -> bool {
        self.known
    }

    /// Cached emptiness, if known.
    pub fn known_empty(&self) -> Option<bool> {
        self.known.then_some(self.empty)
    }

    /// `(is_non_empty, rect)`. Rescans the whole buffer when unknown.
    pub fn bounds(&mut self, mask: &RasterMask) -> (bool, Rect) {
        if self.known {
            trace!("bounds cache hit: empty={} rect={:?}", self.empty, self.rect);
            return (!self.empty, self.rect);
        }

        trace!("bounds cache miss, scanning {}x{}", mask.width(), mask.height());
        match mask.nonzero_bounds() {
            Some(rect) => self.set(rect),
            None => self.set_empty(mask.extent()),
        }

        (!self.empty, self.rect)
    }

    /// Emptiness check that avoids a full bounds scan.
    ///
    /// A non-empty result is not cached, since that would need the full
    /// bounds. An empty result marks the cache as known-empty.
    pub fn is_empty(&mut self, mask: &RasterMask) -> bool {
        if self.known {
            return self.empty;
        }

        if mask.is_all_zero() {
            trace!("emptiness scan found nothing, caching empty bounds");
            self.set_empty(mask.extent());
            true
        } else {
            false
        }
    }

    pub fn invalidate(&mut self) {
        self.known = false;
    }

    pub fn set_empty(&mut self, extent: Rect) {
        self.known = true;
        self.empty = true;
        self.rect = extent;
    }

    /// Whole canvas selected.
    pub fn set_full(&mut self, extent: Rect) {
        self.set(extent);
    }

    /// Known, non-empty bounds.
    pub fn set(&mut self, rect: Rect) {
        self.known = true;
        self.empty = false;
        self.rect = rect;
    }

    /// Incremental update after a shape was combined into the mask.
    ///
    /// `affected` is the rect the combiner reported. For `Add` and
    /// `Replace` it holds exactly the pixels that received coverage.
    pub fn update_after_combine(&mut self, op: ChannelOp, affected: Rect, extent: Rect) {
        let was_empty = self.known && self.empty;

        match op {
            ChannelOp::Add if self.known && !self.empty => {
                self.rect = self.rect.union(&affected);
            }
            // Replace always starts from a cleared mask.
            ChannelOp::Replace | ChannelOp::Add if op == ChannelOp::Replace || was_empty => {
                if !affected.is_empty() {
                    self.set(affected);
                } else if was_empty {
                    self.set_empty(extent);
                } else {
                    self.invalidate();
                }
            }
            _ => self.invalidate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(rect: Rect) -> RasterMask {
        let mut mask = RasterMask::new(10, 10).unwrap();
        mask.fill_full(Some(rect));
        mask
    }

    #[test]
    fn test_unknown_bounds_rescan() {
        let mask = mask_with(Rect::new(2, 3, 4, 5));
        let mut cache = BoundsCache::unknown(mask.extent());
        assert_eq!(cache.bounds(&mask), (true, Rect::new(2, 3, 4, 5)));
        assert!(cache.is_known());
    }

    #[test]
    fn test_empty_rescan_reports_full_canvas() {
        let mask = RasterMask::new(10, 10).unwrap();
        let mut cache = BoundsCache::unknown(mask.extent());
        assert_eq!(cache.bounds(&mask), (false, Rect::new(0, 0, 10, 10)));
    }

    #[test]
    fn test_is_empty_does_not_cache_non_empty() {
        let mask = mask_with(Rect::new(0, 0, 1, 1));
        let mut cache = BoundsCache::unknown(mask.extent());
        assert!(!cache.is_empty(&mask));
        assert!(!cache.is_known());
    }

    #[test]
    fn test_is_empty_caches_empty() {
        let mask = RasterMask::new(3, 3).unwrap();
        let mut cache = BoundsCache::unknown(mask.extent());
        assert!(cache.is_empty(&mask));
        assert_eq!(cache.known_empty(), Some(true));
    }

    #[test]
    fn test_add_fast_path_unions() {
        let extent = Rect::new(0, 0, 10, 10);
        let mut cache = BoundsCache::new_empty(extent);
        cache.set(Rect::new(0, 0, 5, 5));
        cache.update_after_combine(ChannelOp::Add, Rect::new(3, 3, 7, 7), extent);
        assert_eq!(cache.known_empty(), Some(false));
        assert_eq!(cache.rect, Rect::new(0, 0, 10, 10));
    }

    #[test]
    fn test_add_onto_empty_takes_affected() {
        let extent = Rect::new(0, 0, 10, 10);
        let mut cache = BoundsCache::new_empty(extent);
        cache.update_after_combine(ChannelOp::Add, Rect::new(1, 1, 2, 2), extent);
        assert_eq!(cache.known_empty(), Some(false));
        assert_eq!(cache.rect, Rect::new(1, 1, 2, 2));
    }

    #[test]
    fn test_add_onto_unknown_stays_unknown() {
        let extent = Rect::new(0, 0, 10, 10);
        let mut cache = BoundsCache::unknown(extent);
        cache.update_after_combine(ChannelOp::Add, Rect::new(1, 1, 2, 2), extent);
        assert!(!cache.is_known());
    }

    #[test]
    fn test_subtract_invalidates() {
        let extent = Rect::new(0, 0, 10, 10);
        let mut cache = BoundsCache::new_empty(extent);
        cache.set(Rect::new(0, 0, 5, 5));
        cache.update_after_combine(ChannelOp::Subtract, Rect::new(0, 0, 2, 2), extent);
        assert!(!cache.is_known());
    }
}
