//! Whole-mask resampling and quarter-turn rotation.
//!
//! Both produce a new [`RasterMask`]; the caller swaps it in. Rows of the
//! destination are filled in parallel with Rayon, each destination pixel
//! pulling from the source through the inverse mapping.

use log::trace;
use rayon::prelude::*;

use super::raster::RasterMask;
use crate::error::Result;
use crate::geometry::Rect;

/// Resampling filter for [`scale`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Interpolation {
    /// Nearest source pixel. Keeps a hard mask hard.
    #[default]
    Nearest,
    /// Bilinear between the four nearest source pixel centres.
    Linear,
}

/// Clockwise quarter turns in y-down pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rotation {
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    /// Integer shifts of the rotation about the canvas centre. For odd
    /// `width + height` the centre is rounded down to the pixel grid.
    fn shifts(width: i32, height: i32) -> (i32, i32) {
        let a = (width + height) / 2;
        (a - width, a - height)
    }

    /// Source pixel of destination pixel `(x, y)`.
    fn source(self, x: i32, y: i32, width: i32, height: i32) -> (i32, i32) {
        let a = (width + height) / 2;
        let (b, c) = Self::shifts(width, height);
        match self {
            Rotation::Rotate90 => (y - b, a - 1 - x),
            Rotation::Rotate180 => (width - 1 - x, height - 1 - y),
            Rotation::Rotate270 => (a - 1 - y, x - c),
        }
    }

    /// Where the pixels of `rect` land, before clipping to the canvas.
    pub fn map_rect(self, rect: Rect, width: i32, height: i32) -> Rect {
        let a = (width + height) / 2;
        let (b, c) = Self::shifts(width, height);
        let (x1, y1, x2, y2) = rect.corners();
        match self {
            Rotation::Rotate90 => Rect::from_corners(a - y2, b + x1, a - y1, b + x2),
            Rotation::Rotate180 => Rect::from_corners(width - x2, height - y2, width - x1, height - y1),
            Rotation::Rotate270 => Rect::from_corners(c + y1, a - x2, c + y2, a - x1),
        }
    }
}

/// Rotate the mask about the canvas centre, keeping the canvas size.
/// Content rotated off a non-square canvas is dropped.
pub fn rotate(mask: &RasterMask, rotation: Rotation) -> RasterMask {
    let width = mask.width();
    let height = mask.height();
    trace!("rotate {:?} {}x{}", rotation, width, height);

    let mut out = mask.clone();
    out.as_slice_mut()
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, v) in row.iter_mut().enumerate() {
                let (sx, sy) = rotation.source(x as i32, y as i32, width, height);
                *v = mask.sample(sx, sy);
            }
        });
    out
}

/// Resample the mask to `new_width x new_height`.
///
/// # Arguments
/// * `mask` - Source mask
/// * `new_width`, `new_height` - Target size, both positive
/// * `interpolation` - Resampling filter
///
/// # Returns
/// The resampled mask, or an error for invalid target dimensions.
pub fn scale(mask: &RasterMask, new_width: i32, new_height: i32, interpolation: Interpolation) -> Result<RasterMask> {
    let mut out = RasterMask::new(new_width, new_height)?;
    trace!(
        "scale {}x{} -> {}x{} {:?}",
        mask.width(),
        mask.height(),
        new_width,
        new_height,
        interpolation
    );

    let sx = mask.width() as f64 / new_width as f64;
    let sy = mask.height() as f64 / new_height as f64;
    let max_x = mask.width() - 1;
    let max_y = mask.height() - 1;

    out.as_slice_mut()
        .par_chunks_mut(new_width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let fy = (y as f64 + 0.5) * sy;
            for (x, v) in row.iter_mut().enumerate() {
                let fx = (x as f64 + 0.5) * sx;
                *v = match interpolation {
                    Interpolation::Nearest => {
                        mask.get((fx.floor() as i32).min(max_x), (fy.floor() as i32).min(max_y))
                    }
                    Interpolation::Linear => {
                        let px = (fx - 0.5).clamp(0.0, max_x as f64);
                        let py = (fy - 0.5).clamp(0.0, max_y as f64);
                        let x0 = px.floor() as i32;
                        let y0 = py.floor() as i32;
                        let x1 = (x0 + 1).min(max_x);
                        let y1 = (y0 + 1).min(max_y);
                        let tx = px - x0 as f64;
                        let ty = py - y0 as f64;

                        let top = mask.get(x0, y0) as f64 * (1.0 - tx) + mask.get(x1, y0) as f64 * tx;
                        let bottom = mask.get(x0, y1) as f64 * (1.0 - tx) + mask.get(x1, y1) as f64 * tx;
                        (top * (1.0 - ty) + bottom * ty).round() as u8
                    }
                };
            }
        });

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::raster::MASK_MAX;

    fn rect_mask(w: i32, h: i32, rect: Rect) -> RasterMask {
        let mut mask = RasterMask::new(w, h).unwrap();
        mask.fill_full(Some(rect));
        mask
    }

    #[test]
    fn test_rotate90_moves_top_left_to_top_right() {
        let mask = rect_mask(10, 10, Rect::new(0, 0, 1, 1));
        let rotated = rotate(&mask, Rotation::Rotate90);
        assert_eq!(rotated.get(9, 0), MASK_MAX);
        assert_eq!(rotated.nonzero_bounds(), Some(Rect::new(9, 0, 1, 1)));
    }

    #[test]
    fn test_four_quarter_turns_are_identity() {
        let mask = rect_mask(12, 12, Rect::new(1, 3, 5, 2));
        let mut turned = mask.clone();
        for _ in 0..4 {
            turned = rotate(&turned, Rotation::Rotate90);
        }
        assert_eq!(turned, mask);

        let back = rotate(&rotate(&mask, Rotation::Rotate90), Rotation::Rotate270);
        assert_eq!(back, mask);
    }

    #[test]
    fn test_map_rect_matches_pixels() {
        for (w, h) in [(10, 10), (16, 9), (7, 12)] {
            let rect = Rect::new(2, 1, 3, 2);
            let mask = rect_mask(w, h, rect);
            for rotation in [Rotation::Rotate90, Rotation::Rotate180, Rotation::Rotate270] {
                let mapped = rotation.map_rect(rect, w, h);
                let clipped = mask.intersect_rect(mapped);
                let pixels = rotate(&mask, rotation).nonzero_bounds();
                assert_eq!(pixels, (!clipped.is_empty()).then_some(clipped), "{:?} on {}x{}", rotation, w, h);
            }
        }
    }

    #[test]
    fn test_scale_nearest_doubles_rect() {
        let mask = rect_mask(10, 10, Rect::new(2, 2, 4, 4));
        let scaled = scale(&mask, 20, 20, Interpolation::Nearest).unwrap();
        assert_eq!(scaled.nonzero_bounds(), Some(Rect::new(4, 4, 8, 8)));
        assert!(scaled.as_slice().iter().all(|&v| v == 0 || v == MASK_MAX));
    }

    #[test]
    fn test_scale_linear_softens_and_rejects_bad_size() {
        let mask = rect_mask(10, 10, Rect::new(2, 2, 4, 4));
        let scaled = scale(&mask, 25, 25, Interpolation::Linear).unwrap();
        assert_eq!(scaled.get(10, 10), MASK_MAX);
        assert!(scaled.as_slice().iter().any(|&v| v > 0 && v < MASK_MAX));
        assert!(scale(&mask, 0, 5, Interpolation::Linear).is_err());
    }
}
