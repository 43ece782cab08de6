//! Dense single-channel selection buffer.
//!
//! A [`RasterMask`] stores one `u8` intensity per pixel in row-major
//! order: 0 is unselected, [`MASK_MAX`] is fully selected and anything in
//! between is a partial (antialiased or feathered) selection.

use ndarray::{Array2, ArrayView2, ArrayViewMut2};

use crate::error::{MaskError, Result};
use crate::geometry::Rect;

/// Fully selected intensity.
pub const MASK_MAX: u8 = 255;

/// Smallest intensity that counts as "inside" for thresholding and
/// boundary tracing (half of [`MASK_MAX`], rounded up).
pub const MASK_HALF: u8 = 128;

/// Row-major `width * height` intensity buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterMask {
    data: Array2<u8>,
}

impl RasterMask {
    /// Allocate an all-zero mask.
    pub fn new(width: i32, height: i32) -> Result<Self> {
        Self::filled(width, height, 0)
    }

    /// Allocate a mask with every pixel set to `value`.
    pub fn filled(width: i32, height: i32, value: u8) -> Result<Self> {
        let len = checked_len(width, height)?;

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|_| MaskError::Allocation { width, height })?;
        buffer.resize(len, value);

        Self::from_vec(width, height, buffer)
    }

    /// Wrap an existing row-major buffer.
    pub fn from_vec(width: i32, height: i32, data: Vec<u8>) -> Result<Self> {
        let expected = checked_len(width, height)?;
        if data.len() != expected {
            return Err(MaskError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }

        let data = Array2::from_shape_vec((height as usize, width as usize), data).map_err(|_| {
            MaskError::BufferSize {
                width,
                height,
                expected,
                actual: expected,
            }
        })?;

        Ok(Self { data })
    }

    /// Build a mask from float intensities in `0.0..=1.0`.
    pub fn from_f32(input: ArrayView2<f32>) -> Result<Self> {
        let (height, width) = input.dim();
        let data: Vec<u8> = input
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        Self::from_vec(width as i32, height as i32, data)
    }

    /// Float copy of the intensities in `0.0..=1.0`, for compositing.
    pub fn to_f32(&self) -> Array2<f32> {
        self.data.mapv(|v| v as f32 / 255.0)
    }

    pub fn width(&self) -> i32 {
        self.data.ncols() as i32
    }

    pub fn height(&self) -> i32 {
        self.data.nrows() as i32
    }

    /// The whole canvas as a rect at the origin.
    pub fn extent(&self) -> Rect {
        Rect::new(0, 0, self.width(), self.height())
    }

    pub fn view(&self) -> ArrayView2<'_, u8> {
        self.data.view()
    }

    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, u8> {
        self.data.view_mut()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.data
            .as_slice()
            .expect("mask buffer is always in standard layout")
    }

    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        self.data
            .as_slice_mut()
            .expect("mask buffer is always in standard layout")
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data.into_raw_vec_and_offset().0
    }

    /// One row of pixels. `y` must be in range.
    pub fn row(&self, y: i32) -> &[u8] {
        let w = self.width() as usize;
        let start = y as usize * w;
        &self.as_slice()[start..start + w]
    }

    pub fn row_mut(&mut self, y: i32) -> &mut [u8] {
        let w = self.width() as usize;
        let start = y as usize * w;
        &mut self.as_slice_mut()[start..start + w]
    }

    /// Intensity at an in-range pixel.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        self.data[[y as usize, x as usize]]
    }

    #[inline]
    pub fn set(&mut self, x: i32, y: i32, value: u8) {
        self.data[[y as usize, x as usize]] = value;
    }

    /// Nearest-sample lookup; 0 outside the canvas.
    pub fn sample(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width() || y >= self.height() {
            0
        } else {
            self.get(x, y)
        }
    }

    /// Clamp a rect to the canvas.
    pub fn intersect_rect(&self, rect: Rect) -> Rect {
        rect.intersect(&self.extent())
    }

    /// Set `region` (or the whole canvas) to `value`.
    pub fn fill(&mut self, region: Option<Rect>, value: u8) {
        let region = match region {
            Some(r) => self.intersect_rect(r),
            None => self.extent(),
        };
        if region.is_empty() {
            return;
        }

        let (x1, x2) = (region.x as usize, region.x2() as usize);
        for y in region.y..region.y2() {
            self.row_mut(y)[x1..x2].fill(value);
        }
    }

    pub fn clear(&mut self, region: Option<Rect>) {
        self.fill(region, 0);
    }

    pub fn fill_full(&mut self, region: Option<Rect>) {
        self.fill(region, MASK_MAX);
    }

    /// Copy `src_rect` of `src` so that its top-left lands on
    /// `(dst_x, dst_y)`. Both ends are clipped to their canvases.
    ///
    /// Returns the destination rect actually written.
    pub fn copy_region(&mut self, src: &RasterMask, src_rect: Rect, dst_x: i32, dst_y: i32) -> Rect {
        let src_rect = src.intersect_rect(src_rect);
        let dx = dst_x - src_rect.x;
        let dy = dst_y - src_rect.y;
        let dst_rect = self.intersect_rect(src_rect.translate(dx, dy));
        if dst_rect.is_empty() {
            return dst_rect;
        }

        let w = dst_rect.width as usize;
        for y in dst_rect.y..dst_rect.y2() {
            let sx = (dst_rect.x - dx) as usize;
            let src_row = &src.row(y - dy)[sx..sx + w];
            let x1 = dst_rect.x as usize;
            self.row_mut(y)[x1..x1 + w].copy_from_slice(src_row);
        }

        dst_rect
    }

    /// True when no pixel is non-zero. Stops at the first hit.
    pub fn is_all_zero(&self) -> bool {
        self.as_slice().iter().all(|&v| v == 0)
    }

    /// Tightest rect around all non-zero pixels, or `None` for an empty
    /// mask. Full O(width * height) scan.
    pub fn nonzero_bounds(&self) -> Option<Rect> {
        let width = self.width();
        let mut x1 = width;
        let mut y1 = self.height();
        let mut x2 = 0;
        let mut y2 = 0;

        for y in 0..self.height() {
            let row = self.row(y);
            let Some(first) = row.iter().position(|&v| v != 0) else {
                continue;
            };
            // `first` exists, so `rposition` always finds something.
            let last = row.iter().rposition(|&v| v != 0).unwrap_or(first);

            x1 = x1.min(first as i32);
            x2 = x2.max(last as i32 + 1);
            y1 = y1.min(y);
            y2 = y + 1;
        }

        if x2 > x1 && y2 > y1 {
            Some(Rect::from_corners(x1, y1, x2, y2))
        } else {
            None
        }
    }
}

fn checked_len(width: i32, height: i32) -> Result<usize> {
    if width <= 0 || height <= 0 {
        return Err(MaskError::InvalidDimensions { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .ok_or(MaskError::Allocation { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let mask = RasterMask::new(4, 3).unwrap();
        assert_eq!(mask.width(), 4);
        assert_eq!(mask.height(), 3);
        assert_eq!(mask.as_slice().len(), 12);
        assert!(mask.is_all_zero());
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert_eq!(
            RasterMask::new(0, 10),
            Err(MaskError::InvalidDimensions { width: 0, height: 10 })
        );
        assert!(RasterMask::new(5, -1).is_err());
    }

    #[test]
    fn test_from_vec_checks_length() {
        let err = RasterMask::from_vec(3, 3, vec![0; 8]).unwrap_err();
        assert!(matches!(err, MaskError::BufferSize { expected: 9, actual: 8, .. }));
    }

    #[test]
    fn test_sample_out_of_bounds_is_zero() {
        let mut mask = RasterMask::new(5, 5).unwrap();
        mask.fill_full(None);
        assert_eq!(mask.sample(2, 2), MASK_MAX);
        assert_eq!(mask.sample(-1, 2), 0);
        assert_eq!(mask.sample(2, 5), 0);
    }

    #[test]
    fn test_fill_region_is_clamped() {
        let mut mask = RasterMask::new(6, 6).unwrap();
        mask.fill_full(Some(Rect::new(4, 4, 10, 10)));
        assert_eq!(mask.nonzero_bounds(), Some(Rect::new(4, 4, 2, 2)));

        mask.clear(Some(Rect::new(5, 0, 1, 6)));
        assert_eq!(mask.nonzero_bounds(), Some(Rect::new(4, 4, 1, 2)));
    }

    #[test]
    fn test_copy_region_clips_destination() {
        let mut src = RasterMask::new(4, 4).unwrap();
        src.fill(None, 200);
        let mut dst = RasterMask::new(5, 5).unwrap();

        let written = dst.copy_region(&src, Rect::new(0, 0, 4, 4), 3, 3);
        assert_eq!(written, Rect::new(3, 3, 2, 2));
        assert_eq!(dst.get(4, 4), 200);
        assert_eq!(dst.get(2, 2), 0);
    }

    #[test]
    fn test_nonzero_bounds_single_pixel() {
        let mut mask = RasterMask::new(10, 10).unwrap();
        assert_eq!(mask.nonzero_bounds(), None);
        mask.set(7, 2, 1);
        assert_eq!(mask.nonzero_bounds(), Some(Rect::new(7, 2, 1, 1)));
    }

    #[test]
    fn test_f32_conversion() {
        let mut mask = RasterMask::new(2, 1).unwrap();
        mask.set(1, 0, MASK_MAX);
        let f = mask.to_f32();
        assert_eq!(f[[0, 0]], 0.0);
        assert_eq!(f[[0, 1]], 1.0);
        assert_eq!(RasterMask::from_f32(f.view()).unwrap(), mask);
    }
}
