//! Magic wand selection: contiguous regions and select-by-color.
//!
//! Both entry points compare every candidate pixel against a reference
//! color and turn the difference into a mask intensity. With antialiasing
//! the intensity falls off smoothly just past the threshold instead of
//! cutting hard.

use std::collections::VecDeque;

use log::debug;
use rayon::prelude::*;

use crate::error::{MaskError, Result};
use crate::mask::raster::{RasterMask, MASK_MAX};

/// Which part of the color is compared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SelectCriterion {
    /// Largest difference over R, G and B.
    #[default]
    Composite,
    Red,
    Green,
    Blue,
    Alpha,
}

/// Settings shared by the magic wand and select-by-color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MagicWandOptions {
    /// Maximum difference (0-255) that still counts as a match.
    pub threshold: u8,
    /// Soft falloff just beyond the threshold.
    pub antialias: bool,
    /// Allow selecting fully transparent pixels when the reference color
    /// is itself fully transparent.
    pub select_transparent: bool,
    pub criterion: SelectCriterion,
}

impl Default for MagicWandOptions {
    fn default() -> Self {
        Self {
            threshold: 15,
            antialias: true,
            select_transparent: true,
            criterion: SelectCriterion::Composite,
        }
    }
}

#[inline]
fn pixel_at(image: &[u8], width: usize, x: usize, y: usize) -> [f32; 4] {
    let idx = (y * width + x) * 4;
    [
        image[idx] as f32 / 255.0,
        image[idx + 1] as f32 / 255.0,
        image[idx + 2] as f32 / 255.0,
        image[idx + 3] as f32 / 255.0,
    ]
}

/// Match strength of `candidate` against `reference` in `0.0..=1.0`.
fn pixel_difference(
    reference: &[f32; 4],
    candidate: &[f32; 4],
    options: &MagicWandOptions,
    select_transparent: bool,
) -> f32 {
    // Transparent pixels are never picked up unless asked for.
    if !select_transparent && candidate[3] == 0.0 {
        return 0.0;
    }

    let max = if select_transparent {
        (reference[3] - candidate[3]).abs()
    } else {
        match options.criterion {
            SelectCriterion::Composite => (0..3)
                .map(|c| (reference[c] - candidate[c]).abs())
                .fold(0.0, f32::max),
            SelectCriterion::Red => (reference[0] - candidate[0]).abs(),
            SelectCriterion::Green => (reference[1] - candidate[1]).abs(),
            SelectCriterion::Blue => (reference[2] - candidate[2]).abs(),
            SelectCriterion::Alpha => (reference[3] - candidate[3]).abs(),
        }
    };

    let threshold = options.threshold as f32 / 255.0;
    if options.antialias && threshold > 0.0 {
        let aa = 1.5 - max / threshold;
        if aa <= 0.0 {
            0.0
        } else if aa < 0.5 {
            aa * 2.0
        } else {
            1.0
        }
    } else if max > threshold {
        0.0
    } else {
        1.0
    }
}

fn check_image(image: &[u8], width: usize, height: usize) -> Result<()> {
    let expected = width * height * 4;
    if image.len() != expected {
        return Err(MaskError::BufferSize {
            width: width as i32,
            height: height as i32,
            expected,
            actual: image.len(),
        });
    }
    Ok(())
}

fn to_mask(values: &[f32], width: usize, height: usize) -> Result<RasterMask> {
    let data = values
        .iter()
        .map(|&v| (v * MASK_MAX as f32).round() as u8)
        .collect();
    RasterMask::from_vec(width as i32, height as i32, data)
}

/// Transparent selection only makes sense when the reference itself is
/// fully transparent.
fn effective_select_transparent(reference: &[f32; 4], options: &MagicWandOptions) -> bool {
    options.select_transparent && reference[3] == 0.0
}

// ============================================================================
// Contiguous region
// ============================================================================

/// Select the region connected to `(seed_x, seed_y)` whose pixels match
/// the seed color.
///
/// # Arguments
/// * `image` - RGBA image data (4 bytes per pixel)
/// * `width` - Image width
/// * `height` - Image height
/// * `seed_x`, `seed_y` - Starting pixel; outside the image gives an empty mask
/// * `options` - Threshold, antialiasing and criterion
///
/// # Returns
/// A `width x height` mask.
pub fn contiguous_region_by_seed(
    image: &[u8],
    width: usize,
    height: usize,
    seed_x: i32,
    seed_y: i32,
    options: &MagicWandOptions,
) -> Result<RasterMask> {
    check_image(image, width, height)?;
    let mut values = vec![0.0f32; width * height];

    if seed_x < 0 || seed_y < 0 || seed_x as usize >= width || seed_y as usize >= height {
        return to_mask(&values, width, height);
    }

    let reference = pixel_at(image, width, seed_x as usize, seed_y as usize);
    let select_transparent = effective_select_transparent(&reference, options);
    debug!(
        "contiguous_region_by_seed ({}, {}) threshold={} {:?}",
        seed_x, seed_y, options.threshold, options.criterion
    );

    // (y, start, end): scan x in start+1..end on row y.
    let mut queue: VecDeque<(usize, i64, i64)> = VecDeque::new();
    queue.push_back((seed_y as usize, seed_x as i64 - 1, seed_x as i64 + 1));

    while let Some((y, start, end)) = queue.pop_front() {
        let mut x = start + 1;
        while x < end {
            let xi = x as usize;
            if values[y * width + xi] != 0.0 {
                x += 1;
                continue;
            }

            let Some((seg_start, seg_end)) =
                fill_segment(image, width, &mut values, y, xi, &reference, options, select_transparent)
            else {
                x += 1;
                continue;
            };

            if y + 1 < height {
                queue.push_back((y + 1, seg_start, seg_end));
            }
            if y > 0 {
                queue.push_back((y - 1, seg_start, seg_end));
            }
            x += 1;
        }
    }

    to_mask(&values, width, height)
}

/// Extend a matching run left and right from `x` on row `y`, writing the
/// match values. Returns the exclusive run ends `(start, end)`, or `None`
/// if `x` itself does not match.
#[allow(clippy::too_many_arguments)]
fn fill_segment(
    image: &[u8],
    width: usize,
    values: &mut [f32],
    y: usize,
    x: usize,
    reference: &[f32; 4],
    options: &MagicWandOptions,
    select_transparent: bool,
) -> Option<(i64, i64)> {
    let row = &mut values[y * width..(y + 1) * width];
    let diff_at = |x: usize| pixel_difference(reference, &pixel_at(image, width, x, y), options, select_transparent);

    let diff = diff_at(x);
    if diff == 0.0 {
        return None;
    }
    row[x] = diff;

    let mut start = x as i64 - 1;
    while start >= 0 {
        let diff = diff_at(start as usize);
        row[start as usize] = diff;
        if diff == 0.0 {
            break;
        }
        start -= 1;
    }

    let mut end = x as i64 + 1;
    while (end as usize) < width {
        let diff = diff_at(end as usize);
        row[end as usize] = diff;
        if diff == 0.0 {
            break;
        }
        end += 1;
    }

    Some((start, end))
}

// ============================================================================
// Select by color
// ============================================================================

/// Select every pixel in the image that matches `color` (RGBA).
pub fn contiguous_region_by_color(
    image: &[u8],
    width: usize,
    height: usize,
    color: [u8; 4],
    options: &MagicWandOptions,
) -> Result<RasterMask> {
    check_image(image, width, height)?;
    let reference = color.map(|c| c as f32 / 255.0);
    let select_transparent = effective_select_transparent(&reference, options);
    debug!("contiguous_region_by_color {:?} threshold={}", color, options.threshold);

    let mut values = vec![0.0f32; width * height];
    values.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, out) in row.iter_mut().enumerate() {
            *out = pixel_difference(&reference, &pixel_at(image, width, x, y), options, select_transparent);
        }
    });

    to_mask(&values, width, height)
}

/// Magic wand entry point.
///
/// With `contiguous` only the region connected to the seed is selected;
/// otherwise every pixel matching the seed color is.
pub fn magic_wand_select(
    image: &[u8],
    width: usize,
    height: usize,
    start_x: usize,
    start_y: usize,
    options: &MagicWandOptions,
    contiguous: bool,
) -> Result<RasterMask> {
    if contiguous {
        return contiguous_region_by_seed(image, width, height, start_x as i32, start_y as i32, options);
    }

    check_image(image, width, height)?;
    if start_x >= width || start_y >= height {
        return RasterMask::new(width as i32, height as i32);
    }
    let idx = (start_y * width + start_x) * 4;
    let color = [image[idx], image[idx + 1], image[idx + 2], image[idx + 3]];
    contiguous_region_by_color(image, width, height, color, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: usize, height: usize, rgba: [u8; 4]) -> Vec<u8> {
        rgba.iter().copied().cycle().take(width * height * 4).collect()
    }

    fn set_pixel(image: &mut [u8], width: usize, x: usize, y: usize, rgba: [u8; 4]) {
        let idx = (y * width + x) * 4;
        image[idx..idx + 4].copy_from_slice(&rgba);
    }

    fn selected(mask: &RasterMask) -> usize {
        mask.as_slice().iter().filter(|&&v| v > 0).count()
    }

    fn hard() -> MagicWandOptions {
        MagicWandOptions {
            threshold: 0,
            antialias: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_color_fill() {
        let image = solid(5, 5, [255, 0, 0, 255]);
        let mask = magic_wand_select(&image, 5, 5, 2, 2, &hard(), true).unwrap();
        assert!(mask.as_slice().iter().all(|&v| v == MASK_MAX));
    }

    #[test]
    fn test_two_regions() {
        // Left half red, right half blue
        let mut image = solid(4, 4, [255, 0, 0, 255]);
        for y in 0..4 {
            for x in 2..4 {
                set_pixel(&mut image, 4, x, y, [0, 0, 255, 255]);
            }
        }

        let mask = magic_wand_select(&image, 4, 4, 0, 0, &hard(), true).unwrap();
        assert_eq!(selected(&mask), 8);
        assert_eq!(mask.nonzero_bounds(), Some(crate::geometry::Rect::new(0, 0, 2, 4)));
    }

    #[test]
    fn test_wraps_around_obstacles() {
        // A wall with a gap at the bottom; the fill must go around it.
        let mut image = solid(5, 5, [255, 255, 255, 255]);
        for y in 0..4 {
            set_pixel(&mut image, 5, 2, y, [0, 0, 0, 255]);
        }
        let mask = contiguous_region_by_seed(&image, 5, 5, 0, 0, &hard()).unwrap();
        assert_eq!(selected(&mask), 21);
        assert_eq!(mask.get(4, 0), MASK_MAX);
        assert_eq!(mask.get(2, 0), 0);
    }

    #[test]
    fn test_threshold() {
        let mut image = vec![0u8; 3 * 3 * 4];
        let values = [250u8, 245, 240, 235, 230, 225, 220, 215, 210];
        for (i, &val) in values.iter().enumerate() {
            image[i * 4] = val;
            image[i * 4 + 3] = 255;
        }

        let options = MagicWandOptions {
            threshold: 12,
            antialias: false,
            ..Default::default()
        };
        let mask = contiguous_region_by_seed(&image, 3, 3, 1, 1, &options).unwrap();
        // 220..=240 are within 12 of the seed value 230
        assert_eq!(selected(&mask), 5);
    }

    #[test]
    fn test_antialias_falloff() {
        let options = MagicWandOptions {
            threshold: 100,
            antialias: true,
            select_transparent: false,
            criterion: SelectCriterion::Red,
        };
        let reference = [0.0, 0.0, 0.0, 1.0];
        let at = |r: f32| pixel_difference(&reference, &[r, 0.0, 0.0, 1.0], &options, false);

        let t = 100.0 / 255.0;
        assert_eq!(at(0.5 * t), 1.0);
        assert!((at(1.25 * t) - 0.5).abs() < 1e-4);
        assert_eq!(at(1.6 * t), 0.0);
    }

    #[test]
    fn test_transparent_pixels_skipped() {
        let mut image = solid(3, 1, [10, 10, 10, 255]);
        set_pixel(&mut image, 3, 1, 0, [10, 10, 10, 0]);

        let mask = contiguous_region_by_color(&image, 3, 1, [10, 10, 10, 255], &hard()).unwrap();
        assert_eq!(mask.as_slice(), &[255, 0, 255]);

        let mask = contiguous_region_by_color(&image, 3, 1, [0, 0, 0, 0], &MagicWandOptions {
            select_transparent: true,
            ..hard()
        })
        .unwrap();
        assert_eq!(mask.as_slice(), &[0, 255, 0]);
    }

    #[test]
    fn test_non_contiguous() {
        let mut image = solid(5, 5, [0, 0, 0, 255]);
        for y in 0..5 {
            for x in 0..5 {
                if (x + y) % 2 == 0 {
                    set_pixel(&mut image, 5, x, y, [255, 0, 0, 255]);
                }
            }
        }

        let mask = magic_wand_select(&image, 5, 5, 0, 0, &hard(), false).unwrap();
        assert_eq!(selected(&mask), 13);
    }

    #[test]
    fn test_rejects_short_buffer() {
        let err = contiguous_region_by_seed(&[0u8; 10], 2, 2, 0, 0, &hard()).unwrap_err();
        assert!(matches!(err, MaskError::BufferSize { expected: 16, actual: 10, .. }));
    }
}
