//! End-to-end properties of `SelectionMask` that hold across operators.

use std::collections::HashMap;

use selmask::selection::Orientation;
use selmask::{ChannelKind, ChannelOp, Interpolation, Rect, Rotation, SelectionMask, MASK_MAX};

fn mask(width: i32, height: i32) -> SelectionMask {
    SelectionMask::new(width, height, ChannelKind::Selection).unwrap()
}

/// Cached bounds must match a fresh scan of the pixels.
fn assert_bounds_match_pixels(mask: &mut SelectionMask) {
    let scanned = mask.raster().nonzero_bounds();
    let (non_empty, cached) = mask.bounds();
    match scanned {
        Some(rect) => {
            assert!(non_empty, "cache says empty, pixels say {:?}", rect);
            assert_eq!(cached, rect);
        }
        None => {
            assert!(!non_empty);
            assert_eq!(cached, mask.extent());
        }
    }
}

#[test]
fn test_rect_then_invert() {
    let mut m = mask(10, 10);
    m.combine_rect(ChannelOp::Replace, Rect::new(2, 2, 4, 4), false);
    let (non_empty, rect) = m.bounds();
    assert!(non_empty);
    assert_eq!(rect.corners(), (2, 2, 6, 6));

    m.invert(false);
    assert!(!m.is_empty());
    assert_eq!(m.sample(0, 0), MASK_MAX);
    assert_eq!(m.sample(3, 3), 0);
    assert_eq!(m.sample(9, 9), MASK_MAX);
    assert_bounds_match_pixels(&mut m);
}

#[test]
fn test_invert_is_an_involution() {
    let mut m = mask(40, 30);
    m.combine_ellipse(ChannelOp::Replace, Rect::new(5, 4, 25, 20), true, false)
        .unwrap();
    let before = m.raster().clone();

    m.invert(false);
    m.invert(false);
    assert_eq!(m.raster(), &before);
    assert_bounds_match_pixels(&mut m);
}

#[test]
fn test_sharpen_is_idempotent() {
    let mut m = mask(50, 50);
    m.combine_rect(ChannelOp::Replace, Rect::new(10, 10, 25, 25), false);
    m.feather(6.0, 6.0, false);

    m.sharpen(false);
    let once = m.raster().clone();
    m.sharpen(false);
    assert_eq!(m.raster(), &once);
    assert!(once.as_slice().iter().all(|&v| v == 0 || v == MASK_MAX));
}

#[test]
fn test_grow_then_shrink_restores_rect() {
    let mut m = mask(100, 100);
    m.combine_rect(ChannelOp::Replace, Rect::new(10, 10, 20, 20), false);
    let before = m.raster().clone();

    m.grow(3, 3, false);
    assert_eq!(m.bounds(), (true, Rect::new(7, 7, 26, 26)));

    m.shrink(3, 3, false, false);
    assert_eq!(m.raster(), &before);
    assert_eq!(m.bounds(), (true, Rect::new(10, 10, 20, 20)));
}

#[test]
fn test_negative_grow_is_shrink() {
    let mut a = mask(60, 60);
    let mut b = mask(60, 60);
    for m in [&mut a, &mut b] {
        m.combine_rect(ChannelOp::Replace, Rect::new(10, 10, 30, 30), false);
    }

    a.grow(-4, -4, false);
    b.shrink(4, 4, false, false);
    assert_eq!(a.raster(), b.raster());

    a.shrink(-2, -2, false, false);
    b.grow(2, 2, false);
    assert_eq!(a.raster(), b.raster());
}

#[test]
fn test_mixed_sign_grow_is_ignored() {
    let mut m = mask(30, 30);
    m.combine_rect(ChannelOp::Replace, Rect::new(5, 5, 10, 10), false);
    let before = m.raster().clone();

    m.grow(3, -3, false);
    m.shrink(-3, 3, false, false);
    assert_eq!(m.raster(), &before);
}

#[test]
fn test_replace_is_idempotent() {
    let mut m = mask(32, 32);
    m.combine_rect(ChannelOp::Add, Rect::new(0, 0, 8, 8), false);

    m.combine_ellipse(ChannelOp::Replace, Rect::new(4, 6, 20, 14), true, false)
        .unwrap();
    let once = m.raster().clone();
    m.combine_ellipse(ChannelOp::Replace, Rect::new(4, 6, 20, 14), true, false)
        .unwrap();
    assert_eq!(m.raster(), &once);
    assert_eq!(m.sample(0, 0), 0);
}

#[test]
fn test_add_extends_known_bounds() {
    let mut m = mask(10, 10);
    m.combine_rect(ChannelOp::Add, Rect::new(0, 0, 5, 5), false);
    // Runs past the canvas and is clamped to it.
    m.combine_rect(ChannelOp::Add, Rect::new(3, 3, 10, 10), false);
    assert_eq!(m.bounds(), (true, Rect::new(0, 0, 10, 10)));
    assert_bounds_match_pixels(&mut m);
}

#[test]
fn test_bounds_track_every_operator() {
    let mut m = mask(64, 48);
    m.combine_rect(ChannelOp::Add, Rect::new(4, 4, 12, 10), false);
    assert_bounds_match_pixels(&mut m);

    m.combine_ellipse(ChannelOp::Add, Rect::new(30, 20, 20, 16), true, false)
        .unwrap();
    assert_bounds_match_pixels(&mut m);

    m.combine_rect(ChannelOp::Subtract, Rect::new(0, 0, 10, 48), false);
    assert_bounds_match_pixels(&mut m);

    m.combine_polygon(ChannelOp::Add, &[(50.0, 2.0), (62.0, 2.0), (56.0, 12.0)], true, false)
        .unwrap();
    assert_bounds_match_pixels(&mut m);

    m.grow(2, 3, false);
    assert_bounds_match_pixels(&mut m);

    m.shrink(1, 1, true, false);
    assert_bounds_match_pixels(&mut m);

    m.translate(-20, 5, false);
    assert_bounds_match_pixels(&mut m);

    m.flip(Orientation::Horizontal, false);
    assert_bounds_match_pixels(&mut m);

    m.flip(Orientation::Vertical, false);
    assert_bounds_match_pixels(&mut m);

    m.border(2, 2, false, false, false);
    assert_bounds_match_pixels(&mut m);

    m.feather(3.0, 3.0, false);
    assert_bounds_match_pixels(&mut m);

    m.combine_rect(ChannelOp::Intersect, Rect::new(20, 10, 30, 30), false);
    assert_bounds_match_pixels(&mut m);

    m.rotate(Rotation::Rotate90, false);
    assert_bounds_match_pixels(&mut m);

    m.rotate(Rotation::Rotate180, false);
    assert_bounds_match_pixels(&mut m);

    m.scale(96, 72, 0, 0, Interpolation::Linear, false).unwrap();
    assert_bounds_match_pixels(&mut m);
}

#[test]
fn test_clear_and_all_extremes() {
    let mut m = mask(16, 12);
    m.all(false);
    assert!(m.raster().as_slice().iter().all(|&v| v == MASK_MAX));
    assert_eq!(m.bounds(), (true, Rect::new(0, 0, 16, 12)));
    assert!(!m.is_empty());

    m.clear(false);
    assert!(m.raster().is_all_zero());
    assert!(m.is_empty());
    let (non_empty, inner, outer) = m.boundary(None);
    assert!(!non_empty);
    assert!(inner.is_empty() && outer.is_empty());
}

#[test]
fn test_border_on_empty_mask_stays_empty() {
    let mut m = mask(20, 20);
    m.border(3, 3, true, false, false);
    assert!(m.is_empty());
    assert!(m.raster().is_all_zero());
}

#[test]
fn test_outer_boundary_is_closed() {
    let mut m = mask(40, 40);
    m.combine_rect(ChannelOp::Add, Rect::new(2, 2, 10, 10), false);
    m.combine_ellipse(ChannelOp::Add, Rect::new(15, 15, 20, 18), false, false)
        .unwrap();
    m.combine_rect(ChannelOp::Subtract, Rect::new(20, 20, 6, 6), false);

    let (non_empty, _, outer) = m.boundary(None);
    assert!(non_empty);
    assert!(!outer.is_empty());

    // Every grid point is entered as often as it is left.
    let mut degree: HashMap<(i32, i32), i32> = HashMap::new();
    for seg in outer {
        *degree.entry(seg.start()).or_default() += 1;
        *degree.entry(seg.end()).or_default() -= 1;
    }
    assert!(degree.values().all(|&d| d == 0));

    let loops = selmask::mask::outlines(outer);
    // Rect, ellipse and the hole punched into it.
    assert_eq!(loops.len(), 3);
}

#[test]
fn test_stroking_hides_selection() {
    let mut m = mask(20, 20);
    assert!(m.stroke_with(|_| ()).is_err());

    m.combine_rect(ChannelOp::Replace, Rect::new(5, 5, 5, 5), false);
    let seen_empty = m.stroke_with(|inner| inner.is_empty()).unwrap();
    assert!(seen_empty);
    assert_eq!(m.stroking_count(), 0);
    assert!(!m.is_empty());
}
