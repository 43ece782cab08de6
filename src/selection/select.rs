//! High-level select operations built on [`SelectionMask`].
//!
//! Each helper records one undo step named after the tool, clears the
//! mask for `Replace`, and then merges its shape. Feathered shapes and
//! `Intersect` are drawn into a scratch mask first, feathered there, and
//! merged as a buffer; everything else goes straight through the matching
//! combiner.

use log::debug;

use super::magic_wand::{self, MagicWandOptions};
use super::mask::SelectionMask;
use crate::error::{MaskError, Result};
use crate::geometry::Rect;
use crate::mask::combine::{self, ChannelOp};
use crate::mask::morphology;
use crate::mask::raster::RasterMask;
use crate::mask::scan_convert;

/// How a select helper merges its shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectOptions {
    pub op: ChannelOp,
    pub antialias: bool,
    /// Feather radii `(x, y)` applied to the new shape before merging.
    pub feather: Option<(f64, f64)>,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            op: ChannelOp::Replace,
            antialias: true,
            feather: None,
        }
    }
}

impl SelectOptions {
    pub fn with_op(op: ChannelOp) -> Self {
        Self {
            op,
            ..Default::default()
        }
    }

    fn needs_scratch(&self) -> bool {
        self.feather.is_some() || self.op == ChannelOp::Intersect
    }
}

fn begin(mask: &mut SelectionMask, description: &'static str, options: &SelectOptions, push_undo: bool) {
    if push_undo {
        mask.push_undo(description);
    }
    if options.op == ChannelOp::Replace {
        mask.clear(false);
    }
}

/// Draw with `Add` into a canvas-sized scratch mask, feather it, and merge.
fn merge_via_scratch<F>(mask: &mut SelectionMask, options: &SelectOptions, draw: F) -> Result<()>
where
    F: FnOnce(&mut RasterMask) -> Result<Rect>,
{
    let mut scratch = RasterMask::new(mask.width(), mask.height())?;
    draw(&mut scratch)?;

    if let Some((rx, ry)) = options.feather {
        morphology::feather_mask(&mut scratch, rx, ry);
    }

    mask.combine_mask(&scratch, options.op, 0, 0, false);
    Ok(())
}

pub fn select_rectangle(mask: &mut SelectionMask, rect: Rect, options: &SelectOptions, push_undo: bool) -> Result<()> {
    debug!("select_rectangle {:?} {:?}", rect, options);
    begin(mask, "Rectangle Select", options, push_undo);

    if options.needs_scratch() {
        merge_via_scratch(mask, options, |scratch| {
            Ok(combine::combine_rect(scratch, ChannelOp::Add, rect))
        })
    } else {
        mask.combine_rect(options.op, rect, false);
        Ok(())
    }
}

pub fn select_ellipse(mask: &mut SelectionMask, rect: Rect, options: &SelectOptions, push_undo: bool) -> Result<()> {
    debug!("select_ellipse {:?} {:?}", rect, options);
    begin(mask, "Ellipse Select", options, push_undo);

    if options.needs_scratch() {
        merge_via_scratch(mask, options, |scratch| {
            combine::combine_ellipse(scratch, ChannelOp::Add, rect, options.antialias)
        })
    } else {
        mask.combine_ellipse(options.op, rect, options.antialias, false)
    }
}

/// Rectangle with elliptical corners of radii `(corner_x, corner_y)`.
pub fn select_round_rect(
    mask: &mut SelectionMask,
    rect: Rect,
    corner_x: f64,
    corner_y: f64,
    options: &SelectOptions,
    push_undo: bool,
) -> Result<()> {
    debug!("select_round_rect {:?} corners=({}, {}) {:?}", rect, corner_x, corner_y, options);
    begin(mask, "Rounded Rectangle Select", options, push_undo);

    if options.needs_scratch() {
        merge_via_scratch(mask, options, |scratch| {
            combine::combine_ellipse_rect(scratch, ChannelOp::Add, rect, corner_x, corner_y, options.antialias)
        })
    } else {
        mask.combine_ellipse_rect(options.op, rect, corner_x, corner_y, options.antialias, false)
    }
}

/// Closed polygon filled with the even-odd rule.
pub fn select_polygon(
    mask: &mut SelectionMask,
    description: &'static str,
    points: &[(f64, f64)],
    options: &SelectOptions,
    push_undo: bool,
) -> Result<()> {
    if points.len() < 3 {
        return Err(MaskError::InvalidPolygon(points.len()));
    }
    debug!("select_polygon n={} {:?}", points.len(), options);
    begin(mask, description, options, push_undo);

    if options.needs_scratch() {
        merge_via_scratch(mask, options, |scratch| {
            scan_convert::combine_polygon(scratch, ChannelOp::Add, points, options.antialias)
        })
    } else {
        mask.combine_polygon(options.op, points, options.antialias, false)
    }
}

/// Merge an intensity buffer placed at `(offset_x, offset_y)`.
/// `options.antialias` has no effect here.
pub fn select_buffer(
    mask: &mut SelectionMask,
    description: &'static str,
    add_on: &RasterMask,
    offset_x: i32,
    offset_y: i32,
    options: &SelectOptions,
    push_undo: bool,
) {
    debug!("select_buffer {}x{} at ({}, {}) {:?}", add_on.width(), add_on.height(), offset_x, offset_y, options);
    begin(mask, description, options, push_undo);

    match options.feather {
        Some((rx, ry)) => {
            let mut feathered = add_on.clone();
            morphology::feather_mask(&mut feathered, rx, ry);
            mask.combine_mask(&feathered, options.op, offset_x, offset_y, false);
        }
        None => mask.combine_mask(add_on, options.op, offset_x, offset_y, false),
    }
}

/// Load another channel's pixels as a selection shape.
pub fn select_mask(mask: &mut SelectionMask, channel: &RasterMask, options: &SelectOptions, push_undo: bool) {
    select_buffer(mask, "Channel to Selection", channel, 0, 0, options, push_undo);
}

/// Magic wand: select the region connected to `(x, y)` in an RGBA image
/// placed at `(offset_x, offset_y)` on the mask.
#[allow(clippy::too_many_arguments)]
pub fn select_fuzzy(
    mask: &mut SelectionMask,
    image: &[u8],
    width: usize,
    height: usize,
    offset: (i32, i32),
    x: i32,
    y: i32,
    wand: &MagicWandOptions,
    options: &SelectOptions,
    push_undo: bool,
) -> Result<()> {
    let region = magic_wand::contiguous_region_by_seed(image, width, height, x, y, wand)?;
    select_buffer(mask, "Fuzzy Select", &region, offset.0, offset.1, options, push_undo);
    Ok(())
}

/// Select every pixel of an RGBA image matching `color`.
#[allow(clippy::too_many_arguments)]
pub fn select_by_color(
    mask: &mut SelectionMask,
    image: &[u8],
    width: usize,
    height: usize,
    offset: (i32, i32),
    color: [u8; 4],
    wand: &MagicWandOptions,
    options: &SelectOptions,
    push_undo: bool,
) -> Result<()> {
    let region = magic_wand::contiguous_region_by_color(image, width, height, color, wand)?;
    select_buffer(mask, "Select by Color", &region, offset.0, offset.1, options, push_undo);
    Ok(())
}
