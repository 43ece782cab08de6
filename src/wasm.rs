//! WebAssembly exports for selection masks.
//!
//! These are exposed to JavaScript via wasm-bindgen. Masks cross the
//! boundary as flat `u8` arrays (length = width * height), images as flat
//! RGBA bytes, and outlines in the flat `[count, n, x, y, ...]` layout
//! that canvas code walks without allocating per point.

use wasm_bindgen::prelude::*;

use crate::error::MaskError;
use crate::geometry::Rect;
use crate::mask::boundary::{outlines, outlines_to_flat};
use crate::mask::combine::ChannelOp;
use crate::mask::raster::RasterMask;
use crate::mask::transform::{Interpolation, Rotation};
use crate::selection::magic_wand::{magic_wand_select, MagicWandOptions};
use crate::selection::mask::{ChannelKind, SelectionMask};

fn to_js(err: MaskError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn op_from_code(op: u8) -> Result<ChannelOp, JsValue> {
    match op {
        0 => Ok(ChannelOp::Add),
        1 => Ok(ChannelOp::Subtract),
        2 => Ok(ChannelOp::Replace),
        3 => Ok(ChannelOp::Intersect),
        other => Err(JsValue::from_str(&format!("unknown channel op {}", other))),
    }
}

// ============================================================================
// Selection mask
// ============================================================================

/// Selection mask handle for JavaScript.
///
/// Channel ops are passed as codes: 0 add, 1 subtract, 2 replace,
/// 3 intersect.
#[wasm_bindgen]
pub struct WasmSelectionMask {
    inner: SelectionMask,
}

#[wasm_bindgen]
impl WasmSelectionMask {
    #[wasm_bindgen(constructor)]
    pub fn new(width: i32, height: i32) -> Result<WasmSelectionMask, JsValue> {
        let inner = SelectionMask::new(width, height, ChannelKind::Selection).map_err(to_js)?;
        Ok(Self { inner })
    }

    /// Wrap existing mask bytes (length = width * height).
    pub fn from_bytes(data: &[u8], width: i32, height: i32) -> Result<WasmSelectionMask, JsValue> {
        let raster = RasterMask::from_vec(width, height, data.to_vec()).map_err(to_js)?;
        Ok(Self {
            inner: SelectionMask::from_raster(raster, ChannelKind::Selection),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.raster().as_slice().to_vec()
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> i32 {
        self.inner.width()
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> i32 {
        self.inner.height()
    }

    /// `[x, y, width, height]`, or an empty array when nothing is selected.
    pub fn bounds(&mut self) -> Vec<i32> {
        match self.inner.bounds() {
            (true, r) => vec![r.x, r.y, r.width, r.height],
            (false, _) => Vec::new(),
        }
    }

    pub fn is_empty(&mut self) -> bool {
        self.inner.is_empty()
    }

    pub fn combine_rect(&mut self, op: u8, x: i32, y: i32, width: i32, height: i32) -> Result<(), JsValue> {
        self.inner.combine_rect(op_from_code(op)?, Rect::new(x, y, width, height), false);
        Ok(())
    }

    pub fn combine_ellipse(
        &mut self,
        op: u8,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        antialias: bool,
    ) -> Result<(), JsValue> {
        self.inner
            .combine_ellipse(op_from_code(op)?, Rect::new(x, y, width, height), antialias, false)
            .map_err(to_js)
    }

    /// Polygon from flat `[x0, y0, x1, y1, ...]` coordinates.
    pub fn combine_polygon(&mut self, op: u8, coords: &[f64], antialias: bool) -> Result<(), JsValue> {
        let points: Vec<(f64, f64)> = coords.chunks_exact(2).map(|p| (p[0], p[1])).collect();
        self.inner
            .combine_polygon(op_from_code(op)?, &points, antialias, false)
            .map_err(to_js)
    }

    pub fn grow(&mut self, radius_x: i32, radius_y: i32) {
        self.inner.grow(radius_x, radius_y, false);
    }

    pub fn shrink(&mut self, radius_x: i32, radius_y: i32, edge_lock: bool) {
        self.inner.shrink(radius_x, radius_y, edge_lock, false);
    }

    pub fn border(&mut self, radius_x: i32, radius_y: i32, feather: bool, edge_lock: bool) {
        self.inner.border(radius_x, radius_y, feather, edge_lock, false);
    }

    pub fn feather(&mut self, radius_x: f64, radius_y: f64) {
        self.inner.feather(radius_x, radius_y, false);
    }

    pub fn sharpen(&mut self) {
        self.inner.sharpen(false);
    }

    pub fn invert(&mut self) {
        self.inner.invert(false);
    }

    pub fn clear(&mut self) {
        self.inner.clear(false);
    }

    pub fn all(&mut self) {
        self.inner.all(false);
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.inner.translate(dx, dy, false);
    }

    /// Clockwise quarter turns: 1, 2 or 3.
    pub fn rotate(&mut self, quarter_turns: u8) -> Result<(), JsValue> {
        let rotation = match quarter_turns % 4 {
            1 => Rotation::Rotate90,
            2 => Rotation::Rotate180,
            3 => Rotation::Rotate270,
            _ => return Ok(()),
        };
        self.inner.rotate(rotation, false);
        Ok(())
    }

    pub fn scale(&mut self, width: i32, height: i32, linear: bool) -> Result<(), JsValue> {
        let interpolation = if linear { Interpolation::Linear } else { Interpolation::Nearest };
        self.inner.scale(width, height, 0, 0, interpolation, false).map_err(to_js)
    }

    /// Outer outlines for marching ants, flattened.
    pub fn outlines(&mut self) -> Vec<f32> {
        let (_, _, outer) = self.inner.boundary(None);
        outlines_to_flat(&outlines(outer))
    }
}

// ============================================================================
// Magic wand
// ============================================================================

/// Magic wand selection on RGBA u8 data.
///
/// # Arguments
/// * `data` - Flat array of RGBA bytes (length = width * height * 4)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `x`, `y` - Seed pixel
/// * `threshold` - Color distance threshold (0-255)
/// * `contiguous` - Only select the region connected to the seed
///
/// # Returns
/// Flat mask bytes (length = width * height)
#[wasm_bindgen]
pub fn magic_wand_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    x: usize,
    y: usize,
    threshold: u8,
    contiguous: bool,
) -> Result<Vec<u8>, JsValue> {
    let options = MagicWandOptions {
        threshold,
        ..Default::default()
    };
    let mask = magic_wand_select(data, width, height, x, y, &options, contiguous).map_err(to_js)?;
    Ok(mask.into_vec())
}
