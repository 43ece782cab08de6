//! Python bindings via PyO3.
//!
//! Exposes `SelectionMask` as a class backed by numpy `uint8` arrays, plus
//! the stateless magic wand.

use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2, PyReadonlyArray3};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::error::MaskError;
use crate::geometry::Rect;
use crate::mask::boundary::outlines;
use crate::mask::combine::ChannelOp;
use crate::mask::raster::RasterMask;
use crate::mask::transform::{Interpolation, Rotation};
use crate::selection::magic_wand::{self, MagicWandOptions, SelectCriterion};
use crate::selection::mask::{ChannelKind, SelectionMask};

impl From<MaskError> for PyErr {
    fn from(err: MaskError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

fn parse_op(op: &str) -> PyResult<ChannelOp> {
    match op {
        "replace" => Ok(ChannelOp::Replace),
        "add" => Ok(ChannelOp::Add),
        "subtract" => Ok(ChannelOp::Subtract),
        "intersect" => Ok(ChannelOp::Intersect),
        other => Err(PyValueError::new_err(format!("unknown channel op '{}'", other))),
    }
}

fn parse_criterion(criterion: &str) -> PyResult<SelectCriterion> {
    match criterion {
        "composite" => Ok(SelectCriterion::Composite),
        "red" => Ok(SelectCriterion::Red),
        "green" => Ok(SelectCriterion::Green),
        "blue" => Ok(SelectCriterion::Blue),
        "alpha" => Ok(SelectCriterion::Alpha),
        other => Err(PyValueError::new_err(format!("unknown select criterion '{}'", other))),
    }
}

fn rect_tuple(rect: Rect) -> (i32, i32, i32, i32) {
    (rect.x, rect.y, rect.width, rect.height)
}

// ============================================================================
// SelectionMask
// ============================================================================

/// Selection mask with cached bounds and boundary.
#[pyclass(name = "SelectionMask", unsendable)]
pub struct PySelectionMask {
    inner: SelectionMask,
}

#[pymethods]
impl PySelectionMask {
    #[new]
    fn new(width: i32, height: i32) -> PyResult<Self> {
        Ok(Self {
            inner: SelectionMask::new(width, height, ChannelKind::Selection)?,
        })
    }

    /// Build from a (height, width) uint8 array.
    #[staticmethod]
    fn from_array(mask: PyReadonlyArray2<'_, u8>) -> PyResult<Self> {
        let view = mask.as_array();
        let (height, width) = view.dim();
        let raster = RasterMask::from_vec(width as i32, height as i32, view.iter().copied().collect())?;
        Ok(Self {
            inner: SelectionMask::from_raster(raster, ChannelKind::Selection),
        })
    }

    /// Copy of the pixels as a (height, width) uint8 array.
    fn to_array<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<u8>> {
        self.inner.raster().view().to_owned().into_pyarray(py)
    }

    #[getter]
    fn width(&self) -> i32 {
        self.inner.width()
    }

    #[getter]
    fn height(&self) -> i32 {
        self.inner.height()
    }

    /// (non_empty, (x, y, width, height))
    fn bounds(&mut self) -> (bool, (i32, i32, i32, i32)) {
        let (non_empty, rect) = self.inner.bounds();
        (non_empty, rect_tuple(rect))
    }

    fn is_empty(&mut self) -> bool {
        self.inner.is_empty()
    }

    fn sample(&self, x: i32, y: i32) -> u8 {
        self.inner.sample(x, y)
    }

    fn combine_rect(&mut self, op: &str, x: i32, y: i32, width: i32, height: i32) -> PyResult<()> {
        self.inner.combine_rect(parse_op(op)?, Rect::new(x, y, width, height), false);
        Ok(())
    }

    #[pyo3(signature = (op, x, y, width, height, antialias=true))]
    fn combine_ellipse(&mut self, op: &str, x: i32, y: i32, width: i32, height: i32, antialias: bool) -> PyResult<()> {
        self.inner
            .combine_ellipse(parse_op(op)?, Rect::new(x, y, width, height), antialias, false)?;
        Ok(())
    }

    #[pyo3(signature = (op, points, antialias=true))]
    fn combine_polygon(&mut self, op: &str, points: Vec<(f64, f64)>, antialias: bool) -> PyResult<()> {
        self.inner.combine_polygon(parse_op(op)?, &points, antialias, false)?;
        Ok(())
    }

    #[pyo3(signature = (op, mask, offset_x=0, offset_y=0))]
    fn combine_array(&mut self, op: &str, mask: PyReadonlyArray2<'_, u8>, offset_x: i32, offset_y: i32) -> PyResult<()> {
        self.inner
            .combine_buffer(mask.as_array(), parse_op(op)?, offset_x, offset_y, false);
        Ok(())
    }

    fn grow(&mut self, radius_x: i32, radius_y: i32) {
        self.inner.grow(radius_x, radius_y, false);
    }

    #[pyo3(signature = (radius_x, radius_y, edge_lock=false))]
    fn shrink(&mut self, radius_x: i32, radius_y: i32, edge_lock: bool) {
        self.inner.shrink(radius_x, radius_y, edge_lock, false);
    }

    #[pyo3(signature = (radius_x, radius_y, feather=false, edge_lock=false))]
    fn border(&mut self, radius_x: i32, radius_y: i32, feather: bool, edge_lock: bool) {
        self.inner.border(radius_x, radius_y, feather, edge_lock, false);
    }

    fn feather(&mut self, radius_x: f64, radius_y: f64) {
        self.inner.feather(radius_x, radius_y, false);
    }

    fn sharpen(&mut self) {
        self.inner.sharpen(false);
    }

    fn invert(&mut self) {
        self.inner.invert(false);
    }

    fn clear(&mut self) {
        self.inner.clear(false);
    }

    fn all(&mut self) {
        self.inner.all(false);
    }

    fn translate(&mut self, dx: i32, dy: i32) {
        self.inner.translate(dx, dy, false);
    }

    /// Clockwise rotation by 90, 180 or 270 degrees.
    fn rotate(&mut self, degrees: i32) -> PyResult<()> {
        let rotation = match degrees.rem_euclid(360) {
            90 => Rotation::Rotate90,
            180 => Rotation::Rotate180,
            270 => Rotation::Rotate270,
            _ => return Err(PyValueError::new_err(format!("rotation must be a quarter turn, got {}", degrees))),
        };
        self.inner.rotate(rotation, false);
        Ok(())
    }

    #[pyo3(signature = (width, height, linear=false))]
    fn scale(&mut self, width: i32, height: i32, linear: bool) -> PyResult<()> {
        let interpolation = if linear { Interpolation::Linear } else { Interpolation::Nearest };
        self.inner.scale(width, height, 0, 0, interpolation, false)?;
        Ok(())
    }

    /// Outer boundary segments as (x1, y1, x2, y2) tuples.
    fn boundary(&mut self) -> Vec<(i32, i32, i32, i32)> {
        let (_, _, outer) = self.inner.boundary(None);
        outer.iter().map(|s| (s.x1, s.y1, s.x2, s.y2)).collect()
    }

    /// SVG path data for every closed outer outline.
    fn outline_svg_paths(&mut self) -> Vec<String> {
        let (_, _, outer) = self.inner.boundary(None);
        outlines(outer).iter().map(|o| o.to_svg_path()).collect()
    }
}

// ============================================================================
// Magic wand
// ============================================================================

/// Magic wand on an RGBA uint8 image of shape (height, width, 4).
///
/// Returns a (height, width) uint8 mask.
#[pyfunction]
#[pyo3(signature = (image, x, y, threshold=15, antialias=true, contiguous=true, criterion="composite"))]
#[allow(clippy::too_many_arguments)]
pub fn magic_wand<'py>(
    py: Python<'py>,
    image: PyReadonlyArray3<'py, u8>,
    x: usize,
    y: usize,
    threshold: u8,
    antialias: bool,
    contiguous: bool,
    criterion: &str,
) -> PyResult<Bound<'py, PyArray2<u8>>> {
    let view = image.as_array();
    let (height, width, channels) = view.dim();
    if channels != 4 {
        return Err(PyValueError::new_err("magic_wand expects an RGBA image"));
    }

    let options = MagicWandOptions {
        threshold,
        antialias,
        criterion: parse_criterion(criterion)?,
        ..Default::default()
    };
    let data: Vec<u8> = view.iter().copied().collect();
    let mask = magic_wand::magic_wand_select(&data, width, height, x, y, &options, contiguous)?;
    Ok(mask.view().to_owned().into_pyarray(py))
}

/// Selmask extension module
#[pymodule]
pub fn selmask(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySelectionMask>()?;
    m.add_function(wrap_pyfunction!(magic_wand, m)?)?;
    Ok(())
}
