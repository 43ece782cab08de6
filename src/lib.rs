//! Selmask: selection-mask engine
//!
//! Represents an image selection as a single-channel raster mask and
//! keeps two lazily computed caches over it: the bounding box of the
//! selected pixels and the boundary outline used for marching ants and
//! stroking. Morphology and shape operators mutate the mask while keeping
//! both caches consistent.
//!
//! ## Mask Format
//! Masks are `u8` per pixel, row-major, shape `(height, width)`:
//! - `0`: unselected
//! - `255`: fully selected
//! - anything in between: partial selection from antialiasing or feathering
//!
//! Float views (`0.0-1.0`) are available for compositing.
//!
//! ## Layout
//! - [`mask`]: the raster, its caches and stateless kernels
//! - [`selection`]: [`SelectionMask`] and the select tools built on it
//! - [`resolution`]: physical size to pixel radius conversion
//!
//! Python bindings (`python` feature) and WASM bindings (`wasm` feature)
//! wrap the same API.

pub mod error;
pub mod geometry;
pub mod mask;
pub mod resolution;
pub mod selection;

#[cfg(feature = "python")]
mod python;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{MaskError, Result};
pub use geometry::Rect;
pub use mask::{BoundaryPolicy, ChannelOp, Interpolation, RasterMask, Rotation, Segment, SegmentKind, MASK_HALF, MASK_MAX};
pub use resolution::{Resolution, Unit};
pub use selection::{ChannelKind, MaskEvent, MaskHost, MaskSnapshot, SelectOptions, SelectionMask};

#[cfg(feature = "python")]
pub use python::selmask;
