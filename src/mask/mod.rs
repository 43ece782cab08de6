//! Raster mask storage, its caches and the stateless mask kernels.
//!
//! - **raster**: the `u8` intensity buffer
//! - **bounds** / **boundary**: lazily computed bounding box and outline
//! - **combine** / **scan_convert**: merging shapes and buffers into a mask
//! - **morphology**: grow, shrink, border, feather, threshold, invert
//!
//! Everything here is free of owner state; [`crate::selection`] wires
//! these pieces together.

pub mod boundary;
pub mod bounds;
pub mod combine;
pub mod morphology;
pub mod raster;
pub mod scan_convert;
pub mod transform;

pub use boundary::{find_boundary, outlines, BoundaryCache, BoundaryPolicy, Outline, Segment, SegmentKind};
pub use bounds::BoundsCache;
pub use combine::{combine_buffer, combine_ellipse, combine_ellipse_rect, combine_mask, combine_rect, ChannelOp};
pub use raster::{RasterMask, MASK_HALF, MASK_MAX};
pub use scan_convert::combine_polygon;
pub use transform::{Interpolation, Rotation};
