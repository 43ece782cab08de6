//! Selection masks and the tools that build them.
//!
//! - **mask**: [`SelectionMask`], the stateful mask with cached bounds and
//!   boundary, undo and change notification
//! - **select**: rectangle, ellipse, polygon and buffer select helpers
//! - **magic_wand**: flood fill and select-by-color regions

pub mod magic_wand;
pub mod mask;
pub mod select;

pub use magic_wand::{magic_wand_select, MagicWandOptions, SelectCriterion};
pub use mask::{
    ChannelKind, MaskAction, MaskColor, MaskEvent, MaskHost, MaskSnapshot, Orientation, SelectionMask,
};
pub use select::SelectOptions;
