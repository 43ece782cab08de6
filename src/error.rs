//! Error type shared by every mask operation.

use crate::mask::combine::ChannelOp;

/// Errors raised by mask construction and the mask operators.
///
/// Radius arguments that the operators define as "silently ignored"
/// (negative border radius, mixed-sign grow) never produce an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaskError {
    #[error("invalid mask dimensions {width}x{height}, both must be positive")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("could not allocate a {width}x{height} mask buffer")]
    Allocation { width: i32, height: i32 },

    #[error("buffer holds {actual} samples but {width}x{height} needs {expected}")]
    BufferSize {
        width: i32,
        height: i32,
        expected: usize,
        actual: usize,
    },

    #[error("expected a {expected_width}x{expected_height} mask, got {width}x{height}")]
    SizeMismatch {
        expected_width: i32,
        expected_height: i32,
        width: i32,
        height: i32,
    },

    #[error("{op:?} is not supported by {combiner}")]
    UnsupportedOperation {
        op: ChannelOp,
        combiner: &'static str,
    },

    #[error("pop_stroking called while the mask is not being stroked")]
    NotStroking,

    #[error("there is no selection to stroke")]
    NothingToStroke,

    #[error("a polygon needs at least three points, got {0}")]
    InvalidPolygon(usize),
}

pub type Result<T> = std::result::Result<T, MaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_problem() {
        let err = MaskError::InvalidDimensions { width: 0, height: 5 };
        assert_eq!(
            err.to_string(),
            "invalid mask dimensions 0x5, both must be positive"
        );

        let err = MaskError::UnsupportedOperation {
            op: ChannelOp::Intersect,
            combiner: "combine_ellipse_rect",
        };
        assert_eq!(err.to_string(), "Intersect is not supported by combine_ellipse_rect");
    }
}
