use std::error::Error as StdError;

use thiserror::Error;

use crate::dtype::DType;
use crate::shape::Shape;

pub type Result<T> = std::result::Result<T, BoxError>;

/// Errors raised while forwarding an operation to a backend.
///
/// Messages follow numpy's wording so failures read the same on every
/// interface. Errors produced by a backend library itself are carried
/// unchanged in [`BoxError::Backend`].
#[derive(Debug, Error)]
pub enum BoxError {
    #[error("operands could not be broadcast together with shapes {lhs} {rhs}")]
    Broadcast { lhs: Shape, rhs: Shape },

    #[error("axis {axis} is out of bounds for array of dimension {ndim}")]
    AxisOutOfBounds { axis: isize, ndim: usize },

    #[error("duplicate value in 'axis': {axis}")]
    DuplicateAxis { axis: usize },

    #[error("index {index} is out of bounds for axis {axis} with size {size}")]
    IndexOutOfBounds {
        index: isize,
        axis: usize,
        size: usize,
    },

    #[error("shapes {lhs} and {rhs} not aligned: {lhs_len} (dim {lhs_axis}) != {rhs_len} (dim {rhs_axis})")]
    NotAligned {
        lhs: Shape,
        rhs: Shape,
        lhs_axis: usize,
        lhs_len: usize,
        rhs_axis: usize,
        rhs_len: usize,
    },

    #[error("all input arrays must have the same shape, expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    #[error("need at least one array to {op}")]
    EmptyInput { op: &'static str },

    #[error("zero-dimensional arrays cannot be concatenated")]
    ZeroDimConcat,

    #[error("arrays used as indices must be of integer type, got {0}")]
    NonIntegerIndices(DType),

    #[error("{interface}: {op} does not support dtype {dtype}")]
    UnsupportedDType {
        op: &'static str,
        dtype: DType,
        interface: &'static str,
    },

    #[error("{interface}: {op} is not supported")]
    UnsupportedOperation {
        op: &'static str,
        interface: &'static str,
    },

    #[error("unknown interface '{0}'")]
    UnknownInterface(String),

    #[error("data type '{0}' not understood")]
    UnknownDType(String),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error("{source}")]
    Backend {
        interface: &'static str,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl BoxError {
    /// Wrap an error raised by a backend library.
    pub fn backend(interface: &'static str, err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        BoxError::Backend {
            interface,
            source: err.into(),
        }
    }
}
