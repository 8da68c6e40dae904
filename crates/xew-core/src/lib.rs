//! Core types for broadcast elementwise dispatch on the XPU.
//!
//! `xew-core` defines the vocabulary shared by the shape resolver
//! (`xew-ops`), the accelerator ABI (`xew-sys`) and the dispatcher
//! (`xew-xpu`): shapes, element types, precisions, the closed set of
//! elementwise operators, and borrowed tensor views.

pub mod op;
pub mod tensor;
pub mod types;

pub use op::OperatorKind;
pub use tensor::{
    Element, TensorArg, TensorArgMut, TensorData, TensorDataMut, TensorMut, TensorRef,
};
pub use types::{DType, DataLayout, Precision, Shape, Target, checked_numel};

pub type Result<T> = std::result::Result<T, XewError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum XewError {
    #[error(
        "shapes {x} and {y} are not broadcast-compatible at position {position}: {x_dim} vs {y_dim}"
    )]
    ShapeIncompatible {
        position: usize,
        x_dim: i64,
        y_dim: i64,
        x: Shape,
        y: Shape,
    },

    #[error("{op} ({dtype}) failed on device with code {code}")]
    ComputeFailed {
        op: OperatorKind,
        dtype: DType,
        code: i32,
    },

    #[error("invalid broadcast axis {0}: expected -1 or a non-negative offset")]
    InvalidAxis(i32),

    #[error(
        "axis {axis} places a rank-{smaller_rank} operand past output rank {output_rank}"
    )]
    AxisOutOfRange {
        axis: i32,
        smaller_rank: usize,
        output_rank: usize,
    },

    #[error("output rank {output_rank} is smaller than input rank {input_rank}")]
    OutputRankTooSmall {
        output_rank: usize,
        input_rank: usize,
    },

    #[error("output shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<i64>, got: Vec<i64> },

    #[error("element count of {0} overflows")]
    ElementCountOverflow(Shape),

    #[error("dimension {0} does not fit the device shape type")]
    DimensionOverflow(i64),

    #[error("{port} buffer holds {len} elements but its shape needs {expected}")]
    BufferSizeMismatch {
        port: &'static str,
        len: usize,
        expected: i64,
    },

    #[error("{port} buffer is {got}, kernel expects {expected}")]
    DTypeMismatch {
        port: &'static str,
        expected: DType,
        got: DType,
    },

    #[error("no {dtype} device primitive for {op}")]
    UnsupportedKernel { op: OperatorKind, dtype: DType },

    #[error("kernel {0} is already registered")]
    DuplicateKernel(String),

    #[error("no {op} kernel accepts ({x}, {y}) -> {out}")]
    NoMatchingKernel {
        op: OperatorKind,
        x: DType,
        y: DType,
        out: DType,
    },

    #[error("unknown elementwise operator: {0}")]
    UnknownOperator(String),

    #[error("device returned a null context")]
    NullPtr,
}
