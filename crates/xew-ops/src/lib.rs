//! Broadcast shape resolution for binary elementwise ops.

pub mod broadcast;

pub use broadcast::{AlignedDims, AlignedShapes, broadcast_shapes, resolve_aligned};
