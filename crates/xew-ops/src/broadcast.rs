//! Axis-based broadcast alignment for binary elementwise kernels.
//!
//! Device primitives take two shape vectors of the same length, one per
//! operand, where every position either matches or holds a 1 on one side.
//! [`resolve_aligned`] builds that pair from the operands' declared shapes:
//!
//! 1. Both vectors start as all-ones of the output rank.
//! 2. Equal ranks are copied position by position.
//! 3. Otherwise the higher-rank shape is copied as-is and the lower-rank one is
//!    placed at offset `axis`, or right-aligned when `axis == -1`.
//! 4. Every position written by both operands must be equal or have a 1.

use smallvec::SmallVec;
use xew_core::{Result, Shape, XewError, checked_numel};

/// Inline storage for an aligned shape vector.
pub type AlignedDims = SmallVec<[i64; 6]>;

/// Two shape vectors of identical rank, broadcast-compatible at every position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlignedShapes {
    pub x: AlignedDims,
    pub y: AlignedDims,
}

impl AlignedShapes {
    fn ones(rank: usize) -> Self {
        Self {
            x: SmallVec::from_elem(1, rank),
            y: SmallVec::from_elem(1, rank),
        }
    }

    pub fn rank(&self) -> usize {
        self.x.len()
    }

    /// Per-position broadcast result: the non-1 dim where there is one.
    pub fn output_dims(&self) -> AlignedDims {
        self.x
            .iter()
            .zip(&self.y)
            .map(|(&dx, &dy)| if dx == 1 { dy } else { dx })
            .collect()
    }

    /// Number of elements the primitive writes, or `None` on overflow.
    pub fn output_numel(&self) -> Option<i64> {
        checked_numel(&self.output_dims())
    }
}

/// Right-aligned NumPy output shape of two operands.
pub fn broadcast_shapes(a: &Shape, b: &Shape) -> Option<Shape> {
    Shape::broadcast_shapes(a, b)
}

/// Align `x` and `y` to `output_rank` following the elementwise axis rule.
///
/// `axis` is only consulted when the ranks differ: `-1` right-aligns the
/// lower-rank operand against the higher-rank one, `k >= 0` places its first
/// dim at position `k`.
pub fn resolve_aligned(
    output_rank: usize,
    x: &Shape,
    y: &Shape,
    axis: i32,
) -> Result<AlignedShapes> {
    let input_rank = x.ndim().max(y.ndim());
    if output_rank < input_rank {
        return Err(XewError::OutputRankTooSmall {
            output_rank,
            input_rank,
        });
    }

    let mut aligned = AlignedShapes::ones(output_rank);

    if x.ndim() == y.ndim() {
        for (i, (&dx, &dy)) in x.0.iter().zip(&y.0).enumerate() {
            aligned.x[i] = dx;
            aligned.y[i] = dy;
            if !compatible(dx, dy) {
                return Err(incompatible(i, dx, dy, x, y));
            }
        }
        return Ok(aligned);
    }

    let (larger, smaller) = if x.ndim() > y.ndim() { (x, y) } else { (y, x) };
    let offset = axis_offset(axis, larger.ndim(), smaller.ndim(), output_rank)?;

    let (larger_out, smaller_out) = if x.ndim() > y.ndim() {
        (&mut aligned.x, &mut aligned.y)
    } else {
        (&mut aligned.y, &mut aligned.x)
    };
    larger_out[..larger.ndim()].copy_from_slice(&larger.0);

    for (j, &ds) in smaller.0.iter().enumerate() {
        let pos = offset + j;
        smaller_out[pos] = ds;
        let dl = larger_out[pos];
        if !compatible(dl, ds) {
            let (dx, dy) = if x.ndim() > y.ndim() { (dl, ds) } else { (ds, dl) };
            return Err(incompatible(pos, dx, dy, x, y));
        }
    }

    Ok(aligned)
}

fn axis_offset(axis: i32, larger: usize, smaller: usize, output_rank: usize) -> Result<usize> {
    let offset = match axis {
        -1 => larger - smaller,
        a if a >= 0 => a as usize,
        a => return Err(XewError::InvalidAxis(a)),
    };
    if offset + smaller > output_rank {
        return Err(XewError::AxisOutOfRange {
            axis,
            smaller_rank: smaller,
            output_rank,
        });
    }
    Ok(offset)
}

fn compatible(a: i64, b: i64) -> bool {
    a == b || a == 1 || b == 1
}

fn incompatible(position: usize, x_dim: i64, y_dim: i64, x: &Shape, y: &Shape) -> XewError {
    XewError::ShapeIncompatible {
        position,
        x_dim,
        y_dim,
        x: x.clone(),
        y: y.clone(),
    }
}
