//! Core type definitions: DType, Precision, Target, DataLayout, Shape.

/// Element types the XPU elementwise kernels operate on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DType {
    F32,
    F16,
    I32,
    I64,
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F16 => write!(f, "f16"),
            DType::I32 => write!(f, "i32"),
            DType::I64 => write!(f, "i64"),
        }
    }
}

/// Precision tag carried by kernels and by each kernel port.
///
/// Kernel-level precision is `Float` for the float32, int32 and int64
/// kernels and `Fp16` for the float16 ones. Port precision always follows the
/// tensor's element type, see [`Precision::of`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Precision {
    Float,
    Fp16,
    Int32,
    Int64,
}

impl Precision {
    /// Port precision of a tensor holding `dtype` elements.
    pub fn of(dtype: DType) -> Self {
        match dtype {
            DType::F32 => Precision::Float,
            DType::F16 => Precision::Fp16,
            DType::I32 => Precision::Int32,
            DType::I64 => Precision::Int64,
        }
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precision::Float => write!(f, "float"),
            Precision::Fp16 => write!(f, "fp16"),
            Precision::Int32 => write!(f, "int32"),
            Precision::Int64 => write!(f, "int64"),
        }
    }
}

/// Device a kernel or tensor lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    Xpu,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Xpu => write!(f, "xpu"),
        }
    }
}

/// Tensor data layout. Elementwise kernels only see flat N-d shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataLayout {
    Nchw,
}

impl std::fmt::Display for DataLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataLayout::Nchw => write!(f, "NCHW"),
        }
    }
}

/// Tensor shape (dimensions).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shape(pub Vec<i64>);

impl Shape {
    pub fn new(dims: impl Into<Vec<i64>>) -> Self {
        Self(dims.into())
    }

    pub fn dims(&self) -> &[i64] {
        &self.0
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements, or `None` if the product overflows `i64`.
    pub fn numel(&self) -> Option<i64> {
        checked_numel(&self.0)
    }

    /// Right-aligned NumPy broadcast of two shapes, or `None` if some
    /// trailing position holds two different dims, neither of them 1.
    ///
    /// This is the shape an output tensor needs for an `axis = -1` launch.
    pub fn broadcast_shapes(a: &Shape, b: &Shape) -> Option<Shape> {
        let rank = a.ndim().max(b.ndim());
        let pad = |s: &Shape, i: usize| {
            let offset = rank - s.ndim();
            if i < offset { 1 } else { s.0[i - offset] }
        };

        let mut dims = Vec::with_capacity(rank);
        for i in 0..rank {
            let (da, db) = (pad(a, i), pad(b, i));
            match (da, db) {
                _ if da == db => dims.push(da),
                (1, _) => dims.push(db),
                (_, 1) => dims.push(da),
                _ => return None,
            }
        }
        Some(Shape(dims))
    }
}

/// Product of `dims` with overflow reported as `None`.
pub fn checked_numel(dims: &[i64]) -> Option<i64> {
    dims.iter().try_fold(1i64, |acc, &d| acc.checked_mul(d))
}

impl From<&[i64]> for Shape {
    fn from(dims: &[i64]) -> Self {
        Self(dims.to_vec())
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_numel() {
        assert_eq!(Shape::new(vec![2, 3, 4]).numel(), Some(24));
        assert_eq!(Shape::new(vec![]).numel(), Some(1));
        assert_eq!(Shape::new(vec![0, 5]).numel(), Some(0));
    }

    #[test]
    fn test_shape_numel_overflow() {
        assert_eq!(Shape::new(vec![1 << 30, 1 << 30, 16]).numel(), None);
        assert_eq!(checked_numel(&[i64::MAX, 2]), None);
        assert_eq!(checked_numel(&[i64::MAX, 1]), Some(i64::MAX));
    }

    #[test]
    fn test_broadcast_shapes_right_aligned() {
        let a = Shape::new(vec![2, 1, 4]);
        let b = Shape::new(vec![3, 4]);
        assert_eq!(
            Shape::broadcast_shapes(&a, &b),
            Some(Shape::new(vec![2, 3, 4]))
        );
        assert_eq!(
            Shape::broadcast_shapes(&Shape::new(vec![2, 3]), &Shape::new(vec![4])),
            None
        );
    }

    #[test]
    fn test_precision_of_dtype() {
        assert_eq!(Precision::of(DType::F32), Precision::Float);
        assert_eq!(Precision::of(DType::F16), Precision::Fp16);
        assert_eq!(Precision::of(DType::I32), Precision::Int32);
        assert_eq!(Precision::of(DType::I64), Precision::Int64);
    }
}
