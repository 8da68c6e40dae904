//! Generic broadcast dispatcher over one device primitive.

use libc::c_int;
use smallvec::SmallVec;
use tracing::{trace, warn};
use xew_core::{DType, OperatorKind, Precision, Result, Shape, TensorMut, TensorRef, XewError};
use xew_ops::{AlignedDims, resolve_aligned};

use crate::context::XpuContext;
use crate::functor::{Primitive, XpuElement};

type DeviceDims = SmallVec<[c_int; 6]>;

/// Broadcast elementwise kernel fixed to one (element type, op, precision).
pub struct BroadcastDispatcher<T: XpuElement> {
    op: OperatorKind,
    precision: Precision,
    primitive: Primitive<T>,
}

impl<T: XpuElement> BroadcastDispatcher<T> {
    /// Dispatcher bound to the device primitive for `(T, op)`.
    pub fn new(op: OperatorKind, precision: Precision) -> Result<Self> {
        let primitive = T::primitive(op).ok_or(XewError::UnsupportedKernel {
            op,
            dtype: T::DTYPE,
        })?;
        Ok(Self::with_primitive(op, precision, primitive))
    }

    pub fn with_primitive(op: OperatorKind, precision: Precision, primitive: Primitive<T>) -> Self {
        Self {
            op,
            precision,
            primitive,
        }
    }

    pub fn op(&self) -> OperatorKind {
        self.op
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Compute `out = op(x, y)` with broadcasting.
    ///
    /// The output rank comes from `out.shape`. `axis` places the lower-rank
    /// operand when the input ranks differ (`-1` right-aligns it). Only the
    /// output buffer is written, and only when every check passes.
    pub fn execute(
        &self,
        ctx: &XpuContext,
        x: TensorRef<'_, T>,
        y: TensorRef<'_, T>,
        out: TensorMut<'_, T>,
        axis: i32,
    ) -> Result<()> {
        let aligned = resolve_aligned(out.shape.ndim(), x.shape, y.shape, axis)?;

        check_len("X", x.data.len(), x.shape)?;
        check_len("Y", y.data.len(), y.shape)?;
        check_len("Out", out.data.len(), out.shape)?;
        let expected = aligned.output_dims();
        if expected.as_slice() != out.shape.dims() {
            return Err(XewError::ShapeMismatch {
                expected: expected.to_vec(),
                got: out.shape.dims().to_vec(),
            });
        }

        let xs = device_dims(&aligned.x)?;
        let ys = device_dims(&aligned.y)?;

        trace!(
            op = %self.op,
            dtype = %T::DTYPE,
            x = ?xs.as_slice(),
            y = ?ys.as_slice(),
            "launching broadcast primitive"
        );

        // SAFETY: buffer lengths match the aligned shapes checked above, and
        // the context handle is live for the duration of `ctx`.
        let code = unsafe {
            (self.primitive)(
                ctx.as_ptr(),
                x.data.as_ptr(),
                y.data.as_ptr(),
                out.data.as_mut_ptr(),
                xs.as_ptr(),
                xs.len(),
                ys.as_ptr(),
                ys.len(),
            )
        };

        if code != 0 {
            warn!(op = %self.op, dtype = %T::DTYPE, code, "broadcast primitive failed");
            return Err(XewError::ComputeFailed {
                op: self.op,
                dtype: T::DTYPE,
                code,
            });
        }
        Ok(())
    }
}

impl<T: XpuElement> std::fmt::Debug for BroadcastDispatcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastDispatcher")
            .field("op", &self.op)
            .field("dtype", &T::DTYPE)
            .field("precision", &self.precision)
            .finish()
    }
}

fn check_len(port: &'static str, len: usize, shape: &Shape) -> Result<()> {
    let expected = shape
        .numel()
        .ok_or_else(|| XewError::ElementCountOverflow(shape.clone()))?;
    if i64::try_from(len).ok() != Some(expected) {
        return Err(XewError::BufferSizeMismatch {
            port,
            len,
            expected,
        });
    }
    Ok(())
}

fn device_dims(dims: &AlignedDims) -> Result<DeviceDims> {
    dims.iter()
        .map(|&d| c_int::try_from(d).map_err(|_| XewError::DimensionOverflow(d)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceGeneration;
    use std::cell::RefCell;
    use xew_sys::xew_context_t;

    thread_local! {
        static SEEN: RefCell<Vec<(Vec<c_int>, Vec<c_int>)>> = const { RefCell::new(Vec::new()) };
    }

    const SENTINEL: f32 = 42.0;

    /// Records the shapes it is handed and fills the output with `SENTINEL`.
    unsafe extern "C" fn record_shapes(
        _ctx: *mut xew_context_t,
        _x: *const f32,
        _y: *const f32,
        z: *mut f32,
        x_shape: *const c_int,
        x_len: usize,
        y_shape: *const c_int,
        y_len: usize,
    ) -> c_int {
        let xs = unsafe { std::slice::from_raw_parts(x_shape, x_len) }.to_vec();
        let ys = unsafe { std::slice::from_raw_parts(y_shape, y_len) }.to_vec();
        let out_len: usize = xs
            .iter()
            .zip(&ys)
            .map(|(&dx, &dy)| (if dx == 1 { dy } else { dx }) as usize)
            .product();
        unsafe { std::slice::from_raw_parts_mut(z, out_len) }.fill(SENTINEL);
        SEEN.with(|s| s.borrow_mut().push((xs, ys)));
        0
    }

    unsafe extern "C" fn always_fails(
        _ctx: *mut xew_context_t,
        _x: *const f32,
        _y: *const f32,
        _z: *mut f32,
        _x_shape: *const c_int,
        _x_len: usize,
        _y_shape: *const c_int,
        _y_len: usize,
    ) -> c_int {
        7
    }

    fn ctx() -> XpuContext {
        XpuContext::new(DeviceGeneration::Xpu2).unwrap()
    }

    fn take_seen() -> Vec<(Vec<c_int>, Vec<c_int>)> {
        SEEN.with(|s| std::mem::take(&mut *s.borrow_mut()))
    }

    #[test]
    fn test_passes_aligned_shapes_to_primitive() {
        let ctx = ctx();
        let d = BroadcastDispatcher::<f32>::with_primitive(
            OperatorKind::Add,
            Precision::Float,
            record_shapes,
        );
        let (xs, ys, os) = (
            Shape::new(vec![2, 1, 4]),
            Shape::new(vec![3, 4]),
            Shape::new(vec![2, 3, 4]),
        );
        let x = vec![0.0f32; 8];
        let y = vec![0.0f32; 12];
        let mut out = vec![0.0f32; 24];
        take_seen();
        d.execute(
            &ctx,
            TensorRef::new(&x, &xs),
            TensorRef::new(&y, &ys),
            TensorMut::new(&mut out, &os),
            -1,
        )
        .unwrap();
        assert_eq!(take_seen(), vec![(vec![2, 1, 4], vec![1, 3, 4])]);
        assert!(out.iter().all(|&v| v == SENTINEL));
    }

    #[test]
    fn test_overflowing_element_count_rejected() {
        let ctx = ctx();
        let d = BroadcastDispatcher::<f32>::with_primitive(
            OperatorKind::Add,
            Precision::Float,
            record_shapes,
        );
        let huge = Shape::new(vec![1 << 30, 1 << 30, 16]);
        let empty: [f32; 0] = [];
        let mut out: [f32; 0] = [];
        take_seen();
        let err = d
            .execute(
                &ctx,
                TensorRef::new(&empty, &huge),
                TensorRef::new(&empty, &huge),
                TensorMut::new(&mut out, &huge),
                -1,
            )
            .unwrap_err();
        assert_eq!(err, XewError::ElementCountOverflow(huge.clone()));
        assert!(take_seen().is_empty());
    }

    #[test]
    fn test_nonzero_code_is_compute_failure() {
        let ctx = ctx();
        let d = BroadcastDispatcher::<f32>::with_primitive(
            OperatorKind::Div,
            Precision::Float,
            always_fails,
        );
        let s = Shape::new(vec![5]);
        let x = [1.0f32; 5];
        let mut out = [0.0f32; 5];
        let err = d
            .execute(
                &ctx,
                TensorRef::new(&x, &s),
                TensorRef::new(&x, &s),
                TensorMut::new(&mut out, &s),
                -1,
            )
            .unwrap_err();
        assert_eq!(
            err,
            XewError::ComputeFailed {
                op: OperatorKind::Div,
                dtype: DType::F32,
                code: 7,
            }
        );
    }

    #[test]
    fn test_incompatible_shapes_never_launch() {
        let ctx = ctx();
        let d = BroadcastDispatcher::<f32>::with_primitive(
            OperatorKind::Add,
            Precision::Float,
            record_shapes,
        );
        let (xs, ys) = (Shape::new(vec![2, 3]), Shape::new(vec![4]));
        let x = [0.0f32; 6];
        let y = [0.0f32; 4];
        let mut out = [0.0f32; 6];
        take_seen();
        let err = d
            .execute(
                &ctx,
                TensorRef::new(&x, &xs),
                TensorRef::new(&y, &ys),
                TensorMut::new(&mut out, &xs),
                -1,
            )
            .unwrap_err();
        assert!(matches!(err, XewError::ShapeIncompatible { position: 1, .. }));
        assert!(take_seen().is_empty());
    }

    #[test]
    fn test_short_buffer_rejected() {
        let ctx = ctx();
        let d = BroadcastDispatcher::<f32>::with_primitive(
            OperatorKind::Add,
            Precision::Float,
            record_shapes,
        );
        let s = Shape::new(vec![2, 3]);
        let x = [0.0f32; 6];
        let y = [0.0f32; 5];
        let mut out = [0.0f32; 6];
        let err = d
            .execute(
                &ctx,
                TensorRef::new(&x, &s),
                TensorRef::new(&y, &s),
                TensorMut::new(&mut out, &s),
                -1,
            )
            .unwrap_err();
        assert_eq!(
            err,
            XewError::BufferSizeMismatch {
                port: "Y",
                len: 5,
                expected: 6,
            }
        );
    }

    #[test]
    fn test_output_shape_must_match_broadcast() {
        let ctx = ctx();
        let d = BroadcastDispatcher::<f32>::with_primitive(
            OperatorKind::Add,
            Precision::Float,
            record_shapes,
        );
        let (s, wrong) = (Shape::new(vec![2, 3]), Shape::new(vec![3, 2]));
        let x = [0.0f32; 6];
        let mut out = [0.0f32; 6];
        let err = d
            .execute(
                &ctx,
                TensorRef::new(&x, &s),
                TensorRef::new(&x, &s),
                TensorMut::new(&mut out, &wrong),
                -1,
            )
            .unwrap_err();
        assert_eq!(
            err,
            XewError::ShapeMismatch {
                expected: vec![2, 3],
                got: vec![3, 2],
            }
        );
    }

    #[test]
    fn test_dimension_overflow() {
        let dims: AlignedDims = smallvec::smallvec![1, i64::from(c_int::MAX) + 1];
        assert_eq!(
            device_dims(&dims).unwrap_err(),
            XewError::DimensionOverflow(i64::from(c_int::MAX) + 1)
        );
    }

    #[test]
    fn test_unsupported_combination() {
        let err =
            BroadcastDispatcher::<i32>::new(OperatorKind::Div, Precision::Float).unwrap_err();
        assert_eq!(
            err,
            XewError::UnsupportedKernel {
                op: OperatorKind::Div,
                dtype: DType::I32,
            }
        );
    }
}
