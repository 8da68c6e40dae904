//! Kernel registration metadata and the type-erased kernel seam.

use std::fmt;
use std::sync::Arc;

use half::f16;
use xew_core::{
    DType, DataLayout, OperatorKind, Precision, Result, Target, TensorArg, TensorArgMut,
    XewError,
};

use crate::config::DeviceGeneration;
use crate::context::XpuContext;
use crate::dispatcher::BroadcastDispatcher;
use crate::functor::XpuElement;

/// Where a port's tensor lives and what precision it carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortType {
    pub target: Target,
    pub precision: Precision,
}

impl PortType {
    pub const fn xpu(precision: Precision) -> Self {
        Self {
            target: Target::Xpu,
            precision,
        }
    }

    fn accepts(&self, dtype: DType) -> bool {
        self.target == Target::Xpu && self.precision == Precision::of(dtype)
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.target, self.precision)
    }
}

/// Identity of a registered kernel. No two kernels share a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelKey {
    pub op: OperatorKind,
    pub target: Target,
    pub precision: Precision,
    pub layout: DataLayout,
    pub alias: &'static str,
}

impl fmt::Display for KernelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.op, self.target, self.precision, self.layout, self.alias
        )
    }
}

/// Registration record for one elementwise kernel.
///
/// The kernel precision is `Float` for every non-half type: integer kernels
/// are told apart by their alias and port types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KernelDescriptor {
    pub op: OperatorKind,
    pub target: Target,
    pub precision: Precision,
    pub layout: DataLayout,
    pub alias: &'static str,
    pub dtype: DType,
    pub x: PortType,
    pub y: PortType,
    pub out: PortType,
    /// Generation on which the kernel is not registered.
    pub disabled_on: Option<DeviceGeneration>,
}

impl KernelDescriptor {
    const fn xpu(
        op: OperatorKind,
        precision: Precision,
        alias: &'static str,
        dtype: DType,
        port: Precision,
        disabled_on: Option<DeviceGeneration>,
    ) -> Self {
        Self {
            op,
            target: Target::Xpu,
            precision,
            layout: DataLayout::Nchw,
            alias,
            dtype,
            x: PortType::xpu(port),
            y: PortType::xpu(port),
            out: PortType::xpu(port),
            disabled_on,
        }
    }

    pub const fn float32(op: OperatorKind) -> Self {
        Self::xpu(
            op,
            Precision::Float,
            "def",
            DType::F32,
            Precision::Float,
            None,
        )
    }

    pub const fn float16(op: OperatorKind, alias: &'static str) -> Self {
        Self::xpu(
            op,
            Precision::Fp16,
            alias,
            DType::F16,
            Precision::Fp16,
            Some(DeviceGeneration::Xpu1),
        )
    }

    pub const fn int32(op: OperatorKind) -> Self {
        Self::xpu(
            op,
            Precision::Float,
            "int32",
            DType::I32,
            Precision::Int32,
            None,
        )
    }

    pub const fn int64(op: OperatorKind) -> Self {
        Self::xpu(
            op,
            Precision::Float,
            "int64",
            DType::I64,
            Precision::Int64,
            None,
        )
    }

    pub fn key(&self) -> KernelKey {
        KernelKey {
            op: self.op,
            target: self.target,
            precision: self.precision,
            layout: self.layout,
            alias: self.alias,
        }
    }

    pub fn enabled_on(&self, generation: DeviceGeneration) -> bool {
        self.disabled_on != Some(generation)
    }

    /// Whether the declared port types admit tensors of these element types.
    pub fn accepts(&self, x: DType, y: DType, out: DType) -> bool {
        self.x.accepts(x) && self.y.accepts(y) && self.out.accepts(out)
    }
}

/// A launchable elementwise kernel with its element type erased.
pub trait ElementwiseKernel: Send + Sync {
    fn descriptor(&self) -> &KernelDescriptor;

    fn launch(
        &self,
        ctx: &XpuContext,
        x: TensorArg<'_>,
        y: TensorArg<'_>,
        out: TensorArgMut<'_>,
        axis: i32,
    ) -> Result<()>;
}

struct RegisteredKernel<T: XpuElement> {
    descriptor: KernelDescriptor,
    dispatcher: BroadcastDispatcher<T>,
}

impl<T: XpuElement> RegisteredKernel<T> {
    fn new(descriptor: KernelDescriptor) -> Result<Self> {
        let dispatcher = BroadcastDispatcher::new(descriptor.op, descriptor.precision)?;
        Ok(Self {
            descriptor,
            dispatcher,
        })
    }
}

impl<T: XpuElement> ElementwiseKernel for RegisteredKernel<T> {
    fn descriptor(&self) -> &KernelDescriptor {
        &self.descriptor
    }

    fn launch(
        &self,
        ctx: &XpuContext,
        x: TensorArg<'_>,
        y: TensorArg<'_>,
        out: TensorArgMut<'_>,
        axis: i32,
    ) -> Result<()> {
        let (x_dtype, y_dtype, out_dtype) = (x.dtype(), y.dtype(), out.dtype());
        let mismatch = |port, got| XewError::DTypeMismatch {
            port,
            expected: T::DTYPE,
            got,
        };
        let x = x.typed::<T>().ok_or_else(|| mismatch("X", x_dtype))?;
        let y = y.typed::<T>().ok_or_else(|| mismatch("Y", y_dtype))?;
        let out = out.typed::<T>().ok_or_else(|| mismatch("Out", out_dtype))?;
        self.dispatcher.execute(ctx, x, y, out, axis)
    }
}

/// Build the dispatcher a descriptor names, behind the type-erased seam.
pub fn instantiate(descriptor: KernelDescriptor) -> Result<Arc<dyn ElementwiseKernel>> {
    let kernel: Arc<dyn ElementwiseKernel> = match descriptor.dtype {
        DType::F32 => Arc::new(RegisteredKernel::<f32>::new(descriptor)?),
        DType::F16 => Arc::new(RegisteredKernel::<f16>::new(descriptor)?),
        DType::I32 => Arc::new(RegisteredKernel::<i32>::new(descriptor)?),
        DType::I64 => Arc::new(RegisteredKernel::<i64>::new(descriptor)?),
    };
    Ok(kernel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xew_core::Shape;

    #[test]
    fn test_int_kernels_use_float_precision() {
        let d = KernelDescriptor::int32(OperatorKind::Add);
        assert_eq!(d.precision, Precision::Float);
        assert_eq!(d.x.precision, Precision::Int32);
        assert!(d.accepts(DType::I32, DType::I32, DType::I32));
        assert!(!d.accepts(DType::F32, DType::F32, DType::F32));
    }

    #[test]
    fn test_float16_disabled_on_xpu1() {
        let d = KernelDescriptor::float16(OperatorKind::Add, "DISABLE_XPU1_AddFloat16");
        assert!(!d.enabled_on(DeviceGeneration::Xpu1));
        assert!(d.enabled_on(DeviceGeneration::Xpu2));
    }

    #[test]
    fn test_key_display() {
        let d = KernelDescriptor::float32(OperatorKind::FloorDiv);
        assert_eq!(d.key().to_string(), "elementwise_floordiv/xpu/float/NCHW/def");
    }

    #[test]
    fn test_instantiate_rejects_missing_primitive() {
        let err = instantiate(KernelDescriptor::int32(OperatorKind::Div)).err();
        assert_eq!(
            err,
            Some(XewError::UnsupportedKernel {
                op: OperatorKind::Div,
                dtype: DType::I32,
            })
        );
    }

    #[test]
    fn test_launch_rejects_wrong_buffer_type() {
        let ctx = XpuContext::new(DeviceGeneration::Xpu2).unwrap();
        let kernel = instantiate(KernelDescriptor::float32(OperatorKind::Add)).unwrap();
        let s = Shape::new(vec![2]);
        let x = [1.0f32, 2.0];
        let y = [1i32, 2];
        let mut out = [0.0f32; 2];
        let err = kernel
            .launch(
                &ctx,
                TensorArg::new(&x, &s),
                TensorArg::new(&y, &s),
                TensorArgMut::new(&mut out, &s),
                -1,
            )
            .unwrap_err();
        assert_eq!(
            err,
            XewError::DTypeMismatch {
                port: "Y",
                expected: DType::F32,
                got: DType::I32,
            }
        );
        assert_eq!(out, [0.0, 0.0]);
    }
}
