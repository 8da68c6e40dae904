//! Capability table and kernel registry for XPU elementwise ops.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use tracing::{debug, info};
use xew_core::{DType, OperatorKind, Result, TensorArg, TensorArgMut, XewError};

use crate::config::{DeviceGeneration, default_generation};
use crate::context::XpuContext;
use crate::kernel::{ElementwiseKernel, KernelDescriptor, KernelKey, instantiate};

use OperatorKind::*;

/// Every elementwise kernel the XPU provides, one entry per (op, type).
pub const ELEMENTWISE_KERNELS: &[KernelDescriptor] = &[
    KernelDescriptor::float32(Add),
    KernelDescriptor::float16(Add, "DISABLE_XPU1_AddFloat16"),
    KernelDescriptor::int32(Add),
    KernelDescriptor::int64(Add),
    KernelDescriptor::float32(Sub),
    KernelDescriptor::float16(Sub, "DISABLE_XPU1_SubFloat16"),
    KernelDescriptor::int32(Sub),
    KernelDescriptor::int64(Sub),
    KernelDescriptor::float32(Mul),
    KernelDescriptor::float16(Mul, "DISABLE_XPU1_MulFloat16"),
    KernelDescriptor::int64(Mul),
    KernelDescriptor::float32(Div),
    KernelDescriptor::float16(Div, "DISABLE_XPU1_DivFloat16"),
    KernelDescriptor::float32(Max),
    KernelDescriptor::float16(Max, "DISABLE_XPU1_MaxFloat16"),
    KernelDescriptor::int32(Max),
    KernelDescriptor::float32(Min),
    KernelDescriptor::float16(Min, "DISABLE_XPU1_MinFloat16"),
    KernelDescriptor::int32(Min),
    KernelDescriptor::float32(Mod),
    KernelDescriptor::float16(Mod, "DISABLE_XPU1_ModFloat16"),
    KernelDescriptor::int32(Mod),
    KernelDescriptor::float32(FloorDiv),
    KernelDescriptor::float16(FloorDiv, "DISABLE_XPU1_FloordivFloat16"),
    KernelDescriptor::int32(FloorDiv),
    KernelDescriptor::float32(Pow),
    KernelDescriptor::float16(Pow, "DISABLE_XPU1_PowFloat16"),
    KernelDescriptor::int32(Pow),
    KernelDescriptor::int64(Pow),
];

/// Immutable-after-build set of kernels for one device generation.
pub struct KernelRegistry {
    generation: DeviceGeneration,
    kernels: BTreeMap<KernelKey, Arc<dyn ElementwiseKernel>>,
}

impl KernelRegistry {
    /// Register every table entry enabled on `generation`.
    pub fn new(generation: DeviceGeneration) -> Result<Self> {
        let mut registry = Self::empty(generation);
        for descriptor in ELEMENTWISE_KERNELS {
            if descriptor.enabled_on(generation) {
                registry.register(instantiate(*descriptor)?)?;
            }
        }
        info!(%generation, kernels = registry.len(), "built elementwise kernel registry");
        Ok(registry)
    }

    pub fn empty(generation: DeviceGeneration) -> Self {
        Self {
            generation,
            kernels: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, kernel: Arc<dyn ElementwiseKernel>) -> Result<()> {
        let key = kernel.descriptor().key();
        if self.kernels.contains_key(&key) {
            return Err(XewError::DuplicateKernel(key.to_string()));
        }
        debug!(kernel = %key, "registered kernel");
        self.kernels.insert(key, kernel);
        Ok(())
    }

    pub fn get(&self, key: &KernelKey) -> Option<Arc<dyn ElementwiseKernel>> {
        self.kernels.get(key).cloned()
    }

    /// Kernel for `op` whose port types accept the given element types.
    pub fn select(
        &self,
        op: OperatorKind,
        x: DType,
        y: DType,
        out: DType,
    ) -> Result<Arc<dyn ElementwiseKernel>> {
        self.kernels
            .values()
            .find(|k| {
                let d = k.descriptor();
                d.op == op && d.accepts(x, y, out)
            })
            .cloned()
            .ok_or(XewError::NoMatchingKernel { op, x, y, out })
    }

    /// Select by the buffers' element types, then launch.
    pub fn launch(
        &self,
        ctx: &XpuContext,
        op: OperatorKind,
        x: TensorArg<'_>,
        y: TensorArg<'_>,
        out: TensorArgMut<'_>,
        axis: i32,
    ) -> Result<()> {
        let kernel = self.select(op, x.dtype(), y.dtype(), out.dtype())?;
        kernel.launch(ctx, x, y, out, axis)
    }

    /// Descriptors in key order.
    pub fn descriptors(&self) -> impl Iterator<Item = &KernelDescriptor> {
        self.kernels.values().map(|k| k.descriptor())
    }

    pub fn generation(&self) -> DeviceGeneration {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }
}

impl std::fmt::Debug for KernelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelRegistry")
            .field("generation", &self.generation)
            .field("kernels", &self.kernels.keys().collect::<Vec<_>>())
            .finish()
    }
}

static DEFAULT_REGISTRY: LazyLock<Result<Arc<KernelRegistry>>> =
    LazyLock::new(|| KernelRegistry::new(default_generation()).map(Arc::new));

/// Process-wide registry for the configured device generation, built on first use.
pub fn default_registry() -> Result<Arc<KernelRegistry>> {
    DEFAULT_REGISTRY.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use xew_core::Precision;

    #[test]
    fn test_table_keys_unique() {
        let keys: HashSet<_> = ELEMENTWISE_KERNELS.iter().map(|d| d.key()).collect();
        assert_eq!(keys.len(), ELEMENTWISE_KERNELS.len());
        assert_eq!(ELEMENTWISE_KERNELS.len(), 29);
    }

    #[test]
    fn test_float16_aliases() {
        for d in ELEMENTWISE_KERNELS.iter().filter(|d| d.dtype == DType::F16) {
            assert!(d.alias.starts_with("DISABLE_XPU1_"), "{}", d.alias);
            assert!(d.alias.ends_with("Float16"), "{}", d.alias);
            assert_eq!(d.precision, Precision::Fp16);
        }
    }

    #[test]
    fn test_every_entry_has_a_primitive() {
        for d in ELEMENTWISE_KERNELS {
            assert!(instantiate(*d).is_ok(), "{}", d.key());
        }
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut r = KernelRegistry::empty(DeviceGeneration::Xpu2);
        let d = KernelDescriptor::float32(Add);
        r.register(instantiate(d).unwrap()).unwrap();
        let err = r.register(instantiate(d).unwrap()).unwrap_err();
        assert_eq!(
            err,
            XewError::DuplicateKernel("elementwise_add/xpu/float/NCHW/def".into())
        );
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_get_by_key() {
        let r = KernelRegistry::new(DeviceGeneration::Xpu2).unwrap();
        let key = KernelDescriptor::int64(Pow).key();
        let k = r.get(&key).unwrap();
        assert_eq!(k.descriptor().dtype, DType::I64);
    }

    #[test]
    fn test_empty_registry() {
        let r = KernelRegistry::empty(DeviceGeneration::Xpu1);
        assert!(r.is_empty());
        assert!(r.select(Add, DType::F32, DType::F32, DType::F32).is_err());
    }
}
