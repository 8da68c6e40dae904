//! Broadcast elementwise dispatch for the XPU.
//!
//! A [`BroadcastDispatcher`] is fixed to one element type, operator and
//! precision. At launch time it aligns the operand shapes with
//! [`xew_ops::resolve_aligned`] and hands raw buffers plus the aligned shapes
//! to the device primitive picked from the [`functor`] table.
//!
//! The [`registry`] holds one dispatcher per supported combination and
//! selects among them by declared tensor types.

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod functor;
pub mod kernel;
pub mod registry;

pub use config::{DeviceGeneration, default_generation};
pub use context::XpuContext;
pub use dispatcher::BroadcastDispatcher;
pub use functor::{Primitive, XpuElement};
pub use kernel::{ElementwiseKernel, KernelDescriptor, KernelKey, PortType, instantiate};
pub use registry::{ELEMENTWISE_KERNELS, KernelRegistry, default_registry};
