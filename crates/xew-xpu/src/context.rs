//! Owned device execution context.

use std::fmt;
use std::ptr::NonNull;

use tracing::info;
use xew_core::{Result, XewError};
use xew_sys as sys;

use crate::config::{DeviceGeneration, default_generation};

/// One `xew_context_t` handle, destroyed on drop.
///
/// Primitive launches on a context are not synchronized, so the type is
/// `Send` but not `Sync`.
pub struct XpuContext {
    raw: NonNull<sys::xew_context_t>,
    generation: DeviceGeneration,
}

// SAFETY: the handle is only touched through `&self` by one thread at a time
// (the type is !Sync), and the device runtime allows moving a context between
// threads.
unsafe impl Send for XpuContext {}

impl XpuContext {
    pub fn new(generation: DeviceGeneration) -> Result<Self> {
        let raw = unsafe { sys::xew_context_create(generation.to_sys()) };
        let raw = NonNull::new(raw).ok_or(XewError::NullPtr)?;
        info!(%generation, "created XPU context");
        Ok(Self { raw, generation })
    }

    /// Context for the generation picked by [`default_generation`].
    pub fn with_default_generation() -> Result<Self> {
        Self::new(default_generation())
    }

    pub fn generation(&self) -> DeviceGeneration {
        self.generation
    }

    /// Generation the device runtime reports for this handle.
    pub fn device_generation(&self) -> DeviceGeneration {
        DeviceGeneration::from_sys(unsafe { sys::xew_context_generation(self.raw.as_ptr()) })
    }

    /// Primitive launches that completed successfully on this context.
    pub fn launch_count(&self) -> u64 {
        unsafe { sys::xew_context_launch_count(self.raw.as_ptr()) }
    }

    pub(crate) fn as_ptr(&self) -> *mut sys::xew_context_t {
        self.raw.as_ptr()
    }
}

impl Drop for XpuContext {
    fn drop(&mut self) {
        unsafe { sys::xew_context_destroy(self.raw.as_ptr()) }
    }
}

impl fmt::Debug for XpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XpuContext")
            .field("generation", &self.generation)
            .field("launches", &self.launch_count())
            .finish()
    }
}
