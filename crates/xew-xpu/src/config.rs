//! Device generation selection.

use std::fmt;

use xew_sys::xew_device_generation_t;

/// Environment variable consulted by [`default_generation`].
pub const GENERATION_ENV: &str = "XEW_DEVICE_GENERATION";

/// Accelerator hardware generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceGeneration {
    /// First generation. Has no float16 elementwise kernels.
    Xpu1,
    Xpu2,
}

impl DeviceGeneration {
    pub const ALL: [DeviceGeneration; 2] = [DeviceGeneration::Xpu1, DeviceGeneration::Xpu2];

    /// Parse `"xpu1"` / `"xpu2"` (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "xpu1" => Some(DeviceGeneration::Xpu1),
            "xpu2" => Some(DeviceGeneration::Xpu2),
            _ => None,
        }
    }

    pub(crate) fn to_sys(self) -> xew_device_generation_t {
        match self {
            DeviceGeneration::Xpu1 => xew_device_generation_t::XPU1,
            DeviceGeneration::Xpu2 => xew_device_generation_t::XPU2,
        }
    }

    pub(crate) fn from_sys(raw: xew_device_generation_t) -> Self {
        match raw {
            xew_device_generation_t::XPU1 => DeviceGeneration::Xpu1,
            xew_device_generation_t::XPU2 => DeviceGeneration::Xpu2,
        }
    }
}

impl fmt::Display for DeviceGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceGeneration::Xpu1 => write!(f, "xpu1"),
            DeviceGeneration::Xpu2 => write!(f, "xpu2"),
        }
    }
}

impl std::str::FromStr for DeviceGeneration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
            .ok_or_else(|| format!("unknown device generation: {s} (expected xpu1 or xpu2)"))
    }
}

/// Determine the device generation via env var → compile-time feature → Xpu2 fallback.
///
/// Priority:
/// 1. `XEW_DEVICE_GENERATION` env var (`"xpu1"` or `"xpu2"`, case-insensitive)
/// 2. Cargo feature `default-xpu1`
/// 3. Xpu2 fallback
pub fn default_generation() -> DeviceGeneration {
    resolve_generation(std::env::var(GENERATION_ENV).ok().as_deref())
}

fn resolve_generation(env_value: Option<&str>) -> DeviceGeneration {
    if let Some(generation) = env_value.and_then(DeviceGeneration::parse) {
        return generation;
    }
    if let Some(val) = env_value {
        tracing::warn!(value = val, "ignoring unrecognized {GENERATION_ENV}");
    }
    if cfg!(feature = "default-xpu1") {
        DeviceGeneration::Xpu1
    } else {
        DeviceGeneration::Xpu2
    }
}
