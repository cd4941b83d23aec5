//! Device identifiers (`{kind}:{index}`)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Kind of compute device
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceKind {
    /// Host processor
    Cpu,
    /// Graphics processor
    Gpu,
    /// Tensor processor
    Tpu,
}

impl DeviceKind {
    /// Lowercase name used in device strings
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
            Self::Tpu => "tpu",
        }
    }
}

/// A placement target such as `cpu:0` or `gpu:1`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct Device {
    kind: DeviceKind,
    index: usize,
}

impl Device {
    /// Create a device identifier
    pub const fn new(kind: DeviceKind, index: usize) -> Self {
        Self { kind, index }
    }

    /// `cpu:0`
    pub const fn cpu() -> Self {
        Self::new(DeviceKind::Cpu, 0)
    }

    /// `gpu:{index}`
    pub const fn gpu(index: usize) -> Self {
        Self::new(DeviceKind::Gpu, index)
    }

    /// `tpu:{index}`
    pub const fn tpu(index: usize) -> Self {
        Self::new(DeviceKind::Tpu, index)
    }

    /// Device kind
    #[inline]
    pub const fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Device ordinal
    #[inline]
    pub const fn index(&self) -> usize {
        self.index
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::cpu()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.name(), self.index)
    }
}

impl FromStr for Device {
    type Err = Error;

    /// Accepts `cpu`, `gpu:1`, `cuda:0` (alias of gpu) and the like
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        let (kind, index) = s.split_once(':').unwrap_or((s.as_str(), "0"));
        let kind = match kind {
            "cpu" => DeviceKind::Cpu,
            "gpu" | "cuda" => DeviceKind::Gpu,
            "tpu" => DeviceKind::Tpu,
            _ => {
                return Err(Error::invalid_argument(
                    "device",
                    format!("unknown device kind in '{s}'"),
                ))
            }
        };
        let index = index.parse().map_err(|_| {
            Error::invalid_argument("device", format!("invalid device index in '{s}'"))
        })?;
        Ok(Self::new(kind, index))
    }
}

impl TryFrom<String> for Device {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}
