//! Process-wide configuration
//!
//! The configuration is read once from the environment on first use and can
//! be replaced or overridden for a scope afterwards:
//!
//! ```ignore
//! let _guard = unitensor::config::scoped(|c| c.default_dtype = DType::F64)?;
//! ```

use crate::device::Device;
use crate::dtype::{Casting, DType, Defaults};
use crate::error::{Error, Result};
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::LazyLock;

/// Environment variable naming the initial backend
pub const ENV_BACKEND: &str = "UNITENSOR_BACKEND";
/// Environment variable for the float fallback dtype
pub const ENV_DEFAULT_DTYPE: &str = "UNITENSOR_DEFAULT_DTYPE";
/// Environment variable for the integer fallback dtype
pub const ENV_DEFAULT_INT_DTYPE: &str = "UNITENSOR_DEFAULT_INT_DTYPE";
/// Environment variable for the placement fallback
pub const ENV_DEFAULT_DEVICE: &str = "UNITENSOR_DEFAULT_DEVICE";
/// Environment variable for the frontend casting policy
pub const ENV_CASTING: &str = "UNITENSOR_CASTING";

/// Recognised options
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Float fallback for values that carry no dtype
    pub default_dtype: DType,
    /// Integer fallback for values that carry no dtype
    pub default_int_dtype: DType,
    /// Placement fallback
    pub default_device: Device,
    /// Backend activated on first use
    pub backend: String,
    /// Default frontend casting policy
    pub casting: Casting,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_dtype: DType::F32,
            default_int_dtype: DType::I64,
            default_device: Device::cpu(),
            backend: "numpy-like".to_string(),
            casting: Casting::SameKind,
        }
    }
}

impl Config {
    /// Defaults overlaid with the `UNITENSOR_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`; unparseable values are
    /// logged and skipped
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(name) = lookup(ENV_BACKEND) {
            config.backend = name.trim().to_string();
        }
        overlay(&lookup, ENV_DEFAULT_DTYPE, |v: DType| {
            if v.is_float() {
                config.default_dtype = v;
                true
            } else {
                false
            }
        });
        overlay(&lookup, ENV_DEFAULT_INT_DTYPE, |v: DType| {
            if v.is_int() {
                config.default_int_dtype = v;
                true
            } else {
                false
            }
        });
        overlay(&lookup, ENV_DEFAULT_DEVICE, |v: Device| {
            config.default_device = v;
            true
        });
        overlay(&lookup, ENV_CASTING, |v: Casting| {
            config.casting = v;
            true
        });
        config
    }

    /// Fallback dtypes for plain values
    pub fn defaults(&self) -> Defaults {
        Defaults {
            float: self.default_dtype,
            int: self.default_int_dtype,
        }
    }

    /// Check the fallback dtypes have the right kinds
    pub fn validate(&self) -> Result<()> {
        if !self.default_dtype.is_float() {
            return Err(Error::invalid_argument(
                "default_dtype",
                format!("expected a float dtype, got {}", self.default_dtype),
            ));
        }
        if !self.default_int_dtype.is_int() {
            return Err(Error::invalid_argument(
                "default_int_dtype",
                format!("expected an integer dtype, got {}", self.default_int_dtype),
            ));
        }
        Ok(())
    }
}

fn overlay<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    mut apply: impl FnMut(T) -> bool,
) {
    let Some(raw) = lookup(key) else {
        return;
    };
    let accepted = raw.parse::<T>().map(&mut apply).unwrap_or(false);
    if !accepted {
        tracing::warn!(var = key, value = %raw, "ignoring unusable configuration value");
    }
}

// ============================================================================
// Process-wide state
// ============================================================================

static CONFIG: LazyLock<RwLock<Config>> = LazyLock::new(|| RwLock::new(Config::from_env()));

/// Snapshot of the current configuration
pub fn get() -> Config {
    CONFIG.read().clone()
}

/// Fallback dtypes of the current configuration
pub fn defaults() -> Defaults {
    CONFIG.read().defaults()
}

/// Replace the configuration
pub fn set(config: Config) -> Result<()> {
    config.validate()?;
    *CONFIG.write() = config;
    Ok(())
}

/// Modify the configuration in place; the change is rejected if it leaves
/// the configuration invalid
pub fn update(f: impl FnOnce(&mut Config)) -> Result<()> {
    let mut config = get();
    f(&mut config);
    set(config)
}

/// Guard restoring the previous configuration on drop
#[must_use = "the override is reverted as soon as the guard is dropped"]
pub struct ScopedConfig {
    previous: Option<Config>,
}

impl Drop for ScopedConfig {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *CONFIG.write() = previous;
        }
    }
}

/// Override the configuration until the returned guard is dropped
pub fn scoped(f: impl FnOnce(&mut Config)) -> Result<ScopedConfig> {
    let previous = get();
    update(f)?;
    Ok(ScopedConfig {
        previous: Some(previous),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lookup() {
        let config = Config::from_lookup(|key| match key {
            ENV_BACKEND => Some("tensor-train".into()),
            ENV_DEFAULT_DTYPE => Some("float64".into()),
            ENV_DEFAULT_INT_DTYPE => Some("float16".into()),
            ENV_DEFAULT_DEVICE => Some("gpu:1".into()),
            ENV_CASTING => Some("bogus".into()),
            _ => None,
        });
        assert_eq!(config.backend, "tensor-train");
        assert_eq!(config.default_dtype, DType::F64);
        assert_eq!(config.default_int_dtype, DType::I64);
        assert_eq!(config.default_device, Device::gpu(1));
        assert_eq!(config.casting, Casting::SameKind);
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        config.default_dtype = DType::I32;
        assert!(config.validate().is_err());
    }
}
