//! Device placement

use super::call;
use crate::backend;
use crate::config;
use crate::device::Device;
use crate::error::Result;
use crate::ops::{CallFrame, OpId};
use crate::tensor::{Array, ArrayLike};

/// Copy to `device` on the active backend
pub fn to_device(x: impl Into<ArrayLike>, device: Device) -> Result<Array> {
    call(CallFrame::new(OpId::ToDevice).arg(x).kw("device", device))
}

/// Device holding `x`
pub fn dev(x: &Array) -> Device {
    x.device()
}

/// Where new arrays are placed: the configured device when the active
/// backend offers it, else the backend's own default
pub fn default_device() -> Result<Device> {
    let active = backend::current()?;
    let configured = config::get().default_device;
    Ok(if active.valid_devices().contains(&configured) {
        configured
    } else {
        active.default_device()
    })
}

/// Devices the active backend can place arrays on
pub fn valid_devices() -> Result<Vec<Device>> {
    Ok(backend::current()?.valid_devices().to_vec())
}
