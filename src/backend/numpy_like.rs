//! `numpy-like`: a host-only eager backend
//!
//! No bfloat16, a single CPU device, no convolution kernel of its own
//! (`conv` falls back to strided-window materialisation) and elementwise
//! leaves that write straight into a supplied `out` array.

use super::descriptor::BackendDescriptor;
use super::host_native_array;
use crate::device::{Device, DeviceKind};
use crate::dtype::{DType, DTypeSet};
use crate::error::Result;
use crate::kernels;
use crate::ops::{Family, OpEntry, OpId};

/// Registered name
pub const NAME: &str = "numpy-like";

host_native_array!(
    /// Array object of the `numpy-like` backend
    NdArray,
    NAME
);

fn closest_valid(dtype: DType) -> DType {
    match dtype {
        DType::BF16 => DType::F32,
        other => other,
    }
}

/// Build the descriptor
pub fn descriptor() -> Result<BackendDescriptor> {
    let builder = BackendDescriptor::builder(NAME, wrap)
        .native_type(DType::Bool, "bool_")
        .native_type(DType::Complex64, "csingle")
        .native_type(DType::Complex128, "cdouble")
        .invalid_dtypes(DTypeSet::single(DType::BF16))
        .closest_valid(closest_valid)
        .devices(&[Device::cpu()])
        .invalid_device_kinds(&[DeviceKind::Gpu, DeviceKind::Tpu])
        .exports(kernels::reference())
        .unbind(OpId::Conv);
    super::modify_families(builder, &[Family::Unary, Family::Binary], OpEntry::native_out).build()
}
