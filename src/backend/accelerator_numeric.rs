//! `accelerator-numeric`: a 32-bit-first backend for accelerators
//!
//! 64-bit dtypes are narrowed to their 32-bit counterparts. The native sort
//! does not preserve the order of equal keys, and there is no convolution
//! kernel of its own.

use super::descriptor::{BackendDescriptor, Features};
use super::host_native_array;
use crate::device::Device;
use crate::dtype::{DType, DTypeSet};
use crate::error::Result;
use crate::kernels;
use crate::ops::{OpEntry, OpId};

/// Registered name
pub const NAME: &str = "accelerator-numeric";

host_native_array!(
    /// Device array of the `accelerator-numeric` backend
    DeviceArray,
    NAME
);

fn closest_valid(dtype: DType) -> DType {
    match dtype {
        DType::F64 => DType::F32,
        DType::I64 => DType::I32,
        DType::U64 => DType::U32,
        DType::Complex128 => DType::Complex64,
        other => other,
    }
}

/// Build the descriptor
pub fn descriptor() -> Result<BackendDescriptor> {
    BackendDescriptor::builder(NAME, wrap)
        .invalid_dtypes(DTypeSet::of(&[DType::F64, DType::I64, DType::U64, DType::Complex128]))
        .closest_valid(closest_valid)
        .devices(&[Device::cpu(), Device::gpu(0), Device::tpu(0)])
        .features(Features {
            native_inplace_support: false,
            supports_gradients: true,
        })
        .exports(kernels::reference())
        .bind(OpId::Argsort, OpEntry::new(kernels::sort::argsort_unstable).unstable())
        .modify(OpId::Sort, OpEntry::unstable)
        .unbind(OpId::Conv)
        .build()
}
