//! `autograd-tracer`: a define-by-run backend with gradient support
//!
//! Unsigned integers wider than eight bits do not exist natively and map to
//! the next signed width. The Cholesky leaf has no half-precision kernel.

use super::descriptor::{BackendDescriptor, Features};
use super::host_native_array;
use crate::device::Device;
use crate::dtype::{DType, DTypeSet};
use crate::error::Result;
use crate::kernels;
use crate::ops::OpId;

/// Registered name
pub const NAME: &str = "autograd-tracer";

host_native_array!(
    /// Tensor object of the `autograd-tracer` backend
    TracerTensor,
    NAME
);

fn closest_valid(dtype: DType) -> DType {
    match dtype {
        DType::U16 => DType::I32,
        DType::U32 | DType::U64 => DType::I64,
        other => other,
    }
}

/// Build the descriptor
pub fn descriptor() -> Result<BackendDescriptor> {
    BackendDescriptor::builder(NAME, wrap)
        .native_type(DType::F16, "half")
        .native_type(DType::F32, "float")
        .native_type(DType::F64, "double")
        .native_type(DType::I16, "short")
        .native_type(DType::I32, "int")
        .native_type(DType::I64, "long")
        .native_type(DType::Complex64, "cfloat")
        .native_type(DType::Complex128, "cdouble")
        .invalid_dtypes(DTypeSet::of(&[DType::U16, DType::U32, DType::U64]))
        .closest_valid(closest_valid)
        .devices(&[Device::cpu(), Device::gpu(0)])
        .features(Features {
            native_inplace_support: true,
            supports_gradients: true,
        })
        .exports(kernels::reference())
        .modify(OpId::Cholesky, |e| e.unsupported(DTypeSet::HALF))
        .build()
}
