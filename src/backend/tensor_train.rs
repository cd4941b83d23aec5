//! `tensor-train`: a graph-oriented backend with accelerator placement
//!
//! Every dtype is representable. There is no native `median`.

use super::descriptor::{BackendDescriptor, Features};
use super::host_native_array;
use crate::device::Device;
use crate::error::Result;
use crate::kernels;
use crate::ops::OpId;

/// Registered name
pub const NAME: &str = "tensor-train";

host_native_array!(
    /// Eager tensor of the `tensor-train` backend
    TrainTensor,
    NAME
);

/// Build the descriptor
pub fn descriptor() -> Result<BackendDescriptor> {
    BackendDescriptor::builder(NAME, wrap)
        .devices(&[Device::cpu(), Device::gpu(0), Device::tpu(0)])
        .features(Features {
            native_inplace_support: false,
            supports_gradients: true,
        })
        .exports(kernels::reference())
        .unbind(OpId::Median)
        .build()
}
