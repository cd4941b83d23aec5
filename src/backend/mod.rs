//! Backends: descriptors, the registry and the active-backend manager
//!
//! Four builtin backends ship with the crate. They share the reference
//! leaves in `kernels` but differ in the dtypes and devices they accept, the
//! operators they bind and the flags on those operators, which is what the
//! dispatch core has to reconcile.
//!
//! Builtin backends are registered lazily: the first `load`/`activate` of a
//! builtin name builds and registers its descriptor.

pub mod accelerator_numeric;
mod active;
pub mod autograd_tracer;
mod descriptor;
mod native;
pub mod numpy_like;
mod registry;
pub mod tensor_train;

pub use active::{
    activate, current, current_name, previous_backend, scoped_activate, set_backend, unload,
    unload as unset_backend, with_backend, ScopedBackend,
};
pub use descriptor::{BackendBuilder, BackendDescriptor, ClosestValidFn, Features, FromHostFn};
pub(crate) use native::host_native_array;
pub use native::{NativeArray, NativeRef};
pub use registry::{get, is_registered, load, register, registered};

use crate::error::Result;
use crate::ops::{Family, OpEntry, OpId};

/// Names of the builtin backends
pub const BUILTIN: &[&str] = &[
    numpy_like::NAME,
    autograd_tracer::NAME,
    tensor_train::NAME,
    accelerator_numeric::NAME,
];

/// Descriptor constructor of a builtin backend
pub(crate) fn builtin(name: &str) -> Option<fn() -> Result<BackendDescriptor>> {
    match name {
        numpy_like::NAME => Some(numpy_like::descriptor),
        autograd_tracer::NAME => Some(autograd_tracer::descriptor),
        tensor_train::NAME => Some(tensor_train::descriptor),
        accelerator_numeric::NAME => Some(accelerator_numeric::descriptor),
        _ => None,
    }
}

/// Apply `f` to every bound operator of the given families
pub(crate) fn modify_families(
    builder: BackendBuilder,
    families: &[Family],
    f: fn(OpEntry) -> OpEntry,
) -> BackendBuilder {
    OpId::ALL
        .iter()
        .filter(|op| families.contains(&op.family()))
        .fold(builder, |b, op| b.modify(*op, f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;
    use crate::dtype::DType;

    #[test]
    fn test_builtin_descriptors_build() {
        for name in BUILTIN {
            let build = builtin(name).unwrap();
            let descriptor = build().unwrap();
            assert_eq!(descriptor.name(), *name);
            for op in crate::ops::REQUIRED {
                assert!(descriptor.has_operator(*op), "{name} lacks {op}");
            }
        }
        assert!(builtin("no-such-backend").is_none());
    }

    #[test]
    fn test_capability_differences() {
        let numpy = numpy_like::descriptor().unwrap();
        let tracer = autograd_tracer::descriptor().unwrap();
        let tt = tensor_train::descriptor().unwrap();
        let accel = accelerator_numeric::descriptor().unwrap();

        assert!(!numpy.has_operator(OpId::Conv));
        assert!(!accel.has_operator(OpId::Conv));
        assert!(!tt.has_operator(OpId::Median));
        assert!(tracer.has_operator(OpId::Conv));

        assert!(numpy.entry(OpId::Add).unwrap().support_native_out);
        assert!(!tt.entry(OpId::Add).unwrap().support_native_out);
        assert!(!accel.entry(OpId::Argsort).unwrap().stable);

        assert_eq!(numpy.closest_valid_dtype(DType::BF16), DType::F32);
        assert_eq!(tracer.closest_valid_dtype(DType::U32), DType::I64);
        assert_eq!(accel.closest_valid_dtype(DType::F64), DType::F32);
        assert_eq!(accel.closest_valid_dtype(DType::Complex128), DType::Complex64);

        assert!(numpy.check_device(&Device::gpu(0)).is_err());
        assert!(tt.check_device(&Device::tpu(0)).is_ok());
        assert!(!numpy.supports_gradients() && tracer.supports_gradients());
    }
}
