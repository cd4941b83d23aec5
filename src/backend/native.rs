//! Backend-native arrays
//!
//! Each backend wraps results in its own native type. The dispatch core
//! only ever sees them through `NativeArray`; user code reaches them via the
//! `Array::native()` escape hatch and `as_any()` downcasting.

use crate::device::Device;
use crate::dtype::DType;
use crate::tensor::{HostArray, Shape};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// A backend's own array object
pub trait NativeArray: fmt::Debug + Send + Sync + 'static {
    /// Name of the backend that produced this array
    fn backend(&self) -> &'static str;

    /// Host view of the data
    fn host(&self) -> Cow<'_, HostArray>;

    /// Placement
    fn device(&self) -> Device;

    /// Downcasting support
    fn as_any(&self) -> &dyn Any;

    /// Shape
    fn shape(&self) -> Shape {
        self.host().shape().clone()
    }

    /// Dtype
    fn dtype(&self) -> DType {
        self.host().dtype()
    }
}

/// Shared reference to a native array
pub type NativeRef = Arc<dyn NativeArray>;

/// Define a host-backed native array type for a builtin backend.
///
/// Generates the struct, its `NativeArray` impl and a `wrap` constructor
/// suitable as the descriptor's `from_host` function.
macro_rules! host_native_array {
    ($(#[$meta:meta])* $name:ident, $backend:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name {
            data: $crate::tensor::HostArray,
            device: $crate::device::Device,
        }

        impl $name {
            /// Wrap host data placed on `device`
            pub fn new(data: $crate::tensor::HostArray, device: $crate::device::Device) -> Self {
                Self { data, device }
            }

            /// Underlying host data
            pub fn data(&self) -> &$crate::tensor::HostArray {
                &self.data
            }
        }

        impl $crate::backend::NativeArray for $name {
            fn backend(&self) -> &'static str {
                $backend
            }

            fn host(&self) -> std::borrow::Cow<'_, $crate::tensor::HostArray> {
                std::borrow::Cow::Borrowed(&self.data)
            }

            fn device(&self) -> $crate::device::Device {
                self.device
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn shape(&self) -> $crate::tensor::Shape {
                self.data.shape().clone()
            }

            fn dtype(&self) -> $crate::dtype::DType {
                self.data.dtype()
            }
        }

        /// `from_host` hook for the descriptor
        pub fn wrap(
            data: $crate::tensor::HostArray,
            device: &$crate::device::Device,
        ) -> $crate::backend::NativeRef {
            std::sync::Arc::new($name::new(data, *device))
        }
    };
}

pub(crate) use host_native_array;
