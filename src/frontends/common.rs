//! Pieces shared by the frontend façades

use crate::error::{Error, Result};
use crate::ops::{dispatch, Adapter, CallFrame, Output};

/// Dispatch `frame` through `chain`, expecting a single result
pub(crate) fn run(frame: CallFrame, chain: &[Adapter]) -> Result<Output> {
    dispatch(frame, chain)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Backend("operator produced no result".into()))
}

/// Declare a frontend array type wrapping an [`Array`](crate::tensor::Array) handle.
///
/// The type converts into an array-like, so it can be passed anywhere the
/// unified surface takes one, and forwards the arithmetic operators to the
/// unified operators, re-wrapping the result.
macro_rules! frontend_array {
    (@binary $name:ident, $($trait:ident::$method:ident => $op:ident),* $(,)?) => {
        $(
            impl std::ops::$trait<&$name> for &$name {
                type Output = crate::error::Result<$name>;

                fn $method(self, rhs: &$name) -> Self::Output {
                    crate::api::$op(&self.0, &rhs.0).map($name)
                }
            }

            impl std::ops::$trait<f64> for &$name {
                type Output = crate::error::Result<$name>;

                fn $method(self, rhs: f64) -> Self::Output {
                    crate::api::$op(&self.0, rhs).map($name)
                }
            }
        )*
    };
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name(crate::tensor::Array);

        impl $name {
            /// Wrap a unified handle
            pub fn from_handle(handle: crate::tensor::Array) -> Self {
                Self(handle)
            }

            /// The unified handle
            pub fn handle(&self) -> &crate::tensor::Array {
                &self.0
            }

            /// Unwrap into the unified handle
            pub fn into_handle(self) -> crate::tensor::Array {
                self.0
            }

            /// Element dtype
            pub fn dtype(&self) -> crate::dtype::DType {
                self.0.dtype()
            }

            /// Number of dimensions
            pub fn ndim(&self) -> usize {
                self.0.ndim()
            }

            /// Values converted to `T`, in row-major order
            pub fn to_vec<T: crate::dtype::Element>(&self) -> Vec<T> {
                self.0.to_vec()
            }
        }

        impl From<crate::tensor::Array> for $name {
            fn from(handle: crate::tensor::Array) -> Self {
                Self(handle)
            }
        }

        impl From<$name> for crate::tensor::ArrayLike {
            fn from(a: $name) -> Self {
                Self::Handle(a.0)
            }
        }

        impl From<&$name> for crate::tensor::ArrayLike {
            fn from(a: &$name) -> Self {
                Self::Handle(a.0.clone())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }

        $crate::frontends::common::frontend_array!(@binary $name, Add::add => add, Sub::sub => subtract, Mul::mul => multiply,
            Div::div => divide, Rem::rem => remainder);

        impl std::ops::Neg for &$name {
            type Output = crate::error::Result<$name>;

            fn neg(self) -> Self::Output {
                crate::api::negative(&self.0).map($name)
            }
        }
    };
}

pub(crate) use frontend_array;
