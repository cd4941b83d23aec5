//! Dtype conversion and introspection against the active backend

use super::call;
use crate::backend;
use crate::config;
use crate::dtype::{self, DType, Operand};
use crate::error::{Error, Result};
use crate::ops::{CallFrame, OpId};
use crate::tensor::{Array, ArrayLike};

pub use crate::dtype::{can_cast, dtype_bits, finfo, iinfo, promote_types};

/// Cast to `dtype`
pub fn astype(x: impl Into<ArrayLike>, dtype: DType) -> Result<Array> {
    call(CallFrame::new(OpId::Astype).arg(x).dtype(Some(dtype)))
}

/// Resolve a dtype name.
///
/// The active backend's native aliases take precedence over the generic
/// names (`"float32"`, `"f32"`, `"double"`), so `"int"` means `int32` on a
/// backend that says so.
pub fn as_canonical_dtype(name: &str) -> Result<DType> {
    let active = backend::current()?;
    active
        .canonical_dtype(name.trim())
        .ok_or_else(|| Error::invalid_argument("dtype", format!("unknown dtype name '{name}' on {}", active.name())))
}

/// The active backend's name for `dtype`
pub fn as_native_dtype(dtype: DType) -> Result<&'static str> {
    let active = backend::current()?;
    if !active.is_valid_dtype(dtype) {
        return Err(Error::DtypeUnsupported {
            dtype,
            op: "as_native_dtype",
            backend: active.name(),
        });
    }
    Ok(active.native_type(dtype).unwrap_or(dtype.name()))
}

/// Dtype an input carries, or would be given when materialised
pub fn dtype_of(x: impl Into<ArrayLike>) -> Result<DType> {
    let defaults = config::defaults();
    match x.into() {
        ArrayLike::Scalar(s) => Ok(s.natural_dtype(&defaults)),
        ArrayLike::Nested(n) => Ok(n.to_host(None, &defaults)?.dtype()),
        like => like
            .dtype()
            .ok_or_else(|| Error::invalid_argument("x", "input carries no dtype")),
    }
}

/// Dtype to use for a new array.
///
/// An explicit `hint` wins, then the dtype carried by `value`, then the
/// configured float default. The answer is always valid on the active
/// backend.
pub fn default_dtype(hint: Option<DType>, value: Option<ArrayLike>) -> Result<DType> {
    let dtype = match (hint, value) {
        (Some(d), _) => d,
        (None, Some(v)) => dtype_of(v)?,
        (None, None) => config::defaults().float,
    };
    closest_valid_dtype(dtype)
}

/// Configured float fallback, as valid on the active backend
pub fn default_float_dtype() -> Result<DType> {
    closest_valid_dtype(config::defaults().float)
}

/// Configured integer fallback, as valid on the active backend
pub fn default_int_dtype() -> Result<DType> {
    closest_valid_dtype(config::defaults().int)
}

/// Dtypes the active backend can represent
pub fn valid_dtypes() -> Result<Vec<DType>> {
    Ok(backend::current()?.valid_dtypes().iter().collect())
}

/// Dtypes the active backend cannot represent
pub fn invalid_dtypes() -> Result<Vec<DType>> {
    Ok(backend::current()?.invalid_dtypes().iter().collect())
}

/// The active backend's substitute for `dtype`; `dtype` itself when valid
pub fn closest_valid_dtype(dtype: DType) -> Result<DType> {
    Ok(backend::current()?.closest_valid_dtype(dtype))
}

/// Result dtype of combining the inputs.
///
/// Arrays promote among themselves; plain values adapt to the arrays'
/// category before promoting in.
pub fn result_type<A: Into<ArrayLike>>(inputs: impl IntoIterator<Item = A>) -> Result<DType> {
    let defaults = config::defaults();
    let operands = inputs
        .into_iter()
        .map(|x| match x.into() {
            ArrayLike::Scalar(s) => Ok(Operand::Scalar(s)),
            like => dtype_of(like).map(Operand::Array),
        })
        .collect::<Result<Vec<_>>>()?;
    dtype::result_type(&operands, &defaults)
}

macro_rules! category_predicates {
    ($($name:ident => $method:ident, $what:literal;)*) => {
        $(
            #[doc = concat!("Whether the input's dtype is ", $what)]
            pub fn $name(x: impl Into<ArrayLike>) -> Result<bool> {
                dtype_of(x).map(DType::$method)
            }
        )*
    };
}

category_predicates! {
    is_int => is_int, "an integer type";
    is_uint => is_unsigned_int, "an unsigned integer type";
    is_float => is_float, "a real floating type";
    is_complex => is_complex, "a complex type";
    is_bool => is_bool, "boolean";
}
