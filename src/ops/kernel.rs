//! The leaf calling convention
//!
//! A leaf receives an `Invocation` whose operands have already been
//! normalised by the adapter chain: every array operand is a native array of
//! the active backend with a dtype the leaf accepts. Leaves return native
//! arrays (via `Invocation::lift`) or plain scalars; the marshaller turns
//! both back into handles.

use super::frame::Value;
use super::op_id::OpId;
use crate::backend::{BackendDescriptor, NativeRef};
use crate::device::Device;
use crate::dtype::{DType, Defaults, Scalar};
use crate::error::{Error, Result};
use crate::tensor::{ArrayLike, HostArray};
use std::borrow::Cow;

/// A value produced by a leaf
#[derive(Clone, Debug)]
pub enum KernelValue {
    /// Backend-native array
    Array(NativeRef),
    /// Plain scalar escaping from a 0-d result
    Scalar(Scalar),
}

/// Leaf function signature
pub type Kernel = fn(&Invocation<'_>) -> Result<Vec<KernelValue>>;

/// Arguments and context handed to a leaf
pub struct Invocation<'a> {
    /// Operator being executed
    pub op: OpId,
    /// Backend executing it
    pub backend: &'a BackendDescriptor,
    /// Placement for newly created arrays
    pub device: Device,
    /// Requested output dtype (creation and conversion operators)
    pub dtype: Option<DType>,
    /// Output array the leaf may write into directly
    pub out: Option<&'a NativeRef>,
    /// Fallback dtypes
    pub defaults: Defaults,
    args: &'a [Value],
    kwargs: &'a [(&'static str, Value)],
}

static NONE: Value = Value::None;

impl<'a> Invocation<'a> {
    /// Assemble an invocation
    pub(crate) fn new(
        op: OpId,
        backend: &'a BackendDescriptor,
        device: Device,
        args: &'a [Value],
        kwargs: &'a [(&'static str, Value)],
        defaults: Defaults,
    ) -> Self {
        Self {
            op,
            backend,
            device,
            dtype: None,
            out: None,
            defaults,
            args,
            kwargs,
        }
    }

    /// Positional argument `i` (`Value::None` when absent)
    pub fn arg(&self, i: usize) -> &'a Value {
        self.args.get(i).unwrap_or(&NONE)
    }

    /// Number of positional arguments
    pub fn num_args(&self) -> usize {
        self.args.len()
    }

    /// Named parameter (`Value::None` when absent)
    pub fn kw(&self, name: &str) -> &'a Value {
        self.kwargs
            .iter()
            .find(|(k, _)| *k == name)
            .map_or(&NONE, |(_, v)| v)
    }

    /// Host view of array operand `i`
    pub fn host(&self, i: usize) -> Result<Cow<'a, HostArray>> {
        match self.arg(i) {
            Value::Array(ArrayLike::Native(n)) => Ok(n.host()),
            other => Err(self.bad_operand(i, other)),
        }
    }

    /// Host view of array operand `i` when present
    pub fn opt_host(&self, i: usize) -> Result<Option<Cow<'a, HostArray>>> {
        match self.arg(i) {
            Value::None => Ok(None),
            _ => self.host(i).map(Some),
        }
    }

    /// Host views of a sequence operand
    pub fn hosts(&self, i: usize) -> Result<Vec<Cow<'a, HostArray>>> {
        match self.arg(i) {
            Value::Arrays(list) => list
                .iter()
                .map(|like| match like {
                    ArrayLike::Native(n) => Ok(n.host()),
                    _ => Err(Error::Backend(format!(
                        "'{}' received an unmarshalled operand",
                        self.op
                    ))),
                })
                .collect(),
            other => Err(self.bad_operand(i, other)),
        }
    }

    fn bad_operand(&self, i: usize, got: &Value) -> Error {
        Error::Backend(format!(
            "'{}' expected an array operand at position {i}, got {got:?}",
            self.op
        ))
    }

    /// Required integer parameter
    pub fn int_kw(&self, name: &'static str) -> Result<i64> {
        self.opt_int_kw(name)?
            .ok_or_else(|| Error::invalid_argument(name, "missing required argument"))
    }

    /// Optional integer parameter
    pub fn opt_int_kw(&self, name: &'static str) -> Result<Option<i64>> {
        match self.kw(name) {
            Value::None => Ok(None),
            v => v
                .as_int()
                .map(Some)
                .ok_or_else(|| Error::invalid_argument(name, format!("expected an integer, got {v:?}"))),
        }
    }

    /// Optional float parameter
    pub fn opt_float_kw(&self, name: &'static str) -> Result<Option<f64>> {
        match self.kw(name) {
            Value::None => Ok(None),
            v => v
                .as_float()
                .map(Some)
                .ok_or_else(|| Error::invalid_argument(name, format!("expected a number, got {v:?}"))),
        }
    }

    /// Float parameter with a default
    pub fn float_kw(&self, name: &'static str, default: f64) -> Result<f64> {
        Ok(self.opt_float_kw(name)?.unwrap_or(default))
    }

    /// Bool parameter with a default
    pub fn bool_kw(&self, name: &'static str, default: bool) -> Result<bool> {
        match self.kw(name) {
            Value::None => Ok(default),
            v => v
                .as_bool()
                .ok_or_else(|| Error::invalid_argument(name, format!("expected a bool, got {v:?}"))),
        }
    }

    /// Scalar parameter
    pub fn scalar_kw(&self, name: &'static str) -> Result<Option<Scalar>> {
        match self.kw(name) {
            Value::None => Ok(None),
            v => v
                .as_scalar()
                .map(Some)
                .ok_or_else(|| Error::invalid_argument(name, format!("expected a number, got {v:?}"))),
        }
    }

    /// Integer sequence parameter
    pub fn ints_kw(&self, name: &'static str) -> Result<Option<Vec<i64>>> {
        match self.kw(name) {
            Value::None => Ok(None),
            v => v
                .as_ints()
                .map(Some)
                .ok_or_else(|| Error::invalid_argument(name, format!("expected integers, got {v:?}"))),
        }
    }

    /// Axis list parameter; absent means every axis
    pub fn axes_kw(&self, name: &'static str) -> Result<Option<Vec<isize>>> {
        Ok(self
            .ints_kw(name)?
            .map(|v| v.into_iter().map(|a| a as isize).collect()))
    }

    /// Shape parameter
    pub fn shape_kw(&self, name: &'static str) -> Result<Vec<usize>> {
        let dims = self.ints_kw(name)?.unwrap_or_default();
        dims.into_iter()
            .map(|d| {
                usize::try_from(d).map_err(|_| {
                    Error::invalid_argument(name, format!("negative dimension {d}"))
                })
            })
            .collect()
    }

    /// String parameter with a default
    pub fn str_kw(&self, name: &'static str, default: &'static str) -> &'a str {
        self.kw(name).as_str().unwrap_or(default)
    }

    /// Requested dtype, or `fallback`
    #[inline]
    pub fn dtype_or(&self, fallback: DType) -> DType {
        self.dtype.unwrap_or(fallback)
    }

    /// Wrap a host result as this backend's native array.
    ///
    /// When the leaf was handed an `out` array the result takes its dtype and
    /// placement, which is how host-backed leaves honour native `out`.
    pub fn lift(&self, data: HostArray) -> KernelValue {
        KernelValue::Array(match self.out {
            Some(out) => {
                let data = if data.dtype() == out.dtype() {
                    data
                } else {
                    data.astype(out.dtype())
                };
                self.backend.wrap(data, &out.device())
            }
            None => self.backend.wrap(data, &self.device),
        })
    }

    /// Lift a single host result
    #[inline]
    pub fn single(&self, data: HostArray) -> Result<Vec<KernelValue>> {
        Ok(vec![self.lift(data)])
    }
}
