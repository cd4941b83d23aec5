//! Array creation

use super::call;
use crate::device::Device;
use crate::dtype::{DType, Scalar};
use crate::error::Result;
use crate::ops::{CallFrame, OpId};
use crate::tensor::{Array, ArrayLike};

fn shaped(op: OpId, shape: &[usize], dtype: Option<DType>, device: Option<Device>) -> CallFrame {
    CallFrame::new(op).kw("shape", shape).dtype(dtype).device(device)
}

/// Array of zeros; the dtype defaults to the default float
pub fn zeros(shape: &[usize], dtype: Option<DType>) -> Result<Array> {
    call(shaped(OpId::Zeros, shape, dtype, None))
}

/// Array of ones
pub fn ones(shape: &[usize], dtype: Option<DType>) -> Result<Array> {
    call(shaped(OpId::Ones, shape, dtype, None))
}

/// Uninitialised array; contents are unspecified
pub fn empty(shape: &[usize], dtype: Option<DType>) -> Result<Array> {
    call(shaped(OpId::Empty, shape, dtype, None))
}

/// Array filled with `value`; the dtype defaults to the value's own
pub fn full(shape: &[usize], value: impl Into<Scalar>, dtype: Option<DType>) -> Result<Array> {
    call(shaped(OpId::Full, shape, dtype, None).kw("fill_value", value.into()))
}

/// [`zeros`] placed on `device`
pub fn zeros_on(shape: &[usize], dtype: Option<DType>, device: Device) -> Result<Array> {
    call(shaped(OpId::Zeros, shape, dtype, Some(device)))
}

/// Values in `[start, stop)` spaced by `step`
///
/// Integer bounds give the default integer dtype, anything else the default
/// float.
pub fn arange(
    start: impl Into<Scalar>,
    stop: impl Into<Scalar>,
    step: impl Into<Scalar>,
    dtype: Option<DType>,
) -> Result<Array> {
    call(
        CallFrame::new(OpId::Arange)
            .kw("start", start.into())
            .kw("stop", stop.into())
            .kw("step", step.into())
            .dtype(dtype),
    )
}

/// `num` evenly spaced values from `start` to `stop`
pub fn linspace(start: f64, stop: f64, num: usize, endpoint: bool, dtype: Option<DType>) -> Result<Array> {
    call(
        CallFrame::new(OpId::Linspace)
            .kw("start", start)
            .kw("stop", stop)
            .kw("num", num)
            .kw("endpoint", endpoint)
            .dtype(dtype),
    )
}

/// Ones on the `k`-th diagonal of an `n_rows × n_cols` matrix
pub fn eye(n_rows: usize, n_cols: Option<usize>, k: i64, dtype: Option<DType>) -> Result<Array> {
    call(
        CallFrame::new(OpId::Eye)
            .kw("n_rows", n_rows)
            .kw("n_cols", n_cols)
            .kw("k", k)
            .dtype(dtype),
    )
}

/// Zeros with the shape of `x`, and its dtype unless one is given
pub fn zeros_like(x: impl Into<ArrayLike>, dtype: Option<DType>) -> Result<Array> {
    call(CallFrame::new(OpId::ZerosLike).arg(x).dtype(dtype))
}

/// Ones with the shape of `x`
pub fn ones_like(x: impl Into<ArrayLike>, dtype: Option<DType>) -> Result<Array> {
    call(CallFrame::new(OpId::OnesLike).arg(x).dtype(dtype))
}

/// `value` with the shape of `x`
pub fn full_like(x: impl Into<ArrayLike>, value: impl Into<Scalar>, dtype: Option<DType>) -> Result<Array> {
    call(
        CallFrame::new(OpId::FullLike)
            .arg(x)
            .kw("fill_value", value.into())
            .dtype(dtype),
    )
}

/// Lower triangle of the last two axes, at and below diagonal `k`
pub fn tril(x: impl Into<ArrayLike>, k: i64) -> Result<Array> {
    call(CallFrame::new(OpId::Tril).arg(x).kw("k", k))
}

/// Upper triangle of the last two axes, at and above diagonal `k`
pub fn triu(x: impl Into<ArrayLike>, k: i64) -> Result<Array> {
    call(CallFrame::new(OpId::Triu).arg(x).kw("k", k))
}

/// One-hot encoding of integer `indices` with `depth` classes on a new last axis
pub fn one_hot(indices: impl Into<ArrayLike>, depth: usize, dtype: Option<DType>) -> Result<Array> {
    call(CallFrame::new(OpId::OneHot).arg(indices).kw("depth", depth).dtype(dtype))
}
