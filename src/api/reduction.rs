//! Reductions, scans and statistics

use super::{asarray, call, Opts};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::ops::{CallFrame, OpId};
use crate::tensor::{Array, ArrayLike};

fn reduce(op: OpId, x: impl Into<ArrayLike>, axis: Option<&[isize]>, keepdims: bool) -> CallFrame {
    CallFrame::new(op)
        .arg(x)
        .kw("axis", axis)
        .kw("keepdims", keepdims)
}

macro_rules! reductions {
    ($($name:ident => $op:ident: $doc:literal),* $(,)?) => {
        paste::paste! {
            $(
                #[doc = $doc]
                ///
                /// `axis = None` reduces over every axis; negative axes count
                /// from the end.
                pub fn $name(x: impl Into<ArrayLike>, axis: Option<&[isize]>, keepdims: bool) -> Result<Array> {
                    call(reduce(OpId::$op, x, axis, keepdims))
                }

                #[doc = concat!("[`", stringify!($name), "`] with shared options")]
                pub fn [<$name _with>](
                    x: impl Into<ArrayLike>,
                    axis: Option<&[isize]>,
                    keepdims: bool,
                    opts: &Opts,
                ) -> Result<Array> {
                    call(opts.apply(reduce(OpId::$op, x, axis, keepdims)))
                }
            )*
        }
    };
}

reductions! {
    sum => Sum: "Sum of elements; small integers accumulate at the default integer width",
    prod => Prod: "Product of elements",
    mean => Mean: "Arithmetic mean",
    max => Max: "Largest element; NaN propagates",
    min => Min: "Smallest element; NaN propagates",
    all => All: "Whether every element is truthy",
    any => Any: "Whether any element is truthy",
    median => Median: "Median; NaN propagates",
}

/// Variance with `correction` degrees of freedom removed from the divisor
pub fn var(x: impl Into<ArrayLike>, axis: Option<&[isize]>, correction: f64, keepdims: bool) -> Result<Array> {
    call(reduce(OpId::Var, x, axis, keepdims).kw("correction", correction))
}

/// Standard deviation with `correction` degrees of freedom removed
pub fn std(x: impl Into<ArrayLike>, axis: Option<&[isize]>, correction: f64, keepdims: bool) -> Result<Array> {
    call(reduce(OpId::Std, x, axis, keepdims).kw("correction", correction))
}

fn scan(op: OpId, x: impl Into<ArrayLike>, axis: Option<isize>, dtype: Option<DType>) -> Result<Array> {
    let x = call(CallFrame::new(op).arg(x).kw("axis", axis))?;
    match dtype {
        Some(d) if d != x.dtype() => super::astype(&x, d),
        _ => Ok(x),
    }
}

/// Running sum along `axis`; `None` scans the flattened input.
///
/// The input dtype is kept unless `dtype` is given; booleans count in the
/// default integer dtype.
pub fn cumsum(x: impl Into<ArrayLike>, axis: Option<isize>, dtype: Option<DType>) -> Result<Array> {
    scan(OpId::Cumsum, x, axis, dtype)
}

/// Running product along `axis`
pub fn cumprod(x: impl Into<ArrayLike>, axis: Option<isize>, dtype: Option<DType>) -> Result<Array> {
    scan(OpId::Cumprod, x, axis, dtype)
}

/// Exclusive or reversed running sum
pub fn cumsum_ext(x: impl Into<ArrayLike>, axis: isize, exclusive: bool, reverse: bool) -> Result<Array> {
    call(
        CallFrame::new(OpId::Cumsum)
            .arg(x)
            .kw("axis", axis)
            .kw("exclusive", exclusive)
            .kw("reverse", reverse),
    )
}

/// Occurrences of each non-negative integer in a 1-D array.
///
/// Computed on-array: a one-hot encoding over `max(x) + 1` classes (at least
/// `minlength`), optionally scaled by `weights`, summed over the input axis.
pub fn bincount(
    x: impl Into<ArrayLike>,
    weights: Option<impl Into<ArrayLike>>,
    minlength: usize,
) -> Result<Array> {
    let x = asarray(x, None)?;
    if x.ndim() != 1 {
        return Err(Error::invalid_argument("x", format!("bincount needs a 1-D array, got {} dims", x.ndim())));
    }
    if !(x.dtype().is_int() || x.dtype().is_bool()) {
        return Err(Error::invalid_argument("x", format!("bincount needs integers, got {}", x.dtype())));
    }
    if x.numel() > 0 && min(&x, None, false)?.item()?.as_i64() < 0 {
        return Err(Error::invalid_argument("x", "bincount needs non-negative values"));
    }
    let top = if x.numel() == 0 {
        0
    } else {
        max(&x, None, false)?.item()?.as_i64() as usize + 1
    };
    let depth = top.max(minlength);
    let defaults = crate::config::defaults();
    match weights {
        None => {
            let hot = super::one_hot(&x, depth, Some(defaults.int))?;
            sum(&hot, Some(&[0][..]), false)
        }
        Some(w) => {
            let w = asarray(w, None)?;
            let hot = super::one_hot(&x, depth, Some(w.dtype()))?;
            let scaled = super::multiply(&hot, super::expand_dims(&w, -1)?)?;
            sum(&scaled, Some(&[0][..]), false)
        }
    }
}
