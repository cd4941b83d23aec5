//! Reduction, scan and statistical leaves

use super::{inexact, map_lanes, reduce_groups, reduction_axes, total_cmp, Elem};
use crate::dtype::{DType, DTypeCategory, Defaults};
use crate::error::{Error, Result};
use crate::ops::{Invocation, KernelValue};
use crate::tensor::shape::normalize_axis;

type Out = Result<Vec<KernelValue>>;

/// Sums and products accumulate integers at no less than the default width
fn accumulator(dtype: DType, defaults: &Defaults) -> DType {
    match dtype.category() {
        DTypeCategory::Bool => defaults.int,
        DTypeCategory::SignedInt if dtype.bits() < defaults.int.bits() => defaults.int,
        DTypeCategory::UnsignedInt if dtype.bits() < defaults.int.bits() => {
            DType::with_bits(DTypeCategory::UnsignedInt, defaults.int.bits()).unwrap_or(dtype)
        }
        _ => dtype,
    }
}

fn reduction(
    inv: &Invocation<'_>,
    dtype_rule: impl Fn(DType) -> DType,
    f: impl Fn(&[Elem]) -> Result<Elem>,
) -> Out {
    let x = inv.host(0)?;
    let axes = reduction_axes(inv, x.ndim())?;
    let keepdims = inv.bool_kw("keepdims", false)?;
    let dtype = dtype_rule(x.dtype());

    // surface the first leaf failure instead of producing partial output
    let failure = std::cell::RefCell::new(None);
    let out = reduce_groups(&x, &axes, keepdims, dtype, |group| match f(group) {
        Ok(v) => v,
        Err(e) => {
            failure.borrow_mut().get_or_insert(e);
            (f64::NAN, 0.0)
        }
    })?;
    if let Some(e) = failure.into_inner() {
        return Err(e);
    }
    inv.single(out)
}

fn total(group: &[Elem]) -> Elem {
    group
        .iter()
        .fold((0.0, 0.0), |acc, v| (acc.0 + v.0, acc.1 + v.1))
}

pub(crate) fn sum(inv: &Invocation<'_>) -> Out {
    reduction(inv, |d| accumulator(d, &inv.defaults), |g| Ok(total(g)))
}

pub(crate) fn prod(inv: &Invocation<'_>) -> Out {
    reduction(inv, |d| accumulator(d, &inv.defaults), |g| {
        Ok(g.iter().fold((1.0, 0.0), |a, b| {
            (a.0 * b.0 - a.1 * b.1, a.0 * b.1 + a.1 * b.0)
        }))
    })
}

pub(crate) fn mean(inv: &Invocation<'_>) -> Out {
    reduction(inv, |d| inexact(d, &inv.defaults), |g| {
        let (re, im) = total(g);
        let n = g.len() as f64;
        Ok((re / n, im / n))
    })
}

fn extreme(inv: &Invocation<'_>, keep: std::cmp::Ordering) -> Out {
    reduction(inv, |d| d, |g| {
        if g.is_empty() {
            return Err(Error::invalid_argument("x", "zero-size reduction has no identity"));
        }
        if let Some(nan) = g.iter().find(|v| v.0.is_nan() || v.1.is_nan()) {
            return Ok(*nan);
        }
        Ok(g.iter()
            .copied()
            .reduce(|a, b| if total_cmp(&b, &a) == keep { b } else { a })
            .unwrap_or((0.0, 0.0)))
    })
}

pub(crate) fn max(inv: &Invocation<'_>) -> Out {
    extreme(inv, std::cmp::Ordering::Greater)
}

pub(crate) fn min(inv: &Invocation<'_>) -> Out {
    extreme(inv, std::cmp::Ordering::Less)
}

pub(crate) fn all(inv: &Invocation<'_>) -> Out {
    reduction(inv, |_| DType::Bool, |g| {
        Ok((g.iter().all(|v| v.0 != 0.0 || v.1 != 0.0) as u8 as f64, 0.0))
    })
}

pub(crate) fn any(inv: &Invocation<'_>) -> Out {
    reduction(inv, |_| DType::Bool, |g| {
        Ok((g.iter().any(|v| v.0 != 0.0 || v.1 != 0.0) as u8 as f64, 0.0))
    })
}

// ============================================================================
// Scans
// ============================================================================

/// Scans preserve the input dtype; booleans count in the default integer
fn scan(inv: &Invocation<'_>, identity: Elem, step: fn(Elem, Elem) -> Elem) -> Out {
    let x = inv.host(0)?;
    let (x, axis) = match inv.opt_int_kw("axis")? {
        Some(axis) => {
            let axis = normalize_axis(axis as isize, x.ndim().max(1))?;
            (x.into_owned(), axis)
        }
        None => {
            let n = x.numel();
            (x.into_owned().reshaped([n])?, 0)
        }
    };
    let x = if x.ndim() == 0 { x.reshaped([1])? } else { x };
    let dtype = match x.dtype() {
        DType::Bool => inv.defaults.int,
        d => d,
    };
    let exclusive = inv.bool_kw("exclusive", false)?;
    let reverse = inv.bool_kw("reverse", false)?;
    let len = x.shape()[axis];

    let out = map_lanes(&x, axis, len, dtype, |lane| {
        let mut acc = identity;
        let mut out = vec![identity; lane.len()];
        let order: Box<dyn Iterator<Item = usize>> = if reverse {
            Box::new((0..lane.len()).rev())
        } else {
            Box::new(0..lane.len())
        };
        for k in order {
            if exclusive {
                out[k] = acc;
                acc = step(acc, lane[k]);
            } else {
                acc = step(acc, lane[k]);
                out[k] = acc;
            }
        }
        out
    })?;
    inv.single(out)
}

pub(crate) fn cumsum(inv: &Invocation<'_>) -> Out {
    scan(inv, (0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1))
}

pub(crate) fn cumprod(inv: &Invocation<'_>) -> Out {
    scan(inv, (1.0, 0.0), |a, b| (a.0 * b.0 - a.1 * b.1, a.0 * b.1 + a.1 * b.0))
}

// ============================================================================
// Statistics
// ============================================================================

fn variance(group: &[Elem], correction: f64) -> f64 {
    let n = group.len() as f64;
    let (mr, mi) = total(group);
    let (mr, mi) = (mr / n, mi / n);
    let ss: f64 = group
        .iter()
        .map(|v| (v.0 - mr).powi(2) + (v.1 - mi).powi(2))
        .sum();
    ss / (n - correction).max(0.0)
}

pub(crate) fn var(inv: &Invocation<'_>) -> Out {
    let correction = inv.float_kw("correction", 0.0)?;
    reduction(inv, |d| inexact(d, &inv.defaults).real_dtype(), |g| {
        Ok((variance(g, correction), 0.0))
    })
}

pub(crate) fn std(inv: &Invocation<'_>) -> Out {
    let correction = inv.float_kw("correction", 0.0)?;
    reduction(inv, |d| inexact(d, &inv.defaults).real_dtype(), |g| {
        Ok((variance(g, correction).sqrt(), 0.0))
    })
}

pub(crate) fn median(inv: &Invocation<'_>) -> Out {
    if inv.host(0)?.dtype().is_complex() {
        return Err(Error::invalid_argument("x", "median is undefined for complex input"));
    }
    reduction(inv, |d| inexact(d, &inv.defaults), |g| {
        if g.is_empty() {
            return Ok((f64::NAN, 0.0));
        }
        let mut v: Vec<f64> = g.iter().map(|e| e.0).collect();
        if v.iter().any(|x| x.is_nan()) {
            return Ok((f64::NAN, 0.0));
        }
        v.sort_by(f64::total_cmp);
        let mid = v.len() / 2;
        Ok(if v.len() % 2 == 1 {
            (v[mid], 0.0)
        } else {
            ((v[mid - 1] + v[mid]) / 2.0, 0.0)
        })
    })
}
