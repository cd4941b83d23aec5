//! Array construction leaves

use super::{from_elems, Elem};
use crate::dtype::Scalar;
use crate::error::{Error, Result};
use crate::ops::{Invocation, KernelValue};
use crate::tensor::shape::normalize_axis;
use crate::tensor::HostArray;

type Out = Result<Vec<KernelValue>>;

pub(crate) fn zeros(inv: &Invocation<'_>) -> Out {
    let shape = inv.shape_kw("shape")?;
    inv.single(HostArray::zeros(shape, inv.dtype_or(inv.defaults.float)))
}

pub(crate) fn ones(inv: &Invocation<'_>) -> Out {
    let shape = inv.shape_kw("shape")?;
    inv.single(HostArray::full(shape, inv.dtype_or(inv.defaults.float), Scalar::Int(1)))
}

/// Host storage is always initialised; `empty` hands back zeros
pub(crate) fn empty(inv: &Invocation<'_>) -> Out {
    zeros(inv)
}

pub(crate) fn full(inv: &Invocation<'_>) -> Out {
    let shape = inv.shape_kw("shape")?;
    let value = inv
        .scalar_kw("fill_value")?
        .ok_or_else(|| Error::invalid_argument("fill_value", "missing required argument"))?;
    let dtype = inv.dtype_or(value.natural_dtype(&inv.defaults));
    inv.single(HostArray::full(shape, dtype, value))
}

pub(crate) fn arange(inv: &Invocation<'_>) -> Out {
    let start = inv.scalar_kw("start")?.unwrap_or(Scalar::Int(0));
    let stop = inv
        .scalar_kw("stop")?
        .ok_or_else(|| Error::invalid_argument("stop", "missing required argument"))?;
    let step = inv.scalar_kw("step")?.unwrap_or(Scalar::Int(1));
    if step.as_f64() == 0.0 {
        return Err(Error::invalid_argument("step", "step must be non-zero"));
    }
    let all_int = [start, stop, step].iter().all(|s| matches!(s, Scalar::Int(_) | Scalar::Bool(_)));
    let dtype = inv.dtype_or(if all_int { inv.defaults.int } else { inv.defaults.float });

    let (a, b, s) = (start.as_f64(), stop.as_f64(), step.as_f64());
    let n = ((b - a) / s).ceil().max(0.0) as usize;
    let values = (0..n).map(|i| a + i as f64 * s).collect();
    inv.single(HostArray::new([n], dtype, values)?)
}

pub(crate) fn linspace(inv: &Invocation<'_>) -> Out {
    let start = inv.float_kw("start", 0.0)?;
    let stop = inv
        .opt_float_kw("stop")?
        .ok_or_else(|| Error::invalid_argument("stop", "missing required argument"))?;
    let num = usize::try_from(inv.opt_int_kw("num")?.unwrap_or(50))
        .map_err(|_| Error::invalid_argument("num", "must be non-negative"))?;
    let endpoint = inv.bool_kw("endpoint", true)?;
    let div = if endpoint { num.saturating_sub(1) } else { num };
    let step = if div > 0 { (stop - start) / div as f64 } else { 0.0 };
    let mut values: Vec<f64> = (0..num).map(|i| start + i as f64 * step).collect();
    if endpoint && num > 1 {
        values[num - 1] = stop;
    }
    inv.single(HostArray::new([num], inv.dtype_or(inv.defaults.float), values)?)
}

pub(crate) fn eye(inv: &Invocation<'_>) -> Out {
    let rows = inv.int_kw("n_rows")?;
    let cols = inv.opt_int_kw("n_cols")?.unwrap_or(rows);
    let k = inv.opt_int_kw("k")?.unwrap_or(0);
    if rows < 0 || cols < 0 {
        return Err(Error::invalid_argument("n_rows", "dimensions must be non-negative"));
    }
    let (rows, cols) = (rows as usize, cols as usize);
    let mut values = vec![0.0; rows * cols];
    for r in 0..rows {
        let c = r as i64 + k;
        if (0..cols as i64).contains(&c) {
            values[r * cols + c as usize] = 1.0;
        }
    }
    inv.single(HostArray::new([rows, cols], inv.dtype_or(inv.defaults.float), values)?)
}

pub(crate) fn zeros_like(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    inv.single(HostArray::zeros(x.shape().clone(), inv.dtype_or(x.dtype())))
}

pub(crate) fn ones_like(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    inv.single(HostArray::full(x.shape().clone(), inv.dtype_or(x.dtype()), Scalar::Int(1)))
}

pub(crate) fn full_like(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let value = inv
        .scalar_kw("fill_value")?
        .ok_or_else(|| Error::invalid_argument("fill_value", "missing required argument"))?;
    inv.single(HostArray::full(x.shape().clone(), inv.dtype_or(x.dtype()), value))
}

fn triangle(inv: &Invocation<'_>, keep: impl Fn(i64, i64) -> bool) -> Out {
    let x = inv.host(0)?;
    if x.ndim() < 2 {
        return Err(Error::invalid_argument("x", "tril/triu need at least two dimensions"));
    }
    let k = inv.opt_int_kw("k")?.unwrap_or(0);
    let shape = x.shape();
    let (rows, cols) = (shape[x.ndim() - 2], shape[x.ndim() - 1]);
    let elems: Vec<Elem> = (0..x.numel())
        .map(|i| {
            let (r, c) = ((i / cols) % rows, i % cols);
            if keep(c as i64 - r as i64, k) {
                x.get(i)
            } else {
                (0.0, 0.0)
            }
        })
        .collect();
    inv.single(from_elems(shape.clone(), x.dtype(), elems)?)
}

pub(crate) fn tril(inv: &Invocation<'_>) -> Out {
    triangle(inv, |offset, k| offset <= k)
}

pub(crate) fn triu(inv: &Invocation<'_>) -> Out {
    triangle(inv, |offset, k| offset >= k)
}

pub(crate) fn one_hot(inv: &Invocation<'_>) -> Out {
    let indices = inv.host(0)?;
    if indices.dtype().is_inexact() {
        return Err(Error::invalid_argument("indices", "one_hot needs integer indices"));
    }
    let depth = usize::try_from(inv.int_kw("depth")?)
        .map_err(|_| Error::invalid_argument("depth", "must be non-negative"))?;
    let on = inv.scalar_kw("on_value")?.map_or(1.0, Scalar::as_f64);
    let off = inv.scalar_kw("off_value")?.map_or(0.0, Scalar::as_f64);
    let ndim = indices.ndim() + 1;
    let axis = normalize_axis(inv.opt_int_kw("axis")?.unwrap_or(-1) as isize, ndim)?;

    // build with the class axis last, then move it into place
    let n = indices.numel();
    let mut values = vec![off; n * depth];
    for i in 0..n {
        let class = indices.re()[i];
        if class >= 0.0 && (class as usize) < depth {
            values[i * depth + class as usize] = on;
        }
    }
    let mut shape = indices.shape().to_vec();
    shape.push(depth);
    let dtype = inv.dtype_or(inv.defaults.float);
    let last = HostArray::new(shape, dtype, values)?;
    if axis == ndim - 1 {
        return inv.single(last);
    }
    let mut perm: Vec<usize> = (0..ndim - 1).collect();
    perm.insert(axis, ndim - 1);
    inv.single(super::manipulation::permute(&last, &perm)?)
}
