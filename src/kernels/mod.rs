//! Reference leaves shared by the builtin backends
//!
//! Every leaf reads its operands through the host view of the native arrays,
//! evaluates in f64 (with a separate imaginary plane for complex data) and
//! lifts the result back into the calling backend's native type. Backends
//! differ in which of these leaves they export and in the flags attached to
//! them, not in the arithmetic.

pub(crate) mod activation;
pub(crate) mod conv;
pub(crate) mod creation;
pub(crate) mod elementwise;
pub(crate) mod linalg;
pub(crate) mod manipulation;
pub(crate) mod random;
pub(crate) mod reduce;
pub(crate) mod search;
pub(crate) mod set;
pub(crate) mod sort;
pub(crate) mod utility;

use crate::dtype::{DType, Defaults};
use crate::error::Result;
use crate::ops::{Invocation, OpEntry};
use crate::tensor::shape::{lanes, normalize_axes, Shape};
use crate::tensor::HostArray;

/// One element as (re, im)
pub(crate) type Elem = (f64, f64);

macro_rules! exports {
    ($($module:ident :: [$($name:ident),* $(,)?]),* $(,)?) => {
        vec![$($((stringify!($name), OpEntry::new($module::$name)),)*)*]
    };
}

/// The full reference export set, keyed by canonical operator name
pub(crate) fn reference() -> Vec<(&'static str, OpEntry)> {
    exports![
        creation::[
            zeros, ones, full, empty, arange, linspace, eye, zeros_like, ones_like, full_like,
            tril, triu, one_hot,
        ],
        elementwise::[
            abs, negative, positive, exp, expm1, log, log1p, log2, log10, sqrt, square, sin,
            cos, tan, sinh, cosh, tanh, floor, ceil, round, trunc, sign, reciprocal,
            logical_not, isnan, isinf, isfinite, real, imag, conj, add, subtract, multiply,
            divide, floor_divide, remainder, pow, maximum, minimum, atan2, equal, not_equal,
            less, less_equal, greater, greater_equal, logical_and, logical_or, logical_xor,
            r#where, clip,
        ],
        reduce::[sum, prod, mean, max, min, all, any, cumsum, cumprod, var, std, median],
        linalg::[
            matmul, diag, solve, cholesky, inv, det, matrix_rank, svdvals, outer, vector_norm,
            trace,
        ],
        manipulation::[
            reshape, concat, permute_dims, squeeze, expand_dims, stack, split, tile, pad, flip,
            roll, broadcast_to, repeat, gather,
        ],
        search::[argmin, argmax, nonzero, searchsorted],
        sort::[sort, argsort],
        random::[seed, random_uniform, random_normal, randint, shuffle],
        set::[unique_all],
        activation::[relu, leaky_relu, sigmoid, softmax, log_softmax, gelu, softplus, silu],
        conv::[conv],
        utility::[stop_gradient, to_device, astype],
    ]
    .into_iter()
    .map(|(name, entry)| (name.trim_start_matches("r#"), entry))
    .collect()
}

/// Dtype transcendental functions compute in: integers and bools use the
/// default float
pub(crate) fn inexact(dtype: DType, defaults: &Defaults) -> DType {
    if dtype.is_inexact() {
        dtype
    } else {
        defaults.float
    }
}

/// Build a host array from (re, im) pairs
pub(crate) fn from_elems(shape: impl Into<Shape>, dtype: DType, elems: Vec<Elem>) -> Result<HostArray> {
    let (re, im): (Vec<f64>, Vec<f64>) = elems.into_iter().unzip();
    HostArray::from_parts(shape, dtype, re, dtype.is_complex().then_some(im))
}

/// Reduction axes named by the `axis` parameter; absent means every axis
pub(crate) fn reduction_axes(inv: &Invocation<'_>, ndim: usize) -> Result<Vec<usize>> {
    match inv.axes_kw("axis")? {
        None => Ok((0..ndim).collect()),
        Some(axes) => normalize_axes(Some(&axes), ndim),
    }
}

/// Reduce `host` over `axes`, handing each output position its group of
/// elements in row-major order
pub(crate) fn reduce_groups(
    host: &HostArray,
    axes: &[usize],
    keepdims: bool,
    dtype: DType,
    f: impl Fn(&[Elem]) -> Elem,
) -> Result<HostArray> {
    let shape = host.shape().as_slice();
    let kept: Vec<usize> = shape
        .iter()
        .enumerate()
        .map(|(d, &n)| if axes.contains(&d) { 1 } else { n })
        .collect();
    let out_n: usize = kept.iter().product();
    let mut groups: Vec<Vec<Elem>> = vec![Vec::new(); out_n];

    let mut index = vec![0usize; shape.len()];
    for i in 0..host.numel() {
        let mut flat = 0;
        for (d, &k) in index.iter().enumerate() {
            flat = flat * kept[d] + if axes.contains(&d) { 0 } else { k };
        }
        groups[flat].push(host.get(i));
        for d in (0..shape.len()).rev() {
            index[d] += 1;
            if index[d] < shape[d] {
                break;
            }
            index[d] = 0;
        }
    }

    let elems = groups.iter().map(|g| f(g)).collect();
    let out_shape: Shape = if keepdims {
        kept.into()
    } else {
        shape
            .iter()
            .enumerate()
            .filter(|(d, _)| !axes.contains(d))
            .map(|(_, &n)| n)
            .collect()
    };
    from_elems(out_shape, dtype, elems)
}

/// Apply `f` to every lane along `axis`; each call returns `out_len` elements
pub(crate) fn map_lanes(
    host: &HostArray,
    axis: usize,
    out_len: usize,
    dtype: DType,
    mut f: impl FnMut(&[Elem]) -> Vec<Elem>,
) -> Result<HostArray> {
    let (outer, len, inner) = lanes(host.shape(), axis);
    let mut out = vec![(0.0, 0.0); outer * out_len * inner];
    let mut lane = Vec::with_capacity(len);
    for o in 0..outer {
        for i in 0..inner {
            lane.clear();
            lane.extend((0..len).map(|k| host.get(o * len * inner + k * inner + i)));
            for (k, v) in f(&lane).into_iter().enumerate().take(out_len) {
                out[o * out_len * inner + k * inner + i] = v;
            }
        }
    }
    let mut shape = host.shape().to_vec();
    shape[axis] = out_len;
    from_elems(shape, dtype, out)
}

/// Ascending total order on real parts with NaN last
pub(crate) fn total_cmp(a: &Elem, b: &Elem) -> std::cmp::Ordering {
    match (a.0.is_nan(), b.0.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        _ => a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::OpId;

    #[test]
    fn test_reference_covers_every_operator() {
        let names: Vec<_> = reference().into_iter().map(|(n, _)| n).collect();
        for op in OpId::ALL {
            assert!(names.contains(&op.name()), "no reference leaf for {op}");
        }
    }

    #[test]
    fn test_reduce_groups_keepdims() {
        let a = HostArray::new([2, 3], DType::F64, (1..=6).map(f64::from).collect()).unwrap();
        let sum = |g: &[Elem]| (g.iter().map(|e| e.0).sum(), 0.0);
        let rows = reduce_groups(&a, &[1], false, DType::F64, sum).unwrap();
        assert_eq!(rows.re(), &[6.0, 15.0]);
        let cols = reduce_groups(&a, &[0], true, DType::F64, sum).unwrap();
        assert_eq!(cols.shape().as_slice(), &[1, 3]);
        assert_eq!(cols.re(), &[5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_map_lanes_inner_axis() {
        let a = HostArray::new([2, 2], DType::F64, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let rev = map_lanes(&a, 0, 2, DType::F64, |lane| lane.iter().rev().copied().collect()).unwrap();
        assert_eq!(rev.re(), &[3.0, 4.0, 1.0, 2.0]);
    }
}
