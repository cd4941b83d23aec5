//! Shape and layout leaves
//!
//! Most of these are pure index remappings: [`remap`] walks the output in
//! row-major order and asks, for each multi-index, which source element (if
//! any) lands there.

use super::{from_elems, Elem};
use crate::dtype::{promote_types, Scalar};
use crate::error::{Error, Result};
use crate::ops::{Invocation, KernelValue, Value};
use crate::tensor::shape::{contiguous_strides, normalize_axes, normalize_axis, Shape};
use crate::tensor::HostArray;
use std::borrow::Cow;

type Out = Result<Vec<KernelValue>>;

/// Build an array of `shape` where position `idx` takes source element
/// `src(idx)`, or `fill` when that is `None`
pub(crate) fn remap(
    host: &HostArray,
    shape: impl Into<Shape>,
    fill: Elem,
    src: impl Fn(&[usize]) -> Option<usize>,
) -> Result<HostArray> {
    let shape = shape.into();
    let n = shape.numel();
    let mut elems = Vec::with_capacity(n);
    let mut index = vec![0usize; shape.ndim()];
    for _ in 0..n {
        elems.push(src(&index).map_or(fill, |i| host.get(i)));
        for d in (0..shape.ndim()).rev() {
            index[d] += 1;
            if index[d] < shape[d] {
                break;
            }
            index[d] = 0;
        }
    }
    from_elems(shape, host.dtype(), elems)
}

fn flat(index: &[usize], strides: &[usize]) -> usize {
    index.iter().zip(strides).map(|(i, s)| i * s).sum()
}

/// Transpose `host` so that output axis `d` is input axis `perm[d]`
pub(crate) fn permute(host: &HostArray, perm: &[usize]) -> Result<HostArray> {
    let ndim = host.ndim();
    let mut seen = vec![false; ndim];
    if perm.len() != ndim || perm.iter().any(|&p| p >= ndim || std::mem::replace(&mut seen[p], true)) {
        return Err(Error::invalid_argument("axes", format!("{perm:?} is not a permutation of {ndim} axes")));
    }
    let strides = contiguous_strides(host.shape());
    let shape: Vec<usize> = perm.iter().map(|&p| host.shape()[p]).collect();
    remap(host, shape, (0.0, 0.0), |idx| {
        Some(idx.iter().zip(perm).map(|(&i, &p)| i * strides[p]).sum())
    })
}

/// Target shape with at most one `-1` resolved against `numel`
pub(crate) fn resolve_shape(dims: &[i64], numel: usize) -> Result<Vec<usize>> {
    let unknown: Vec<usize> = dims.iter().enumerate().filter(|(_, &d)| d == -1).map(|(i, _)| i).collect();
    if unknown.len() > 1 || dims.iter().any(|&d| d < -1) {
        return Err(Error::invalid_argument("shape", format!("invalid target shape {dims:?}")));
    }
    let known: usize = dims.iter().filter(|&&d| d >= 0).map(|&d| d as usize).product();
    let mut shape: Vec<usize> = dims.iter().map(|&d| d.max(0) as usize).collect();
    if let Some(&u) = unknown.first() {
        if known == 0 || numel % known != 0 {
            return Err(Error::shape_mismatch(&shape, &[numel]));
        }
        shape[u] = numel / known;
    }
    if shape.iter().product::<usize>() != numel {
        return Err(Error::shape_mismatch(&shape, &[numel]));
    }
    Ok(shape)
}

pub(crate) fn reshape(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let dims = inv.ints_kw("shape")?.unwrap_or_default();
    let shape = resolve_shape(&dims, x.numel())?;
    inv.single(x.into_owned().reshaped(shape)?)
}

/// Join along an existing axis; `axis = None` flattens every part first
pub(crate) fn concat_hosts(parts: &[Cow<'_, HostArray>], axis: Option<isize>) -> Result<HostArray> {
    let first = parts
        .first()
        .ok_or_else(|| Error::invalid_argument("arrays", "need at least one array"))?;
    let dtype = parts.iter().map(|p| p.dtype()).fold(first.dtype(), promote_types);
    let flattened: Vec<HostArray>;
    let (parts, axis): (Vec<&HostArray>, usize) = match axis {
        None => {
            flattened = parts
                .iter()
                .map(|p| p.as_ref().clone().reshaped([p.numel()]))
                .collect::<Result<_>>()?;
            (flattened.iter().collect(), 0)
        }
        Some(axis) => (parts.iter().map(|p| p.as_ref()).collect(), normalize_axis(axis, first.ndim())?),
    };
    let base = parts[0].shape();
    for p in &parts[1..] {
        let compatible = p.ndim() == base.ndim()
            && p.shape().iter().zip(base.iter()).enumerate().all(|(d, (a, b))| d == axis || a == b);
        if !compatible {
            return Err(Error::shape_mismatch(base, p.shape()));
        }
    }
    let mut shape = base.to_vec();
    shape[axis] = parts.iter().map(|p| p.shape()[axis]).sum();
    let outer: usize = shape[..axis].iter().product();
    let mut elems = Vec::with_capacity(shape.iter().product());
    for o in 0..outer {
        for p in &parts {
            let chunk = p.shape()[axis..].iter().product::<usize>();
            elems.extend((o * chunk..(o + 1) * chunk).map(|i| p.get(i)));
        }
    }
    from_elems(shape, dtype, elems)
}

pub(crate) fn concat(inv: &Invocation<'_>) -> Out {
    let parts = inv.hosts(0)?;
    let axis = inv.opt_int_kw("axis")?.map(|a| a as isize);
    inv.single(concat_hosts(&parts, axis)?)
}

pub(crate) fn permute_dims(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let perm = match inv.axes_kw("axes")? {
        Some(axes) => axes
            .iter()
            .map(|&a| normalize_axis(a, x.ndim()))
            .collect::<Result<Vec<_>>>()?,
        None => (0..x.ndim()).rev().collect(),
    };
    inv.single(permute(&x, &perm)?)
}

pub(crate) fn squeeze(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let axes = match inv.axes_kw("axis")? {
        Some(axes) => {
            let axes = normalize_axes(Some(&axes), x.ndim())?;
            if let Some(&bad) = axes.iter().find(|&&a| x.shape()[a] != 1) {
                return Err(Error::invalid_argument(
                    "axis",
                    format!("cannot squeeze axis {bad} of size {}", x.shape()[bad]),
                ));
            }
            axes
        }
        None => (0..x.ndim()).filter(|&a| x.shape()[a] == 1).collect(),
    };
    let shape: Vec<usize> = (0..x.ndim()).filter(|a| !axes.contains(a)).map(|a| x.shape()[a]).collect();
    inv.single(x.into_owned().reshaped(shape)?)
}

pub(crate) fn expand_dims(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let axis = normalize_axis(inv.opt_int_kw("axis")?.unwrap_or(0) as isize, x.ndim() + 1)?;
    let mut shape = x.shape().to_vec();
    shape.insert(axis, 1);
    inv.single(x.into_owned().reshaped(shape)?)
}

pub(crate) fn stack(inv: &Invocation<'_>) -> Out {
    let parts = inv.hosts(0)?;
    let first = parts
        .first()
        .ok_or_else(|| Error::invalid_argument("arrays", "need at least one array"))?;
    if let Some(bad) = parts.iter().find(|p| p.shape() != first.shape()) {
        return Err(Error::shape_mismatch(first.shape(), bad.shape()));
    }
    let axis = normalize_axis(inv.opt_int_kw("axis")?.unwrap_or(0) as isize, first.ndim() + 1)?;
    let expanded: Vec<Cow<'_, HostArray>> = parts
        .iter()
        .map(|p| {
            let mut shape = p.shape().to_vec();
            shape.insert(axis, 1);
            p.as_ref().clone().reshaped(shape).map(Cow::Owned)
        })
        .collect::<Result<_>>()?;
    inv.single(concat_hosts(&expanded, Some(axis as isize))?)
}

pub(crate) fn split(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    if x.ndim() == 0 {
        return Err(Error::invalid_argument("x", "cannot split a 0-d array"));
    }
    let axis = normalize_axis(inv.opt_int_kw("axis")?.unwrap_or(0) as isize, x.ndim())?;
    let len = x.shape()[axis];
    let bounds: Vec<usize> = match inv.kw("sections") {
        Value::Int(n) => {
            let n = usize::try_from(*n).ok().filter(|&n| n > 0).ok_or_else(|| {
                Error::invalid_argument("sections", "number of sections must be positive")
            })?;
            if len % n != 0 {
                return Err(Error::invalid_argument(
                    "sections",
                    format!("axis of length {len} does not split into {n} equal sections"),
                ));
            }
            (0..=n).map(|k| k * len / n).collect()
        }
        Value::Ints(points) => std::iter::once(0)
            .chain(points.iter().map(|&p| (p.max(0) as usize).min(len)))
            .chain(std::iter::once(len))
            .collect(),
        other => {
            return Err(Error::invalid_argument("sections", format!("expected a count or split points, got {other:?}")))
        }
    };
    let strides = contiguous_strides(x.shape());
    bounds
        .windows(2)
        .map(|w| {
            let (start, stop) = (w[0], w[1].max(w[0]));
            let mut shape = x.shape().to_vec();
            shape[axis] = stop - start;
            let piece = remap(&x, shape, (0.0, 0.0), |idx| {
                let mut src = idx.to_vec();
                src[axis] += start;
                Some(flat(&src, &strides))
            })?;
            Ok(inv.lift(piece))
        })
        .collect()
}

pub(crate) fn tile(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let reps = inv.ints_kw("reps")?.unwrap_or_default();
    if reps.iter().any(|&r| r < 0) {
        return Err(Error::invalid_argument("reps", "repetitions must be non-negative"));
    }
    let ndim = x.ndim().max(reps.len());
    let mut src_shape = vec![1; ndim - x.ndim()];
    src_shape.extend_from_slice(x.shape());
    let mut full_reps = vec![1usize; ndim - reps.len()];
    full_reps.extend(reps.iter().map(|&r| r as usize));
    let src = x.into_owned().reshaped(src_shape.clone())?;
    let strides = contiguous_strides(&src_shape);
    let shape: Vec<usize> = src_shape.iter().zip(&full_reps).map(|(s, r)| s * r).collect();
    inv.single(remap(&src, shape, (0.0, 0.0), |idx| {
        Some(idx.iter().zip(&src_shape).zip(&strides).map(|((i, s), st)| (i % s) * st).sum())
    })?)
}

/// Map a padded coordinate back into `0..len`
fn pad_source(i: i64, len: i64, mode: &str) -> Option<usize> {
    if (0..len).contains(&i) {
        return Some(i as usize);
    }
    if len == 0 {
        return None;
    }
    let j = match mode {
        "edge" => i.clamp(0, len - 1),
        "wrap" => i.rem_euclid(len),
        "reflect" if len > 1 => {
            let period = 2 * (len - 1);
            let m = i.rem_euclid(period);
            if m < len { m } else { period - m }
        }
        "reflect" => 0,
        _ => return None,
    };
    Some(j as usize)
}

pub(crate) fn pad(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let ndim = x.ndim();
    let widths = inv.ints_kw("pad_width")?.unwrap_or_default();
    let pairs: Vec<(i64, i64)> = match widths.len() {
        1 => vec![(widths[0], widths[0]); ndim],
        2 => vec![(widths[0], widths[1]); ndim],
        n if n == 2 * ndim => widths.chunks(2).map(|c| (c[0], c[1])).collect(),
        n => {
            return Err(Error::invalid_argument("pad_width", format!("{n} values do not describe {ndim} axes")))
        }
    };
    if pairs.iter().any(|&(a, b)| a < 0 || b < 0) {
        return Err(Error::invalid_argument("pad_width", "widths must be non-negative"));
    }
    let mode = inv.str_kw("mode", "constant");
    if !matches!(mode, "constant" | "edge" | "wrap" | "reflect") {
        return Err(Error::invalid_argument("mode", format!("unsupported pad mode '{mode}'")));
    }
    let fill = inv.scalar_kw("constant_value")?.unwrap_or(Scalar::Int(0)).as_complex();
    let strides = contiguous_strides(x.shape());
    let shape: Vec<usize> = x
        .shape()
        .iter()
        .zip(&pairs)
        .map(|(&n, &(a, b))| n + a as usize + b as usize)
        .collect();
    inv.single(remap(&x, shape, fill, |idx| {
        let mut at = 0;
        for d in 0..ndim {
            let i = idx[d] as i64 - pairs[d].0;
            at += pad_source(i, x.shape()[d] as i64, mode)? * strides[d];
        }
        Some(at)
    })?)
}

pub(crate) fn flip(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let axes = match inv.axes_kw("axis")? {
        Some(axes) => normalize_axes(Some(&axes), x.ndim())?,
        None => (0..x.ndim()).collect(),
    };
    let strides = contiguous_strides(x.shape());
    let shape = x.shape().clone();
    inv.single(remap(&x, shape.clone(), (0.0, 0.0), |idx| {
        Some(
            idx.iter()
                .enumerate()
                .map(|(d, &i)| (if axes.contains(&d) { shape[d] - 1 - i } else { i }) * strides[d])
                .sum(),
        )
    })?)
}

pub(crate) fn roll(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let shifts = inv.ints_kw("shift")?.unwrap_or_default();
    let original = x.shape().clone();
    let (src, axes): (HostArray, Vec<usize>) = match inv.axes_kw("axis")? {
        None => (x.as_ref().clone().reshaped([x.numel()])?, vec![0]),
        Some(axes) => {
            let axes = axes
                .iter()
                .map(|&a| normalize_axis(a, x.ndim()))
                .collect::<Result<Vec<_>>>()?;
            (x.into_owned(), axes)
        }
    };
    let shifts = match (shifts.len(), axes.len()) {
        (1, n) => vec![shifts[0]; n],
        (s, a) if s == a => shifts,
        (s, a) => {
            return Err(Error::invalid_argument("shift", format!("{s} shifts for {a} axes")));
        }
    };
    let mut per_axis = vec![0i64; src.ndim()];
    for (&a, &s) in axes.iter().zip(&shifts) {
        per_axis[a] += s;
    }
    let strides = contiguous_strides(src.shape());
    let shape = src.shape().clone();
    let rolled = remap(&src, shape.clone(), (0.0, 0.0), |idx| {
        Some(
            idx.iter()
                .enumerate()
                .map(|(d, &i)| {
                    let n = shape[d] as i64;
                    (i as i64 - per_axis[d]).rem_euclid(n.max(1)) as usize * strides[d]
                })
                .sum(),
        )
    })?;
    inv.single(rolled.reshaped(original)?)
}

pub(crate) fn broadcast_to(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let shape = inv.shape_kw("shape")?;
    inv.single(x.broadcast_to(&shape)?)
}

pub(crate) fn repeat(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let (x, axis) = match inv.opt_int_kw("axis")? {
        None => (x.as_ref().clone().reshaped([x.numel()])?, 0),
        Some(a) => {
            let axis = normalize_axis(a as isize, x.ndim())?;
            (x.into_owned(), axis)
        }
    };
    let len = x.shape()[axis];
    let counts: Vec<usize> = match inv.kw("repeats") {
        Value::Int(n) if *n >= 0 => vec![*n as usize; len],
        Value::Ints(v) if v.len() == len && v.iter().all(|&n| n >= 0) => v.iter().map(|&n| n as usize).collect(),
        other => {
            return Err(Error::invalid_argument("repeats", format!("cannot repeat {len} entries by {other:?}")))
        }
    };
    let source: Vec<usize> = counts
        .iter()
        .enumerate()
        .flat_map(|(i, &c)| std::iter::repeat(i).take(c))
        .collect();
    let strides = contiguous_strides(x.shape());
    let mut shape = x.shape().to_vec();
    shape[axis] = source.len();
    inv.single(remap(&x, shape, (0.0, 0.0), |idx| {
        let mut src = idx.to_vec();
        src[axis] = source[idx[axis]];
        Some(flat(&src, &strides))
    })?)
}

/// Take elements along `axis` at integer `indices`; negative indices count
/// from the end
pub(crate) fn gather(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let indices = inv.host(1)?;
    if indices.dtype().is_inexact() {
        return Err(Error::invalid_argument("indices", "indices must be integers"));
    }
    let axis = normalize_axis(inv.opt_int_kw("axis")?.unwrap_or(0) as isize, x.ndim())?;
    let len = x.shape()[axis] as i64;
    let resolved: Vec<usize> = indices
        .re()
        .iter()
        .map(|&i| {
            let i = i as i64;
            let j = if i < 0 { i + len } else { i };
            if (0..len).contains(&j) {
                Ok(j as usize)
            } else {
                Err(Error::invalid_argument("indices", format!("index {i} is out of bounds for axis of length {len}")))
            }
        })
        .collect::<Result<_>>()?;

    let mut shape = x.shape()[..axis].to_vec();
    shape.extend_from_slice(indices.shape());
    shape.extend_from_slice(&x.shape()[axis + 1..]);
    let strides = contiguous_strides(x.shape());
    let index_strides = contiguous_strides(indices.shape());
    let k = indices.ndim();
    inv.single(remap(&x, shape, (0.0, 0.0), |idx| {
        let picked = resolved[flat(&idx[axis..axis + k], &index_strides)];
        let mut src: Vec<usize> = idx[..axis].to_vec();
        src.push(picked);
        src.extend_from_slice(&idx[axis + k..]);
        Some(flat(&src, &strides))
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;

    #[test]
    fn test_permute_roundtrip() {
        let a = HostArray::new([2, 3, 4], DType::F64, (0..24).map(f64::from).collect()).unwrap();
        let t = permute(&a, &[2, 0, 1]).unwrap();
        assert_eq!(t.shape().as_slice(), &[4, 2, 3]);
        let back = permute(&t, &[1, 2, 0]).unwrap();
        assert_eq!(back, a);
        assert!(permute(&a, &[0, 0, 1]).is_err());
    }

    #[test]
    fn test_resolve_shape() {
        assert_eq!(resolve_shape(&[-1, 3], 6).unwrap(), vec![2, 3]);
        assert!(resolve_shape(&[-1, -1], 6).is_err());
        assert!(resolve_shape(&[4], 6).is_err());
    }

    #[test]
    fn test_concat_axis_none_flattens() {
        let a = HostArray::new([2, 2], DType::I32, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = HostArray::new([1], DType::I32, vec![5.0]).unwrap();
        let c = concat_hosts(&[Cow::Borrowed(&a), Cow::Borrowed(&b)], None).unwrap();
        assert_eq!(c.re(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_pad_sources() {
        assert_eq!(pad_source(-1, 3, "edge"), Some(0));
        assert_eq!(pad_source(-1, 3, "reflect"), Some(1));
        assert_eq!(pad_source(4, 3, "wrap"), Some(1));
        assert_eq!(pad_source(-1, 3, "constant"), None);
    }
}
