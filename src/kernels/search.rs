//! Searching leaves

use super::{map_lanes, total_cmp, Elem};
use crate::error::{Error, Result};
use crate::ops::{Invocation, KernelValue};
use crate::tensor::shape::{contiguous_strides, normalize_axis};
use crate::tensor::HostArray;
use std::cmp::Ordering;

type Out = Result<Vec<KernelValue>>;

/// Position of the extreme element; ties resolve to the first occurrence and
/// a NaN beats everything
fn extreme_index(lane: &[Elem], keep: Ordering) -> usize {
    let mut best = 0;
    for (i, v) in lane.iter().enumerate().skip(1) {
        let current = &lane[best];
        if current.0.is_nan() {
            break;
        }
        if v.0.is_nan() || total_cmp(v, current) == keep {
            best = i;
        }
    }
    best
}

fn arg_extreme(inv: &Invocation<'_>, keep: Ordering) -> Out {
    let x = inv.host(0)?;
    if x.numel() == 0 {
        return Err(Error::invalid_argument("x", "attempt to get the index of an empty sequence"));
    }
    let keepdims = inv.bool_kw("keepdims", false)?;
    let dtype = inv.defaults.int;
    match inv.opt_int_kw("axis")? {
        None => {
            let lane: Vec<Elem> = (0..x.numel()).map(|i| x.get(i)).collect();
            let idx = extreme_index(&lane, keep) as f64;
            let shape = if keepdims { vec![1; x.ndim()] } else { Vec::new() };
            inv.single(HostArray::new(shape, dtype, vec![idx])?)
        }
        Some(axis) => {
            let axis = normalize_axis(axis as isize, x.ndim())?;
            let out = map_lanes(&x, axis, 1, dtype, |lane| {
                vec![(extreme_index(lane, keep) as f64, 0.0)]
            })?;
            let mut shape = x.shape().to_vec();
            if keepdims {
                shape[axis] = 1;
            } else {
                shape.remove(axis);
            }
            inv.single(out.reshaped(shape)?)
        }
    }
}

pub(crate) fn argmax(inv: &Invocation<'_>) -> Out {
    arg_extreme(inv, Ordering::Greater)
}

pub(crate) fn argmin(inv: &Invocation<'_>) -> Out {
    arg_extreme(inv, Ordering::Less)
}

/// One index array per dimension, listing the coordinates of non-zero
/// elements in row-major order
pub(crate) fn nonzero(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let ndim = x.ndim().max(1);
    let shape: Vec<usize> = if x.ndim() == 0 { vec![1] } else { x.shape().to_vec() };
    let strides = contiguous_strides(&shape);
    let hits: Vec<usize> = (0..x.numel()).filter(|&i| x.truthy(i)).collect();
    (0..ndim)
        .map(|d| {
            let coords = hits.iter().map(|&i| ((i / strides[d]) % shape[d]) as f64).collect();
            Ok(inv.lift(HostArray::new([hits.len()], inv.defaults.int, coords)?))
        })
        .collect()
}

pub(crate) fn searchsorted(inv: &Invocation<'_>) -> Out {
    let sorted = inv.host(0)?;
    let values = inv.host(1)?;
    if sorted.ndim() != 1 {
        return Err(Error::invalid_argument("x1", "searchsorted needs a 1-d sorted array"));
    }
    let right = match inv.str_kw("side", "left") {
        "left" => false,
        "right" => true,
        other => return Err(Error::invalid_argument("side", format!("expected 'left' or 'right', got '{other}'"))),
    };
    let keys: Vec<Elem> = (0..sorted.numel()).map(|i| sorted.get(i)).collect();
    let out = (0..values.numel())
        .map(|i| {
            let v = values.get(i);
            keys.partition_point(|k| match total_cmp(k, &v) {
                Ordering::Less => true,
                Ordering::Equal => right,
                Ordering::Greater => false,
            }) as f64
        })
        .collect();
    inv.single(HostArray::new(values.shape().clone(), inv.defaults.int, out)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(values: &[f64]) -> Vec<Elem> {
        values.iter().map(|&v| (v, 0.0)).collect()
    }

    #[test]
    fn test_ties_pick_first() {
        assert_eq!(extreme_index(&lane(&[3.0, 1.0, 3.0, 3.0]), Ordering::Greater), 0);
        assert_eq!(extreme_index(&lane(&[2.0, 1.0, 1.0]), Ordering::Less), 1);
    }

    #[test]
    fn test_nan_wins() {
        assert_eq!(extreme_index(&lane(&[1.0, f64::NAN, 5.0, f64::NAN]), Ordering::Greater), 1);
        assert_eq!(extreme_index(&lane(&[1.0, f64::NAN, -5.0]), Ordering::Less), 1);
    }
}
