//! Sorting leaves

use super::{map_lanes, total_cmp, Elem};
use crate::error::Result;
use crate::ops::{Invocation, KernelValue};
use crate::tensor::shape::normalize_axis;
use std::cmp::Ordering;

type Out = Result<Vec<KernelValue>>;

/// Key order; descending keeps NaN last as well
fn key_order(descending: bool) -> impl Fn(&Elem, &Elem) -> Ordering {
    move |a, b| {
        if descending && !a.0.is_nan() && !b.0.is_nan() {
            total_cmp(b, a)
        } else {
            total_cmp(a, b)
        }
    }
}

/// Stable permutation that sorts `lane`
fn order(lane: &[Elem], descending: bool) -> Vec<usize> {
    let cmp = key_order(descending);
    let mut idx: Vec<usize> = (0..lane.len()).collect();
    idx.sort_by(|&i, &j| cmp(&lane[i], &lane[j]));
    idx
}

fn sort_along(inv: &Invocation<'_>, indices: bool, permute: fn(&[Elem], bool) -> Vec<usize>) -> Out {
    let x = inv.host(0)?;
    let x = if x.ndim() == 0 { x.into_owned().reshaped([1])? } else { x.into_owned() };
    let axis = normalize_axis(inv.opt_int_kw("axis")?.unwrap_or(-1) as isize, x.ndim())?;
    let descending = inv.bool_kw("descending", false)?;
    let len = x.shape()[axis];
    let dtype = if indices { inv.defaults.int } else { x.dtype() };
    let out = map_lanes(&x, axis, len, dtype, |lane| {
        let idx = permute(lane, descending);
        if indices {
            idx.into_iter().map(|i| (i as f64, 0.0)).collect()
        } else {
            idx.into_iter().map(|i| lane[i]).collect()
        }
    })?;
    inv.single(out)
}

pub(crate) fn sort(inv: &Invocation<'_>) -> Out {
    sort_along(inv, false, order)
}

pub(crate) fn argsort(inv: &Invocation<'_>) -> Out {
    sort_along(inv, true, order)
}

/// Sorted order where runs of equal keys come out reversed, the way a
/// non-order-preserving native sort may return them
fn unstable_order(lane: &[Elem], descending: bool) -> Vec<usize> {
    let mut idx = order(lane, descending);
    let mut start = 0;
    while start < idx.len() {
        let mut end = start + 1;
        while end < idx.len() && lane[idx[end]] == lane[idx[start]] {
            end += 1;
        }
        idx[start..end].reverse();
        start = end;
    }
    idx
}

/// Argsort leaf of backends whose native sort is not stable
pub(crate) fn argsort_unstable(inv: &Invocation<'_>) -> Out {
    sort_along(inv, true, unstable_order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(values: &[f64]) -> Vec<Elem> {
        values.iter().map(|&v| (v, 0.0)).collect()
    }

    #[test]
    fn test_order_is_stable() {
        assert_eq!(order(&lane(&[2.0, 1.0, 2.0, 1.0]), false), vec![1, 3, 0, 2]);
        assert_eq!(order(&lane(&[2.0, 1.0, 2.0, 1.0]), true), vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_nan_sorts_last() {
        assert_eq!(order(&lane(&[f64::NAN, 1.0, 3.0]), true), vec![2, 1, 0]);
        assert_eq!(order(&lane(&[f64::NAN, 1.0, 3.0]), false), vec![1, 2, 0]);
    }

    #[test]
    fn test_unstable_order_reverses_ties() {
        assert_eq!(unstable_order(&lane(&[2.0, 1.0, 2.0, 1.0]), false), vec![3, 1, 2, 0]);
    }
}
