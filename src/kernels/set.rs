//! Set leaves

use super::{from_elems, total_cmp, Elem};
use crate::error::Result;
use crate::ops::{Invocation, KernelValue};
use crate::tensor::HostArray;

type Out = Result<Vec<KernelValue>>;

/// Sorted unique values of `elems` with, per value, the first flat index,
/// the occurrence count, and for every input element the position of its
/// value. NaNs never compare equal, so each one is its own value.
pub(crate) fn unique_groups(elems: &[Elem]) -> (Vec<Elem>, Vec<usize>, Vec<usize>, Vec<usize>) {
    let mut order: Vec<usize> = (0..elems.len()).collect();
    order.sort_by(|&i, &j| total_cmp(&elems[i], &elems[j]));

    let mut values = Vec::new();
    let mut first = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut inverse = vec![0; elems.len()];
    for &i in &order {
        let v = elems[i];
        match values.last() {
            Some(&last) if last == v => {
                if let Some(c) = counts.last_mut() {
                    *c += 1;
                }
            }
            _ => {
                values.push(v);
                first.push(i);
                counts.push(1);
            }
        }
        inverse[i] = values.len() - 1;
    }
    (values, first, inverse, counts)
}

/// Returns `values, indices, inverse_indices, counts`
pub(crate) fn unique_all(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let elems: Vec<Elem> = (0..x.numel()).map(|i| x.get(i)).collect();
    let (values, first, inverse, counts) = unique_groups(&elems);
    let int = inv.defaults.int;
    let as_f64 = |v: Vec<usize>| v.into_iter().map(|i| i as f64).collect::<Vec<_>>();
    let n = values.len();
    Ok(vec![
        inv.lift(from_elems([n], x.dtype(), values)?),
        inv.lift(HostArray::new([n], int, as_f64(first))?),
        inv.lift(HostArray::new(x.shape().clone(), int, as_f64(inverse))?),
        inv.lift(HostArray::new([n], int, as_f64(counts))?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_groups() {
        let elems: Vec<Elem> = [3.0, 1.0, 3.0, 2.0, 1.0].iter().map(|&v| (v, 0.0)).collect();
        let (values, first, inverse, counts) = unique_groups(&elems);
        assert_eq!(values.iter().map(|v| v.0).collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert_eq!(first, vec![1, 3, 0]);
        assert_eq!(inverse, vec![2, 0, 2, 1, 0]);
        assert_eq!(counts, vec![2, 1, 2]);
    }

    #[test]
    fn test_nans_are_distinct() {
        let elems = vec![(f64::NAN, 0.0), (1.0, 0.0), (f64::NAN, 0.0)];
        let (values, _, _, counts) = unique_groups(&elems);
        assert_eq!(values.len(), 3);
        assert_eq!(counts, vec![1, 1, 1]);
    }
}
