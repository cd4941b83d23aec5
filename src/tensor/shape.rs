//! Shape type and the broadcasting / axis rules shared by every operator

use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;
use std::iter::FromIterator;
use std::ops::Deref;

/// Stack allocation threshold for dimensions
/// Most arrays have 4 or fewer dimensions, so we stack-allocate up to 4
pub(crate) const STACK_DIMS: usize = 4;

/// Shape type: dimensions of an array; the empty shape denotes a 0-d array
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape(SmallVec<[usize; STACK_DIMS]>);

impl Shape {
    /// Create an empty (0-d) shape.
    pub fn scalar() -> Self {
        Self(SmallVec::new())
    }

    /// View shape as a slice.
    pub fn as_slice(&self) -> &[usize] {
        self.0.as_slice()
    }

    /// Number of dimensions in this shape.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements
    #[inline]
    pub fn numel(&self) -> usize {
        numel(&self.0)
    }
}

impl Deref for Shape {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        self.0.as_slice()
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0.as_slice())
    }
}

impl AsRef<[usize]> for Shape {
    fn as_ref(&self) -> &[usize] {
        self.0.as_slice()
    }
}

impl From<Vec<usize>> for Shape {
    fn from(value: Vec<usize>) -> Self {
        Self(value.into_iter().collect())
    }
}

impl From<&[usize]> for Shape {
    fn from(value: &[usize]) -> Self {
        Self(value.iter().copied().collect())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(value: [usize; N]) -> Self {
        Self(value.into_iter().collect())
    }
}

impl<const N: usize> From<&[usize; N]> for Shape {
    fn from(value: &[usize; N]) -> Self {
        Self(value.iter().copied().collect())
    }
}

impl FromIterator<usize> for Shape {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// Shape rules
// ============================================================================

/// Number of elements of a shape (1 for the empty shape)
#[inline]
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Row-major strides, in elements
pub fn contiguous_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Broadcast two shapes with the standard right-aligned rule
pub fn broadcast_shape(a: &[usize], b: &[usize]) -> Result<Shape> {
    let ndim = a.len().max(b.len());
    let mut out = Vec::with_capacity(ndim);
    for i in 0..ndim {
        let da = if i + a.len() >= ndim { a[i + a.len() - ndim] } else { 1 };
        let db = if i + b.len() >= ndim { b[i + b.len() - ndim] } else { 1 };
        out.push(match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => return Err(Error::broadcast(a, b)),
        });
    }
    Ok(Shape::from(out))
}

/// Broadcast any number of shapes
pub fn broadcast_shapes<'a>(shapes: impl IntoIterator<Item = &'a [usize]>) -> Result<Shape> {
    shapes
        .into_iter()
        .try_fold(Shape::scalar(), |acc, s| broadcast_shape(&acc, s))
}

/// Resolve a possibly negative axis against `ndim`
pub fn normalize_axis(axis: isize, ndim: usize) -> Result<usize> {
    let resolved = if axis < 0 { axis + ndim as isize } else { axis };
    if resolved < 0 || resolved >= ndim as isize {
        return Err(Error::InvalidDimension { dim: axis, ndim });
    }
    Ok(resolved as usize)
}

/// Resolve an optional axis list; `None` selects every axis.
///
/// The result is sorted and rejects duplicates.
pub fn normalize_axes(axes: Option<&[isize]>, ndim: usize) -> Result<Vec<usize>> {
    let Some(axes) = axes else {
        return Ok((0..ndim).collect());
    };
    let mut out = axes
        .iter()
        .map(|&a| normalize_axis(a, ndim))
        .collect::<Result<Vec<_>>>()?;
    out.sort_unstable();
    if out.windows(2).any(|w| w[0] == w[1]) {
        return Err(Error::invalid_argument("axis", format!("repeated axis in {axes:?}")));
    }
    Ok(out)
}

/// Map each linear index of `out_shape` to the linear index of a source
/// that broadcasts into it
pub fn broadcast_indices(src_shape: &[usize], out_shape: &[usize]) -> Vec<usize> {
    let n = numel(out_shape);
    if src_shape == out_shape {
        return (0..n).collect();
    }
    let offset = out_shape.len() - src_shape.len();
    let src_strides = contiguous_strides(src_shape);
    let mut idx = Vec::with_capacity(n);
    let mut counter = vec![0usize; out_shape.len()];
    for _ in 0..n {
        let mut linear = 0;
        for (d, &c) in counter.iter().enumerate().skip(offset) {
            let sd = d - offset;
            if src_shape[sd] != 1 {
                linear += c * src_strides[sd];
            }
        }
        idx.push(linear);
        for d in (0..out_shape.len()).rev() {
            counter[d] += 1;
            if counter[d] < out_shape[d] {
                break;
            }
            counter[d] = 0;
        }
    }
    idx
}

/// Split a shape around `axis` into (outer, len, inner) lane sizes
#[inline]
pub fn lanes(shape: &[usize], axis: usize) -> (usize, usize, usize) {
    let outer = numel(&shape[..axis]);
    let inner = numel(&shape[axis + 1..]);
    (outer, shape[axis], inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_shape() {
        assert_eq!(broadcast_shape(&[2, 1, 3], &[4, 3]).unwrap().as_slice(), &[2, 4, 3]);
        assert_eq!(broadcast_shape(&[], &[5]).unwrap().as_slice(), &[5]);
        assert!(broadcast_shape(&[2, 3], &[3, 2]).is_err());
    }

    #[test]
    fn test_normalize_axis() {
        assert_eq!(normalize_axis(-1, 3).unwrap(), 2);
        assert!(normalize_axis(3, 3).is_err());
        assert!(normalize_axes(Some(&[0, -3]), 3).is_err());
        assert_eq!(normalize_axes(None, 2).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_broadcast_indices() {
        assert_eq!(broadcast_indices(&[3], &[2, 3]), vec![0, 1, 2, 0, 1, 2]);
        assert_eq!(broadcast_indices(&[2, 1], &[2, 3]), vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(broadcast_indices(&[], &[2]), vec![0, 0]);
    }

    #[test]
    fn test_strides_and_lanes() {
        assert_eq!(contiguous_strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(lanes(&[2, 3, 4], 1), (2, 3, 4));
    }
}
