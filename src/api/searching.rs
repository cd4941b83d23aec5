//! Searching, sorting and set operators

use super::{call, call_all};
use crate::error::{Error, Result};
use crate::ops::{CallFrame, OpId};
use crate::tensor::{Array, ArrayLike};

/// Which insertion point [`searchsorted`] reports for equal values
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Side {
    /// Before any equal entries
    #[default]
    Left,
    /// After any equal entries
    Right,
}

/// Index of the largest element along `axis`; `None` searches the
/// flattened array. Ties resolve to the first index.
pub fn argmax(x: impl Into<ArrayLike>, axis: Option<isize>, keepdims: bool) -> Result<Array> {
    call(CallFrame::new(OpId::Argmax).arg(x).kw("axis", axis).kw("keepdims", keepdims))
}

/// Index of the smallest element along `axis`; ties resolve to the first
pub fn argmin(x: impl Into<ArrayLike>, axis: Option<isize>, keepdims: bool) -> Result<Array> {
    call(CallFrame::new(OpId::Argmin).arg(x).kw("axis", axis).kw("keepdims", keepdims))
}

/// Indices of the non-zero elements, one array per dimension
pub fn nonzero(x: impl Into<ArrayLike>) -> Result<Vec<Array>> {
    call_all(CallFrame::new(OpId::Nonzero).arg(x))
}

/// Insertion points of `values` into the ascending 1-D `sorted`
pub fn searchsorted(sorted: impl Into<ArrayLike>, values: impl Into<ArrayLike>, side: Side) -> Result<Array> {
    let side = match side {
        Side::Left => "left",
        Side::Right => "right",
    };
    call(CallFrame::new(OpId::Searchsorted).arg(sorted).arg(values).kw("side", side))
}

fn sorting(op: OpId, x: impl Into<ArrayLike>, axis: isize, descending: bool, stable: bool) -> CallFrame {
    CallFrame::new(op)
        .arg(x)
        .kw("axis", axis)
        .kw("descending", descending)
        .kw("stable", stable)
}

/// Sort along `axis`; NaN sorts last
pub fn sort(x: impl Into<ArrayLike>, axis: isize, descending: bool, stable: bool) -> Result<Array> {
    call(sorting(OpId::Sort, x, axis, descending, stable))
}

/// Indices that sort `x` along `axis`.
///
/// With `stable`, equal keys keep their input order even on backends whose
/// native sort does not guarantee it.
pub fn argsort(x: impl Into<ArrayLike>, axis: isize, descending: bool, stable: bool) -> Result<Array> {
    call(sorting(OpId::Argsort, x, axis, descending, stable))
}

/// Result of [`unique_all`]
#[derive(Clone, Debug)]
pub struct UniqueAll {
    /// Distinct values in ascending order
    pub values: Array,
    /// Flat index of the first occurrence of each value
    pub indices: Array,
    /// Position in `values` of each input element, shaped like the input
    pub inverse_indices: Array,
    /// Occurrences of each value
    pub counts: Array,
}

/// Distinct values with their first indices, inverse mapping and counts
pub fn unique_all(x: impl Into<ArrayLike>) -> Result<UniqueAll> {
    let mut parts = call_all(CallFrame::new(OpId::UniqueAll).arg(x))?.into_iter();
    let mut next = || {
        parts
            .next()
            .ok_or_else(|| Error::Backend("unique_all produced fewer than four results".into()))
    };
    Ok(UniqueAll {
        values: next()?,
        indices: next()?,
        inverse_indices: next()?,
        counts: next()?,
    })
}

/// Distinct values in ascending order
pub fn unique_values(x: impl Into<ArrayLike>) -> Result<Array> {
    Ok(unique_all(x)?.values)
}
