//! Shape and layout manipulation

use super::{call, call_all, likes};
use crate::dtype::Scalar;
use crate::error::Result;
use crate::ops::{CallFrame, OpId, Value};
use crate::tensor::{Array, ArrayLike};

/// How [`split`] divides an axis
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sections {
    /// This many equal parts; the axis length must divide evenly
    Equal(usize),
    /// Split before each of these indices
    At(Vec<usize>),
}

impl From<Sections> for Value {
    fn from(s: Sections) -> Self {
        match s {
            Sections::Equal(n) => Value::from(n),
            Sections::At(points) => Value::from(points.as_slice()),
        }
    }
}

/// Values written into the border by [`pad`]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PadMode {
    /// A fixed value
    Constant(Scalar),
    /// The nearest edge value
    Edge,
    /// Wrap around to the opposite edge
    Wrap,
    /// Mirror about the edge, excluding the edge itself
    Reflect,
}

impl PadMode {
    fn name(self) -> &'static str {
        match self {
            Self::Constant(_) => "constant",
            Self::Edge => "edge",
            Self::Wrap => "wrap",
            Self::Reflect => "reflect",
        }
    }
}

/// Reshape to `shape`; a single `-1` is inferred from the element count
pub fn reshape(x: impl Into<ArrayLike>, shape: &[i64]) -> Result<Array> {
    call(CallFrame::new(OpId::Reshape).arg(x).kw("shape", shape.to_vec()))
}

/// Join arrays along an existing axis; `None` flattens them first
pub fn concat<A: Into<ArrayLike>>(arrays: impl IntoIterator<Item = A>, axis: Option<isize>) -> Result<Array> {
    call(CallFrame::new(OpId::Concat).arrays(likes(arrays)).kw("axis", axis))
}

/// Reorder axes; `None` reverses them
pub fn permute_dims(x: impl Into<ArrayLike>, axes: Option<&[isize]>) -> Result<Array> {
    call(CallFrame::new(OpId::PermuteDims).arg(x).kw("axes", axes))
}

/// Drop size-1 axes; `None` drops all of them
pub fn squeeze(x: impl Into<ArrayLike>, axis: Option<&[isize]>) -> Result<Array> {
    call(CallFrame::new(OpId::Squeeze).arg(x).kw("axis", axis))
}

/// Insert a size-1 axis at `axis`
pub fn expand_dims(x: impl Into<ArrayLike>, axis: isize) -> Result<Array> {
    call(CallFrame::new(OpId::ExpandDims).arg(x).kw("axis", axis))
}

/// Join equally shaped arrays along a new axis
pub fn stack<A: Into<ArrayLike>>(arrays: impl IntoIterator<Item = A>, axis: isize) -> Result<Array> {
    call(CallFrame::new(OpId::Stack).arrays(likes(arrays)).kw("axis", axis))
}

/// Split along `axis` into several arrays
pub fn split(x: impl Into<ArrayLike>, sections: Sections, axis: isize) -> Result<Vec<Array>> {
    call_all(CallFrame::new(OpId::Split).arg(x).kw("sections", sections).kw("axis", axis))
}

/// Repeat the whole array `reps` times along each axis
pub fn tile(x: impl Into<ArrayLike>, reps: &[usize]) -> Result<Array> {
    call(CallFrame::new(OpId::Tile).arg(x).kw("reps", reps))
}

/// Pad every axis.
///
/// `pad_width` holds one width for all sides, a `(before, after)` pair for
/// every axis, or a pair per axis.
pub fn pad(x: impl Into<ArrayLike>, pad_width: &[usize], mode: PadMode) -> Result<Array> {
    let frame = CallFrame::new(OpId::Pad)
        .arg(x)
        .kw("pad_width", pad_width)
        .kw("mode", mode.name());
    let frame = match mode {
        PadMode::Constant(v) => frame.kw("constant_value", v),
        _ => frame,
    };
    call(frame)
}

/// Reverse the order of elements along `axis` (`None` for every axis)
pub fn flip(x: impl Into<ArrayLike>, axis: Option<&[isize]>) -> Result<Array> {
    call(CallFrame::new(OpId::Flip).arg(x).kw("axis", axis))
}

/// Shift elements cyclically; `axis = None` rolls the flattened array
pub fn roll(x: impl Into<ArrayLike>, shift: &[i64], axis: Option<&[isize]>) -> Result<Array> {
    call(
        CallFrame::new(OpId::Roll)
            .arg(x)
            .kw("shift", shift.to_vec())
            .kw("axis", axis),
    )
}

/// Broadcast to `shape` under the standard rules
pub fn broadcast_to(x: impl Into<ArrayLike>, shape: &[usize]) -> Result<Array> {
    call(CallFrame::new(OpId::BroadcastTo).arg(x).kw("shape", shape))
}

/// Repeat each element; `repeats` holds one count or one per entry of the axis
pub fn repeat(x: impl Into<ArrayLike>, repeats: &[usize], axis: Option<isize>) -> Result<Array> {
    let repeats = match repeats {
        [n] => Value::from(*n),
        many => Value::from(many),
    };
    call(CallFrame::new(OpId::Repeat).arg(x).kw("repeats", repeats).kw("axis", axis))
}

/// Take entries along `axis` at integer `indices`
pub fn gather(x: impl Into<ArrayLike>, indices: impl Into<ArrayLike>, axis: isize) -> Result<Array> {
    call(CallFrame::new(OpId::Gather).arg(x).arg(indices).kw("axis", axis))
}
