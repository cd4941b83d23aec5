//! Linear algebra

use super::call;
use crate::dtype::Scalar;
use crate::error::{Error, Result};
use crate::ops::{CallFrame, OpId};
use crate::tensor::{Array, ArrayLike};

/// Batched matrix product.
///
/// 1-D operands are lifted: a leading vector becomes a row, a trailing one a
/// column, and the lifted axis is dropped from the result.
pub fn matmul(x: impl Into<ArrayLike>, y: impl Into<ArrayLike>) -> Result<Array> {
    matmul_transpose(x, y, false, false)
}

/// [`matmul`] with either operand transposed first (before 1-D lifting)
pub fn matmul_transpose(
    x: impl Into<ArrayLike>,
    y: impl Into<ArrayLike>,
    transpose_a: bool,
    transpose_b: bool,
) -> Result<Array> {
    call(
        CallFrame::new(OpId::Matmul)
            .arg(x)
            .arg(y)
            .kw("transpose_a", transpose_a)
            .kw("transpose_b", transpose_b),
    )
}

/// Vector to diagonal matrix, or matrix to its diagonal.
///
/// A length-`n` vector becomes an `n × n` matrix with the values on the
/// `offset` diagonal and zeros elsewhere.
pub fn diag(x: impl Into<ArrayLike>, offset: i64) -> Result<Array> {
    call(CallFrame::new(OpId::Diag).arg(x).kw("offset", offset))
}

/// [`diag`] with an explicit output size and fill value
pub fn diag_padded(
    x: impl Into<ArrayLike>,
    offset: i64,
    num_rows: Option<usize>,
    num_cols: Option<usize>,
    padding_value: impl Into<Scalar>,
) -> Result<Array> {
    call(
        CallFrame::new(OpId::Diag)
            .arg(x)
            .kw("offset", offset)
            .kw("num_rows", num_rows)
            .kw("num_cols", num_cols)
            .kw("padding_value", padding_value.into()),
    )
}

/// Solve `a @ x = b`; a 1-D `b` is treated as a single column
pub fn solve(a: impl Into<ArrayLike>, b: impl Into<ArrayLike>) -> Result<Array> {
    call(CallFrame::new(OpId::Solve).arg(a).arg(b))
}

/// Cholesky factor; `upper` returns the transpose of the lower factor
pub fn cholesky(x: impl Into<ArrayLike>, upper: bool) -> Result<Array> {
    call(CallFrame::new(OpId::Cholesky).arg(x).kw("upper", upper))
}

/// Matrix inverse.
///
/// Singular input fails with `NumericalFailure`, unless `singular_ok` is
/// set, in which case the input comes back unchanged.
pub fn inv(x: impl Into<ArrayLike>, singular_ok: bool) -> Result<Array> {
    call(CallFrame::new(OpId::Inv).arg(x).kw("singular_ok", singular_ok))
}

/// Determinant
pub fn det(x: impl Into<ArrayLike>) -> Result<Array> {
    call(CallFrame::new(OpId::Det).arg(x))
}

/// Number of singular values above the tolerance.
///
/// With both `atol` and `rtol` the larger is used; with neither the
/// tolerance is `σ_max · max(M, N) · ε`.
pub fn matrix_rank(x: impl Into<ArrayLike>, atol: Option<f64>, rtol: Option<f64>) -> Result<Array> {
    call(
        CallFrame::new(OpId::MatrixRank)
            .arg(x)
            .kw("atol", atol)
            .kw("rtol", rtol),
    )
}

/// Singular values in descending order
pub fn svdvals(x: impl Into<ArrayLike>) -> Result<Array> {
    call(CallFrame::new(OpId::Svdvals).arg(x))
}

/// Outer product of two vectors
pub fn outer(x: impl Into<ArrayLike>, y: impl Into<ArrayLike>) -> Result<Array> {
    call(CallFrame::new(OpId::Outer).arg(x).arg(y))
}

/// Vector `ord`-norm over `axis` (`None` for all axes)
pub fn vector_norm(
    x: impl Into<ArrayLike>,
    ord: f64,
    axis: Option<&[isize]>,
    keepdims: bool,
) -> Result<Array> {
    call(
        CallFrame::new(OpId::VectorNorm)
            .arg(x)
            .kw("ord", ord)
            .kw("axis", axis)
            .kw("keepdims", keepdims),
    )
}

/// Sum along the `offset` diagonal of the last two axes
pub fn trace(x: impl Into<ArrayLike>, offset: i64) -> Result<Array> {
    call(CallFrame::new(OpId::Trace).arg(x).kw("offset", offset))
}

/// Swap the last two axes
pub fn matrix_transpose(x: impl Into<ArrayLike>) -> Result<Array> {
    let x = super::asarray(x, None)?;
    let nd = x.ndim();
    if nd < 2 {
        return Err(Error::invalid_argument(
            "x",
            format!("matrix_transpose needs at least two dimensions, got {nd}"),
        ));
    }
    let mut axes: Vec<isize> = (0..nd as isize).collect();
    axes.swap(nd - 2, nd - 1);
    super::permute_dims(&x, Some(axes.as_slice()))
}
