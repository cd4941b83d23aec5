//! Linear algebra leaves
//!
//! Batched operators treat the last two axes as the matrix and every leading
//! axis as batch. Decompositions work on real data; complex operands are
//! rejected with `DtypeUnsupported`.

use super::{from_elems, inexact, reduce_groups, reduction_axes, Elem};
use super::manipulation::permute;
use crate::dtype::{DType, Scalar};
use crate::error::{Error, Result};
use crate::ops::{Invocation, KernelValue};
use crate::tensor::shape::{broadcast_indices, broadcast_shape, normalize_axis, numel};
use crate::tensor::HostArray;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

type Out = Result<Vec<KernelValue>>;

fn mul(a: Elem, b: Elem) -> Elem {
    (a.0 * b.0 - a.1 * b.1, a.0 * b.1 + a.1 * b.0)
}

/// Split `[..batch, m, n]` into its batch shape and matrix dimensions
fn matrix_dims(host: &HostArray, arg: &'static str) -> Result<(Vec<usize>, usize, usize)> {
    let nd = host.ndim();
    if nd < 2 {
        return Err(Error::invalid_argument(arg, format!("expected a matrix, got {nd}-d input")));
    }
    let s = host.shape();
    Ok((s[..nd - 2].to_vec(), s[nd - 2], s[nd - 1]))
}

fn real_only(inv: &Invocation<'_>, host: &HostArray) -> Result<()> {
    if host.dtype().is_complex() {
        return Err(Error::DtypeUnsupported {
            dtype: host.dtype(),
            op: inv.op.name(),
            backend: inv.backend.name(),
        });
    }
    Ok(())
}

/// Each batch matrix of a real array as a row-major `Vec<f64>`
fn real_matrices(host: &HostArray, m: usize, n: usize) -> Vec<Vec<f64>> {
    let count = numel(&host.shape()[..host.ndim() - 2]);
    (0..count)
        .map(|b| host.re()[b * m * n..(b + 1) * m * n].to_vec())
        .collect()
}

// ============================================================================
// Products
// ============================================================================

fn gemm(out: &mut [Elem], a: &[Elem], b: &[Elem], k: usize, n: usize) {
    if n == 0 {
        return;
    }
    let row = |(i, dst): (usize, &mut [Elem])| {
        for (j, cell) in dst.iter_mut().enumerate() {
            *cell = (0..k).fold((0.0, 0.0), |acc, p| {
                let t = mul(a[i * k + p], b[p * n + j]);
                (acc.0 + t.0, acc.1 + t.1)
            });
        }
    };
    #[cfg(feature = "rayon")]
    out.par_chunks_mut(n).enumerate().for_each(row);
    #[cfg(not(feature = "rayon"))]
    out.chunks_mut(n).enumerate().for_each(row);
}

/// Batched matrix product with NumPy's 1-D lifting: a 1-D left operand is a
/// row vector, a 1-D right operand a column vector, and the lifted axis is
/// removed from the result
pub(crate) fn matmul_hosts(a: &HostArray, b: &HostArray) -> Result<HostArray> {
    if a.ndim() == 0 || b.ndim() == 0 {
        return Err(Error::invalid_argument("x", "matmul does not accept 0-d operands"));
    }
    let lift_a = a.ndim() == 1;
    let lift_b = b.ndim() == 1;
    let a = if lift_a { a.clone().reshaped([1, a.numel()])? } else { a.clone() };
    let b = if lift_b { b.clone().reshaped([b.numel(), 1])? } else { b.clone() };
    let (batch_a, m, k) = matrix_dims(&a, "x1")?;
    let (batch_b, k2, n) = matrix_dims(&b, "x2")?;
    if k != k2 {
        return Err(Error::shape_mismatch(&[m, k], &[k2, n]));
    }
    let batch = broadcast_shape(&batch_a, &batch_b)?;
    let ia = broadcast_indices(&batch_a, &batch);
    let ib = broadcast_indices(&batch_b, &batch);
    let ea: Vec<Elem> = (0..a.numel()).map(|i| a.get(i)).collect();
    let eb: Vec<Elem> = (0..b.numel()).map(|i| b.get(i)).collect();

    let mut out = vec![(0.0, 0.0); numel(&batch) * m * n];
    for (t, (&sa, &sb)) in ia.iter().zip(&ib).enumerate() {
        gemm(
            &mut out[t * m * n..(t + 1) * m * n],
            &ea[sa * m * k..(sa + 1) * m * k],
            &eb[sb * k * n..(sb + 1) * k * n],
            k,
            n,
        );
    }

    let mut shape = batch.to_vec();
    if !lift_a {
        shape.push(m);
    }
    if !lift_b {
        shape.push(n);
    }
    from_elems(shape, a.dtype(), out)
}

/// Swap the last two axes; vectors pass through
fn transposed(host: &HostArray) -> Result<HostArray> {
    let nd = host.ndim();
    if nd < 2 {
        return Ok(host.clone());
    }
    let mut perm: Vec<usize> = (0..nd).collect();
    perm.swap(nd - 2, nd - 1);
    permute(host, &perm)
}

/// `transpose_a`/`transpose_b` apply before 1-D lifting
pub(crate) fn matmul(inv: &Invocation<'_>) -> Out {
    let mut a = inv.host(0)?.into_owned();
    let mut b = inv.host(1)?.into_owned();
    if inv.bool_kw("transpose_a", false)? {
        a = transposed(&a)?;
    }
    if inv.bool_kw("transpose_b", false)? {
        b = transposed(&b)?;
    }
    inv.single(matmul_hosts(&a, &b)?)
}

pub(crate) fn outer(inv: &Invocation<'_>) -> Out {
    let a = inv.host(0)?;
    let b = inv.host(1)?;
    let (m, n) = (a.numel(), b.numel());
    let elems = (0..m)
        .flat_map(|i| (0..n).map(move |j| (i, j)))
        .map(|(i, j)| mul(a.get(i), b.get(j)))
        .collect();
    inv.single(from_elems([m, n], a.dtype(), elems)?)
}

// ============================================================================
// Diagonals
// ============================================================================

/// Vector input builds a matrix with the values on the `offset` diagonal;
/// matrix input extracts that diagonal from each batch matrix
pub(crate) fn diag(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let k = inv.opt_int_kw("offset")?.unwrap_or(0);
    match x.ndim() {
        1 => {
            let n = x.numel();
            let rows = inv.opt_int_kw("num_rows")?.map_or(n, |r| r.max(0) as usize);
            let cols = inv.opt_int_kw("num_cols")?.map_or(n, |c| c.max(0) as usize);
            let pad = inv
                .scalar_kw("padding_value")?
                .unwrap_or(Scalar::Int(0))
                .as_complex();
            let mut elems = vec![pad; rows * cols];
            for i in 0..n {
                let (r, c) = if k >= 0 {
                    (i as i64, i as i64 + k)
                } else {
                    (i as i64 - k, i as i64)
                };
                if r < rows as i64 && c < cols as i64 {
                    elems[r as usize * cols + c as usize] = x.get(i);
                }
            }
            inv.single(from_elems([rows, cols], x.dtype(), elems)?)
        }
        nd if nd >= 2 => {
            let (batch, m, n) = matrix_dims(&x, "x")?;
            let (r0, c0) = if k >= 0 { (0, k as usize) } else { ((-k) as usize, 0) };
            let len = m.saturating_sub(r0).min(n.saturating_sub(c0));
            let mut elems = Vec::with_capacity(numel(&batch) * len);
            for b in 0..numel(&batch) {
                elems.extend((0..len).map(|i| x.get(b * m * n + (r0 + i) * n + c0 + i)));
            }
            let mut shape = batch;
            shape.push(len);
            inv.single(from_elems(shape, x.dtype(), elems)?)
        }
        _ => Err(Error::invalid_argument("x", "diag needs a vector or a matrix")),
    }
}

pub(crate) fn trace(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let nd = x.ndim();
    if nd < 2 {
        return Err(Error::invalid_argument("x", "trace needs at least two dimensions"));
    }
    let a1 = normalize_axis(inv.opt_int_kw("axis1")?.unwrap_or(-2) as isize, nd)?;
    let a2 = normalize_axis(inv.opt_int_kw("axis2")?.unwrap_or(-1) as isize, nd)?;
    if a1 == a2 {
        return Err(Error::invalid_argument("axis2", "trace axes must differ"));
    }
    let mut perm: Vec<usize> = (0..nd).filter(|&d| d != a1 && d != a2).collect();
    perm.extend([a1, a2]);
    let moved = permute(&x, &perm)?;
    let (batch, m, n) = matrix_dims(&moved, "x")?;
    let k = inv.opt_int_kw("offset")?.unwrap_or(0);
    let (r0, c0) = if k >= 0 { (0, k as usize) } else { ((-k) as usize, 0) };
    let len = m.saturating_sub(r0).min(n.saturating_sub(c0));
    let elems = (0..numel(&batch))
        .map(|b| {
            (0..len).fold((0.0, 0.0), |acc, i| {
                let v = moved.get(b * m * n + (r0 + i) * n + c0 + i);
                (acc.0 + v.0, acc.1 + v.1)
            })
        })
        .collect();
    let dtype = match x.dtype() {
        DType::Bool => inv.defaults.int,
        d => d,
    };
    inv.single(from_elems(batch, dtype, elems)?)
}

// ============================================================================
// Solvers and decompositions
// ============================================================================

/// Pivots at or below this magnitude count as zero; relative to the matrix scale
fn pivot_floor(a: &[f64], n: usize) -> f64 {
    n as f64 * f64::EPSILON * a.iter().fold(0.0f64, |m, v| m.max(v.abs()))
}

/// LU factorisation with partial pivoting, in place. Returns the row swap
/// count, or `None` when a pivot vanishes.
fn lu(a: &mut [f64], n: usize) -> Option<usize> {
    let floor = pivot_floor(a, n);
    let mut swaps = 0;
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i * n + col].abs().total_cmp(&a[j * n + col].abs()))?;
        if a[pivot * n + col].abs() <= floor || a[pivot * n + col].is_nan() {
            return None;
        }
        if pivot != col {
            for c in 0..n {
                a.swap(pivot * n + c, col * n + c);
            }
            swaps += 1;
        }
        for r in col + 1..n {
            let f = a[r * n + col] / a[col * n + col];
            a[r * n + col] = f;
            for c in col + 1..n {
                a[r * n + c] -= f * a[col * n + c];
            }
        }
    }
    Some(swaps)
}

/// Solve `a x = b` for `k` right-hand sides by Gaussian elimination
fn gauss_solve(mut a: Vec<f64>, mut b: Vec<f64>, n: usize, k: usize) -> Option<Vec<f64>> {
    let floor = pivot_floor(&a, n);
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i * n + col].abs().total_cmp(&a[j * n + col].abs()))?;
        if a[pivot * n + col].abs() <= floor || a[pivot * n + col].is_nan() {
            return None;
        }
        if pivot != col {
            for c in 0..n {
                a.swap(pivot * n + c, col * n + c);
            }
            for c in 0..k {
                b.swap(pivot * k + c, col * k + c);
            }
        }
        for r in 0..n {
            if r == col {
                continue;
            }
            let f = a[r * n + col] / a[col * n + col];
            if f == 0.0 {
                continue;
            }
            for c in col..n {
                a[r * n + c] -= f * a[col * n + c];
            }
            for c in 0..k {
                b[r * k + c] -= f * b[col * k + c];
            }
        }
    }
    for r in 0..n {
        let d = a[r * n + r];
        for c in 0..k {
            b[r * k + c] /= d;
        }
    }
    Some(b)
}

fn square(inv: &Invocation<'_>, host: &HostArray) -> Result<(Vec<usize>, usize)> {
    real_only(inv, host)?;
    let (batch, m, n) = matrix_dims(host, "x")?;
    if m != n {
        return Err(Error::invalid_argument("x", format!("expected square matrices, got {m}x{n}")));
    }
    Ok((batch, n))
}

pub(crate) fn solve(inv: &Invocation<'_>) -> Out {
    let a = inv.host(0)?;
    let b = inv.host(1)?;
    let (batch_a, n) = square(inv, &a)?;
    real_only(inv, &b)?;
    let vector_rhs = b.ndim() == 1;
    let b = if vector_rhs { b.as_ref().clone().reshaped([b.numel(), 1])? } else { b.into_owned() };
    let (batch_b, rows, k) = matrix_dims(&b, "x2")?;
    if rows != n {
        return Err(Error::shape_mismatch(&[n, k], &[rows, k]));
    }
    let batch = broadcast_shape(&batch_a, &batch_b)?;
    let ia = broadcast_indices(&batch_a, &batch);
    let ib = broadcast_indices(&batch_b, &batch);
    let ma = real_matrices(&a, n, n);
    let mb = real_matrices(&b, n, k);

    let mut out = Vec::with_capacity(numel(&batch) * n * k);
    for (&sa, &sb) in ia.iter().zip(&ib) {
        let x = gauss_solve(ma[sa].clone(), mb[sb].clone(), n, k)
            .ok_or_else(|| Error::numerical("solve", "matrix is singular"))?;
        out.extend(x);
    }
    let mut shape = batch.to_vec();
    shape.push(n);
    if !vector_rhs {
        shape.push(k);
    }
    inv.single(HostArray::new(shape, inexact(a.dtype(), &inv.defaults), out)?)
}

pub(crate) fn inv(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let (batch, n) = square(inv, &x)?;
    let singular_ok = inv.bool_kw("singular_ok", false)?;
    let identity: Vec<f64> = (0..n * n).map(|i| f64::from(u8::from(i / n == i % n))).collect();
    let mut out = Vec::with_capacity(x.numel());
    for m in real_matrices(&x, n, n) {
        match gauss_solve(m, identity.clone(), n, n) {
            Some(r) => out.extend(r),
            None if singular_ok => return inv.single(x.into_owned()),
            None => return Err(Error::numerical("inv", "matrix is singular")),
        }
    }
    let mut shape = batch;
    shape.extend([n, n]);
    inv.single(HostArray::new(shape, inexact(x.dtype(), &inv.defaults), out)?)
}

pub(crate) fn det(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let (batch, n) = square(inv, &x)?;
    let out = real_matrices(&x, n, n)
        .into_iter()
        .map(|mut m| match lu(&mut m, n) {
            Some(swaps) => {
                let d: f64 = (0..n).map(|i| m[i * n + i]).product();
                if swaps % 2 == 1 { -d } else { d }
            }
            None => 0.0,
        })
        .collect();
    inv.single(HostArray::new(batch, inexact(x.dtype(), &inv.defaults), out)?)
}

pub(crate) fn cholesky(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let (batch, n) = square(inv, &x)?;
    let upper = inv.bool_kw("upper", false)?;
    let mut out = Vec::with_capacity(x.numel());
    for a in real_matrices(&x, n, n) {
        let mut l = vec![0.0; n * n];
        for j in 0..n {
            let d = a[j * n + j] - (0..j).map(|p| l[j * n + p] * l[j * n + p]).sum::<f64>();
            if d <= 0.0 || d.is_nan() {
                return Err(Error::numerical("cholesky", "matrix is not positive definite"));
            }
            let d = d.sqrt();
            l[j * n + j] = d;
            for i in j + 1..n {
                let s = a[i * n + j] - (0..j).map(|p| l[i * n + p] * l[j * n + p]).sum::<f64>();
                l[i * n + j] = s / d;
            }
        }
        out.extend(l);
    }
    let mut shape = batch;
    shape.extend([n, n]);
    let lower = HostArray::new(shape, inexact(x.dtype(), &inv.defaults), out)?;
    // the upper factor is the lower one with its matrix axes swapped
    inv.single(if upper { transposed(&lower)? } else { lower })
}

/// Singular values of a row-major `m x n` matrix, descending, by one-sided
/// Jacobi rotations
pub(crate) fn singular_values(a: &[f64], m: usize, n: usize) -> Vec<f64> {
    // rotate the columns of the taller orientation
    let (rows, cols) = (m.max(n), m.min(n));
    let mut u: Vec<Vec<f64>> = (0..cols)
        .map(|c| {
            (0..rows)
                .map(|r| if m >= n { a[r * n + c] } else { a[c * n + r] })
                .collect()
        })
        .collect();

    for _ in 0..60 {
        let mut rotated = false;
        for p in 0..cols {
            for q in p + 1..cols {
                let alpha: f64 = u[p].iter().map(|v| v * v).sum();
                let beta: f64 = u[q].iter().map(|v| v * v).sum();
                let gamma: f64 = u[p].iter().zip(&u[q]).map(|(x, y)| x * y).sum();
                if gamma.abs() <= f64::EPSILON * (alpha * beta).sqrt() || gamma == 0.0 {
                    continue;
                }
                rotated = true;
                let zeta = (beta - alpha) / (2.0 * gamma);
                let t = zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = c * t;
                for r in 0..rows {
                    let (x, y) = (u[p][r], u[q][r]);
                    u[p][r] = c * x - s * y;
                    u[q][r] = s * x + c * y;
                }
            }
        }
        if !rotated {
            break;
        }
    }
    let mut sv: Vec<f64> = u.iter().map(|col| col.iter().map(|v| v * v).sum::<f64>().sqrt()).collect();
    sv.sort_by(|a, b| b.total_cmp(a));
    sv
}

pub(crate) fn svdvals(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    real_only(inv, &x)?;
    let (batch, m, n) = matrix_dims(&x, "x")?;
    let out: Vec<f64> = real_matrices(&x, m, n)
        .iter()
        .flat_map(|a| singular_values(a, m, n))
        .collect();
    let mut shape = batch;
    shape.push(m.min(n));
    inv.single(HostArray::new(shape, inexact(x.dtype(), &inv.defaults), out)?)
}

/// Tolerance for `matrix_rank`: explicit `atol`/`rtol` win (their maximum
/// when both are given), otherwise `sigma_max * max(m, n) * eps`
fn rank_tolerance(atol: Option<f64>, rtol: Option<f64>, sigma_max: f64, m: usize, n: usize, eps: f64) -> f64 {
    match (atol, rtol) {
        (Some(a), Some(r)) => a.max(r),
        (Some(t), None) | (None, Some(t)) => t,
        (None, None) => sigma_max * m.max(n) as f64 * eps,
    }
}

pub(crate) fn matrix_rank(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    real_only(inv, &x)?;
    let (batch, m, n) = matrix_dims(&x, "x")?;
    let atol = inv.opt_float_kw("atol")?;
    let rtol = inv.opt_float_kw("rtol")?;
    let eps = inexact(x.dtype(), &inv.defaults).epsilon().unwrap_or(f64::EPSILON);
    let out = real_matrices(&x, m, n)
        .iter()
        .map(|a| {
            let sv = singular_values(a, m, n);
            let tol = rank_tolerance(atol, rtol, sv.first().copied().unwrap_or(0.0), m, n, eps);
            sv.iter().filter(|&&s| s > tol).count() as f64
        })
        .collect();
    inv.single(HostArray::new(batch, inv.defaults.int, out)?)
}

// ============================================================================
// Norms
// ============================================================================

pub(crate) fn vector_norm(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let axes = reduction_axes(inv, x.ndim())?;
    let keepdims = inv.bool_kw("keepdims", false)?;
    let ord = inv.float_kw("ord", 2.0)?;
    let dtype = inexact(x.dtype(), &inv.defaults).real_dtype();
    let out = reduce_groups(&x, &axes, keepdims, dtype, |g| {
        let mags = g.iter().map(|v| v.0.hypot(v.1));
        let norm = if ord == f64::INFINITY {
            mags.fold(0.0, f64::max)
        } else if ord == f64::NEG_INFINITY {
            mags.fold(f64::INFINITY, f64::min)
        } else if ord == 0.0 {
            mags.filter(|&m| m != 0.0).count() as f64
        } else {
            mags.map(|m| m.powf(ord)).sum::<f64>().powf(ord.recip())
        };
        (norm, 0.0)
    })?;
    inv.single(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(shape: &[usize], values: &[f64]) -> HostArray {
        HostArray::new(shape, DType::F64, values.to_vec()).unwrap()
    }

    #[test]
    fn test_matmul_lifting() {
        let a = host(&[2, 2], &[1.0, 2.0, 3.0, 4.0]);
        let v = host(&[2], &[5.0, 6.0]);
        let r = matmul_hosts(&a, &v).unwrap();
        assert_eq!(r.shape().as_slice(), &[2]);
        assert_eq!(r.re(), &[17.0, 39.0]);

        let col = host(&[2, 1], &[5.0, 6.0]);
        let r = matmul_hosts(&a, &col).unwrap();
        assert_eq!(r.shape().as_slice(), &[2, 1]);

        let r = matmul_hosts(&v, &a).unwrap();
        assert_eq!(r.re(), &[23.0, 34.0]);
    }

    #[test]
    fn test_matmul_batch_broadcast() {
        let a = host(&[2, 1, 2], &[1.0, 0.0, 0.0, 1.0]);
        let b = host(&[2, 2], &[1.0, 2.0, 3.0, 4.0]);
        let r = matmul_hosts(&a, &b).unwrap();
        assert_eq!(r.shape().as_slice(), &[2, 1, 2]);
        assert_eq!(r.re(), &[1.0, 2.0, 3.0, 4.0]);
        assert!(matmul_hosts(&b, &host(&[3], &[1.0, 1.0, 1.0])).is_err());
    }

    #[test]
    fn test_singular_values() {
        let sv = singular_values(&[3.0, 0.0, 0.0, -2.0], 2, 2);
        assert!((sv[0] - 3.0).abs() < 1e-12 && (sv[1] - 2.0).abs() < 1e-12);
        let sv = singular_values(&[1.0, 2.0, 2.0, 2.0, 4.0, 4.0], 2, 3);
        assert_eq!(sv.len(), 2);
        assert!((sv[0] - 45f64.sqrt()).abs() < 1e-10);
        assert!(sv[1].abs() < 1e-10);
        let sv = singular_values(&[1.0, 2.0, 2.0, 4.0, 0.0, 0.0], 2, 3);
        assert!(sv[1] > 1.0);
    }

    #[test]
    fn test_pivot_threshold_follows_scale() {
        let tiny = [1e-20, 0.0, 0.0, 1e-20];
        let mut a = tiny;
        assert_eq!(lu(&mut a, 2), Some(0));
        assert!((a[0] * a[3] - 1e-40).abs() < 1e-52);
        let x = gauss_solve(tiny.to_vec(), vec![1.0, 0.0, 0.0, 1.0], 2, 2).unwrap();
        assert!((x[0] - 1e20).abs() < 1e8 && (x[3] - 1e20).abs() < 1e8);

        let mut singular = [1e-20, 2e-20, 2e-20, 4e-20];
        assert_eq!(lu(&mut singular, 2), None);
        assert!(gauss_solve(vec![1.0, 2.0, 2.0, 4.0], vec![1.0, 1.0], 2, 1).is_none());
        assert!(gauss_solve(vec![0.0; 4], vec![1.0, 1.0], 2, 1).is_none());
    }

    #[test]
    fn test_rank_tolerance() {
        assert_eq!(rank_tolerance(Some(0.5), Some(0.1), 9.0, 2, 2, 1e-7), 0.5);
        assert_eq!(rank_tolerance(None, Some(0.1), 9.0, 2, 2, 1e-7), 0.1);
        assert!((rank_tolerance(None, None, 2.0, 3, 2, 0.5) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_lu_detects_singular() {
        let mut a = vec![1.0, 2.0, 2.0, 4.0];
        assert!(lu(&mut a, 2).is_none());
        let mut a = vec![0.0, 1.0, 1.0, 0.0];
        assert_eq!(lu(&mut a, 2), Some(1));
    }
}
