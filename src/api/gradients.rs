//! Gradient marking and estimation
//!
//! Only backends that declare `supports_gradients` mark variables or
//! differentiate. Gradients are central-difference estimates evaluated
//! through the unified surface, so they carry no correctness guarantee
//! beyond that of the finite difference.

use super::{add, asarray, astype, call, one_hot, reshape, subtract};
use crate::backend;
use crate::config;
use crate::error::{Error, Result};
use crate::ops::{CallFrame, OpId};
use crate::tensor::{Array, ArrayLike};

/// Mark `x` as gradient-eligible.
///
/// On backends without gradient support the handle comes back unmarked.
pub fn variable(x: impl Into<ArrayLike>) -> Result<Array> {
    let x = asarray(x, None)?;
    Ok(if x.backend().supports_gradients() {
        x.with_variable(true)
    } else {
        x
    })
}

/// Whether `x` was marked by [`variable`]
pub fn is_variable(x: &Array) -> bool {
    x.is_variable()
}

/// The same values, cut off from gradient tracking
pub fn stop_gradient(x: impl Into<ArrayLike>) -> Result<Array> {
    call(CallFrame::new(OpId::StopGradient).arg(x))
}

/// Value of the scalar function `f` at `x` and its gradient.
///
/// Fails with `BackendMissingOperator` on backends without gradient
/// support.
pub fn value_and_grad<F>(f: F, x: impl Into<ArrayLike>) -> Result<(Array, Array)>
where
    F: Fn(&Array) -> Result<Array>,
{
    let active = backend::current()?;
    if !active.supports_gradients() {
        return Err(Error::BackendMissingOperator {
            op: "value_and_grad".to_string(),
            backend: active.name(),
        });
    }
    let x = asarray(x, None)?;
    let x = if x.dtype().is_inexact() {
        x
    } else {
        astype(&x, config::defaults().float)?
    };
    let dtype = x.dtype();
    let value = f(&variable(&x)?)?;
    if value.numel() != 1 {
        return Err(Error::invalid_argument(
            "f",
            format!("gradient needs a scalar-valued function, got shape {}", value.shape()),
        ));
    }

    let eps = dtype.epsilon().unwrap_or(f64::EPSILON);
    let shape: Vec<i64> = x.shape().iter().map(|&d| d as i64).collect();
    let n = x.numel();
    let mut grads = Vec::with_capacity(n);
    for (i, xi) in x.to_f64_vec().into_iter().enumerate() {
        let h = eps.cbrt() * xi.abs().max(1.0);
        let basis = reshape(one_hot(i as i64, n, Some(dtype))?, &shape)?;
        let step = super::multiply(&basis, h)?;
        let ahead = f(&variable(add(&x, &step)?)?)?.item()?.as_f64();
        let behind = f(&variable(subtract(&x, &step)?)?)?.item()?.as_f64();
        grads.push((ahead - behind) / (2.0 * h));
    }
    let grad = asarray(Array::from_slice(&grads, x.shape().as_slice())?, Some(dtype))?;
    Ok((value, grad))
}

/// Gradient of the scalar function `f` at `x`
pub fn grad<F>(f: F, x: impl Into<ArrayLike>) -> Result<Array>
where
    F: Fn(&Array) -> Result<Array>,
{
    value_and_grad(f, x).map(|(_, g)| g)
}
