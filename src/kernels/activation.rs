//! Activation leaves

use super::{inexact, map_lanes};
use crate::error::{Error, Result};
use crate::ops::{Invocation, KernelValue};
use crate::tensor::shape::normalize_axis;
use crate::tensor::HostArray;
use std::borrow::Cow;
use std::f64::consts::{FRAC_2_SQRT_PI, SQRT_2};

type Out = Result<Vec<KernelValue>>;

fn real_input<'a>(inv: &Invocation<'a>) -> Result<Cow<'a, HostArray>> {
    let x = inv.host(0)?;
    if x.dtype().is_complex() {
        return Err(Error::DtypeUnsupported {
            dtype: x.dtype(),
            op: inv.op.name(),
            backend: inv.backend.name(),
        });
    }
    Ok(x)
}

fn pointwise(inv: &Invocation<'_>, f: impl Fn(f64) -> f64) -> Out {
    let x = real_input(inv)?;
    inv.single(x.map(inexact(x.dtype(), &inv.defaults), f))
}

pub(crate) fn relu(inv: &Invocation<'_>) -> Out {
    let x = real_input(inv)?;
    inv.single(x.map(x.dtype(), |v| if v > 0.0 { v } else { 0.0 }))
}

pub(crate) fn leaky_relu(inv: &Invocation<'_>) -> Out {
    let slope = inv.float_kw("negative_slope", 0.01)?;
    pointwise(inv, |v| if v >= 0.0 { v } else { slope * v })
}

fn sigmoid_of(v: f64) -> f64 {
    if v >= 0.0 {
        1.0 / (1.0 + (-v).exp())
    } else {
        let e = v.exp();
        e / (1.0 + e)
    }
}

pub(crate) fn sigmoid(inv: &Invocation<'_>) -> Out {
    pointwise(inv, sigmoid_of)
}

pub(crate) fn silu(inv: &Invocation<'_>) -> Out {
    pointwise(inv, |v| v * sigmoid_of(v))
}

/// log(1 + e^v) without overflow for large `v`
fn softplus_of(v: f64) -> f64 {
    v.max(0.0) + (-v.abs()).exp().ln_1p()
}

pub(crate) fn softplus(inv: &Invocation<'_>) -> Out {
    pointwise(inv, softplus_of)
}

/// Abramowitz-Stegun 7.1.26, accurate to about 1.5e-7
fn erf(x: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.327_591_1 * x.abs());
    let poly = t * (0.254_829_592
        + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    let y = 1.0 - poly * (-x * x).exp();
    if x >= 0.0 { y } else { -y }
}

pub(crate) fn gelu(inv: &Invocation<'_>) -> Out {
    if inv.bool_kw("approximate", false)? {
        // sqrt(2 / pi)
        let c = FRAC_2_SQRT_PI / SQRT_2;
        pointwise(inv, move |v| 0.5 * v * (1.0 + (c * (v + 0.044_715 * v.powi(3))).tanh()))
    } else {
        pointwise(inv, |v| 0.5 * v * (1.0 + erf(v / SQRT_2)))
    }
}

fn softmax_lanes(inv: &Invocation<'_>, log: bool) -> Out {
    let x = real_input(inv)?;
    if x.ndim() == 0 {
        let v = if log { 0.0 } else { 1.0 };
        return inv.single(x.map(inexact(x.dtype(), &inv.defaults), |_| v));
    }
    let axis = normalize_axis(inv.opt_int_kw("axis")?.unwrap_or(-1) as isize, x.ndim())?;
    let len = x.shape()[axis];
    let out = map_lanes(&x, axis, len, inexact(x.dtype(), &inv.defaults), |lane| {
        let max = lane.iter().map(|v| v.0).fold(f64::NEG_INFINITY, f64::max);
        let shift = if max.is_finite() { max } else { 0.0 };
        let total: f64 = lane.iter().map(|v| (v.0 - shift).exp()).sum();
        lane.iter()
            .map(|v| {
                let z = v.0 - shift;
                (if log { z - total.ln() } else { z.exp() / total }, 0.0)
            })
            .collect()
    })?;
    inv.single(out)
}

pub(crate) fn softmax(inv: &Invocation<'_>) -> Out {
    softmax_lanes(inv, false)
}

pub(crate) fn log_softmax(inv: &Invocation<'_>) -> Out {
    softmax_lanes(inv, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erf_reference_points() {
        assert!(erf(0.0).abs() < 1e-7);
        assert!((erf(1.0) - 0.842_700_79).abs() < 1e-6);
        assert!((erf(-1.0) + 0.842_700_79).abs() < 1e-6);
    }

    #[test]
    fn test_softplus_stable() {
        assert!((softplus_of(0.0) - std::f64::consts::LN_2).abs() < 1e-12);
        assert_eq!(softplus_of(1000.0), 1000.0);
        assert!(softplus_of(-1000.0) >= 0.0);
    }

    #[test]
    fn test_sigmoid_symmetry() {
        assert!((sigmoid_of(2.0) + sigmoid_of(-2.0) - 1.0).abs() < 1e-12);
    }
}
