//! Elementwise leaves: unary, binary and ternary

use super::{inexact, Elem};
use crate::dtype::{promote_types, DType, Defaults};
use crate::error::{Error, Result};
use crate::ops::{Invocation, KernelValue};
use crate::tensor::shape::broadcast_shapes;
use crate::tensor::{zip_broadcast, HostArray};

type Out = Result<Vec<KernelValue>>;

// ============================================================================
// Output dtype rules
// ============================================================================

fn same(dtype: DType, _: &Defaults) -> DType {
    dtype
}

fn boolean(_: DType, _: &Defaults) -> DType {
    DType::Bool
}

/// Complex inputs produce their component dtype
fn real_part(dtype: DType, _: &Defaults) -> DType {
    dtype.real_dtype()
}

fn complex_rejected(inv: &Invocation<'_>, dtype: DType) -> Error {
    Error::DtypeUnsupported {
        dtype,
        op: inv.op.name(),
        backend: inv.backend.name(),
    }
}

// ============================================================================
// Unary
// ============================================================================

macro_rules! unary {
    ($($name:ident: $rule:ident, |$re:ident, $im:ident| $body:expr;)*) => {
        $(
            pub(crate) fn $name(inv: &Invocation<'_>) -> Out {
                let x = inv.host(0)?;
                let dtype = $rule(x.dtype(), &inv.defaults);
                inv.single(x.map_complex(dtype, |$re, $im| $body))
            }
        )*
    };
}

/// Leaves defined on real input only
macro_rules! unary_real {
    ($($name:ident: $rule:ident, $f:expr;)*) => {
        $(
            pub(crate) fn $name(inv: &Invocation<'_>) -> Out {
                let x = inv.host(0)?;
                if x.dtype().is_complex() {
                    return Err(complex_rejected(inv, x.dtype()));
                }
                let dtype = $rule(x.dtype(), &inv.defaults);
                let f: fn(f64) -> f64 = $f;
                inv.single(x.map(dtype, f))
            }
        )*
    };
}

fn c_exp(re: f64, im: f64) -> Elem {
    let m = re.exp();
    if im == 0.0 {
        return (m, 0.0);
    }
    (m * im.cos(), m * im.sin())
}

fn c_log(re: f64, im: f64) -> Elem {
    (re.hypot(im).ln(), im.atan2(re))
}

fn c_sqrt(re: f64, im: f64) -> Elem {
    let r = re.hypot(im);
    let a = ((r + re) / 2.0).sqrt();
    let b = ((r - re) / 2.0).sqrt();
    (a, if im < 0.0 { -b } else { b })
}

fn c_div(a: Elem, b: Elem) -> Elem {
    if a.1 == 0.0 && b.1 == 0.0 {
        return (a.0 / b.0, 0.0);
    }
    let d = b.0 * b.0 + b.1 * b.1;
    ((a.0 * b.0 + a.1 * b.1) / d, (a.1 * b.0 - a.0 * b.1) / d)
}

fn c_mul(a: Elem, b: Elem) -> Elem {
    (a.0 * b.0 - a.1 * b.1, a.0 * b.1 + a.1 * b.0)
}

fn real_sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        v
    }
}

unary! {
    abs: real_part, |re, im| (re.hypot(im), 0.0);
    negative: same, |re, im| (-re, -im);
    positive: same, |re, im| (re, im);
    square: same, |re, im| c_mul((re, im), (re, im));
    conj: same, |re, im| (re, -im);
    real: real_part, |re, _im| (re, 0.0);
    imag: real_part, |_re, im| (im, 0.0);
    logical_not: boolean, |re, im| ((re == 0.0 && im == 0.0) as u8 as f64, 0.0);
    isnan: boolean, |re, im| ((re.is_nan() || im.is_nan()) as u8 as f64, 0.0);
    isinf: boolean, |re, im| ((re.is_infinite() || im.is_infinite()) as u8 as f64, 0.0);
    isfinite: boolean, |re, im| ((re.is_finite() && im.is_finite()) as u8 as f64, 0.0);
    sign: same, |re, im| {
        if im == 0.0 {
            (real_sign(re), 0.0)
        } else {
            let m = re.hypot(im);
            (re / m, im / m)
        }
    };
}

/// Leaves with a complex extension; real input stays on the real branch so
/// that e.g. `sqrt(-1.0)` is NaN rather than a silently dropped `i`
macro_rules! unary_inexact {
    ($($name:ident: $real:expr, $complex:expr;)*) => {
        $(
            pub(crate) fn $name(inv: &Invocation<'_>) -> Out {
                let x = inv.host(0)?;
                let dtype = inexact(x.dtype(), &inv.defaults);
                let real: fn(f64) -> f64 = $real;
                let complex: fn(f64, f64) -> Elem = $complex;
                inv.single(if dtype.is_complex() {
                    x.map_complex(dtype, complex)
                } else {
                    x.map(dtype, real)
                })
            }
        )*
    };
}

unary_inexact! {
    exp: f64::exp, c_exp;
    log: f64::ln, c_log;
    sqrt: f64::sqrt, c_sqrt;
    reciprocal: f64::recip, |re, im| c_div((1.0, 0.0), (re, im));
    sin: f64::sin, |re, im| (re.sin() * im.cosh(), re.cos() * im.sinh());
    cos: f64::cos, |re, im| (re.cos() * im.cosh(), -(re.sin() * im.sinh()));
}

unary_real! {
    expm1: inexact, f64::exp_m1;
    log1p: inexact, f64::ln_1p;
    log2: inexact, f64::log2;
    log10: inexact, f64::log10;
    tan: inexact, f64::tan;
    sinh: inexact, f64::sinh;
    cosh: inexact, f64::cosh;
    tanh: inexact, f64::tanh;
    floor: same, f64::floor;
    ceil: same, f64::ceil;
    trunc: same, f64::trunc;
}

/// Round half to even, optionally at `decimals` places
pub(crate) fn round(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let scale = 10f64.powi(inv.opt_int_kw("decimals")?.unwrap_or(0) as i32);
    let r = |v: f64| (v * scale).round_ties_even() / scale;
    inv.single(x.map_complex(x.dtype(), |re, im| (r(re), r(im))))
}

// ============================================================================
// Binary
// ============================================================================

fn binary_with(
    inv: &Invocation<'_>,
    rule: fn(DType, &Defaults) -> DType,
    f: impl Fn(Elem, Elem) -> Elem,
) -> Out {
    let (x, y) = (inv.host(0)?, inv.host(1)?);
    let dtype = rule(promote_types(x.dtype(), y.dtype()), &inv.defaults);
    inv.single(zip_broadcast(&x, &y, dtype, f)?)
}

fn binary_real(
    inv: &Invocation<'_>,
    rule: fn(DType, &Defaults) -> DType,
    f: impl Fn(f64, f64, DType) -> f64,
) -> Out {
    let (x, y) = (inv.host(0)?, inv.host(1)?);
    let common = promote_types(x.dtype(), y.dtype());
    if common.is_complex() {
        return Err(complex_rejected(inv, common));
    }
    let dtype = rule(common, &inv.defaults);
    inv.single(zip_broadcast(&x, &y, dtype, |a, b| (f(a.0, b.0, common), 0.0))?)
}

/// Lexicographic order on (re, im), which is plain order for real data
fn lex(a: Elem, b: Elem) -> Option<std::cmp::Ordering> {
    match a.0.partial_cmp(&b.0)? {
        std::cmp::Ordering::Equal => a.1.partial_cmp(&b.1),
        other => Some(other),
    }
}

fn truth(b: bool) -> Elem {
    (b as u8 as f64, 0.0)
}

pub(crate) fn add(inv: &Invocation<'_>) -> Out {
    binary_with(inv, same, |a, b| (a.0 + b.0, a.1 + b.1))
}

pub(crate) fn subtract(inv: &Invocation<'_>) -> Out {
    binary_with(inv, same, |a, b| (a.0 - b.0, a.1 - b.1))
}

pub(crate) fn multiply(inv: &Invocation<'_>) -> Out {
    binary_with(inv, same, c_mul)
}

/// True division: integer operands produce the default float
pub(crate) fn divide(inv: &Invocation<'_>) -> Out {
    binary_with(inv, inexact, c_div)
}

pub(crate) fn pow(inv: &Invocation<'_>) -> Out {
    binary_with(inv, same, |a, b| {
        if a.1 == 0.0 && b.1 == 0.0 && (a.0 >= 0.0 || b.0.fract() == 0.0) {
            return (a.0.powf(b.0), 0.0);
        }
        let (lr, li) = c_log(a.0, a.1);
        let (er, ei) = c_mul((lr, li), b);
        c_exp(er, ei)
    })
}

pub(crate) fn floor_divide(inv: &Invocation<'_>) -> Out {
    binary_real(inv, same, |a, b, dtype| {
        if dtype.is_inexact() {
            (a / b).floor()
        } else if b == 0.0 {
            0.0
        } else {
            (a / b).floor()
        }
    })
}

/// Remainder with the sign of the divisor
pub(crate) fn remainder(inv: &Invocation<'_>) -> Out {
    binary_real(inv, same, |a, b, dtype| {
        if b == 0.0 && !dtype.is_inexact() {
            return 0.0;
        }
        let r = a % b;
        if r != 0.0 && (r < 0.0) != (b < 0.0) {
            r + b
        } else {
            r
        }
    })
}

pub(crate) fn maximum(inv: &Invocation<'_>) -> Out {
    binary_with(inv, same, |a, b| match lex(a, b) {
        None => (f64::NAN, 0.0),
        Some(std::cmp::Ordering::Less) => b,
        Some(_) => a,
    })
}

pub(crate) fn minimum(inv: &Invocation<'_>) -> Out {
    binary_with(inv, same, |a, b| match lex(a, b) {
        None => (f64::NAN, 0.0),
        Some(std::cmp::Ordering::Greater) => b,
        Some(_) => a,
    })
}

pub(crate) fn atan2(inv: &Invocation<'_>) -> Out {
    binary_real(inv, inexact, |a, b, _| a.atan2(b))
}

macro_rules! comparison {
    ($($name:ident: $test:expr;)*) => {
        $(
            pub(crate) fn $name(inv: &Invocation<'_>) -> Out {
                let test: fn(Option<std::cmp::Ordering>) -> bool = $test;
                binary_with(inv, boolean, |a, b| truth(test(lex(a, b))))
            }
        )*
    };
}

comparison! {
    equal: |o| o == Some(std::cmp::Ordering::Equal);
    not_equal: |o| o != Some(std::cmp::Ordering::Equal);
    less: |o| o == Some(std::cmp::Ordering::Less);
    less_equal: |o| matches!(o, Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal));
    greater: |o| o == Some(std::cmp::Ordering::Greater);
    greater_equal: |o| matches!(o, Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal));
}

fn nonzero(e: Elem) -> bool {
    e.0 != 0.0 || e.1 != 0.0
}

pub(crate) fn logical_and(inv: &Invocation<'_>) -> Out {
    binary_with(inv, boolean, |a, b| truth(nonzero(a) && nonzero(b)))
}

pub(crate) fn logical_or(inv: &Invocation<'_>) -> Out {
    binary_with(inv, boolean, |a, b| truth(nonzero(a) || nonzero(b)))
}

pub(crate) fn logical_xor(inv: &Invocation<'_>) -> Out {
    binary_with(inv, boolean, |a, b| truth(nonzero(a) != nonzero(b)))
}

// ============================================================================
// Ternary
// ============================================================================

/// Select from `x` where `condition` holds, else from `y`
pub(crate) fn r#where(inv: &Invocation<'_>) -> Out {
    let (cond, x, y) = (inv.host(0)?, inv.host(1)?, inv.host(2)?);
    let dtype = promote_types(x.dtype(), y.dtype());
    let shape = broadcast_shapes([cond.shape().as_slice(), x.shape().as_slice(), y.shape().as_slice()])?;
    let (cond, x, y) = (cond.broadcast_to(&shape)?, x.broadcast_to(&shape)?, y.broadcast_to(&shape)?);
    let n = shape.numel();
    let (mut re, mut im) = (Vec::with_capacity(n), Vec::with_capacity(n));
    for i in 0..n {
        let (a, b) = if cond.truthy(i) { x.get(i) } else { y.get(i) };
        re.push(a);
        im.push(b);
    }
    inv.single(HostArray::from_parts(shape, dtype, re, dtype.is_complex().then_some(im))?)
}

/// Clamp into `[min, max]`; either bound may be absent
pub(crate) fn clip(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?.into_owned();
    let dtype = x.dtype();
    if dtype.is_complex() {
        return Err(complex_rejected(inv, dtype));
    }
    let mut result = x;
    if let Some(lo) = inv.opt_host(1)? {
        result = zip_broadcast(&result, &lo, dtype, |a, b| (if a.0 < b.0 { b.0 } else { a.0 }, 0.0))?;
    }
    if let Some(hi) = inv.opt_host(2)? {
        result = zip_broadcast(&result, &hi, dtype, |a, b| (if a.0 > b.0 { b.0 } else { a.0 }, 0.0))?;
    }
    inv.single(result)
}
