//! Network layers: convolution, dense, normalisation, attention
//!
//! Everything except a native convolution is composed from other operators
//! of the unified surface, so every backend gets these layers.

use super::{
    add, asarray, call, divide, gather, matmul, matmul_transpose, mean, multiply, pad, reshape,
    softmax, sqrt, stack, subtract, var, where_, PadMode,
};
use crate::backend;
use crate::dtype::Scalar;
use crate::error::{Error, Result};
use crate::kernels::conv::{output_len, per_axis, resolve_padding};
use crate::ops::{CallFrame, OpId, Value};
use crate::tensor::shape::contiguous_strides;
use crate::tensor::{Array, ArrayLike};

/// Convolution padding
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Padding {
    /// No padding
    #[default]
    Valid,
    /// Pad so each output length is `ceil(input / stride)`; an odd total
    /// puts the extra element on the right
    Same,
    /// `(before, after)` per spatial axis
    Explicit(Vec<(usize, usize)>),
}

impl From<&Padding> for Value {
    fn from(p: &Padding) -> Self {
        match p {
            Padding::Valid => Value::from("VALID"),
            Padding::Same => Value::from("SAME"),
            Padding::Explicit(pairs) => Value::Ints(pairs.iter().flat_map(|&(a, b)| [a as i64, b as i64]).collect()),
        }
    }
}

/// N-d convolution, channels first.
///
/// `x` is `[N, C_in, *spatial]` and `filters` `[C_out, C_in, *kernel]`.
/// `strides` and `dilations` hold one value for every axis or one per
/// axis. Backends without a native convolution get a strided-window
/// rendition: each kernel tap is gathered from the padded input and the
/// taps are contracted with the filters in one matmul.
pub fn conv(
    x: impl Into<ArrayLike>,
    filters: impl Into<ArrayLike>,
    strides: &[usize],
    padding: &Padding,
    dilations: &[usize],
) -> Result<Array> {
    let active = backend::current()?;
    if active.has_operator(OpId::Conv) {
        return call(
            CallFrame::new(OpId::Conv)
                .arg(x)
                .arg(filters)
                .kw("strides", strides)
                .kw("padding", padding)
                .kw("dilations", dilations),
        );
    }
    tracing::debug!(backend = active.name(), "conv via strided windows");
    conv_windows(asarray(x, None)?, asarray(filters, None)?, strides, padding, dilations)
}

fn conv_windows(x: Array, w: Array, strides: &[usize], padding: &Padding, dilations: &[usize]) -> Result<Array> {
    let (xs, ws) = (x.shape(), w.shape());
    if xs.ndim() < 3 || ws.ndim() != xs.ndim() || ws[1] != xs[1] {
        return Err(Error::invalid_argument(
            "filters",
            format!("input {xs} and filters {ws} are not channels-first convolution operands"),
        ));
    }
    let nd = xs.ndim() - 2;
    let (batch, c_in, c_out) = (xs[0], xs[1], ws[0]);
    let spatial = &xs[2..];
    let kernel = &ws[2..];
    let strides = per_axis(&Value::from(strides), nd, 1, "strides")?;
    let dilations = per_axis(&Value::from(dilations), nd, 1, "dilations")?;
    let pads = resolve_padding(&Value::from(padding), spatial, kernel, &strides, &dilations)?;
    let out_spatial: Vec<usize> = (0..nd)
        .map(|d| output_len(spatial[d], pads[d], kernel[d], strides[d], dilations[d]))
        .collect();

    let mut widths = vec![0usize; 4];
    widths.extend(pads.iter().flat_map(|&(a, b)| [a, b]));
    let padded = pad(&x, &widths, PadMode::Constant(Scalar::Int(0)))?;

    let taps: usize = kernel.iter().product();
    let kernel_strides = contiguous_strides(kernel);
    let mut windows = Vec::with_capacity(taps);
    for t in 0..taps {
        let mut window = padded.clone();
        for d in 0..nd {
            let k = (t / kernel_strides[d]) % kernel[d];
            let at: Vec<i64> = (0..out_spatial[d])
                .map(|o| (k * dilations[d] + o * strides[d]) as i64)
                .collect();
            let at = ArrayLike::from_slice(&at, &[at.len()])?;
            window = gather(&window, at, 2 + d as isize)?;
        }
        windows.push(window);
    }

    // [N, C_in, T, *O] -> [N, C_in * T, P]
    let positions: usize = out_spatial.iter().product();
    let stacked = stack(&windows, 2)?;
    let columns = reshape(&stacked, &[batch as i64, (c_in * taps) as i64, positions as i64])?;
    let kernels = reshape(&w, &[c_out as i64, (c_in * taps) as i64])?;
    let out = matmul(&kernels, &columns)?;

    let mut shape = vec![batch as i64, c_out as i64];
    shape.extend(out_spatial.iter().map(|&o| o as i64));
    reshape(&out, &shape)
}

/// Dense layer `x @ weightᵀ + bias` with `weight` shaped `[out, in]`
pub fn linear(
    x: impl Into<ArrayLike>,
    weight: impl Into<ArrayLike>,
    bias: Option<impl Into<ArrayLike>>,
) -> Result<Array> {
    let y = matmul_transpose(x, weight, false, true)?;
    match bias {
        Some(b) => add(&y, b),
        None => Ok(y),
    }
}

/// Normalise over the last `normalized_ndim` axes, then scale and shift
pub fn layer_norm(
    x: impl Into<ArrayLike>,
    normalized_ndim: usize,
    scale: Option<impl Into<ArrayLike>>,
    offset: Option<impl Into<ArrayLike>>,
    eps: f64,
) -> Result<Array> {
    let x = asarray(x, None)?;
    let nd = x.ndim();
    if normalized_ndim == 0 || normalized_ndim > nd {
        return Err(Error::invalid_argument(
            "normalized_ndim",
            format!("cannot normalise {normalized_ndim} trailing axes of a {nd}-d array"),
        ));
    }
    let axes: Vec<isize> = (nd - normalized_ndim..nd).map(|a| a as isize).collect();
    let mu = mean(&x, Some(axes.as_slice()), true)?;
    let sigma2 = var(&x, Some(axes.as_slice()), 0.0, true)?;
    normalise(&x, &mu, &sigma2, scale, offset, eps)
}

/// Batch normalisation over the channel axis 1.
///
/// Without running statistics the batch mean and variance over every other
/// axis are used. `scale`, `offset` and the statistics are per-channel.
pub fn batch_norm(
    x: impl Into<ArrayLike>,
    running: Option<(Array, Array)>,
    scale: Option<impl Into<ArrayLike>>,
    offset: Option<impl Into<ArrayLike>>,
    eps: f64,
) -> Result<Array> {
    let x = asarray(x, None)?;
    let nd = x.ndim();
    if nd < 2 {
        return Err(Error::invalid_argument("x", format!("batch_norm needs [N, C, ...], got {}", x.shape())));
    }
    let axes: Vec<isize> = (0..nd as isize).filter(|&a| a != 1).collect();
    let channels = x.shape()[1] as i64;
    let mut per_channel = vec![1i64; nd];
    per_channel[1] = channels;
    let as_channels = |a: Array| reshape(&a, &per_channel);
    let (mu, sigma2) = match running {
        Some((m, v)) => (as_channels(m)?, as_channels(v)?),
        None => (mean(&x, Some(axes.as_slice()), true)?, var(&x, Some(axes.as_slice()), 0.0, true)?),
    };
    let scale = scale.map(|s| asarray(s, None).and_then(as_channels)).transpose()?;
    let offset = offset.map(|o| asarray(o, None).and_then(as_channels)).transpose()?;
    normalise(&x, &mu, &sigma2, scale, offset, eps)
}

fn normalise(
    x: &Array,
    mu: &Array,
    sigma2: &Array,
    scale: Option<impl Into<ArrayLike>>,
    offset: Option<impl Into<ArrayLike>>,
    eps: f64,
) -> Result<Array> {
    let centred = subtract(x, mu)?;
    let spread = sqrt(add(sigma2, eps)?)?;
    let mut y = divide(&centred, &spread)?;
    if let Some(s) = scale {
        y = multiply(&y, s)?;
    }
    if let Some(o) = offset {
        y = add(&y, o)?;
    }
    Ok(y)
}

/// `softmax(q @ kᵀ · scale) @ v` over the last two axes.
///
/// `scale` defaults to `1 / sqrt(d_k)`. Where the boolean `mask` is false
/// the score is replaced by negative infinity before the softmax.
pub fn scaled_dot_product_attention(
    q: impl Into<ArrayLike>,
    k: impl Into<ArrayLike>,
    v: impl Into<ArrayLike>,
    mask: Option<impl Into<ArrayLike>>,
    scale: Option<f64>,
) -> Result<Array> {
    let q = asarray(q, None)?;
    let depth = q.shape().as_slice().last().copied().unwrap_or(1).max(1);
    let scale = scale.unwrap_or(1.0 / (depth as f64).sqrt());
    let scores = multiply(matmul_transpose(&q, k, false, true)?, scale)?;
    let scores = match mask {
        Some(m) => where_(m, &scores, f64::NEG_INFINITY)?,
        None => scores,
    };
    let weights = softmax(&scores, Some(-1))?;
    matmul(&weights, v)
}

