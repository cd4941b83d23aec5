//! Direct N-d convolution leaf
//!
//! Layout is channels-first: input `[N, C_in, *spatial]`, filters
//! `[C_out, C_in, *kernel]`. Padding is `"VALID"`, `"SAME"` or explicit
//! per-axis widths.

use super::{from_elems, Elem};
use crate::error::{Error, Result};
use crate::ops::{Invocation, KernelValue, Value};
use crate::tensor::shape::{contiguous_strides, numel};

type Out = Result<Vec<KernelValue>>;

/// `SAME` padding for one axis, the larger half on the right
pub(crate) fn same_padding(size: usize, kernel: usize, stride: usize) -> (usize, usize) {
    let total = if size % stride != 0 {
        kernel.saturating_sub(size % stride)
    } else {
        kernel.saturating_sub(stride)
    };
    (total / 2, total - total / 2)
}

/// Per-axis integer parameter: one value for every axis or one per axis
pub(crate) fn per_axis(value: &Value, ndim: usize, default: usize, arg: &'static str) -> Result<Vec<usize>> {
    let values = match value {
        Value::None => return Ok(vec![default; ndim]),
        v => v
            .as_ints()
            .ok_or_else(|| Error::invalid_argument(arg, format!("expected integers, got {v:?}")))?,
    };
    if values.iter().any(|&v| v < 1) {
        return Err(Error::invalid_argument(arg, "values must be positive"));
    }
    match values.len() {
        1 => Ok(vec![values[0] as usize; ndim]),
        n if n == ndim => Ok(values.into_iter().map(|v| v as usize).collect()),
        n => Err(Error::invalid_argument(arg, format!("{n} values for {ndim} spatial axes"))),
    }
}

/// Resolve the `padding` parameter to (before, after) widths per spatial axis
pub(crate) fn resolve_padding(
    padding: &Value,
    spatial: &[usize],
    kernel: &[usize],
    strides: &[usize],
    dilations: &[usize],
) -> Result<Vec<(usize, usize)>> {
    let ndim = spatial.len();
    match padding {
        Value::None => Ok(vec![(0, 0); ndim]),
        Value::Str(s) => match s.to_ascii_uppercase().as_str() {
            "VALID" => Ok(vec![(0, 0); ndim]),
            "SAME" => Ok((0..ndim)
                .map(|d| {
                    let effective = (kernel[d] - 1) * dilations[d] + 1;
                    same_padding(spatial[d], effective, strides[d])
                })
                .collect()),
            other => Err(Error::invalid_argument("padding", format!("unknown padding '{other}'"))),
        },
        v => {
            let widths = v
                .as_ints()
                .ok_or_else(|| Error::invalid_argument("padding", format!("expected a mode or widths, got {v:?}")))?;
            if widths.iter().any(|&w| w < 0) {
                return Err(Error::invalid_argument("padding", "widths must be non-negative"));
            }
            let w: Vec<usize> = widths.into_iter().map(|w| w as usize).collect();
            match w.len() {
                1 => Ok(vec![(w[0], w[0]); ndim]),
                n if n == ndim => Ok(w.iter().map(|&p| (p, p)).collect()),
                n if n == 2 * ndim => Ok(w.chunks(2).map(|c| (c[0], c[1])).collect()),
                n => Err(Error::invalid_argument("padding", format!("{n} widths for {ndim} spatial axes"))),
            }
        }
    }
}

/// Output length of one spatial axis
pub(crate) fn output_len(size: usize, pad: (usize, usize), kernel: usize, stride: usize, dilation: usize) -> usize {
    let effective = (kernel - 1) * dilation + 1;
    let padded = size + pad.0 + pad.1;
    if padded < effective {
        0
    } else {
        (padded - effective) / stride + 1
    }
}

/// Row-major iteration over every multi-index of `shape`
fn indices(shape: &[usize]) -> impl Iterator<Item = Vec<usize>> + '_ {
    let strides = contiguous_strides(shape);
    (0..numel(shape)).map(move |i| shape.iter().zip(&strides).map(|(&n, &s)| (i / s) % n.max(1)).collect())
}

pub(crate) fn conv(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let w = inv.host(1)?;
    if x.ndim() < 3 || w.ndim() != x.ndim() {
        return Err(Error::invalid_argument(
            "filters",
            format!("input {} and filters {} are not channels-first N-d convolution operands", x.shape(), w.shape()),
        ));
    }
    let nd = x.ndim() - 2;
    let (batch, c_in) = (x.shape()[0], x.shape()[1]);
    let (c_out, w_in) = (w.shape()[0], w.shape()[1]);
    if w_in != c_in {
        return Err(Error::shape_mismatch(&[c_out, c_in], &w.shape()[..2]));
    }
    let spatial = &x.shape()[2..];
    let kernel = &w.shape()[2..];
    let strides = per_axis(inv.kw("strides"), nd, 1, "strides")?;
    let dilations = per_axis(inv.kw("dilations"), nd, 1, "dilations")?;
    let pads = resolve_padding(inv.kw("padding"), spatial, kernel, &strides, &dilations)?;
    let out_spatial: Vec<usize> = (0..nd)
        .map(|d| output_len(spatial[d], pads[d], kernel[d], strides[d], dilations[d]))
        .collect();

    let x_strides = contiguous_strides(x.shape());
    let w_strides = contiguous_strides(w.shape());
    let kernel_positions: Vec<Vec<usize>> = indices(kernel).collect();
    let mut out: Vec<Elem> = Vec::with_capacity(batch * c_out * numel(&out_spatial));
    for n in 0..batch {
        for co in 0..c_out {
            for pos in indices(&out_spatial) {
                let mut acc = (0.0, 0.0);
                for ci in 0..c_in {
                    'taps: for k in &kernel_positions {
                        let mut xi = n * x_strides[0] + ci * x_strides[1];
                        for d in 0..nd {
                            let at = (pos[d] * strides[d] + k[d] * dilations[d]) as isize - pads[d].0 as isize;
                            if at < 0 || at as usize >= spatial[d] {
                                continue 'taps;
                            }
                            xi += at as usize * x_strides[d + 2];
                        }
                        let wi = co * w_strides[0]
                            + ci * w_strides[1]
                            + k.iter().zip(&w_strides[2..]).map(|(a, b)| a * b).sum::<usize>();
                        let (a, b) = (x.get(xi), w.get(wi));
                        acc.0 += a.0 * b.0 - a.1 * b.1;
                        acc.1 += a.0 * b.1 + a.1 * b.0;
                    }
                }
                out.push(acc);
            }
        }
    }
    let mut shape = vec![batch, c_out];
    shape.extend(out_spatial);
    inv.single(from_elems(shape, x.dtype(), out)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_padding_puts_extra_on_the_right() {
        assert_eq!(same_padding(5, 3, 1), (1, 1));
        assert_eq!(same_padding(5, 4, 1), (1, 2));
        assert_eq!(same_padding(5, 3, 2), (1, 1));
        assert_eq!(same_padding(6, 3, 2), (0, 1));
    }

    #[test]
    fn test_output_len() {
        assert_eq!(output_len(5, (0, 0), 3, 1, 1), 3);
        assert_eq!(output_len(5, (1, 1), 3, 2, 1), 3);
        assert_eq!(output_len(5, (0, 0), 3, 1, 2), 1);
        assert_eq!(output_len(2, (0, 0), 3, 1, 1), 0);
    }

    #[test]
    fn test_resolve_padding_forms() {
        let same = resolve_padding(&Value::from("same"), &[5], &[4], &[1], &[1]).unwrap();
        assert_eq!(same, vec![(1, 2)]);
        let pairs = resolve_padding(&Value::Ints(vec![1, 2, 0, 0]), &[5, 5], &[3, 3], &[1, 1], &[1, 1]).unwrap();
        assert_eq!(pairs, vec![(1, 2), (0, 0)]);
        assert!(resolve_padding(&Value::from("full"), &[5], &[3], &[1], &[1]).is_err());
    }
}
