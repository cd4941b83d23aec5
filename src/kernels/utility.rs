//! Placement, conversion and gradient-boundary leaves

use crate::error::{Error, Result};
use crate::ops::{Invocation, KernelValue, Value};

type Out = Result<Vec<KernelValue>>;

/// Values pass through unchanged; the handle layer drops variable marking
pub(crate) fn stop_gradient(inv: &Invocation<'_>) -> Out {
    inv.single(inv.host(0)?.into_owned())
}

pub(crate) fn to_device(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let device = match inv.kw("device") {
        Value::Device(d) => *d,
        Value::Str(s) => s.parse()?,
        Value::None => inv.device,
        other => return Err(Error::invalid_argument("device", format!("expected a device, got {other:?}"))),
    };
    inv.backend.check_device(&device)?;
    Ok(vec![KernelValue::Array(inv.backend.wrap(x.into_owned(), &device))])
}

pub(crate) fn astype(inv: &Invocation<'_>) -> Out {
    let x = inv.host(0)?;
    let dtype = inv
        .dtype
        .ok_or_else(|| Error::invalid_argument("dtype", "missing required argument"))?;
    if x.dtype() == dtype {
        return inv.single(x.into_owned());
    }
    inv.single(x.astype(dtype))
}
