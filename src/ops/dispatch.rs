//! Operator dispatch
//!
//! `dispatch` snapshots the active backend, runs the adapter chain around the
//! bound leaf and hands back array handles. The snapshot is taken once on
//! entry, so an activation published while the call is in flight does not
//! affect it.

use super::frame::{CallFrame, Value};
use super::kernel::{Invocation, KernelValue};
use super::marshal::cast_native;
use super::op_id::OpId;
use super::wrappers::{Adapter, CallContext, Produced, UNIFIED_CHAIN};
use crate::backend::{self, BackendDescriptor};
use crate::dtype::Scalar;
use crate::error::{Error, Result};
use crate::tensor::shape::{lanes, normalize_axis};
use crate::tensor::{Array, ArrayLike, HostArray};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// A public result
#[derive(Clone, Debug)]
pub enum Output {
    /// Array handle
    Array(Array),
    /// Plain scalar (frontend zero-dim coercion only)
    Scalar(Scalar),
}

impl Output {
    /// The handle, materialising a scalar as a 0-d array
    pub fn into_array(self) -> Result<Array> {
        match self {
            Self::Array(a) => Ok(a),
            Self::Scalar(s) => crate::api::asarray(s, None),
        }
    }

    /// The scalar, extracting it from a one-element array
    pub fn into_scalar(self) -> Result<Scalar> {
        match self {
            Self::Array(a) => a.item(),
            Self::Scalar(s) => Ok(s),
        }
    }
}

/// Run `frame` through `chain` against the active backend
pub fn dispatch(frame: CallFrame, chain: &[Adapter]) -> Result<Vec<Output>> {
    let backend = backend::current()?;
    let op = frame.op;
    let name = backend.name();
    let summary = frame.summary();
    tracing::trace!(op = op.name(), backend = name, args = %summary, "dispatch");
    run(frame, chain, backend).map_err(|e| e.in_call(op.name(), name, summary))
}

/// Dispatch through the unified chain and return the first result
pub fn dispatch_one(frame: CallFrame) -> Result<Array> {
    first(dispatch(frame, UNIFIED_CHAIN)?)
}

fn first(outputs: Vec<Output>) -> Result<Array> {
    outputs
        .into_iter()
        .next()
        .ok_or_else(|| Error::Backend("operator produced no result".into()))?
        .into_array()
}

/// Call an operator by its canonical name through the unified chain.
///
/// Unknown names fail with `UnknownOperator`; names the active backend does
/// not bind fail with `BackendMissingOperator`.
pub fn call_by_name(
    name: &str,
    args: Vec<Value>,
    kwargs: Vec<(&'static str, Value)>,
) -> Result<Vec<Output>> {
    let op = OpId::from_name(name).ok_or_else(|| Error::UnknownOperator {
        name: name.to_string(),
    })?;
    let mut frame = CallFrame::new(op);
    frame.args = args;
    frame.kwargs = kwargs;
    dispatch(frame, UNIFIED_CHAIN)
}

fn run(frame: CallFrame, chain: &[Adapter], backend: Arc<BackendDescriptor>) -> Result<Vec<Output>> {
    let entry = *backend.require(frame.op)?;
    let mut cx = CallContext::new(frame, backend, entry);

    for adapter in chain {
        adapter.before(&mut cx)?;
    }
    let mut outs = invoke(&cx)?;
    if cx.frame.op == OpId::Argsort && !cx.entry.stable && stable_requested(&cx.frame) {
        stabilise_argsort(&cx, &mut outs)?;
    }
    for adapter in chain.iter().rev() {
        adapter.after(&mut cx, &mut outs)?;
    }

    Ok(outs
        .into_iter()
        .map(|p| match p {
            Produced::Native(n) => Output::Array(Array::from_native(n, Arc::clone(&cx.backend))),
            Produced::Handle(a) => Output::Array(a),
            Produced::Scalar(s) => Output::Scalar(s),
        })
        .collect())
}

fn invoke(cx: &CallContext) -> Result<Vec<Produced>> {
    let mut inv = Invocation::new(
        cx.frame.op,
        &cx.backend,
        cx.device,
        &cx.frame.args,
        &cx.frame.kwargs,
        cx.defaults,
    );
    inv.dtype = cx.frame.dtype;
    inv.out = cx.native_out.as_ref();

    let kernel = cx.entry.kernel;
    let values = match panic::catch_unwind(AssertUnwindSafe(|| kernel(&inv))) {
        Ok(result) => result?,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "leaf panicked".to_string());
            return Err(Error::Backend(reason));
        }
    };

    // 0-d scalars escaping a leaf come back as 0-d arrays; results in a
    // dtype the backend cannot represent take its closest valid dtype
    Ok(values
        .into_iter()
        .map(|v| match v {
            KernelValue::Array(n) if cx.backend.is_valid_dtype(n.dtype()) => Produced::Native(n),
            KernelValue::Array(n) => {
                let to = cx.backend.closest_valid_dtype(n.dtype());
                Produced::Native(cast_native(&n, to, &cx.backend))
            }
            KernelValue::Scalar(s) => {
                let dtype = s.natural_dtype(&cx.defaults);
                let dtype = if cx.backend.is_valid_dtype(dtype) {
                    dtype
                } else {
                    cx.backend.closest_valid_dtype(dtype)
                };
                Produced::Native(cx.backend.wrap(HostArray::from_scalar(s, dtype), &cx.device))
            }
        })
        .collect())
}

fn stable_requested(frame: &CallFrame) -> bool {
    frame
        .get_kw("stable")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Reorder each run of equal keys so that indices ascend
fn stabilise_argsort(cx: &CallContext, outs: &mut [Produced]) -> Result<()> {
    let Some(Value::Array(ArrayLike::Native(input))) = cx.frame.args.first() else {
        return Ok(());
    };
    let Some(Produced::Native(indices)) = outs.first() else {
        return Ok(());
    };
    let keys = input.host();
    let order = indices.host();
    let axis = cx
        .frame
        .get_kw("axis")
        .and_then(Value::as_int)
        .unwrap_or(-1);
    if keys.ndim() == 0 {
        return Ok(());
    }
    let axis = normalize_axis(axis as isize, keys.ndim())?;
    let (outer, len, inner) = lanes(keys.shape(), axis);

    let mut idx: Vec<f64> = order.re().to_vec();
    for o in 0..outer {
        for i in 0..inner {
            let at = |k: usize| o * len * inner + k * inner + i;
            let key_of = |pos: f64| keys.get(at(pos as usize));
            let mut start = 0;
            while start < len {
                let pivot = key_of(idx[at(start)]);
                let mut end = start + 1;
                while end < len && key_of(idx[at(end)]) == pivot {
                    end += 1;
                }
                let mut run: Vec<f64> = (start..end).map(|k| idx[at(k)]).collect();
                run.sort_by(f64::total_cmp);
                for (k, v) in (start..end).zip(run) {
                    idx[at(k)] = v;
                }
                start = end;
            }
        }
    }
    let fixed = HostArray::new(order.shape().clone(), order.dtype(), idx)?;
    let device = indices.device();
    outs[0] = Produced::Native(cx.backend.wrap(fixed, &device));
    Ok(())
}
