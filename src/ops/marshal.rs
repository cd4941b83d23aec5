//! Marshalling between array-likes, handles and backend-native arrays

use super::op_id::OpId;
use crate::backend::{BackendDescriptor, NativeRef};
use crate::device::Device;
use crate::dtype::{DType, Defaults};
use crate::error::Result;
use crate::tensor::{ArrayLike, HostArray};
use std::cell::RefCell;

/// Bring any array-like onto `backend` as a native array.
///
/// Natives of the same backend pass through untouched; natives of another
/// backend are rebuilt from their host data, keeping their placement when
/// `backend` can use it. Plain values and nested sequences are materialised
/// on `device` with a dtype inferred under `defaults`.
pub fn to_native(
    like: &ArrayLike,
    backend: &BackendDescriptor,
    device: &Device,
    defaults: &Defaults,
) -> Result<NativeRef> {
    let adopt = |native: NativeRef| -> NativeRef {
        if native.backend() == backend.name() {
            return native;
        }
        let placement = native.device();
        let placement = if backend.valid_devices().contains(&placement) {
            placement
        } else {
            *device
        };
        backend.wrap(native.host().into_owned(), &placement)
    };
    Ok(match like {
        ArrayLike::Handle(a) => adopt(a.native()),
        ArrayLike::Native(n) => adopt(n.clone()),
        ArrayLike::Scalar(s) => backend.wrap(HostArray::from_scalar(*s, s.natural_dtype(defaults)), device),
        ArrayLike::Nested(n) => backend.wrap(n.to_host(None, defaults)?, device),
        ArrayLike::Host(h) => backend.wrap(h.clone(), device),
    })
}

/// `native` converted to `dtype` on the same backend and device
pub fn cast_native(native: &NativeRef, dtype: DType, backend: &BackendDescriptor) -> NativeRef {
    if native.dtype() == dtype {
        return native.clone();
    }
    backend.wrap(native.host().astype(dtype), &native.device())
}

// ============================================================================
// Substitution log
// ============================================================================

/// A dtype substitution performed on the way into a leaf
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Substitution {
    /// Operator called
    pub op: OpId,
    /// Requested dtype
    pub from: DType,
    /// Dtype the leaf received
    pub to: DType,
    /// Backend executing the call
    pub backend: &'static str,
}

thread_local! {
    static SUBSTITUTIONS: RefCell<Vec<Substitution>> = const { RefCell::new(Vec::new()) };
}

pub(crate) fn record(substitution: Substitution) {
    tracing::debug!(
        op = substitution.op.name(),
        from = %substitution.from,
        to = %substitution.to,
        backend = substitution.backend,
        "dtype substituted"
    );
    SUBSTITUTIONS.with(|log| log.borrow_mut().push(substitution));
}

/// Drain the substitutions recorded on this thread
pub fn take_substitutions() -> Vec<Substitution> {
    SUBSTITUTIONS.with(|log| std::mem::take(&mut *log.borrow_mut()))
}
