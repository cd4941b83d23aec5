//! The unified operator surface
//!
//! Every function here builds a [`CallFrame`], sends it through the unified
//! adapter chain against the active backend and returns array handles. The
//! functions are re-exported flat at the crate root.
//!
//! Elementwise operators come in two forms: `add(x, y)` and
//! `add_with(x, y, &opts)`, the latter taking the shared [`Opts`]
//! (`out`, `where`, `dtype`, `device`, strict dtypes).

mod creation;
mod device;
mod dtypes;
mod elementwise;
mod gradients;
mod linalg;
mod manipulation;
mod nn;
mod overloads;
mod random;
mod reduction;
mod searching;

pub use creation::*;
pub use device::*;
pub use dtypes::*;
pub use elementwise::*;
pub use gradients::*;
pub use linalg::*;
pub use manipulation::*;
pub use nn::*;
pub use random::*;
pub use reduction::*;
pub use searching::*;

use crate::backend;
use crate::config;
use crate::device::Device;
use crate::dtype::DType;
use crate::error::Result;
use crate::ops::{cast_native, dispatch, dispatch_one, to_native, CallFrame, Output, UNIFIED_CHAIN};
use crate::tensor::{Array, ArrayLike, HostArray};

/// Options shared by the elementwise operators
#[derive(Clone, Debug, Default)]
pub struct Opts {
    /// Pre-allocated output; the result is written into it
    pub out: Option<Array>,
    /// Boolean mask; positions where it is false keep `out`, else the
    /// operator's declared fill
    pub where_mask: Option<ArrayLike>,
    /// Inputs are cast to this dtype before computing
    pub dtype: Option<DType>,
    /// Placement of the result
    pub device: Option<Device>,
    /// Fail with `DtypeUnsupported` instead of substituting
    pub strict: bool,
}

impl Opts {
    /// Write the result into `out`
    pub fn out(mut self, out: &Array) -> Self {
        self.out = Some(out.clone());
        self
    }

    /// Compute only where `mask` is true
    pub fn where_mask(mut self, mask: impl Into<ArrayLike>) -> Self {
        self.where_mask = Some(mask.into());
        self
    }

    /// Cast inputs to `dtype` first
    pub fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    /// Place the result on `device`
    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Forbid dtype substitution
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub(crate) fn apply(&self, frame: CallFrame) -> CallFrame {
        frame
            .out(self.out.as_ref())
            .where_mask(self.where_mask.clone())
            .dtype(self.dtype)
            .device(self.device)
            .strict(self.strict)
    }
}

#[inline]
pub(crate) fn call(frame: CallFrame) -> Result<Array> {
    dispatch_one(frame)
}

pub(crate) fn call_all(frame: CallFrame) -> Result<Vec<Array>> {
    dispatch(frame, UNIFIED_CHAIN)?
        .into_iter()
        .map(Output::into_array)
        .collect()
}

pub(crate) fn likes<A: Into<ArrayLike>>(arrays: impl IntoIterator<Item = A>) -> Vec<ArrayLike> {
    arrays.into_iter().map(Into::into).collect()
}

/// Materialise any array-like as a handle on the active backend.
///
/// Handles already on the active backend are returned as-is when no dtype is
/// requested. Dtypes the backend cannot represent are replaced by its
/// closest valid dtype.
pub fn asarray(like: impl Into<ArrayLike>, dtype: Option<DType>) -> Result<Array> {
    let like = like.into();
    let backend = backend::current()?;
    if let (ArrayLike::Handle(a), None) = (&like, dtype) {
        if a.backend_name() == backend.name() {
            return Ok(a.clone());
        }
    }
    let config = config::get();
    let defaults = config.defaults();
    let device = if backend.valid_devices().contains(&config.default_device) {
        config.default_device
    } else {
        backend.default_device()
    };
    let native = match (&like, dtype) {
        (ArrayLike::Nested(n), Some(d)) => backend.wrap(n.to_host(Some(d), &defaults)?, &device),
        (ArrayLike::Scalar(s), Some(d)) => backend.wrap(HostArray::from_scalar(*s, d), &device),
        _ => to_native(&like, &backend, &device, &defaults)?,
    };
    let target = backend.closest_valid_dtype(dtype.unwrap_or(native.dtype()));
    let native = cast_native(&native, target, &backend);
    Ok(Array::from_native(native, backend))
}
