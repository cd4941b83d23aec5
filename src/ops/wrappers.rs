//! Call-frame adapters
//!
//! Every public function declares an ordered adapter chain. Before-phases
//! run in declared order on the way in; after-phases run in reverse order on
//! the way out, so the first adapter wraps everything else. Adapters never
//! reorder positional arguments and pass errors through untouched.

use super::frame::{CallFrame, Value};
use super::marshal::{self, Substitution};
use super::signature::{signature, DtypeHint, Promote, Signature, WhereFill};
use super::table::OpEntry;
use crate::backend::{BackendDescriptor, NativeRef};
use crate::config;
use crate::device::Device;
use crate::dtype::{can_cast, result_type, Casting, DType, Defaults, Operand, Scalar};
use crate::error::{Error, Result};
use crate::tensor::shape::broadcast_shapes;
use crate::tensor::{Array, ArrayLike, HostArray};
use std::sync::Arc;

/// A result travelling back through the after-phases
#[derive(Clone, Debug)]
pub enum Produced {
    /// Native array not yet wrapped
    Native(NativeRef),
    /// Finished handle
    Handle(Array),
    /// Plain scalar (zero-dim coercion)
    Scalar(Scalar),
}

/// Mutable state of one call while the chain runs
pub struct CallContext {
    /// The call being made
    pub frame: CallFrame,
    /// Backend snapshot taken on entry
    pub backend: Arc<BackendDescriptor>,
    /// Bound entry
    pub entry: OpEntry,
    /// Declared contract
    pub signature: Signature,
    /// Fallback dtypes
    pub defaults: Defaults,
    /// Casting policy
    pub casting: Casting,
    /// Placement for new arrays
    pub device: Device,
    /// Boolean where mask
    pub mask: Option<HostArray>,
    /// Fill source for masked-out positions
    pub fill: Option<HostArray>,
    /// `out` handed to the leaf
    pub native_out: Option<NativeRef>,
}

impl CallContext {
    pub(crate) fn new(frame: CallFrame, backend: Arc<BackendDescriptor>, entry: OpEntry) -> Self {
        let config = config::get();
        let device = if backend.valid_devices().contains(&config.default_device) {
            config.default_device
        } else {
            backend.default_device()
        };
        Self {
            signature: signature(frame.op),
            casting: frame.casting.unwrap_or(config.casting),
            defaults: config.defaults(),
            frame,
            backend,
            entry,
            device,
            mask: None,
            fill: None,
            native_out: None,
        }
    }

    fn natives(&self) -> impl Iterator<Item = &NativeRef> {
        self.frame.args.iter().flat_map(|v| match v {
            Value::Array(a) => std::slice::from_ref(a).iter(),
            Value::Arrays(list) => list.iter(),
            _ => Default::default(),
        })
        .filter_map(|like| match like {
            ArrayLike::Native(n) => Some(n),
            _ => None,
        })
    }

    fn map_natives(&mut self, mut f: impl FnMut(&NativeRef) -> Result<NativeRef>) -> Result<()> {
        for like in self.frame.operands_mut() {
            if let ArrayLike::Native(n) = like {
                *n = f(n)?;
            }
        }
        Ok(())
    }

    fn unsupported(&self, dtype: DType) -> Error {
        Error::DtypeUnsupported {
            dtype,
            op: self.frame.op.name(),
            backend: self.backend.name(),
        }
    }

    /// Dtype the leaf will actually receive in place of `dtype`
    fn resolve_dtype(&self, dtype: DType) -> Result<DType> {
        let strict = self.frame.strict_dtypes;
        let mut to = dtype;
        if !self.backend.is_valid_dtype(to) {
            if strict {
                return Err(self.unsupported(dtype));
            }
            to = self.backend.closest_valid_dtype(to);
        }
        let rejected = self.entry.unsupported_dtypes;
        if rejected.contains(to) {
            if strict {
                return Err(self.unsupported(dtype));
            }
            to = self
                .backend
                .valid_dtypes()
                .difference(rejected)
                .nearest(to)
                .ok_or_else(|| self.unsupported(dtype))?;
        }
        if to != dtype {
            marshal::record(Substitution {
                op: self.frame.op,
                from: dtype,
                to,
                backend: self.backend.name(),
            });
        }
        Ok(to)
    }
}

/// A named call-frame transformer
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Adapter {
    /// Convert every array-like to a native array of the active backend
    ToInternalArrays,
    /// Promote operands declared promotable to a common dtype
    PromoteTypes,
    /// Write results into a supplied `out` array
    HandleOut,
    /// Blend results with a fallback where the mask is false
    HandleWhere,
    /// Enforce the casting policy on implicit conversions
    HandleCasting,
    /// Return plain scalars in place of 0-d results
    FromZeroDimToScalar,
    /// Apply a `dtype` request
    HandleDtypeHint,
    /// Keep dtypes the backend or leaf rejects away from the leaf
    UnsupportedDtypesGuard,
}

/// Adapter chain of the unified surface
pub const UNIFIED_CHAIN: &[Adapter] = &[
    Adapter::ToInternalArrays,
    Adapter::HandleOut,
    Adapter::HandleDtypeHint,
    Adapter::HandleWhere,
    Adapter::PromoteTypes,
    Adapter::UnsupportedDtypesGuard,
];

/// Adapter chain of the frontend façades
pub const FRONTEND_CHAIN: &[Adapter] = &[
    Adapter::ToInternalArrays,
    Adapter::FromZeroDimToScalar,
    Adapter::HandleOut,
    Adapter::HandleCasting,
    Adapter::HandleDtypeHint,
    Adapter::HandleWhere,
    Adapter::PromoteTypes,
    Adapter::UnsupportedDtypesGuard,
];

impl Adapter {
    /// Adapter name
    pub const fn name(self) -> &'static str {
        match self {
            Self::ToInternalArrays => "to_internal_arrays",
            Self::PromoteTypes => "promote_types",
            Self::HandleOut => "handle_out",
            Self::HandleWhere => "handle_where",
            Self::HandleCasting => "handle_casting",
            Self::FromZeroDimToScalar => "from_zero_dim_to_scalar",
            Self::HandleDtypeHint => "handle_dtype_hint",
            Self::UnsupportedDtypesGuard => "unsupported_dtypes_guard",
        }
    }

    /// Resolve an adapter name
    pub fn from_name(name: &str) -> Option<Self> {
        [
            Self::ToInternalArrays,
            Self::PromoteTypes,
            Self::HandleOut,
            Self::HandleWhere,
            Self::HandleCasting,
            Self::FromZeroDimToScalar,
            Self::HandleDtypeHint,
            Self::UnsupportedDtypesGuard,
        ]
        .into_iter()
        .find(|a| a.name() == name)
    }

    pub(crate) fn before(self, cx: &mut CallContext) -> Result<()> {
        match self {
            Self::ToInternalArrays => to_internal_before(cx),
            Self::PromoteTypes => promote_before(cx),
            Self::HandleOut => {
                if let Some(out) = &cx.frame.out {
                    if cx.entry.support_native_out && cx.frame.where_mask.is_none() {
                        let native = marshal::to_native(
                            &ArrayLike::Handle(out.clone()),
                            &cx.backend,
                            &cx.device,
                            &cx.defaults,
                        )?;
                        cx.native_out = Some(native);
                    }
                }
                Ok(())
            }
            Self::HandleWhere => {
                let Some(mask) = &cx.frame.where_mask else {
                    return Ok(());
                };
                let mask = marshal::to_native(mask, &cx.backend, &cx.device, &cx.defaults)?;
                cx.mask = Some(mask.host().astype(DType::Bool));
                if cx.signature.where_fill == WhereFill::Input {
                    let fill = cx.natives().next().map(|n| n.host().into_owned());
                    cx.fill = fill;
                }
                Ok(())
            }
            Self::HandleCasting => {
                // the result dtype is checked against `out` after the leaf runs
                if cx.frame.out.is_some() {
                    cx.native_out = None;
                }
                if let (Some(dtype), DtypeHint::CastInputs) = (cx.frame.dtype, cx.signature.dtype_hint) {
                    if let Some(from) = cx
                        .natives()
                        .map(|n| n.dtype())
                        .find(|&from| !can_cast(from, dtype, cx.casting))
                    {
                        return Err(Error::CastingNotAllowed {
                            from,
                            to: dtype,
                            casting: cx.casting,
                        });
                    }
                    return Ok(());
                }
                check_promotion_casting(cx)
            }
            Self::FromZeroDimToScalar => Ok(()),
            Self::HandleDtypeHint => match (cx.frame.dtype, cx.signature.dtype_hint) {
                (Some(dtype), DtypeHint::CastInputs) => {
                    let backend = Arc::clone(&cx.backend);
                    cx.map_natives(|n| Ok(marshal::cast_native(n, dtype, &backend)))
                }
                _ => Ok(()),
            },
            Self::UnsupportedDtypesGuard => {
                if let (Some(dtype), DtypeHint::Output) = (cx.frame.dtype, cx.signature.dtype_hint) {
                    cx.frame.dtype = Some(cx.resolve_dtype(dtype)?);
                }
                let resolved = cx
                    .natives()
                    .map(|n| cx.resolve_dtype(n.dtype()))
                    .collect::<Result<Vec<_>>>()?;
                let backend = Arc::clone(&cx.backend);
                let mut resolved = resolved.into_iter();
                cx.map_natives(|n| {
                    let to = resolved.next().unwrap_or(n.dtype());
                    Ok(marshal::cast_native(n, to, &backend))
                })
            }
        }
    }

    pub(crate) fn after(self, cx: &mut CallContext, outs: &mut [Produced]) -> Result<()> {
        match self {
            Self::ToInternalArrays => {
                for p in outs.iter_mut() {
                    if let Produced::Native(n) = p {
                        *p = Produced::Handle(Array::from_native(n.clone(), Arc::clone(&cx.backend)));
                    }
                }
                Ok(())
            }
            Self::HandleOut => handle_out_after(cx, outs),
            Self::HandleWhere => handle_where_after(cx, outs),
            Self::HandleCasting => {
                if let (Some(out), Some(Produced::Native(n))) = (&cx.frame.out, outs.first()) {
                    if !can_cast(n.dtype(), out.dtype(), cx.casting) {
                        return Err(Error::CastingNotAllowed {
                            from: n.dtype(),
                            to: out.dtype(),
                            casting: cx.casting,
                        });
                    }
                }
                Ok(())
            }
            Self::FromZeroDimToScalar => {
                for p in outs.iter_mut() {
                    if let Produced::Native(n) = p {
                        if n.shape().ndim() == 0 {
                            *p = Produced::Scalar(n.host().item()?);
                        }
                    }
                }
                Ok(())
            }
            Self::PromoteTypes | Self::HandleDtypeHint | Self::UnsupportedDtypesGuard => Ok(()),
        }
    }
}

fn to_internal_before(cx: &mut CallContext) -> Result<()> {
    if let Some(device) = cx.frame.device {
        cx.backend.check_device(&device)?;
        cx.device = device;
    } else if let Some(device) = cx.frame.operands_mut().find_map(|like| match like {
        ArrayLike::Handle(a) => Some(a.device()),
        ArrayLike::Native(n) => Some(n.device()),
        _ => None,
    }) {
        if cx.backend.valid_devices().contains(&device) {
            cx.device = device;
        }
    }

    let signature = cx.signature;
    let (backend, device, defaults) = (Arc::clone(&cx.backend), cx.device, cx.defaults);
    for (position, value) in cx.frame.args.iter_mut().enumerate() {
        let keep_scalars = signature.promotes(position);
        let items = match value {
            Value::Array(a) => std::slice::from_mut(a),
            Value::Arrays(list) => list.as_mut_slice(),
            _ => continue,
        };
        for like in items {
            if keep_scalars && like.is_scalar() {
                continue;
            }
            *like = ArrayLike::Native(marshal::to_native(like, &backend, &device, &defaults)?);
        }
    }
    if let Some(mask) = &cx.frame.where_mask {
        cx.frame.where_mask = Some(ArrayLike::Native(marshal::to_native(mask, &backend, &device, &defaults)?));
    }
    Ok(())
}

/// Dtypes of the promotable operands, or nothing when the operator does not promote
fn promotion_operands(cx: &CallContext) -> Vec<Operand> {
    let Promote::From(start) = cx.signature.promote else {
        return Vec::new();
    };
    let mut operands = Vec::new();
    for value in cx.frame.args.iter().skip(start) {
        let items = match value {
            Value::Array(a) => std::slice::from_ref(a),
            Value::Arrays(list) => list.as_slice(),
            _ => continue,
        };
        for like in items {
            match like {
                ArrayLike::Native(n) => operands.push(Operand::Array(n.dtype())),
                ArrayLike::Scalar(s) => operands.push(Operand::Scalar(*s)),
                _ => {}
            }
        }
    }
    operands
}

/// Every array operand must cast to the promoted dtype under the active policy
fn check_promotion_casting(cx: &CallContext) -> Result<()> {
    let operands = promotion_operands(cx);
    if operands.is_empty() {
        return Ok(());
    }
    let target = result_type(&operands, &cx.defaults)?;
    let rejected = operands.iter().find_map(|op| match *op {
        Operand::Array(from) if !can_cast(from, target, cx.casting) => Some(from),
        _ => None,
    });
    match rejected {
        Some(from) => Err(Error::CastingNotAllowed {
            from,
            to: target,
            casting: cx.casting,
        }),
        None => Ok(()),
    }
}

fn promote_before(cx: &mut CallContext) -> Result<()> {
    let Promote::From(start) = cx.signature.promote else {
        return Ok(());
    };
    let operands = promotion_operands(cx);
    if operands.is_empty() {
        return Ok(());
    }
    let target = result_type(&operands, &cx.defaults)?;
    let (backend, device) = (Arc::clone(&cx.backend), cx.device);
    for value in cx.frame.args.iter_mut().skip(start) {
        let items = match value {
            Value::Array(a) => std::slice::from_mut(a),
            Value::Arrays(list) => list.as_mut_slice(),
            _ => continue,
        };
        for like in items {
            let promoted = match &*like {
                ArrayLike::Native(n) => ArrayLike::Native(marshal::cast_native(n, target, &backend)),
                ArrayLike::Scalar(s) => {
                    ArrayLike::Native(backend.wrap(HostArray::from_scalar(*s, target), &device))
                }
                _ => continue,
            };
            *like = promoted;
        }
    }
    Ok(())
}

fn produced_host(p: &Produced) -> Result<HostArray> {
    Ok(match p {
        Produced::Native(n) => n.host().into_owned(),
        Produced::Handle(a) => a.to_host(),
        Produced::Scalar(s) => HostArray::from_scalar(*s, s.natural_dtype(&config::defaults())),
    })
}

fn handle_where_after(cx: &mut CallContext, outs: &mut [Produced]) -> Result<()> {
    let (Some(mask), Some(first)) = (&cx.mask, outs.first_mut()) else {
        return Ok(());
    };
    let result = produced_host(first)?;
    let dtype = result.dtype();
    let fallback = match (&cx.frame.out, &cx.fill) {
        (Some(out), _) => out.to_host().astype(dtype),
        (None, Some(fill)) => fill.astype(dtype),
        (None, None) => HostArray::zeros(result.shape().clone(), dtype),
    };
    let shape = broadcast_shapes([result.shape().as_slice(), mask.shape().as_slice()])?;
    let result = result.broadcast_to(&shape)?;
    let mask = mask.broadcast_to(&shape)?;
    let fallback = fallback.broadcast_to(&shape)?;
    let n = shape.numel();
    let (mut re, mut im) = (Vec::with_capacity(n), Vec::with_capacity(n));
    for i in 0..n {
        let (x, y) = if mask.truthy(i) { result.get(i) } else { fallback.get(i) };
        re.push(x);
        im.push(y);
    }
    let blended = HostArray::from_parts(shape, dtype, re, dtype.is_complex().then_some(im))?;
    *first = Produced::Native(cx.backend.wrap(blended, &cx.device));
    Ok(())
}

fn handle_out_after(cx: &mut CallContext, outs: &mut [Produced]) -> Result<()> {
    let (Some(out), Some(first)) = (&cx.frame.out, outs.first_mut()) else {
        return Ok(());
    };
    let native = match &*first {
        Produced::Native(n) if n.dtype() == out.dtype() && n.shape() == out.shape() => n.clone(),
        other => {
            let host = produced_host(other)?;
            let target = out.shape();
            let host = host.broadcast_to(&target).map_err(|_| Error::shape_mismatch(&target, host.shape()))?;
            let placement = out.device();
            let placement = if cx.backend.valid_devices().contains(&placement) {
                placement
            } else {
                cx.device
            };
            cx.backend.wrap(host.astype(out.dtype()), &placement)
        }
    };
    out.assign(native, Arc::clone(&cx.backend));
    *first = Produced::Handle(out.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_names_resolve() {
        for a in FRONTEND_CHAIN {
            assert_eq!(Adapter::from_name(a.name()), Some(*a));
        }
        assert_eq!(Adapter::from_name("handle_nothing"), None);
    }

    #[test]
    fn test_chain_shapes() {
        assert_eq!(UNIFIED_CHAIN[0], Adapter::ToInternalArrays);
        assert!(!UNIFIED_CHAIN.contains(&Adapter::HandleCasting));
        assert!(!UNIFIED_CHAIN.contains(&Adapter::FromZeroDimToScalar));
        assert_eq!(FRONTEND_CHAIN.last(), Some(&Adapter::UnsupportedDtypesGuard));
    }
}
