//! Registering a backend from outside the crate

mod common;

use common::serial;
use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;
use unitensor::backend::{self, BackendDescriptor, Features, NativeArray, NativeRef};
use unitensor::device::{Device, DeviceKind};
use unitensor::dtype::{DType, DTypeSet};
use unitensor::error::{Error, Result};
use unitensor::ops::{Invocation, KernelValue, OpEntry, OpId};
use unitensor::tensor::shape::broadcast_shape;
use unitensor::tensor::HostArray;

const NAME: &str = "ledger";

#[derive(Debug)]
struct LedgerArray {
    data: HostArray,
    device: Device,
}

impl NativeArray for LedgerArray {
    fn backend(&self) -> &'static str {
        NAME
    }

    fn host(&self) -> Cow<'_, HostArray> {
        Cow::Borrowed(&self.data)
    }

    fn device(&self) -> Device {
        self.device
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn wrap(data: HostArray, device: &Device) -> NativeRef {
    Arc::new(LedgerArray { data, device: *device })
}

fn astype(inv: &Invocation<'_>) -> Result<Vec<KernelValue>> {
    let x = inv.host(0)?;
    let dtype = inv.dtype.unwrap_or(x.dtype());
    inv.single(x.astype(dtype))
}

fn zeros_like(inv: &Invocation<'_>) -> Result<Vec<KernelValue>> {
    let x = inv.host(0)?;
    inv.single(HostArray::zeros(x.shape().clone(), inv.dtype_or(x.dtype())))
}

fn to_device(inv: &Invocation<'_>) -> Result<Vec<KernelValue>> {
    let x = inv.host(0)?;
    Ok(vec![KernelValue::Array(inv.backend.wrap(x.into_owned(), &inv.device))])
}

fn where_(inv: &Invocation<'_>) -> Result<Vec<KernelValue>> {
    let (cond, x, y) = (inv.host(0)?, inv.host(1)?, inv.host(2)?);
    if cond.shape() != x.shape() || x.shape() != y.shape() {
        return Err(Error::Backend("ledger where needs equal shapes".into()));
    }
    let out = (0..x.numel())
        .map(|i| if cond.truthy(i) { x.re()[i] } else { y.re()[i] })
        .collect();
    inv.single(HostArray::new(x.shape().clone(), x.dtype(), out)?)
}

fn add(inv: &Invocation<'_>) -> Result<Vec<KernelValue>> {
    let (x, y) = (inv.host(0)?, inv.host(1)?);
    let shape = broadcast_shape(x.shape().as_slice(), y.shape().as_slice())?;
    let (x, y) = (x.broadcast_to(shape.as_slice())?, y.broadcast_to(shape.as_slice())?);
    let out = x.re().iter().zip(y.re()).map(|(a, b)| a + b).collect();
    inv.single(HostArray::new(shape, x.dtype(), out)?)
}

fn ledger() -> Result<BackendDescriptor> {
    BackendDescriptor::builder(NAME, wrap)
        .invalid_dtypes(DTypeSet::HALF)
        .devices(&[Device::cpu()])
        .invalid_device_kinds(&[DeviceKind::Gpu, DeviceKind::Tpu])
        .features(Features::default())
        .exports([
            ("astype", OpEntry::new(astype)),
            ("zeros_like", OpEntry::new(zeros_like)),
            ("to_device", OpEntry::new(to_device)),
            ("where", OpEntry::new(where_)),
            ("add", OpEntry::new(add)),
            ("frobnicate", OpEntry::new(add)),
        ])
        .build()
}

#[test]
fn test_build_requires_core_operators() {
    let err = BackendDescriptor::builder("partial", wrap)
        .bind(OpId::Add, OpEntry::new(add))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::BackendMissingOperator { backend: "partial", .. }), "{err}");
}

#[test]
fn test_build_rejects_contradictory_devices() {
    let err = BackendDescriptor::builder("contradiction", wrap)
        .bind(OpId::Astype, OpEntry::new(astype))
        .bind(OpId::ZerosLike, OpEntry::new(zeros_like))
        .bind(OpId::ToDevice, OpEntry::new(to_device))
        .bind(OpId::Where, OpEntry::new(where_))
        .devices(&[Device::gpu(0)])
        .invalid_device_kinds(&[DeviceKind::Gpu])
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }), "{err}");
}

#[test]
fn test_registered_backend_dispatch() {
    let _g = serial();
    let registered = backend::register(ledger().unwrap());
    assert!(backend::registered().contains(&NAME));
    assert!(!registered.table().contains(OpId::Exp));
    assert!(registered.table().contains(OpId::Add));

    let again = backend::register(ledger().unwrap());
    assert!(Arc::ptr_eq(&registered, &again));

    let _b = backend::scoped_activate(NAME).unwrap();
    let sum = unitensor::add([1.0, 2.0], [10.0, 20.0]).unwrap();
    assert_eq!(sum.backend_name(), NAME);
    assert_eq!(sum.to_f64_vec(), vec![11.0, 22.0]);

    let err = unitensor::exp([1.0]).unwrap_err();
    assert!(matches!(err.root(), Error::BackendMissingOperator { backend: NAME, .. }), "{err}");
}

#[test]
fn test_registered_backend_substitutes_half() {
    let _g = serial();
    backend::register(ledger().unwrap());
    let _b = backend::scoped_activate(NAME).unwrap();
    unitensor::ops::take_substitutions();

    let x = unitensor::asarray([1.0, 2.0], Some(DType::F32)).unwrap();
    let y = unitensor::add_with(&x, 1.0, &unitensor::Opts::default().dtype(DType::F16)).unwrap();
    assert_ne!(y.dtype(), DType::F16);
    assert_eq!(y.to_f64_vec(), vec![2.0, 3.0]);
    let log = unitensor::ops::take_substitutions();
    assert!(log.iter().any(|s| s.from == DType::F16 && s.backend == NAME), "{log:?}");
}
