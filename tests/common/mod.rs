//! Common test utilities
#![allow(dead_code)]

use parking_lot::{Mutex, MutexGuard};
use unitensor::backend::{self, ScopedBackend};

/// Backend activation, configuration and frontend versions are
/// process-wide, so tests touching them run one at a time.
static SERIAL: Mutex<()> = parking_lot::const_mutex(());

/// Every builtin backend
pub const BACKENDS: &[&str] = backend::BUILTIN;

/// Holds the serialisation lock and a scoped backend activation.
///
/// Fields drop in order: the backend is restored before the lock is
/// released.
pub struct OnBackend {
    _backend: ScopedBackend,
    _serial: MutexGuard<'static, ()>,
}

/// Take the serialisation lock and activate `name` until the guard drops
pub fn on_backend(name: &str) -> OnBackend {
    let serial = SERIAL.lock();
    init_tracing();
    let backend = backend::scoped_activate(name).expect("builtin backend must activate");
    OnBackend {
        _backend: backend,
        _serial: serial,
    }
}

/// Take the serialisation lock without changing the backend
pub fn serial() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock();
    init_tracing();
    guard
}

/// Install a test-writer subscriber once; `RUST_LOG` selects the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}
