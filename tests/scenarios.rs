//! End-to-end scenarios through the unified surface

mod common;

use common::{on_backend, serial, BACKENDS};
use unitensor::backend;
use unitensor::dtype::{DType, Scalar};
use unitensor::error::{Error, Result};
use unitensor::frontends::version::{Library, Versioned};
use unitensor::Opts;

#[test]
fn test_matmul_lifts_vectors() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        let a = unitensor::asarray([[1.0f32, 2.0], [3.0, 4.0]], Some(DType::F32)).unwrap();

        let v = unitensor::matmul(&a, [5.0f32, 6.0]).unwrap();
        assert_eq!(v.shape().as_slice(), &[2], "{name}");
        assert_eq!(v.to_vec::<f32>(), vec![17.0, 39.0], "{name}");

        let col = unitensor::matmul(&a, [[5.0f32], [6.0]]).unwrap();
        assert_eq!(col.shape().as_slice(), &[2, 1], "{name}");
        assert_eq!(col.to_vec::<f32>(), vec![17.0, 39.0], "{name}");
    }
}

#[test]
fn test_diag_places_offset_diagonal() {
    let _b = on_backend("numpy-like");
    let d = unitensor::diag_padded([1, 2, 3], 1, None, None, 0).unwrap();
    assert_eq!(d.shape().as_slice(), &[3, 3]);
    assert_eq!(d.to_vec::<i64>(), vec![0, 1, 0, 0, 0, 2, 0, 0, 0]);
}

#[test]
fn test_argmax_first_index_wins() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        let i = unitensor::argmax([3, 1, 3, 3], None, false).unwrap();
        assert_eq!(i.ndim(), 0);
        assert_eq!(i.item().unwrap(), Scalar::Int(0), "{name}");
    }
}

#[test]
fn test_scoped_activation_restores_on_error() {
    let _s = serial();
    let _outer = backend::scoped_activate("numpy-like").unwrap();

    let failed: Result<()> = (|| {
        let _inner = backend::scoped_activate("tensor-train")?;
        assert_eq!(backend::current_name(), Some("tensor-train"));
        Err(Error::Backend("boom".into()))
    })();
    assert!(failed.is_err());
    assert_eq!(backend::current_name(), Some("numpy-like"));

    let panicked = std::panic::catch_unwind(|| {
        let _inner = backend::scoped_activate("accelerator-numeric").unwrap();
        panic!("boom");
    });
    assert!(panicked.is_err());
    assert_eq!(backend::current_name(), Some("numpy-like"));
}

static FOO_LIB: Library = Library {
    name: "scenario-lib",
    env: "UNITENSOR_SCENARIO_LIB_VERSION",
    pinned: "1.12",
};

fn foo_v_1p11_and_below() -> &'static str {
    "old"
}

fn foo_v_1p12_and_above() -> &'static str {
    "new"
}

type FooFn = fn() -> &'static str;

static FOO: Versioned<FooFn> = Versioned {
    canonical: "foo",
    library: &FOO_LIB,
    symbols: &[
        ("foo_v_1p11_and_below", foo_v_1p11_and_below as FooFn),
        ("foo_v_1p12_and_above", foo_v_1p12_and_above as FooFn),
    ],
};

#[test]
fn test_version_routing_binds_matching_alias() {
    let _s = serial();
    FOO_LIB.set_version(Some("1.12")).unwrap();
    assert_eq!(FOO.resolve().unwrap()(), "new");
    assert_eq!(FOO.get("foo_v_1p11_and_below").unwrap()(), "old");

    FOO_LIB.set_version(Some("1.10")).unwrap();
    assert_eq!(FOO.resolve().unwrap()(), "old");

    FOO_LIB.set_version(None).unwrap();
    assert_eq!(FOO.resolve().unwrap()(), "new");
}

#[test]
fn test_where_blends_with_out() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        let out = unitensor::asarray([0, 0, 0, 0], None).unwrap();
        let opts = Opts::default().out(&out).where_mask([true, false, true, false]);
        let r = unitensor::add_with([1, 2, 3, 4], [10, 20, 30, 40], &opts).unwrap();
        assert!(r.same_handle(&out), "{name}");
        assert_eq!(out.to_vec::<i64>(), vec![11, 0, 33, 0], "{name}");
    }
}
