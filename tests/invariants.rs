//! Properties that hold for every operator and backend

mod common;

use common::{on_backend, serial, BACKENDS};
use unitensor::backend;
use unitensor::dtype::{promote_types, DType};
use unitensor::frontends::version::{route, Library, VersionRange, Versioned};
use unitensor::Sections;

// ============================================================================
// Shape contract
// ============================================================================

#[test]
fn test_broadcasting_shapes() {
    let _b = on_backend("numpy-like");
    let a = unitensor::ones(&[2, 1, 3], None).unwrap();
    let b = unitensor::ones(&[4, 3], None).unwrap();
    assert_eq!(unitensor::add(&a, &b).unwrap().shape().as_slice(), &[2, 4, 3]);
    assert_eq!(unitensor::multiply(&a, 2.0).unwrap().shape().as_slice(), &[2, 1, 3]);

    let c = unitensor::ones(&[2, 3], None).unwrap();
    let err = unitensor::add(&b, &c).unwrap_err();
    assert!(err.root().is_shape_error(), "{err}");
}

#[test]
fn test_reduction_keepdims_shapes() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        let x = unitensor::ones(&[2, 3, 4], None).unwrap();
        let cases: &[(Option<&[isize]>, bool, &[usize])] = &[
            (None, false, &[]),
            (None, true, &[1, 1, 1]),
            (Some(&[1][..]), false, &[2, 4]),
            (Some(&[1][..]), true, &[2, 1, 4]),
            (Some(&[0, -1][..]), false, &[3]),
            (Some(&[0, -1][..]), true, &[1, 3, 1]),
        ];
        for &(axis, keepdims, expected) in cases {
            let s = unitensor::sum(&x, axis, keepdims).unwrap();
            assert_eq!(s.shape().as_slice(), expected, "{name} sum {axis:?} keepdims={keepdims}");
            let m = unitensor::mean(&x, axis, keepdims).unwrap();
            assert_eq!(m.shape().as_slice(), expected, "{name} mean {axis:?} keepdims={keepdims}");
        }
        let i = unitensor::argmax(&x, Some(2), true).unwrap();
        assert_eq!(i.shape().as_slice(), &[2, 3, 1]);
    }
}

#[test]
fn test_reshape_infers_one_dimension() {
    let _b = on_backend("numpy-like");
    let x = unitensor::arange(0, 24, 1, None).unwrap();
    assert_eq!(unitensor::reshape(&x, &[2, -1, 4]).unwrap().shape().as_slice(), &[2, 3, 4]);
    assert!(unitensor::reshape(&x, &[5, -1]).is_err());
    assert!(unitensor::reshape(&x, &[-1, -1]).is_err());
}

// ============================================================================
// Activation restoration
// ============================================================================

#[test]
fn test_nested_scoped_activation_unwinds_in_order() {
    let _s = serial();
    let outer = backend::scoped_activate("numpy-like").unwrap();
    {
        let _a = backend::scoped_activate("tensor-train").unwrap();
        {
            let _b = backend::scoped_activate("accelerator-numeric").unwrap();
            assert_eq!(backend::current_name(), Some("accelerator-numeric"));
        }
        assert_eq!(backend::current_name(), Some("tensor-train"));
    }
    assert_eq!(backend::current_name(), Some("numpy-like"));
    assert_eq!(outer.name(), "numpy-like");
}

#[test]
fn test_set_backend_history() {
    let _s = serial();
    let _outer = backend::scoped_activate("numpy-like").unwrap();
    backend::set_backend("tensor-train").unwrap();
    backend::set_backend("autograd-tracer").unwrap();
    assert_eq!(backend::current_name(), Some("autograd-tracer"));

    let popped = backend::previous_backend().unwrap();
    assert_eq!(popped.name(), "autograd-tracer");
    assert_eq!(backend::current_name(), Some("tensor-train"));
    backend::previous_backend().unwrap();
    assert_eq!(backend::current_name(), Some("numpy-like"));
    assert!(backend::previous_backend().is_none());
}

#[test]
fn test_with_backend_and_unknown_names() {
    let _s = serial();
    let _outer = backend::scoped_activate("numpy-like").unwrap();
    let inner = backend::with_backend("tensor-train", backend::current_name).unwrap();
    assert_eq!(inner, Some("tensor-train"));
    assert_eq!(backend::current_name(), Some("numpy-like"));

    let err = backend::scoped_activate("no-such-backend").unwrap_err();
    assert!(matches!(err, unitensor::error::Error::BackendNotRegistered { .. }));
    assert_eq!(backend::current_name(), Some("numpy-like"));
}

#[test]
fn test_unset_backend_activates_configured_on_first_call() {
    let _s = serial();
    let _outer = backend::scoped_activate("tensor-train").unwrap();
    backend::unset_backend();
    assert_eq!(backend::current_name(), None);
    let x = unitensor::zeros(&[2], None).unwrap();
    assert_eq!(x.backend_name(), unitensor::config::get().backend);
    assert!(backend::current_name().is_some());
}

// ============================================================================
// Promotion
// ============================================================================

#[test]
fn test_promotion_is_idempotent_and_symmetric() {
    for a in DType::ALL {
        for b in DType::ALL {
            let ab = promote_types(a, b);
            assert_eq!(promote_types(ab, b), ab, "{a} {b}");
            assert_eq!(promote_types(b, a), ab, "{a} {b}");
            assert_eq!(promote_types(a, a), a);
        }
    }
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_reshape_round_trip() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        let x = unitensor::reshape(unitensor::arange(0, 24, 1, None).unwrap(), &[2, 3, 4]).unwrap();
        let flat = unitensor::reshape(&x, &[6, 4]).unwrap();
        let back = unitensor::reshape(&flat, &[2, 3, 4]).unwrap();
        assert_eq!(back.shape(), x.shape());
        assert_eq!(back.to_vec::<i64>(), x.to_vec::<i64>());
    }
}

#[test]
fn test_permute_round_trip() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        let x = unitensor::reshape(unitensor::arange(0, 24, 1, None).unwrap(), &[2, 3, 4]).unwrap();
        let p: &[isize] = &[2, 0, 1];
        let inverse: &[isize] = &[1, 2, 0];
        let t = unitensor::permute_dims(&x, Some(p)).unwrap();
        assert_eq!(t.shape().as_slice(), &[4, 2, 3]);
        let back = unitensor::permute_dims(&t, Some(inverse)).unwrap();
        assert_eq!(back.shape(), x.shape());
        assert_eq!(back.to_vec::<i64>(), x.to_vec::<i64>());
    }
}

#[test]
fn test_split_concat_round_trip() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        let x = unitensor::reshape(unitensor::arange(0, 24, 1, None).unwrap(), &[4, 6]).unwrap();
        for axis in [0isize, 1] {
            let parts = unitensor::split(&x, Sections::Equal(2), axis).unwrap();
            let back = unitensor::concat(&parts, Some(axis)).unwrap();
            assert_eq!(back.to_vec::<i64>(), x.to_vec::<i64>());
        }
        let parts = unitensor::split(&x, Sections::At(vec![1, 4]), 1).unwrap();
        let widths: Vec<usize> = parts.iter().map(|p| p.shape()[1]).collect();
        assert_eq!(widths, vec![1, 3, 2]);
        let back = unitensor::concat(&parts, Some(1)).unwrap();
        assert_eq!(back.to_vec::<i64>(), x.to_vec::<i64>());

        assert!(unitensor::split(&x, Sections::Equal(4), 1).is_err());
    }
}

// ============================================================================
// Sorting and searching
// ============================================================================

#[test]
fn test_stable_sort_keeps_equal_keys_in_order() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        let keys = [2, 1, 2, 1];
        let up = unitensor::argsort(keys, -1, false, true).unwrap();
        assert_eq!(up.to_vec::<i64>(), vec![1, 3, 0, 2], "{name}");
        let down = unitensor::argsort(keys, -1, true, true).unwrap();
        assert_eq!(down.to_vec::<i64>(), vec![0, 2, 1, 3], "{name}");

        let rows = unitensor::argsort([[3, 3, 1], [0, 5, 0]], 1, false, true).unwrap();
        assert_eq!(rows.to_vec::<i64>(), vec![2, 0, 1, 0, 2, 1], "{name}");
    }
}

#[test]
fn test_unstable_sort_leaf_is_observable_without_stable() {
    let _b = on_backend("accelerator-numeric");
    let idx = unitensor::argsort([2, 1, 2, 1], -1, false, false).unwrap();
    assert_eq!(idx.to_vec::<i64>(), vec![3, 1, 2, 0]);
    let sorted = unitensor::sort([2, 1, 2, 1], -1, false, false).unwrap();
    assert_eq!(sorted.to_vec::<i64>(), vec![1, 1, 2, 2]);
}

#[test]
fn test_argmax_argmin_pick_first_extreme() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        let x = [[1, 5, 5], [7, 0, 7]];
        assert_eq!(unitensor::argmax(x, None, false).unwrap().item().unwrap().as_i64(), 3, "{name}");
        assert_eq!(unitensor::argmin(x, None, false).unwrap().item().unwrap().as_i64(), 4, "{name}");
        assert_eq!(unitensor::argmax(x, Some(1), false).unwrap().to_vec::<i64>(), vec![1, 0], "{name}");
        assert_eq!(unitensor::argmin(x, Some(0), false).unwrap().to_vec::<i64>(), vec![0, 1, 0], "{name}");
        assert_eq!(unitensor::argmin([f64::NAN, 1.0, f64::NAN], None, false).unwrap().item().unwrap().as_i64(), 0);
    }
}

// ============================================================================
// Version routing
// ============================================================================

static RANGE_LIB: Library = Library {
    name: "range-lib",
    env: "UNITENSOR_RANGE_LIB_VERSION",
    pinned: "2.5",
};

type Pick = fn() -> u8;

fn one() -> u8 {
    1
}

fn two() -> u8 {
    2
}

fn three() -> u8 {
    3
}

static PICK: Versioned<Pick> = Versioned {
    canonical: "pick",
    library: &RANGE_LIB,
    symbols: &[
        ("pick_v_1p9_and_below", one as Pick),
        ("pick_v_2p0_to_2p3", two as Pick),
        ("pick_v_2p2_and_above", three as Pick),
    ],
};

#[test]
fn test_canonical_binds_iff_version_in_range() {
    let _s = serial();
    let symbols = ["pick_v_1p9_and_below", "pick_v_2p0_to_2p3", "pick_v_2p2_and_above"];
    for major in 1..=3u64 {
        for minor in 0..=9u64 {
            let version = format!("{major}.{minor}");
            let number = major * 10 + minor;
            RANGE_LIB.set_version(Some(&version)).unwrap();
            let bound = PICK.resolve().unwrap()();
            let expected = if number <= 19 {
                1
            } else if (20..=23).contains(&number) {
                2
            } else {
                3
            };
            assert_eq!(bound, expected, "{version}");

            let routed = route(symbols, number);
            assert_eq!(routed.len(), 1, "{version}");
            let (_, tagged) = routed[0];
            let (_, range) = unitensor::frontends::version::parse_tag(tagged).unwrap();
            assert!(range.contains(number));
        }
    }
    RANGE_LIB.set_version(None).unwrap();
    assert_eq!(PICK.resolve().unwrap()(), 3);
    assert!(RANGE_LIB.set_version(Some("next")).is_err());
}

#[test]
fn test_uncovered_version_is_unsupported() {
    let _s = serial();
    static GAP_LIB: Library = Library {
        name: "gap-lib",
        env: "UNITENSOR_GAP_LIB_VERSION",
        pinned: "1.5",
    };
    static GAP: Versioned<Pick> = Versioned {
        canonical: "gap",
        library: &GAP_LIB,
        symbols: &[("gap_v_1p0_to_1p2", one as Pick), ("gap_v_1p8_and_above", two as Pick)],
    };
    let err = GAP.resolve().unwrap_err();
    assert!(matches!(err, unitensor::error::Error::VersionUnsupported { .. }), "{err}");
    assert_eq!(GAP.get("gap_v_1p0_to_1p2").unwrap()(), 1);
    assert!(VersionRange::Between(10, 12).contains(12));
    assert!(!VersionRange::Between(10, 12).contains(13));
}
