//! The same operator on every builtin backend agrees with numpy-like

mod common;

use common::{assert_allclose_f64, on_backend, BACKENDS};
use unitensor::backend;
use unitensor::dtype::DType;
use unitensor::error::Result;
use unitensor::ops::OpId;
use unitensor::tensor::Array;

const REFERENCE: &str = "numpy-like";

fn x() -> Result<Array> {
    unitensor::asarray([[0.5f32, -1.0, 2.0], [3.0, 0.25, -0.75]], Some(DType::F32))
}

fn square() -> Result<Array> {
    unitensor::asarray([[4.0f32, 1.0], [2.0, 3.0]], Some(DType::F32))
}

type Case = (&'static str, Option<OpId>, fn() -> Result<Array>);

fn cases() -> Vec<Case> {
    let cases: &[Case] = &[
        ("add", None, || unitensor::add(x()?, 1.5)),
        ("multiply_broadcast", None, || unitensor::multiply(x()?, [2.0f32, 3.0, 4.0])),
        ("exp", None, || unitensor::exp(x()?)),
        ("tanh", None, || unitensor::tanh(x()?)),
        ("sum_axis", None, || unitensor::sum(x()?, Some(&[1][..]), false)),
        ("mean", None, || unitensor::mean(x()?, None, false)),
        ("var", None, || unitensor::var(x()?, Some(&[0][..]), 1.0, false)),
        ("max_keepdims", None, || unitensor::max(x()?, Some(&[-1][..]), true)),
        ("cumsum", None, || unitensor::cumsum(x()?, Some(1), None)),
        ("matmul", None, || unitensor::matmul(x()?, unitensor::matrix_transpose(x()?)?)),
        ("softmax", None, || unitensor::softmax(x()?, Some(-1))),
        ("sort", None, || unitensor::sort(x()?, -1, false, true)),
        ("flip", None, || unitensor::flip(x()?, None)),
        ("det", None, || unitensor::det(square()?)),
        ("inv", None, || unitensor::inv(square()?, false)),
        ("solve", None, || unitensor::solve(square()?, [1.0f32, 2.0])),
        ("median", Some(OpId::Median), || unitensor::median(x()?, None, false)),
    ];
    cases.to_vec()
}

fn run(name: &str, case: fn() -> Result<Array>) -> Array {
    case().unwrap_or_else(|e| panic!("{name}: {e}"))
}

#[test]
fn test_operators_agree_across_backends() {
    for (name, requires, case) in cases() {
        let expected = {
            let _b = on_backend(REFERENCE);
            run(name, case)
        };
        for &backend_name in BACKENDS {
            let _b = on_backend(backend_name);
            if let Some(op) = requires {
                if !backend::current().unwrap().has_operator(op) {
                    continue;
                }
            }
            let got = run(name, case);
            assert_eq!(got.shape(), expected.shape(), "{name} on {backend_name}");
            assert_allclose_f64(
                &got.to_f64_vec(),
                &expected.to_f64_vec(),
                1e-5,
                1e-6,
                &format!("{name} on {backend_name}"),
            );
        }
    }
}

#[test]
fn test_results_are_handles_of_the_active_backend() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        let a = x().unwrap();
        assert_eq!(a.backend_name(), name);

        let parts = unitensor::split(&a, unitensor::Sections::Equal(3), 1).unwrap();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.backend_name() == name));

        let unique = unitensor::unique_all([3, 1, 3]).unwrap();
        for part in [&unique.values, &unique.indices, &unique.inverse_indices, &unique.counts] {
            assert_eq!(part.backend_name(), name);
        }

        let nz = unitensor::nonzero([[0, 1], [1, 0]]).unwrap();
        assert_eq!(nz.len(), 2);
        assert!(nz.iter().all(|p| p.backend_name() == name));
    }
}

#[test]
fn test_handles_migrate_to_the_active_backend() {
    let a = {
        let _b = on_backend("tensor-train");
        unitensor::asarray([1.0f32, 2.0], None).unwrap()
    };
    let _b = on_backend("numpy-like");
    let b = unitensor::add(&a, 1.0).unwrap();
    assert_eq!(b.backend_name(), "numpy-like");
    assert_eq!(b.to_vec::<f32>(), vec![2.0, 3.0]);
}

#[test]
fn test_invalid_dtypes_are_substituted() {
    let _b = on_backend("accelerator-numeric");
    let _ = unitensor::ops::take_substitutions();
    let a = unitensor::asarray([1.0f64, 2.0], Some(DType::F64)).unwrap();
    assert_eq!(a.dtype(), DType::F32);

    let y = unitensor::add_with([1.0f32, 2.0], [3.0f32, 4.0], &unitensor::Opts::default().dtype(DType::F64)).unwrap();
    assert_eq!(y.dtype(), DType::F32);
    let log = unitensor::ops::take_substitutions();
    assert!(log.iter().any(|s| s.from == DType::F64 && s.to == DType::F32 && s.backend == "accelerator-numeric"));
}

#[test]
fn test_strict_dtype_rejects_substitution() {
    let _b = on_backend("accelerator-numeric");
    let err = unitensor::add_with([1.0f32], [2.0f32], &unitensor::Opts::default().dtype(DType::F64).strict())
        .unwrap_err();
    assert!(matches!(err.root(), unitensor::error::Error::DtypeUnsupported { dtype: DType::F64, .. }));
}
