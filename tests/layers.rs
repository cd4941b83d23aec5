//! Layers, linear algebra options, counting, gradients, sampling and
//! configuration.

mod common;

use common::{assert_allclose_f64, on_backend, BACKENDS};
use unitensor::api::Padding;
use unitensor::config::{self, Config};
use unitensor::dtype::DType;
use unitensor::error::Error;
use unitensor::ops::{call_by_name, Value};
use unitensor::tensor::{Array, ArrayLike};

fn image(h: usize, w: usize) -> Array {
    let flat = unitensor::arange(0.0, (h * w) as f64, 1.0, Some(DType::F32)).unwrap();
    unitensor::reshape(&flat, &[1, 1, h as i64, w as i64]).unwrap()
}

fn conv_on(backend: &str, strides: &[usize], padding: &Padding, dilations: &[usize]) -> (Vec<usize>, Vec<f64>) {
    let _b = on_backend(backend);
    let x = image(5, 5);
    let w = unitensor::reshape(unitensor::asarray([1.0, 2.0, -1.0, 0.5], Some(DType::F32)).unwrap(), &[1, 1, 2, 2]).unwrap();
    let y = unitensor::conv(&x, &w, strides, padding, dilations).unwrap();
    (y.shape().to_vec(), y.to_f64_vec())
}

#[test]
fn test_conv_valid_window_sums() {
    let _b = on_backend("numpy-like");
    let x = image(4, 4);
    let w = unitensor::ones(&[1, 1, 2, 2], Some(DType::F32)).unwrap();
    let y = unitensor::conv(&x, &w, &[1], &Padding::Valid, &[1]).unwrap();
    assert_eq!(y.shape().to_vec(), vec![1, 1, 3, 3]);
    let expected: Vec<f64> = (0..3)
        .flat_map(|i| (0..3).map(move |j| (16 * i + 4 * j + 10) as f64))
        .collect();
    assert_eq!(y.to_f64_vec(), expected);
}

#[test]
fn test_conv_windows_match_native() {
    let cases = [
        (vec![1], Padding::Valid, vec![1]),
        (vec![2], Padding::Valid, vec![1]),
        (vec![1], Padding::Same, vec![1]),
        (vec![2, 1], Padding::Same, vec![1]),
        (vec![1], Padding::Valid, vec![2]),
        (vec![1], Padding::Explicit(vec![(1, 0), (0, 2)]), vec![1]),
        (vec![2], Padding::Explicit(vec![(1, 1), (1, 1)]), vec![2, 1]),
    ];
    for (strides, padding, dilations) in &cases {
        let (shape_w, windows) = conv_on("numpy-like", strides, padding, dilations);
        let (shape_n, native) = conv_on("autograd-tracer", strides, padding, dilations);
        let label = format!("strides {strides:?} padding {padding:?} dilations {dilations:?}");
        assert_eq!(shape_w, shape_n, "{label}");
        assert_allclose_f64(&windows, &native, 1e-5, 1e-5, &label);
    }
}

#[test]
fn test_conv_rejects_mismatched_channels() {
    let _b = on_backend("numpy-like");
    let x = image(3, 3);
    let w = unitensor::ones(&[1, 2, 2, 2], Some(DType::F32)).unwrap();
    assert!(unitensor::conv(&x, &w, &[1], &Padding::Valid, &[1]).is_err());
}

#[test]
fn test_linear() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        let x = unitensor::asarray([[1.0, 2.0, 3.0]], None).unwrap();
        let w = unitensor::asarray([[1.0, 1.0, 1.0], [0.0, 1.0, 0.0]], None).unwrap();
        let plain = unitensor::linear(&x, &w, None::<Array>).unwrap();
        assert_eq!(plain.shape().to_vec(), vec![1, 2], "{name}");
        assert_eq!(plain.to_f64_vec(), vec![6.0, 2.0], "{name}");
        let biased = unitensor::linear(&x, &w, Some([1.0, -1.0])).unwrap();
        assert_eq!(biased.to_f64_vec(), vec![7.0, 1.0], "{name}");
    }
}

#[test]
fn test_layer_norm() {
    let _b = on_backend("numpy-like");
    let x = unitensor::asarray([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]], None).unwrap();
    let z = 1.224_744_9;

    let y = unitensor::layer_norm(&x, 1, None::<Array>, None::<Array>, 1e-5).unwrap();
    assert_allclose_f64(&y.to_f64_vec(), &[-z, 0.0, z, -z, 0.0, z], 1e-4, 1e-4, "layer_norm");

    let y = unitensor::layer_norm(&x, 1, Some([2.0, 2.0, 2.0]), Some([1.0, 1.0, 1.0]), 1e-5).unwrap();
    assert_allclose_f64(
        &y.to_f64_vec(),
        &[1.0 - 2.0 * z, 1.0, 1.0 + 2.0 * z, 1.0 - 2.0 * z, 1.0, 1.0 + 2.0 * z],
        1e-4,
        1e-4,
        "layer_norm affine",
    );

    let whole = unitensor::layer_norm(&x, 2, None::<Array>, None::<Array>, 1e-5).unwrap();
    assert_allclose_f64(&[unitensor::mean(&whole, None, false).unwrap().item().unwrap().as_f64()], &[0.0], 0.0, 1e-5, "mean");

    assert!(unitensor::layer_norm(&x, 3, None::<Array>, None::<Array>, 1e-5).is_err());
}

#[test]
fn test_batch_norm() {
    let _b = on_backend("tensor-train");
    let x = unitensor::asarray([[1.0, 2.0], [3.0, 4.0]], None).unwrap();

    let y = unitensor::batch_norm(&x, None, None::<Array>, None::<Array>, 1e-6).unwrap();
    assert_allclose_f64(&y.to_f64_vec(), &[-1.0, -1.0, 1.0, 1.0], 1e-4, 1e-4, "batch stats");

    let running = (
        unitensor::asarray([1.0, 2.0], None).unwrap(),
        unitensor::asarray([4.0, 4.0], None).unwrap(),
    );
    let y = unitensor::batch_norm(&x, Some(running), Some([1.0, 10.0]), None::<Array>, 0.0).unwrap();
    assert_allclose_f64(&y.to_f64_vec(), &[0.0, 0.0, 1.0, 10.0], 1e-5, 1e-5, "running stats");

    assert!(unitensor::batch_norm([1.0, 2.0], None, None::<Array>, None::<Array>, 1e-5).is_err());
}

#[test]
fn test_attention() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        let q = unitensor::zeros(&[1, 2], None).unwrap();
        let k = unitensor::asarray([[1.0, 0.0], [0.0, 1.0]], None).unwrap();
        let v = unitensor::asarray([[1.0, 2.0], [5.0, 6.0]], None).unwrap();

        let y = unitensor::scaled_dot_product_attention(&q, &k, &v, None::<Array>, None).unwrap();
        assert_allclose_f64(&y.to_f64_vec(), &[3.0, 4.0], 1e-5, 1e-5, name);

        let y = unitensor::scaled_dot_product_attention(&q, &k, &v, Some([[true, false]]), None).unwrap();
        assert_allclose_f64(&y.to_f64_vec(), &[1.0, 2.0], 1e-5, 1e-5, name);
    }
}

#[test]
fn test_bincount() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        let x = unitensor::asarray([0, 1, 1, 3], None).unwrap();

        let counts = unitensor::bincount(&x, None::<Array>, 0).unwrap();
        assert!(counts.dtype().is_int(), "{name}");
        assert_eq!(counts.to_f64_vec(), vec![1.0, 2.0, 0.0, 1.0], "{name}");

        let padded = unitensor::bincount(&x, None::<Array>, 6).unwrap();
        assert_eq!(padded.to_f64_vec(), vec![1.0, 2.0, 0.0, 1.0, 0.0, 0.0], "{name}");

        let weighted = unitensor::bincount(&x, Some([0.5, 1.0, 1.0, 2.0]), 0).unwrap();
        assert_eq!(weighted.to_f64_vec(), vec![0.5, 2.0, 0.0, 2.0], "{name}");

        assert!(unitensor::bincount([-1, 2], None::<Array>, 0).is_err(), "{name}");
        assert!(unitensor::bincount([0.5, 1.0], None::<Array>, 0).is_err(), "{name}");
    }
}

fn sum_of_squares(x: &Array) -> unitensor::error::Result<Array> {
    unitensor::sum(unitensor::multiply(x, x)?, None, false)
}

#[test]
fn test_value_and_grad() {
    let _b = on_backend("autograd-tracer");
    let x = unitensor::asarray([1.0, 2.0, 3.0], Some(DType::F64)).unwrap();
    let (value, grad) = unitensor::value_and_grad(sum_of_squares, &x).unwrap();
    assert_allclose_f64(&[value.item().unwrap().as_f64()], &[14.0], 1e-9, 0.0, "value");
    assert_eq!(grad.shape().to_vec(), vec![3]);
    assert_eq!(grad.dtype(), DType::F64);
    assert_allclose_f64(&grad.to_f64_vec(), &[2.0, 4.0, 6.0], 0.0, 1e-4, "grad");

    let vector_valued = unitensor::grad(|x: &Array| unitensor::multiply(x, 2.0), &x);
    assert!(vector_valued.is_err());
}

#[test]
fn test_gradients_need_support() {
    let _b = on_backend("numpy-like");
    let err = unitensor::grad(sum_of_squares, [1.0, 2.0]).unwrap_err();
    assert!(matches!(err.root(), Error::BackendMissingOperator { .. }), "{err}");

    let v = unitensor::variable([1.0, 2.0]).unwrap();
    assert!(!unitensor::is_variable(&v));
}

#[test]
fn test_variable_marking() {
    let _b = on_backend("autograd-tracer");
    let v = unitensor::variable([1.0, 2.0]).unwrap();
    assert!(unitensor::is_variable(&v));
    let detached = unitensor::stop_gradient(&v).unwrap();
    assert!(!unitensor::is_variable(&detached));
    assert_eq!(detached.to_f64_vec(), v.to_f64_vec());
}

#[test]
fn test_inv_singular() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        let singular = unitensor::asarray([[1.0, 2.0], [2.0, 4.0]], None).unwrap();
        let err = unitensor::inv(&singular, false).unwrap_err();
        assert!(matches!(err.root(), Error::NumericalFailure { .. }), "{name}: {err}");

        let passthrough = unitensor::inv(&singular, true).unwrap();
        assert_eq!(passthrough.to_f64_vec(), vec![1.0, 2.0, 2.0, 4.0], "{name}");

        let regular = unitensor::inv([[4.0, 7.0], [2.0, 6.0]], false).unwrap();
        assert_allclose_f64(&regular.to_f64_vec(), &[0.6, -0.7, -0.2, 0.4], 1e-5, 1e-6, name);
    }
}

#[test]
fn test_matrix_rank_tolerances() {
    let _b = on_backend("numpy-like");
    let x = unitensor::asarray([[1.0, 0.0], [0.0, 1e-3]], Some(DType::F64)).unwrap();
    let rank = |atol, rtol| unitensor::matrix_rank(&x, atol, rtol).unwrap().item().unwrap().as_i64();
    assert_eq!(rank(None, None), 2);
    assert_eq!(rank(Some(1e-2), None), 1);
    assert_eq!(rank(None, Some(1e-4)), 2);
    assert_eq!(rank(Some(1e-2), Some(1e-4)), 1);
    assert_eq!(rank(Some(1e-4), Some(1e-2)), 1);
}

#[test]
fn test_cumsum_dtypes() {
    let _b = on_backend("numpy-like");
    let flags = unitensor::cumsum([true, false, true], None, None).unwrap();
    assert_eq!(flags.dtype(), config::defaults().int);
    assert_eq!(flags.to_f64_vec(), vec![1.0, 1.0, 2.0]);

    let narrow = unitensor::asarray([1, 2, 3], Some(DType::I32)).unwrap();
    let summed = unitensor::cumsum(&narrow, None, None).unwrap();
    assert_eq!(summed.dtype(), DType::I32);
    assert_eq!(summed.to_f64_vec(), vec![1.0, 3.0, 6.0]);

    let rows = unitensor::cumsum([[1, 2], [3, 4]], Some(0), None).unwrap();
    assert_eq!(rows.to_f64_vec(), vec![1.0, 2.0, 4.0, 6.0]);
}

#[test]
fn test_seed_reproducible() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        unitensor::seed(7).unwrap();
        let a = unitensor::random_uniform(-1.0, 1.0, &[32], None).unwrap();
        unitensor::seed(7).unwrap();
        let b = unitensor::random_uniform(-1.0, 1.0, &[32], None).unwrap();
        assert_eq!(a.to_f64_vec(), b.to_f64_vec(), "{name}");
        assert!(a.to_f64_vec().iter().all(|v| (-1.0..1.0).contains(v)), "{name}");
    }
}

#[test]
fn test_sampling_ranges() {
    let _b = on_backend("numpy-like");
    unitensor::seed(11).unwrap();

    let ints = unitensor::randint(2, 5, &[200], None).unwrap();
    assert_eq!(ints.dtype(), config::defaults().int);
    assert!(ints.to_f64_vec().iter().all(|&v| (2.0..5.0).contains(&v)));
    assert!(unitensor::randint(3, 3, &[1], None).is_err());

    let normal = unitensor::random_normal(10.0, 0.5, &[2, 3], Some(DType::F64)).unwrap();
    assert_eq!(normal.shape().to_vec(), vec![2, 3]);
    assert_eq!(normal.dtype(), DType::F64);

    let x = unitensor::arange(0, 10, 1, None).unwrap();
    let shuffled = unitensor::shuffle(&x, 0).unwrap();
    let mut values = shuffled.to_f64_vec();
    values.sort_by(f64::total_cmp);
    assert_eq!(values, x.to_f64_vec());
}

#[test]
fn test_config_deserialize() {
    let config: Config = serde_json::from_str(r#"{"default_dtype": "float64", "backend": "tensor-train"}"#).unwrap();
    assert_eq!(config.default_dtype, DType::F64);
    assert_eq!(config.backend, "tensor-train");
    assert_eq!(config.default_int_dtype, Config::default().default_int_dtype);

    let config: Config = serde_json::from_str(r#"{"default_device": "gpu:1", "casting": "unsafe"}"#).unwrap();
    assert_eq!(config.default_device, unitensor::device::Device::gpu(1));
    assert_eq!(config.casting, unitensor::dtype::Casting::Unsafe);

    assert!(serde_json::from_str::<Config>(r#"{"dtype": "float64"}"#).is_err());
    assert!(serde_json::from_str::<Config>(r#"{"default_dtype": "float99"}"#).is_err());
}

#[test]
fn test_scoped_config() {
    let _b = on_backend("numpy-like");
    let before = unitensor::asarray([1.5, 2.5], None).unwrap().dtype();
    {
        let _config = config::scoped(|c| c.default_dtype = DType::F64).unwrap();
        assert_eq!(unitensor::asarray([1.5, 2.5], None).unwrap().dtype(), DType::F64);
    }
    assert_eq!(unitensor::asarray([1.5, 2.5], None).unwrap().dtype(), before);

    assert!(config::scoped(|c| c.default_dtype = DType::I32).is_err());
    assert_eq!(config::get().default_dtype, before);
}

#[test]
fn test_call_by_name() {
    let _b = on_backend("numpy-like");
    let err = call_by_name("frobnicate", Vec::new(), Vec::new()).unwrap_err();
    assert!(matches!(err.root(), Error::UnknownOperator { .. }), "{err}");

    let pixel = image(1, 1);
    let operand = || Value::from(ArrayLike::from(&pixel));
    let err = call_by_name("conv", vec![operand(), operand()], Vec::new()).unwrap_err();
    assert!(matches!(err.root(), Error::BackendMissingOperator { .. }), "{err}");

    let sum = call_by_name(
        "add",
        vec![Value::from(ArrayLike::from([1.0, 2.0])), Value::from(ArrayLike::from(10.0))],
        Vec::new(),
    )
    .unwrap();
    let sum = sum.into_iter().next().unwrap().into_array().unwrap();
    assert_eq!(sum.to_f64_vec(), vec![11.0, 12.0]);
}
