//! Foreign-shaped façades: calling conventions, casting rules and
//! version-specific behaviour

mod common;

use common::{assert_allclose_f64, on_backend, BACKENDS};
use unitensor::dtype::{Casting, DType, Scalar};
use unitensor::error::Error;
use unitensor::frontends::{accelerator_numeric as jnp, autograd_tracer as torch, numeric_python as np, tensor_train as tf};

// ============================================================================
// numeric-python
// ============================================================================

#[test]
fn test_np_dtype_request_obeys_casting() {
    let _b = on_backend("numpy-like");
    let opts = np::UfuncOpts::default().dtype(DType::I32);
    let err = np::add_with([1.5, 2.5], [1.0, 2.0], &opts).unwrap_err();
    assert!(
        matches!(err.root(), Error::CastingNotAllowed { to: DType::I32, casting: Casting::SameKind, .. }),
        "{err}"
    );

    let unsafe_opts = opts.casting(Casting::Unsafe);
    let r = np::add_with([1.5, 2.5], [1.0, 2.0], &unsafe_opts).unwrap().into_array().unwrap();
    assert_eq!(r.dtype(), DType::I32);
    assert_eq!(r.to_vec::<i32>(), vec![2, 4]);
}

#[test]
fn test_np_mixed_inputs_obey_casting() {
    let _b = on_backend("numpy-like");
    let ints = np::asarray([1, 2], Some(DType::I32)).unwrap();
    let floats = np::asarray([0.5, 1.5], Some(DType::F32)).unwrap();

    let strict = np::UfuncOpts::default().casting(Casting::No);
    let err = np::add_with(&ints, &floats, &strict).unwrap_err();
    assert!(
        matches!(err.root(), Error::CastingNotAllowed { from: DType::I32, casting: Casting::No, .. }),
        "{err}"
    );

    let same = np::asarray([3, 4], Some(DType::I32)).unwrap();
    let r = np::add_with(&ints, &same, &strict).unwrap().into_array().unwrap();
    assert_eq!(r.to_vec::<i32>(), vec![4, 6]);

    let r = np::add_with(&ints, &floats, &np::UfuncOpts::default()).unwrap().into_array().unwrap();
    assert_eq!(r.dtype(), DType::F32);
    assert_eq!(r.to_vec::<f32>(), vec![1.5, 3.5]);
}

#[test]
fn test_np_out_dtype_obeys_casting() {
    let _b = on_backend("numpy-like");
    let out = np::zeros(&[2], Some(DType::I64)).unwrap();
    let err = np::add_with([1.5, 2.5], [1.0, 1.0], &np::UfuncOpts::default().out(&out)).unwrap_err();
    assert!(matches!(err.root(), Error::CastingNotAllowed { to: DType::I64, .. }), "{err}");
    assert_eq!(out.to_vec::<i64>(), vec![0, 0]);

    let opts = np::UfuncOpts::default().out(&out).casting(Casting::Unsafe);
    let r = np::add_with([1.5, 2.5], [1.0, 1.0], &opts).unwrap().into_array().unwrap();
    assert!(r.handle().same_handle(out.handle()));
    assert_eq!(out.to_vec::<i64>(), vec![2, 3]);

    let float_out = np::zeros(&[2], None).unwrap();
    np::multiply_with([1, 2], [3, 4], &np::UfuncOpts::default().out(&float_out)).unwrap();
    assert_eq!(float_out.dtype(), DType::F64);
    assert_eq!(float_out.to_vec::<f64>(), vec![3.0, 8.0]);
}

#[test]
fn test_np_where_without_out_fills_zero() {
    let _b = on_backend("numpy-like");
    let opts = np::UfuncOpts::default().where_mask([false, true]);
    let r = np::multiply_with([2, 3], [4, 5], &opts).unwrap().into_array().unwrap();
    assert_eq!(r.to_vec::<i64>(), vec![0, 15]);
}

#[test]
fn test_np_zero_dim_results_are_scalars() {
    for &name in BACKENDS {
        let _b = on_backend(name);
        match np::sum([1, 2, 3], None, false).unwrap() {
            np::NpOutput::Scalar(s) => assert_eq!(s, Scalar::Int(6), "{name}"),
            other => panic!("{name}: expected a scalar, got {other:?}"),
        }
        assert!(matches!(np::sum([[1, 2], [3, 4]], Some(&[0][..]), false).unwrap(), np::NpOutput::Array(_)));
        assert_eq!(np::argmax([3, 1, 3], None).unwrap().into_scalar().unwrap(), Scalar::Int(0));
        assert_eq!(np::matmul([1, 2], [3, 4]).unwrap().into_scalar().unwrap(), Scalar::Int(11));
        let mean = np::mean([1.0, 2.0], None, false).unwrap().into_scalar().unwrap();
        assert_eq!(mean, Scalar::Float(1.5));
    }
}

#[test]
fn test_np_constructors_default_to_float64() {
    let _b = on_backend("numpy-like");
    assert_eq!(np::zeros(&[2, 2], None).unwrap().dtype(), DType::F64);
    assert_eq!(np::eye(3, None, 0, None).unwrap().to_vec::<f64>(), vec![1., 0., 0., 0., 1., 0., 0., 0., 1.]);
    assert_eq!(np::arange(0.0, 1.0, 0.25, None).unwrap().to_vec::<f64>(), vec![0.0, 0.25, 0.5, 0.75]);
}

#[test]
fn test_np_constructors_narrow_on_32_bit_backend() {
    let _b = on_backend("accelerator-numeric");
    assert_eq!(np::zeros(&[2], None).unwrap().dtype(), DType::F32);
    assert_eq!(np::asarray([1, 2], None).unwrap().dtype(), DType::I32);
}

#[test]
fn test_np_bytes_round_trip() {
    let _b = on_backend("numpy-like");
    let a = np::asarray([1.5f32, -2.0, 0.25], None).unwrap();
    let bytes = a.tobytes();
    assert_eq!(bytes.len(), 12);
    let back = np::frombuffer(&bytes, DType::F32).unwrap();
    assert_eq!(back.dtype(), DType::F32);
    assert_eq!(back.to_vec::<f32>(), vec![1.5, -2.0, 0.25]);

    let flags = np::frombuffer(&[1, 0, 1], DType::Bool).unwrap();
    assert_eq!(flags.dtype(), DType::Bool);
    assert_eq!(flags.to_vec::<u8>(), vec![1, 0, 1]);
    assert!(np::frombuffer(&[0; 7], DType::I32).is_err());
}

#[test]
fn test_np_unique_nan_handling_follows_version() {
    let _b = on_backend("numpy-like");
    let data = [1.0, f64::NAN, f64::NAN, 2.0, 1.0];
    let opts = np::UniqueOpts {
        return_inverse: true,
        return_counts: true,
        ..Default::default()
    };

    np::LIBRARY.set_version(Some("1.23")).unwrap();
    let old = np::unique(data, &opts).unwrap();
    let values = old.values.to_vec::<f64>();
    assert_eq!(values.len(), 4);
    assert!(values[2].is_nan() && values[3].is_nan());
    assert_eq!(old.counts.unwrap().to_vec::<i64>(), vec![2, 1, 1, 1]);

    np::LIBRARY.set_version(Some("1.24")).unwrap();
    let new = np::unique(data, &opts).unwrap();
    let values = new.values.to_vec::<f64>();
    assert_eq!(&values[..2], &[1.0, 2.0]);
    assert!(values[2].is_nan() && values.len() == 3);
    assert_eq!(new.counts.unwrap().to_vec::<i64>(), vec![2, 1, 2]);
    assert_eq!(new.inverse.unwrap().to_vec::<i64>(), vec![0, 2, 2, 1, 0]);
    assert!(new.indices.is_none());

    let distinct = np::unique(data, &np::UniqueOpts { equal_nan: false, ..opts }).unwrap();
    assert_eq!(distinct.values.to_vec::<f64>().len(), 4);

    np::LIBRARY.set_version(None).unwrap();
}

#[test]
fn test_np_argsort_kinds() {
    let _b = on_backend("accelerator-numeric");
    assert_eq!(np::argsort([2, 1, 2, 1], -1, Some("stable")).unwrap().to_vec::<i64>(), vec![1, 3, 0, 2]);
    assert_eq!(np::argsort([2, 1, 2, 1], -1, None).unwrap().to_vec::<i64>(), vec![3, 1, 2, 0]);
    assert!(np::argsort([2, 1], -1, Some("bogosort")).is_err());
}

#[test]
fn test_np_array_methods_and_operators() {
    let _b = on_backend("numpy-like");
    let a = np::asarray([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]], None).unwrap();
    assert_eq!(a.shape(), vec![2, 3]);
    assert_eq!(a.size(), 6);
    assert_eq!(a.T().unwrap().shape(), vec![3, 2]);
    assert_eq!(a.reshape(&[3, -1]).unwrap().shape(), vec![3, 2]);
    assert_eq!(a.sum(None).unwrap().into_scalar().unwrap().as_f64(), 21.0);

    let b = (&a * 2.0).unwrap();
    let c = (&b - &a).unwrap();
    assert_eq!(c.to_vec::<f64>(), a.to_vec::<f64>());
    assert_eq!((-&a).unwrap().to_vec::<f64>()[0], -1.0);
    assert_eq!(np::diag([1, 2], 0).unwrap().to_vec::<i64>(), vec![1, 0, 0, 2]);
    assert_eq!(np::diag([1, 2], 1).unwrap().to_vec::<i64>(), vec![0, 1, 0, 0, 0, 2, 0, 0, 0]);
}

// ============================================================================
// autograd-tracer
// ============================================================================

#[test]
fn test_torch_argsort_stable_flag_follows_version() {
    let _b = on_backend("accelerator-numeric");
    let t = torch::tensor([2, 1, 2, 1], None).unwrap();

    torch::LIBRARY.set_version(Some("2.0")).unwrap();
    assert_eq!(torch::argsort(&t, -1, false, true).unwrap().to_vec::<i64>(), vec![3, 1, 2, 0]);

    torch::LIBRARY.set_version(Some("2.1")).unwrap();
    assert_eq!(torch::argsort(&t, -1, false, true).unwrap().to_vec::<i64>(), vec![1, 3, 0, 2]);
    assert_eq!(torch::argsort_v_2p0_and_below((&t).into(), -1, false, true).unwrap().to_vec::<i64>(), vec![3, 1, 2, 0]);

    torch::LIBRARY.set_version(None).unwrap();
}

#[test]
fn test_torch_tensor_methods() {
    let _b = on_backend("autograd-tracer");
    let t = torch::arange(0, 6, 1).unwrap().view(&[2, 3]).unwrap();
    assert_eq!(t.size(), vec![2, 3]);
    assert_eq!(t.numel(), 6);
    assert_eq!(t.t().unwrap().size(), vec![3, 2]);
    assert_eq!(t.unsqueeze(0).unwrap().size(), vec![1, 2, 3]);
    assert_eq!(t.unsqueeze(0).unwrap().squeeze(Some(0)).unwrap().size(), vec![2, 3]);

    let s = t.sum(Some(&[1][..]), false).unwrap();
    assert_eq!(s.ndim(), 1);
    let total = t.sum(None, false).unwrap();
    assert_eq!(total.ndim(), 0);
    assert_eq!(total.item().unwrap(), Scalar::Int(15));

    let x = torch::tensor([1.0, 2.0], Some(DType::F64)).unwrap();
    assert!(!x.requires_grad());
    let v = x.requires_grad_().unwrap();
    assert!(v.requires_grad());
    assert!(!v.detach().unwrap().requires_grad());

    let (values, indices) = torch::sort([3, 1, 2], -1, true, true).unwrap();
    assert_eq!(values.to_vec::<i64>(), vec![3, 2, 1]);
    assert_eq!(indices.to_vec::<i64>(), vec![0, 2, 1]);
}

#[test]
fn test_torch_linear() {
    let _b = on_backend("autograd-tracer");
    let x = torch::tensor([[1.0, 2.0]], None).unwrap();
    let w = torch::tensor([[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]], None).unwrap();
    let b = torch::tensor([0.5, 0.5, 0.5], None).unwrap();
    let y = torch::linear(&x, &w, Some(&b)).unwrap();
    assert_eq!(y.size(), vec![1, 3]);
    assert_eq!(y.to_vec::<f32>(), vec![1.5, 2.5, 3.5]);
    assert_eq!(torch::linear(&x, &w, None).unwrap().to_vec::<f32>(), vec![1.0, 2.0, 3.0]);
}

// ============================================================================
// tensor-train
// ============================================================================

#[test]
fn test_tf_diag_options_follow_version() {
    let _b = on_backend("tensor-train");
    let offset = tf::linalg::DiagOpts {
        k: 1,
        ..Default::default()
    };

    tf::LIBRARY.set_version(Some("2.1")).unwrap();
    let main = tf::linalg::diag([1, 2], &Default::default()).unwrap();
    assert_eq!(main.to_vec::<i64>(), vec![1, 0, 0, 2]);
    let err = tf::linalg::diag([1, 2, 3], &offset).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }), "{err}");

    tf::LIBRARY.set_version(Some("2.2")).unwrap();
    let d = tf::linalg::diag([1, 2, 3], &offset).unwrap();
    assert_eq!(d.shape(), vec![3, 3]);
    assert_eq!(d.to_vec::<i64>(), vec![0, 1, 0, 0, 0, 2, 0, 0, 0]);

    let padded = tf::linalg::diag(
        [1, 2],
        &tf::linalg::DiagOpts {
            num_rows: Some(2),
            num_cols: Some(3),
            padding_value: Scalar::Int(9),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(padded.to_vec::<i64>(), vec![1, 9, 9, 9, 2, 9]);

    tf::LIBRARY.set_version(None).unwrap();
}

#[test]
fn test_tf_convolution_channels_last() {
    for name in ["numpy-like", "tensor-train"] {
        let _b = on_backend(name);
        let x = tf::reshape(tf::range(0.0, 16.0, 1.0).unwrap(), &[1, 4, 4, 1]).unwrap();
        let w = tf::ones(&[2, 2, 1, 1], Some(DType::F32)).unwrap();
        let y = tf::nn::convolution(&x, &w, &[1, 1], "VALID", &[1, 1]).unwrap();
        assert_eq!(y.shape(), vec![1, 3, 3, 1], "{name}");
        let expected: Vec<f64> = (0..3)
            .flat_map(|i| (0..3).map(move |j| (16 * i + 4 * j + 10) as f64))
            .collect();
        assert_allclose_f64(&y.to_vec::<f64>(), &expected, 0.0, 1e-6, name);

        let same = tf::nn::convolution(&x, &w, &[1, 1], "SAME", &[1, 1]).unwrap();
        assert_eq!(same.shape(), vec![1, 4, 4, 1], "{name}");
        assert!(tf::nn::convolution(&x, &w, &[1, 1], "FULL", &[1, 1]).is_err());
    }
}

#[test]
fn test_tf_reductions_and_numpy_view() {
    let _b = on_backend("tensor-train");
    let t = tf::constant([[1.0, 2.0], [3.0, 4.0]], None).unwrap();
    assert_eq!(tf::reduce_sum(&t, Some(&[0][..]), false).unwrap().to_vec::<f32>(), vec![4.0, 6.0]);
    assert_eq!(tf::reduce_mean(&t, None, true).unwrap().shape(), vec![1, 1]);
    assert_eq!(tf::argmax(&t, None).unwrap().to_vec::<i64>(), vec![1, 1]);
    let m = tf::matmul(&t, &t, false, true).unwrap();
    assert_eq!(m.to_vec::<f32>(), vec![5.0, 11.0, 11.0, 25.0]);
    assert_eq!(t.numpy().shape(), vec![2, 2]);
    assert_eq!((&t + 1.0).unwrap().to_vec::<f32>(), vec![2.0, 3.0, 4.0, 5.0]);
}

// ============================================================================
// accelerator-numeric
// ============================================================================

#[test]
fn test_jnp_indexed_updates_are_functional() {
    let _b = on_backend("accelerator-numeric");
    let x = jnp::array([[1, 2], [3, 4]], None).unwrap();
    let y = x.at(&[0, 1]).set(10).unwrap();
    assert_eq!(y.to_vec::<i64>(), vec![1, 10, 3, 4]);
    assert_eq!(x.to_vec::<i64>(), vec![1, 2, 3, 4]);
    assert_eq!(y.dtype(), x.dtype());

    assert_eq!(x.at(&[1, 0]).add(5).unwrap().to_vec::<i64>(), vec![1, 2, 8, 4]);
    assert_eq!(x.at(&[1, 1]).multiply(3).unwrap().to_vec::<i64>(), vec![1, 2, 3, 12]);
    assert_eq!(x.at(&[1, 0]).get().unwrap().item().unwrap(), Scalar::Int(3));
    assert!(x.at(&[2, 0]).set(1).is_err());
    assert!(x.at(&[0]).set(1).is_err());
}

#[test]
fn test_jnp_argsort_descending_needs_0_4_6() {
    let _b = on_backend("accelerator-numeric");
    jnp::LIBRARY.set_version(Some("0.4.5")).unwrap();
    assert!(jnp::argsort([1, 3, 2], -1, false, true).is_err());
    assert_eq!(jnp::argsort([2, 1, 2, 1], -1, false, false).unwrap().to_vec::<i64>(), vec![1, 3, 0, 2]);

    jnp::LIBRARY.set_version(Some("0.4.6")).unwrap();
    assert_eq!(jnp::argsort([1, 3, 2], -1, false, true).unwrap().to_vec::<i64>(), vec![1, 2, 0]);
    jnp::LIBRARY.set_version(None).unwrap();
}
