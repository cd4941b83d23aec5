//! tensorflow-shaped façade
//!
//! Functions use tensorflow's argument names and conventions: reductions
//! are `reduce_*` with `axis`/`keepdims`, convolutions are channels-last.

use super::common::frontend_array;
use super::numeric_python::NdArray;
use super::version::Library;
use crate::api;
use crate::dtype::{DType, Scalar};
use crate::error::Result;
use crate::tensor::ArrayLike;

/// The emulated library
pub static LIBRARY: Library = Library {
    name: "tensor-train",
    env: "UNITENSOR_TENSOR_TRAIN_VERSION",
    pinned: "2.2",
};

frontend_array!(
    /// tensorflow-style eager tensor
    EagerTensor
);

impl EagerTensor {
    /// Dimensions
    pub fn shape(&self) -> Vec<usize> {
        self.0.shape().to_vec()
    }

    /// The values as a numpy-style array
    pub fn numpy(&self) -> NdArray {
        NdArray::from_handle(self.0.clone())
    }
}

/// `tf.constant`
pub fn constant(value: impl Into<ArrayLike>, dtype: Option<DType>) -> Result<EagerTensor> {
    api::asarray(value, dtype).map(EagerTensor)
}

/// `tf.convert_to_tensor`
pub fn convert_to_tensor(value: impl Into<ArrayLike>) -> Result<EagerTensor> {
    api::asarray(value, None).map(EagerTensor)
}

/// `tf.zeros`
pub fn zeros(shape: &[usize], dtype: Option<DType>) -> Result<EagerTensor> {
    api::zeros(shape, dtype).map(EagerTensor)
}

/// `tf.ones`
pub fn ones(shape: &[usize], dtype: Option<DType>) -> Result<EagerTensor> {
    api::ones(shape, dtype).map(EagerTensor)
}

/// `tf.range`
pub fn range(start: impl Into<Scalar>, limit: impl Into<Scalar>, delta: impl Into<Scalar>) -> Result<EagerTensor> {
    api::arange(start, limit, delta, None).map(EagerTensor)
}

/// `tf.cast`
pub fn cast(x: impl Into<ArrayLike>, dtype: DType) -> Result<EagerTensor> {
    api::astype(x, dtype).map(EagerTensor)
}

/// `tf.add`
pub fn add(x: impl Into<ArrayLike>, y: impl Into<ArrayLike>) -> Result<EagerTensor> {
    api::add(x, y).map(EagerTensor)
}

/// `tf.subtract`
pub fn subtract(x: impl Into<ArrayLike>, y: impl Into<ArrayLike>) -> Result<EagerTensor> {
    api::subtract(x, y).map(EagerTensor)
}

/// `tf.multiply`
pub fn multiply(x: impl Into<ArrayLike>, y: impl Into<ArrayLike>) -> Result<EagerTensor> {
    api::multiply(x, y).map(EagerTensor)
}

/// `tf.matmul`
pub fn matmul(
    a: impl Into<ArrayLike>,
    b: impl Into<ArrayLike>,
    transpose_a: bool,
    transpose_b: bool,
) -> Result<EagerTensor> {
    api::matmul_transpose(a, b, transpose_a, transpose_b).map(EagerTensor)
}

macro_rules! reductions {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            #[doc = concat!("`tf.", stringify!($name), "`")]
            pub fn $name(input: impl Into<ArrayLike>, axis: Option<&[isize]>, keepdims: bool) -> Result<EagerTensor> {
                api::$op(input, axis, keepdims).map(EagerTensor)
            }
        )*
    };
}

reductions! {
    reduce_sum => sum,
    reduce_prod => prod,
    reduce_mean => mean,
    reduce_max => max,
    reduce_min => min,
    reduce_all => all,
    reduce_any => any,
}

/// `tf.argmax`; tensorflow reduces axis 0 when none is given
pub fn argmax(input: impl Into<ArrayLike>, axis: Option<isize>) -> Result<EagerTensor> {
    api::argmax(input, Some(axis.unwrap_or(0)), false).map(EagerTensor)
}

/// `tf.argmin`; axis 0 when none is given
pub fn argmin(input: impl Into<ArrayLike>, axis: Option<isize>) -> Result<EagerTensor> {
    api::argmin(input, Some(axis.unwrap_or(0)), false).map(EagerTensor)
}

/// `tf.reshape`
pub fn reshape(tensor: impl Into<ArrayLike>, shape: &[i64]) -> Result<EagerTensor> {
    api::reshape(tensor, shape).map(EagerTensor)
}

/// `tf.transpose`; `None` reverses the axes
pub fn transpose(a: impl Into<ArrayLike>, perm: Option<&[isize]>) -> Result<EagerTensor> {
    api::permute_dims(a, perm).map(EagerTensor)
}

/// `tf.concat`
pub fn concat<A: Into<ArrayLike>>(values: impl IntoIterator<Item = A>, axis: isize) -> Result<EagerTensor> {
    api::concat(values, Some(axis)).map(EagerTensor)
}

/// `tf.stack`
pub fn stack<A: Into<ArrayLike>>(values: impl IntoIterator<Item = A>, axis: isize) -> Result<EagerTensor> {
    api::stack(values, axis).map(EagerTensor)
}

/// `tf.gather`
pub fn gather(params: impl Into<ArrayLike>, indices: impl Into<ArrayLike>, axis: isize) -> Result<EagerTensor> {
    api::gather(params, indices, axis).map(EagerTensor)
}

/// `tf.stop_gradient`
pub fn stop_gradient(input: impl Into<ArrayLike>) -> Result<EagerTensor> {
    api::stop_gradient(input).map(EagerTensor)
}

/// `tf.nn`
pub mod nn {
    use super::EagerTensor;
    use crate::api::{self, Padding};
    use crate::error::{Error, Result};
    use crate::tensor::ArrayLike;

    /// `tf.nn.relu`
    pub fn relu(features: impl Into<ArrayLike>) -> Result<EagerTensor> {
        api::relu(features).map(EagerTensor)
    }

    /// `tf.nn.softmax`
    pub fn softmax(logits: impl Into<ArrayLike>, axis: Option<isize>) -> Result<EagerTensor> {
        api::softmax(logits, Some(axis.unwrap_or(-1))).map(EagerTensor)
    }

    /// `tf.nn.convolution`, channels last.
    ///
    /// `input` is `[N, *spatial, C_in]`, `filters` `[*kernel, C_in, C_out]`
    /// and `padding` is `"VALID"` or `"SAME"`.
    pub fn convolution(
        input: impl Into<ArrayLike>,
        filters: impl Into<ArrayLike>,
        strides: &[usize],
        padding: &str,
        dilations: &[usize],
    ) -> Result<EagerTensor> {
        let padding = match padding {
            "VALID" => Padding::Valid,
            "SAME" => Padding::Same,
            other => {
                return Err(Error::invalid_argument("padding", format!("expected VALID or SAME, got '{other}'")))
            }
        };
        let x = api::asarray(input, None)?;
        let w = api::asarray(filters, None)?;
        let nd = x.ndim() as isize;
        // [N, *S, C] -> [N, C, *S]
        let mut to_first = vec![0, nd - 1];
        to_first.extend(1..nd - 1);
        // [*K, Ci, Co] -> [Co, Ci, *K]
        let mut filters_first = vec![nd - 1, nd - 2];
        filters_first.extend(0..nd - 2);
        // [N, C, *S] -> [N, *S, C]
        let mut to_last = vec![0];
        to_last.extend(2..nd);
        to_last.push(1);

        let x = api::permute_dims(&x, Some(to_first.as_slice()))?;
        let w = api::permute_dims(&w, Some(filters_first.as_slice()))?;
        let y = api::conv(&x, &w, strides, &padding, dilations)?;
        api::permute_dims(&y, Some(to_last.as_slice())).map(EagerTensor)
    }
}

/// `tf.linalg`
pub mod linalg {
    use super::{EagerTensor, LIBRARY};
    use crate::api;
    use crate::dtype::Scalar;
    use crate::error::{Error, Result};
    use crate::frontends::version::Versioned;
    use crate::tensor::ArrayLike;

    /// Options of `tf.linalg.diag`
    #[derive(Copy, Clone, Debug, PartialEq)]
    pub struct DiagOpts {
        /// Diagonal offset
        pub k: i64,
        /// Output rows; inferred when `None`
        pub num_rows: Option<usize>,
        /// Output columns; inferred when `None`
        pub num_cols: Option<usize>,
        /// Value off the diagonal
        pub padding_value: Scalar,
    }

    impl Default for DiagOpts {
        fn default() -> Self {
            Self {
                k: 0,
                num_rows: None,
                num_cols: None,
                padding_value: Scalar::Int(0),
            }
        }
    }

    /// Signature shared by the versions of `diag`
    pub type DiagFn = fn(ArrayLike, &DiagOpts) -> Result<EagerTensor>;

    static DIAG: Versioned<DiagFn> = Versioned {
        canonical: "diag",
        library: &LIBRARY,
        symbols: &[
            ("diag_v_2p1_and_below", diag_v_2p1_and_below as DiagFn),
            ("diag_v_2p2_and_above", diag_v_2p2_and_above as DiagFn),
        ],
    };

    /// `tf.linalg.diag` for the detected version
    pub fn diag(diagonal: impl Into<ArrayLike>, opts: &DiagOpts) -> Result<EagerTensor> {
        DIAG.resolve()?(diagonal.into(), opts)
    }

    /// `tf.linalg.diag` up to 2.1, which only places the main diagonal
    pub fn diag_v_2p1_and_below(diagonal: ArrayLike, opts: &DiagOpts) -> Result<EagerTensor> {
        if *opts != DiagOpts::default() {
            return Err(Error::invalid_argument(
                "k",
                "offsets, explicit sizes and padding need tensorflow 2.2 or later",
            ));
        }
        api::diag(diagonal, 0).map(EagerTensor)
    }

    /// `tf.linalg.diag` from 2.2, with offset, size and padding options
    pub fn diag_v_2p2_and_above(diagonal: ArrayLike, opts: &DiagOpts) -> Result<EagerTensor> {
        api::diag_padded(diagonal, opts.k, opts.num_rows, opts.num_cols, opts.padding_value).map(EagerTensor)
    }

    /// `tf.linalg.matmul`
    pub fn matmul(a: impl Into<ArrayLike>, b: impl Into<ArrayLike>) -> Result<EagerTensor> {
        super::matmul(a, b, false, false)
    }

    /// `tf.linalg.inv`
    pub fn inv(input: impl Into<ArrayLike>) -> Result<EagerTensor> {
        api::inv(input, false).map(EagerTensor)
    }

    /// `tf.linalg.det`
    pub fn det(input: impl Into<ArrayLike>) -> Result<EagerTensor> {
        api::det(input).map(EagerTensor)
    }

    /// `tf.linalg.cholesky`
    pub fn cholesky(input: impl Into<ArrayLike>) -> Result<EagerTensor> {
        api::cholesky(input, false).map(EagerTensor)
    }
}
