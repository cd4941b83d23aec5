//! torch-shaped façade
//!
//! Results stay tensors even when 0-d, and reductions take `dim`/`keepdim`.

use super::common::frontend_array;
use super::version::{Library, Versioned};
use crate::api;
use crate::device::Device;
use crate::dtype::{DType, Scalar};
use crate::error::Result;
use crate::tensor::ArrayLike;

/// The emulated library
pub static LIBRARY: Library = Library {
    name: "autograd-tracer",
    env: "UNITENSOR_AUTOGRAD_TRACER_VERSION",
    pinned: "2.1",
};

frontend_array!(
    /// torch-style tensor
    Tensor
);

impl Tensor {
    /// Dimensions
    pub fn size(&self) -> Vec<usize> {
        self.0.shape().to_vec()
    }

    /// Number of elements
    pub fn numel(&self) -> usize {
        self.0.numel()
    }

    /// Device holding the data
    pub fn device(&self) -> Device {
        self.0.device()
    }

    /// Whether gradients flow to this tensor
    pub fn requires_grad(&self) -> bool {
        self.0.is_variable()
    }

    /// Mark for gradient tracking
    pub fn requires_grad_(&self) -> Result<Tensor> {
        api::variable(&self.0).map(Tensor)
    }

    /// Same values, cut off from gradient tracking
    pub fn detach(&self) -> Result<Tensor> {
        api::stop_gradient(&self.0).map(Tensor)
    }

    /// The single element as a plain value
    pub fn item(&self) -> Result<Scalar> {
        self.0.item()
    }

    /// Copy to another device
    pub fn to_device(&self, device: Device) -> Result<Tensor> {
        api::to_device(&self.0, device).map(Tensor)
    }

    /// Cast to `dtype`
    pub fn to_dtype(&self, dtype: DType) -> Result<Tensor> {
        api::astype(&self.0, dtype).map(Tensor)
    }

    /// Element-wise sum
    pub fn add(&self, other: impl Into<ArrayLike>) -> Result<Tensor> {
        api::add(&self.0, other).map(Tensor)
    }

    /// Element-wise difference
    pub fn sub(&self, other: impl Into<ArrayLike>) -> Result<Tensor> {
        api::subtract(&self.0, other).map(Tensor)
    }

    /// Element-wise product
    pub fn mul(&self, other: impl Into<ArrayLike>) -> Result<Tensor> {
        api::multiply(&self.0, other).map(Tensor)
    }

    /// Element-wise quotient
    pub fn div(&self, other: impl Into<ArrayLike>) -> Result<Tensor> {
        api::divide(&self.0, other).map(Tensor)
    }

    /// Matrix product
    pub fn matmul(&self, other: impl Into<ArrayLike>) -> Result<Tensor> {
        matmul(self, other)
    }

    /// Sum over `dim` (every dimension when `None`)
    pub fn sum(&self, dim: Option<&[isize]>, keepdim: bool) -> Result<Tensor> {
        api::sum(&self.0, dim, keepdim).map(Tensor)
    }

    /// Mean over `dim` (every dimension when `None`)
    pub fn mean(&self, dim: Option<&[isize]>, keepdim: bool) -> Result<Tensor> {
        api::mean(&self.0, dim, keepdim).map(Tensor)
    }

    /// Index of the largest value; ties resolve to the first
    pub fn argmax(&self, dim: Option<isize>, keepdim: bool) -> Result<Tensor> {
        api::argmax(&self.0, dim, keepdim).map(Tensor)
    }

    /// Reshape; `view` and `reshape` coincide since there are no views
    pub fn view(&self, shape: &[i64]) -> Result<Tensor> {
        api::reshape(&self.0, shape).map(Tensor)
    }

    /// Reorder dimensions
    pub fn permute(&self, dims: &[isize]) -> Result<Tensor> {
        api::permute_dims(&self.0, Some(dims)).map(Tensor)
    }

    /// Transpose of a matrix
    pub fn t(&self) -> Result<Tensor> {
        api::matrix_transpose(&self.0).map(Tensor)
    }

    /// Insert a size-1 dimension
    pub fn unsqueeze(&self, dim: isize) -> Result<Tensor> {
        api::expand_dims(&self.0, dim).map(Tensor)
    }

    /// Drop size-1 dimensions
    pub fn squeeze(&self, dim: Option<isize>) -> Result<Tensor> {
        let dims = dim.map(|d| [d]);
        api::squeeze(&self.0, dims.as_ref().map(|d| &d[..])).map(Tensor)
    }

    /// Indices that sort along `dim`
    pub fn argsort(&self, dim: isize, descending: bool) -> Result<Tensor> {
        argsort(self, dim, descending, false)
    }
}

/// `torch.tensor`
pub fn tensor(data: impl Into<ArrayLike>, dtype: Option<DType>) -> Result<Tensor> {
    api::asarray(data, dtype).map(Tensor)
}

/// `torch.zeros`
pub fn zeros(size: &[usize], dtype: Option<DType>) -> Result<Tensor> {
    api::zeros(size, dtype).map(Tensor)
}

/// `torch.ones`
pub fn ones(size: &[usize], dtype: Option<DType>) -> Result<Tensor> {
    api::ones(size, dtype).map(Tensor)
}

/// `torch.arange`
pub fn arange(start: impl Into<Scalar>, end: impl Into<Scalar>, step: impl Into<Scalar>) -> Result<Tensor> {
    api::arange(start, end, step, None).map(Tensor)
}

/// `torch.matmul`
pub fn matmul(input: impl Into<ArrayLike>, other: impl Into<ArrayLike>) -> Result<Tensor> {
    api::matmul(input, other).map(Tensor)
}

/// `torch.cat`
pub fn cat<A: Into<ArrayLike>>(tensors: impl IntoIterator<Item = A>, dim: isize) -> Result<Tensor> {
    api::concat(tensors, Some(dim)).map(Tensor)
}

/// `torch.stack`
pub fn stack<A: Into<ArrayLike>>(tensors: impl IntoIterator<Item = A>, dim: isize) -> Result<Tensor> {
    api::stack(tensors, dim).map(Tensor)
}

/// `torch.where`
pub fn where_(condition: impl Into<ArrayLike>, input: impl Into<ArrayLike>, other: impl Into<ArrayLike>) -> Result<Tensor> {
    api::where_(condition, input, other).map(Tensor)
}

/// `torch.sort`, returning values and indices
pub fn sort(input: impl Into<ArrayLike>, dim: isize, descending: bool, stable: bool) -> Result<(Tensor, Tensor)> {
    let input = api::asarray(input, None)?;
    let values = api::sort(&input, dim, descending, stable)?;
    let indices = api::argsort(&input, dim, descending, stable)?;
    Ok((Tensor(values), Tensor(indices)))
}

/// `torch.softmax`
pub fn softmax(input: impl Into<ArrayLike>, dim: isize) -> Result<Tensor> {
    api::softmax(input, Some(dim)).map(Tensor)
}

/// `torch.relu`
pub fn relu(input: impl Into<ArrayLike>) -> Result<Tensor> {
    api::relu(input).map(Tensor)
}

/// `torch.nn.functional.linear`: `input @ weightᵀ + bias`
pub fn linear(input: impl Into<ArrayLike>, weight: impl Into<ArrayLike>, bias: Option<&Tensor>) -> Result<Tensor> {
    api::linear(input, weight, bias.map(Tensor::handle)).map(Tensor)
}

/// Signature shared by the versions of `argsort`
pub type ArgsortFn = fn(ArrayLike, isize, bool, bool) -> Result<Tensor>;

static ARGSORT: Versioned<ArgsortFn> = Versioned {
    canonical: "argsort",
    library: &LIBRARY,
    symbols: &[
        ("argsort_v_2p0_and_below", argsort_v_2p0_and_below as ArgsortFn),
        ("argsort_v_2p1_and_above", argsort_v_2p1_and_above as ArgsortFn),
    ],
};

/// `torch.argsort` for the detected version
pub fn argsort(input: impl Into<ArrayLike>, dim: isize, descending: bool, stable: bool) -> Result<Tensor> {
    ARGSORT.resolve()?(input.into(), dim, descending, stable)
}

/// `torch.argsort` up to 2.0, which has no `stable` option: ties come back
/// in whatever order the backend's sort leaves them
pub fn argsort_v_2p0_and_below(input: ArrayLike, dim: isize, descending: bool, _stable: bool) -> Result<Tensor> {
    api::argsort(input, dim, descending, false).map(Tensor)
}

/// `torch.argsort` from 2.1, honouring `stable`
pub fn argsort_v_2p1_and_above(input: ArrayLike, dim: isize, descending: bool, stable: bool) -> Result<Tensor> {
    api::argsort(input, dim, descending, stable).map(Tensor)
}
