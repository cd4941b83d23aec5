//! jax.numpy-shaped façade
//!
//! Arrays are immutable: indexed updates go through `.at(..)`, which
//! returns a new array.

use super::common::frontend_array;
use super::version::{Library, Versioned};
use crate::api;
use crate::dtype::{DType, Scalar};
use crate::error::{Error, Result};
use crate::tensor::{ArrayLike, HostArray};

/// The emulated library
pub static LIBRARY: Library = Library {
    name: "accelerator-numeric",
    env: "UNITENSOR_ACCELERATOR_NUMERIC_VERSION",
    pinned: "0.4.6",
};

frontend_array!(
    /// jax-style immutable array
    JaxArray
);

impl JaxArray {
    /// Dimensions
    pub fn shape(&self) -> Vec<usize> {
        self.0.shape().to_vec()
    }

    /// Number of elements
    pub fn size(&self) -> usize {
        self.0.numel()
    }

    /// The single element as a plain value
    pub fn item(&self) -> Result<Scalar> {
        self.0.item()
    }

    /// Indexed-update view at the element `index` (one entry per axis)
    pub fn at(&self, index: &[usize]) -> At<'_> {
        At {
            array: self,
            index: index.to_vec(),
        }
    }
}

/// Pending indexed update, as `x.at[index]`
#[derive(Debug)]
pub struct At<'a> {
    array: &'a JaxArray,
    index: Vec<usize>,
}

impl At<'_> {
    fn mask(&self) -> Result<HostArray> {
        let shape = self.array.0.shape();
        if self.index.len() != shape.ndim() || self.index.iter().zip(shape.iter()).any(|(&i, &d)| i >= d) {
            return Err(Error::invalid_argument(
                "index",
                format!("index {:?} does not address an element of shape {shape}", self.index),
            ));
        }
        let flat = self
            .index
            .iter()
            .zip(crate::tensor::shape::contiguous_strides(&shape))
            .map(|(&i, s)| i * s)
            .sum::<usize>();
        let mut mask = vec![0.0; shape.numel()];
        mask[flat] = 1.0;
        HostArray::new(shape, DType::Bool, mask)
    }

    fn update(&self, value: crate::tensor::Array) -> Result<JaxArray> {
        let x = &self.array.0;
        let blended = api::where_(self.mask()?, value, x)?;
        api::astype(blended, x.dtype()).map(JaxArray)
    }

    /// `x.at[index].set(value)`
    pub fn set(&self, value: impl Into<ArrayLike>) -> Result<JaxArray> {
        self.update(api::asarray(value, None)?)
    }

    /// `x.at[index].add(value)`
    pub fn add(&self, value: impl Into<ArrayLike>) -> Result<JaxArray> {
        self.update(api::add(&self.array.0, value)?)
    }

    /// `x.at[index].multiply(value)`
    pub fn multiply(&self, value: impl Into<ArrayLike>) -> Result<JaxArray> {
        self.update(api::multiply(&self.array.0, value)?)
    }

    /// `x.at[index].get()`
    pub fn get(&self) -> Result<JaxArray> {
        let picked = api::sum(api::where_(self.mask()?, &self.array.0, 0)?, None, false)?;
        api::astype(picked, self.array.0.dtype()).map(JaxArray)
    }
}

/// `jnp.array`
pub fn array(object: impl Into<ArrayLike>, dtype: Option<DType>) -> Result<JaxArray> {
    api::asarray(object, dtype).map(JaxArray)
}

/// `jnp.zeros`
pub fn zeros(shape: &[usize], dtype: Option<DType>) -> Result<JaxArray> {
    api::zeros(shape, dtype).map(JaxArray)
}

/// `jnp.ones`
pub fn ones(shape: &[usize], dtype: Option<DType>) -> Result<JaxArray> {
    api::ones(shape, dtype).map(JaxArray)
}

/// `jnp.arange`
pub fn arange(start: impl Into<Scalar>, stop: impl Into<Scalar>, step: impl Into<Scalar>) -> Result<JaxArray> {
    api::arange(start, stop, step, None).map(JaxArray)
}

/// `jnp.add`
pub fn add(x1: impl Into<ArrayLike>, x2: impl Into<ArrayLike>) -> Result<JaxArray> {
    api::add(x1, x2).map(JaxArray)
}

/// `jnp.multiply`
pub fn multiply(x1: impl Into<ArrayLike>, x2: impl Into<ArrayLike>) -> Result<JaxArray> {
    api::multiply(x1, x2).map(JaxArray)
}

/// `jnp.matmul`
pub fn matmul(a: impl Into<ArrayLike>, b: impl Into<ArrayLike>) -> Result<JaxArray> {
    api::matmul(a, b).map(JaxArray)
}

/// `jnp.sum`
pub fn sum(a: impl Into<ArrayLike>, axis: Option<&[isize]>, keepdims: bool) -> Result<JaxArray> {
    api::sum(a, axis, keepdims).map(JaxArray)
}

/// `jnp.mean`
pub fn mean(a: impl Into<ArrayLike>, axis: Option<&[isize]>, keepdims: bool) -> Result<JaxArray> {
    api::mean(a, axis, keepdims).map(JaxArray)
}

/// `jnp.where`
pub fn where_(condition: impl Into<ArrayLike>, x: impl Into<ArrayLike>, y: impl Into<ArrayLike>) -> Result<JaxArray> {
    api::where_(condition, x, y).map(JaxArray)
}

/// `jnp.clip`
pub fn clip(a: impl Into<ArrayLike>, a_min: Option<f64>, a_max: Option<f64>) -> Result<JaxArray> {
    api::clip(a, a_min, a_max).map(JaxArray)
}

/// `jnp.concatenate`
pub fn concatenate<A: Into<ArrayLike>>(arrays: impl IntoIterator<Item = A>, axis: isize) -> Result<JaxArray> {
    api::concat(arrays, Some(axis)).map(JaxArray)
}

/// `jnp.sort`; jax sorts stably
pub fn sort(a: impl Into<ArrayLike>, axis: isize) -> Result<JaxArray> {
    api::sort(a, axis, false, true).map(JaxArray)
}

/// Signature shared by the versions of `argsort`: `(a, axis, stable, descending)`
pub type ArgsortFn = fn(ArrayLike, isize, bool, bool) -> Result<JaxArray>;

static ARGSORT: Versioned<ArgsortFn> = Versioned {
    canonical: "argsort",
    library: &LIBRARY,
    symbols: &[
        ("argsort_v_0p4p5_and_below", argsort_v_0p4p5_and_below as ArgsortFn),
        ("argsort_v_0p4p6_and_above", argsort_v_0p4p6_and_above as ArgsortFn),
    ],
};

/// `jnp.argsort` for the detected version
pub fn argsort(a: impl Into<ArrayLike>, axis: isize, stable: bool, descending: bool) -> Result<JaxArray> {
    ARGSORT.resolve()?(a.into(), axis, stable, descending)
}

/// `jnp.argsort` up to 0.4.5: always stable, ascending only
pub fn argsort_v_0p4p5_and_below(a: ArrayLike, axis: isize, _stable: bool, descending: bool) -> Result<JaxArray> {
    if descending {
        return Err(Error::invalid_argument("descending", "needs accelerator-numeric 0.4.6 or later"));
    }
    api::argsort(a, axis, false, true).map(JaxArray)
}

/// `jnp.argsort` from 0.4.6, with `stable` and `descending`
pub fn argsort_v_0p4p6_and_above(a: ArrayLike, axis: isize, stable: bool, descending: bool) -> Result<JaxArray> {
    api::argsort(a, axis, descending, stable).map(JaxArray)
}
