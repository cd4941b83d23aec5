//! Host-resident reference storage
//!
//! `HostArray` is the storage every builtin backend keeps behind its native
//! array type. Values are held as f64 (plus an imaginary plane for complex
//! dtypes) and are always quantised to the array's dtype, so an `int8` array
//! never holds 300 and a `float16` array never holds more precision than f16.

use super::shape::{broadcast_indices, broadcast_shape, numel, Shape};
use crate::dtype::{DType, Scalar};
use crate::error::{Error, Result};

/// Host reference storage for a single array
#[derive(Clone, Debug, PartialEq)]
pub struct HostArray {
    shape: Shape,
    dtype: DType,
    re: Vec<f64>,
    im: Option<Vec<f64>>,
}

impl HostArray {
    /// Create an array from real values, quantising into `dtype`
    pub fn new(shape: impl Into<Shape>, dtype: DType, re: Vec<f64>) -> Result<Self> {
        Self::from_parts(shape, dtype, re, None)
    }

    /// Create an array from real and optional imaginary planes
    pub fn from_parts(
        shape: impl Into<Shape>,
        dtype: DType,
        mut re: Vec<f64>,
        im: Option<Vec<f64>>,
    ) -> Result<Self> {
        let shape = shape.into();
        let n = shape.numel();
        if re.len() != n {
            return Err(Error::shape_mismatch(&shape, &[re.len()]));
        }
        if let Some(im) = &im {
            if im.len() != n {
                return Err(Error::shape_mismatch(&shape, &[im.len()]));
            }
        }
        re.iter_mut().for_each(|v| *v = dtype.quantize(*v));
        let im = if dtype.is_complex() {
            let mut im = im.unwrap_or_else(|| vec![0.0; n]);
            im.iter_mut().for_each(|v| *v = dtype.quantize(*v));
            Some(im)
        } else {
            None
        };
        Ok(Self { shape, dtype, re, im })
    }

    /// Array filled with zeros
    pub fn zeros(shape: impl Into<Shape>, dtype: DType) -> Self {
        Self::full(shape, dtype, Scalar::Int(0))
    }

    /// Array filled with a single value
    pub fn full(shape: impl Into<Shape>, dtype: DType, value: Scalar) -> Self {
        let shape = shape.into();
        let n = shape.numel();
        let (re, im) = value.as_complex();
        Self {
            dtype,
            re: vec![dtype.quantize(re); n],
            im: dtype.is_complex().then(|| vec![dtype.quantize(im); n]),
            shape,
        }
    }

    /// 0-d array holding one value
    pub fn from_scalar(value: Scalar, dtype: DType) -> Self {
        Self::full(Shape::scalar(), dtype, value)
    }

    /// Shape
    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Dtype
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Number of dimensions
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    /// Number of elements
    #[inline]
    pub fn numel(&self) -> usize {
        self.re.len()
    }

    /// Real plane in row-major order
    #[inline]
    pub fn re(&self) -> &[f64] {
        &self.re
    }

    /// Imaginary plane, present only for complex dtypes
    #[inline]
    pub fn im(&self) -> Option<&[f64]> {
        self.im.as_deref()
    }

    /// Element `i` as (re, im)
    #[inline]
    pub fn get(&self, i: usize) -> (f64, f64) {
        (self.re[i], self.im.as_ref().map_or(0.0, |im| im[i]))
    }

    /// Element `i` as a scalar of this array's kind
    pub fn scalar_at(&self, i: usize) -> Scalar {
        let (re, im) = self.get(i);
        Scalar::from_element(self.dtype, re, im)
    }

    /// Truthiness of element `i`
    #[inline]
    pub fn truthy(&self, i: usize) -> bool {
        let (re, im) = self.get(i);
        re != 0.0 || im != 0.0
    }

    /// The single element of a one-element array
    pub fn item(&self) -> Result<Scalar> {
        if self.numel() != 1 {
            return Err(Error::invalid_argument(
                "array",
                format!("only one-element arrays convert to a scalar, got shape {}", self.shape),
            ));
        }
        Ok(self.scalar_at(0))
    }

    /// Every element as a scalar
    pub fn to_scalars(&self) -> Vec<Scalar> {
        (0..self.numel()).map(|i| self.scalar_at(i)).collect()
    }

    /// Consume into (shape, dtype, re, im)
    pub fn into_parts(self) -> (Shape, DType, Vec<f64>, Option<Vec<f64>>) {
        (self.shape, self.dtype, self.re, self.im)
    }

    /// Convert to another dtype; complex to real keeps the real part
    pub fn astype(&self, dtype: DType) -> Self {
        if dtype == self.dtype {
            return self.clone();
        }
        let re = self.re.iter().map(|&v| dtype.quantize(v)).collect();
        let im = dtype.is_complex().then(|| match &self.im {
            Some(im) => im.iter().map(|&v| dtype.quantize(v)).collect(),
            None => vec![0.0; self.numel()],
        });
        Self {
            shape: self.shape.clone(),
            dtype,
            re,
            im,
        }
    }

    /// Same data under a new shape with the same element count
    pub fn reshaped(mut self, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        if shape.numel() != self.numel() {
            return Err(Error::shape_mismatch(&shape, &self.shape));
        }
        self.shape = shape;
        Ok(self)
    }

    /// Materialise a broadcast of this array to `shape`
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self> {
        if self.shape.as_slice() == shape {
            return Ok(self.clone());
        }
        let target = broadcast_shape(&self.shape, shape)?;
        if target.as_slice() != shape {
            return Err(Error::broadcast(&self.shape, shape));
        }
        Ok(self.gather(shape.into(), &broadcast_indices(&self.shape, shape)))
    }

    /// New array of `shape` whose element `k` is this array's element `indices[k]`
    pub fn gather(&self, shape: Shape, indices: &[usize]) -> Self {
        Self {
            shape,
            dtype: self.dtype,
            re: indices.iter().map(|&i| self.re[i]).collect(),
            im: self
                .im
                .as_ref()
                .map(|im| indices.iter().map(|&i| im[i]).collect()),
        }
    }

    /// Apply a real function elementwise, producing `dtype`
    pub fn map(&self, dtype: DType, f: impl Fn(f64) -> f64) -> Self {
        Self {
            shape: self.shape.clone(),
            dtype,
            re: self.re.iter().map(|&v| dtype.quantize(f(v))).collect(),
            im: dtype.is_complex().then(|| vec![0.0; self.numel()]),
        }
    }

    /// Apply a complex-aware function elementwise, producing `dtype`
    pub fn map_complex(&self, dtype: DType, f: impl Fn(f64, f64) -> (f64, f64)) -> Self {
        let n = self.numel();
        let mut re = Vec::with_capacity(n);
        let mut im = Vec::with_capacity(n);
        for i in 0..n {
            let (a, b) = self.get(i);
            let (x, y) = f(a, b);
            re.push(dtype.quantize(x));
            im.push(dtype.quantize(y));
        }
        Self {
            shape: self.shape.clone(),
            dtype,
            re,
            im: dtype.is_complex().then_some(im),
        }
    }
}

/// Broadcast two arrays together and combine them elementwise
pub fn zip_broadcast(
    a: &HostArray,
    b: &HostArray,
    dtype: DType,
    f: impl Fn((f64, f64), (f64, f64)) -> (f64, f64),
) -> Result<HostArray> {
    let shape = broadcast_shape(a.shape(), b.shape())?;
    let ia = broadcast_indices(a.shape(), &shape);
    let ib = broadcast_indices(b.shape(), &shape);
    let n = numel(&shape);
    let mut re = Vec::with_capacity(n);
    let mut im = Vec::with_capacity(n);
    for k in 0..n {
        let (x, y) = f(a.get(ia[k]), b.get(ib[k]));
        re.push(x);
        im.push(y);
    }
    HostArray::from_parts(shape, dtype, re, dtype.is_complex().then_some(im))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_quantised() {
        let a = HostArray::new([3], DType::U8, vec![1.0, 256.0, -1.0]).unwrap();
        assert_eq!(a.re(), &[1.0, 0.0, 255.0]);
        assert!(HostArray::new([2], DType::F32, vec![1.0]).is_err());
    }

    #[test]
    fn test_astype_complex() {
        let a = HostArray::new([2], DType::F64, vec![1.5, -2.0]).unwrap();
        let c = a.astype(DType::Complex64);
        assert_eq!(c.im(), Some(&[0.0, 0.0][..]));
        assert_eq!(c.astype(DType::I32).re(), &[1.0, -2.0]);
    }

    #[test]
    fn test_broadcast_to() {
        let a = HostArray::new([2, 1], DType::I64, vec![1.0, 2.0]).unwrap();
        let b = a.broadcast_to(&[2, 3]).unwrap();
        assert_eq!(b.re(), &[1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
        assert!(a.broadcast_to(&[3, 3]).is_err());
    }

    #[test]
    fn test_zip_broadcast() {
        let a = HostArray::new([3], DType::F32, vec![1.0, 2.0, 3.0]).unwrap();
        let b = HostArray::from_scalar(Scalar::Float(10.0), DType::F32);
        let c = zip_broadcast(&a, &b, DType::F32, |x, y| (x.0 + y.0, 0.0)).unwrap();
        assert_eq!(c.re(), &[11.0, 12.0, 13.0]);
    }
}
