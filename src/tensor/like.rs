//! Array-like inputs accepted by every public operator

use super::handle::Array;
use super::host::HostArray;
use super::shape::Shape;
use crate::backend::NativeRef;
use crate::dtype::{result_type, DType, Defaults, Element, Operand, Scalar};
use crate::error::{Error, Result};

/// Anything an operator accepts where an array is expected
#[derive(Clone, Debug)]
pub enum ArrayLike {
    /// An existing array handle
    Handle(Array),
    /// A backend-native array (escape hatch)
    Native(NativeRef),
    /// A plain value
    Scalar(Scalar),
    /// A nested sequence of plain values
    Nested(Nested),
    /// Host data with a fixed dtype
    Host(HostArray),
}

/// Nested sequence of plain values, e.g. `[[1, 2], [3, 4]]`
#[derive(Clone, Debug, PartialEq)]
pub enum Nested {
    /// A single value
    Leaf(Scalar),
    /// A sequence of equally shaped children
    List(Vec<Nested>),
}

/// Capability protocol for foreign arrays.
///
/// Any type that can report a shape and iterate its elements in row-major
/// order can be handed to an operator via [`ArrayLike::from_foreign`].
pub trait ArrayInterface {
    /// Dimensions
    fn shape(&self) -> Vec<usize>;

    /// Elements in row-major order
    fn elements(&self) -> Box<dyn Iterator<Item = Scalar> + '_>;

    /// Element dtype, if the foreign type declares one
    fn dtype(&self) -> Option<DType> {
        None
    }
}

impl Nested {
    /// Shape of a rectangular nesting
    pub fn shape(&self) -> Result<Shape> {
        match self {
            Self::Leaf(_) => Ok(Shape::scalar()),
            Self::List(items) => {
                let Some(first) = items.first() else {
                    return Ok(Shape::from([0]));
                };
                let inner = first.shape()?;
                for item in &items[1..] {
                    let s = item.shape()?;
                    if s != inner {
                        return Err(Error::shape_mismatch(&inner, &s));
                    }
                }
                Ok(std::iter::once(items.len()).chain(inner.iter().copied()).collect())
            }
        }
    }

    fn leaves(&self, out: &mut Vec<Scalar>) {
        match self {
            Self::Leaf(s) => out.push(*s),
            Self::List(items) => items.iter().for_each(|i| i.leaves(out)),
        }
    }

    /// Materialise as host data; the dtype is inferred from the values
    /// under `defaults` unless given
    pub fn to_host(&self, dtype: Option<DType>, defaults: &Defaults) -> Result<HostArray> {
        let shape = self.shape()?;
        let mut values = Vec::with_capacity(shape.numel());
        self.leaves(&mut values);
        scalars_to_host(shape, &values, dtype, defaults)
    }
}

fn scalars_to_host(
    shape: Shape,
    values: &[Scalar],
    dtype: Option<DType>,
    defaults: &Defaults,
) -> Result<HostArray> {
    let dtype = match dtype {
        Some(d) => d,
        None if values.is_empty() => defaults.float,
        None => {
            let operands: Vec<_> = values.iter().map(|s| Operand::Scalar(*s)).collect();
            result_type(&operands, defaults)?
        }
    };
    let (re, im): (Vec<f64>, Vec<f64>) = values.iter().map(|s| s.as_complex()).unzip();
    HostArray::from_parts(shape, dtype, re, dtype.is_complex().then_some(im))
}

impl ArrayLike {
    /// Convert a foreign array through the capability protocol
    pub fn from_foreign(foreign: &dyn ArrayInterface, defaults: &Defaults) -> Result<Self> {
        let shape = Shape::from(foreign.shape());
        let values: Vec<Scalar> = foreign.elements().collect();
        if values.len() != shape.numel() {
            return Err(Error::shape_mismatch(&shape, &[values.len()]));
        }
        scalars_to_host(shape, &values, foreign.dtype(), defaults).map(Self::Host)
    }

    /// Typed host data
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize]) -> Result<Self> {
        let (re, im): (Vec<f64>, Vec<f64>) = data.iter().map(|v| v.to_parts()).unzip();
        HostArray::from_parts(shape, T::DTYPE, re, T::DTYPE.is_complex().then_some(im))
            .map(Self::Host)
    }

    /// Whether this is a plain value rather than an array
    #[inline]
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    /// Dtype carried by the input, if it fixes one
    pub fn dtype(&self) -> Option<DType> {
        match self {
            Self::Handle(a) => Some(a.dtype()),
            Self::Native(n) => Some(n.dtype()),
            Self::Host(h) => Some(h.dtype()),
            Self::Scalar(_) | Self::Nested(_) => None,
        }
    }

    /// Short description for error messages, e.g. `f32[2, 3]`
    pub fn describe(&self) -> String {
        match self {
            Self::Handle(a) => format!("{}{}", a.dtype().short_name(), a.shape()),
            Self::Native(n) => format!("{}{}", n.dtype().short_name(), n.shape()),
            Self::Host(h) => format!("{}{}", h.dtype().short_name(), h.shape()),
            Self::Scalar(s) => format!("scalar({s})"),
            Self::Nested(n) => match n.shape() {
                Ok(shape) => format!("nested{shape}"),
                Err(_) => "nested[ragged]".to_string(),
            },
        }
    }
}

impl From<Array> for ArrayLike {
    fn from(a: Array) -> Self {
        Self::Handle(a)
    }
}

impl From<&Array> for ArrayLike {
    fn from(a: &Array) -> Self {
        Self::Handle(a.clone())
    }
}

impl From<NativeRef> for ArrayLike {
    fn from(n: NativeRef) -> Self {
        Self::Native(n)
    }
}

impl From<HostArray> for ArrayLike {
    fn from(h: HostArray) -> Self {
        Self::Host(h)
    }
}

impl From<Nested> for ArrayLike {
    fn from(n: Nested) -> Self {
        Self::Nested(n)
    }
}

impl From<Scalar> for ArrayLike {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

macro_rules! like_from_values {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ArrayLike {
                fn from(v: $t) -> Self {
                    Self::Scalar(Scalar::from(v))
                }
            }

            impl From<$t> for Nested {
                fn from(v: $t) -> Self {
                    Self::Leaf(Scalar::from(v))
                }
            }

            impl From<Vec<$t>> for ArrayLike {
                fn from(v: Vec<$t>) -> Self {
                    Self::Nested(Nested::from(v))
                }
            }

            impl From<&[$t]> for ArrayLike {
                fn from(v: &[$t]) -> Self {
                    Self::Nested(Nested::List(v.iter().map(|x| Nested::from(*x)).collect()))
                }
            }

            impl<const N: usize> From<[$t; N]> for ArrayLike {
                fn from(v: [$t; N]) -> Self {
                    Self::Nested(Nested::List(v.into_iter().map(Nested::from).collect()))
                }
            }

            impl<const N: usize, const M: usize> From<[[$t; M]; N]> for ArrayLike {
                fn from(v: [[$t; M]; N]) -> Self {
                    Self::Nested(Nested::List(
                        v.into_iter()
                            .map(|row| Nested::List(row.into_iter().map(Nested::from).collect()))
                            .collect(),
                    ))
                }
            }

            impl From<Vec<Vec<$t>>> for ArrayLike {
                fn from(v: Vec<Vec<$t>>) -> Self {
                    Self::Nested(Nested::List(v.into_iter().map(Nested::from).collect()))
                }
            }
        )*
    };
}

like_from_values!(bool, i32, i64, f32, f64);

impl<T: Into<Nested>> From<Vec<T>> for Nested {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_materialisation() {
        let d = Defaults::default();
        let like = ArrayLike::from(vec![vec![1, 2], vec![3, 4]]);
        let ArrayLike::Nested(n) = like else { panic!("expected nested") };
        let host = n.to_host(None, &d).unwrap();
        assert_eq!(host.shape().as_slice(), &[2, 2]);
        assert_eq!(host.dtype(), DType::I64);

        let mixed = Nested::from(vec![Nested::from(1i64), Nested::from(2.5f64)]);
        assert_eq!(mixed.to_host(None, &d).unwrap().dtype(), DType::F32);

        let wide = Defaults { float: DType::F64, int: DType::I32 };
        assert_eq!(mixed.to_host(None, &wide).unwrap().dtype(), DType::F64);
        let flags = Nested::from(vec![Nested::from(true), Nested::from(3i64)]);
        assert_eq!(flags.to_host(None, &wide).unwrap().dtype(), DType::I32);
    }

    #[test]
    fn test_ragged_nesting_fails() {
        let ragged = Nested::List(vec![Nested::from(vec![1i64, 2]), Nested::from(vec![3i64])]);
        assert!(ragged.to_host(None, &Defaults::default()).unwrap_err().is_shape_error());
    }

    struct Foreign(Vec<f64>);

    impl ArrayInterface for Foreign {
        fn shape(&self) -> Vec<usize> {
            vec![self.0.len()]
        }

        fn elements(&self) -> Box<dyn Iterator<Item = Scalar> + '_> {
            Box::new(self.0.iter().map(|&v| Scalar::Float(v)))
        }
    }

    #[test]
    fn test_foreign_protocol() {
        let like = ArrayLike::from_foreign(&Foreign(vec![1.0, 2.0]), &Defaults::default()).unwrap();
        assert_eq!(like.dtype(), Some(DType::F32));
        assert_eq!(like.describe(), "f32[2]");
    }
}
