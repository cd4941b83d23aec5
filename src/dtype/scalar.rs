//! Plain numeric values that travel alongside arrays

use super::{DType, DTypeCategory};
use std::fmt;

/// A single numeric value not (yet) wrapped in an array
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Scalar {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Real floating point value
    Float(f64),
    /// Complex value (re, im)
    Complex(f64, f64),
}

/// Fallback dtypes used when a value carries no dtype of its own
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Defaults {
    /// Float fallback
    pub float: DType,
    /// Integer fallback
    pub int: DType,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            float: DType::F32,
            int: DType::I64,
        }
    }
}

impl Defaults {
    /// Complex fallback: the complex dtype whose components match the float fallback
    pub fn complex(&self) -> DType {
        if self.float == DType::F64 {
            DType::Complex128
        } else {
            DType::Complex64
        }
    }
}

impl Scalar {
    /// Category of the value's representation
    pub const fn kind(self) -> DTypeCategory {
        match self {
            Self::Bool(_) => DTypeCategory::Bool,
            Self::Int(_) => DTypeCategory::SignedInt,
            Self::Float(_) => DTypeCategory::Float,
            Self::Complex(..) => DTypeCategory::Complex,
        }
    }

    /// Dtype the value takes on its own, from the defaults
    pub fn natural_dtype(self, defaults: &Defaults) -> DType {
        match self {
            Self::Bool(_) => DType::Bool,
            Self::Int(_) => defaults.int,
            Self::Float(_) => defaults.float,
            Self::Complex(..) => defaults.complex(),
        }
    }

    /// Whether the value is representable in `dtype` without wrapping or overflow
    pub fn fits(self, dtype: DType) -> bool {
        match self {
            Self::Bool(_) => true,
            Self::Int(v) => {
                let v = v as f64;
                v >= dtype.min_value() && v <= dtype.max_value()
            }
            Self::Float(v) => {
                !v.is_finite() || (v >= dtype.min_value() && v <= dtype.max_value())
            }
            Self::Complex(re, im) => Self::Float(re).fits(dtype) && Self::Float(im).fits(dtype),
        }
    }

    /// Real part as f64 (bool maps to 0/1)
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
            Self::Complex(re, _) => re,
        }
    }

    /// Value as (re, im)
    pub fn as_complex(self) -> (f64, f64) {
        match self {
            Self::Complex(re, im) => (re, im),
            other => (other.as_f64(), 0.0),
        }
    }

    /// Value as i64, truncating floats
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Int(v) => v,
            other => other.as_f64() as i64,
        }
    }

    /// Rebuild a scalar from a stored element of `dtype`
    pub fn from_element(dtype: DType, re: f64, im: f64) -> Self {
        match dtype.category() {
            DTypeCategory::Bool => Self::Bool(re != 0.0),
            DTypeCategory::SignedInt | DTypeCategory::UnsignedInt => Self::Int(re as i64),
            DTypeCategory::Float => Self::Float(re),
            DTypeCategory::Complex => Self::Complex(re, im),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Complex(re, im) => write!(f, "({re}{im:+}j)"),
        }
    }
}

macro_rules! scalar_from {
    ($variant:ident, $cast:ty; $($t:ty),*) => {
        $(
            impl From<$t> for Scalar {
                #[inline]
                fn from(v: $t) -> Self {
                    Self::$variant(v as $cast)
                }
            }
        )*
    };
}

scalar_from!(Int, i64; i8, i16, i32, i64, u8, u16, u32, usize, isize);
scalar_from!(Float, f64; f32, f64);

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<(f64, f64)> for Scalar {
    fn from((re, im): (f64, f64)) -> Self {
        Self::Complex(re, im)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_dtype() {
        let d = Defaults::default();
        assert_eq!(Scalar::from(1).natural_dtype(&d), DType::I64);
        assert_eq!(Scalar::from(1.5).natural_dtype(&d), DType::F32);
        assert_eq!(Scalar::from(true).natural_dtype(&d), DType::Bool);
        assert_eq!(Scalar::Complex(1.0, 2.0).natural_dtype(&d), DType::Complex64);
    }

    #[test]
    fn test_fits() {
        assert!(Scalar::Int(255).fits(DType::U8));
        assert!(!Scalar::Int(256).fits(DType::U8));
        assert!(!Scalar::Int(-1).fits(DType::U8));
        assert!(Scalar::Float(f64::INFINITY).fits(DType::F16));
        assert!(!Scalar::Float(1e6).fits(DType::F16));
    }

    #[test]
    fn test_display() {
        assert_eq!(Scalar::Bool(true).to_string(), "True");
        assert_eq!(Scalar::Float(2.0).to_string(), "2.0");
        assert_eq!(Scalar::Complex(1.0, -2.0).to_string(), "(1-2j)");
    }
}
