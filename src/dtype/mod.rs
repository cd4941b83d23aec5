//! Data type system for unitensor arrays
//!
//! This module provides the backend-independent `DType` enum, category
//! predicates, dtype sets, scalar values, type promotion and casting rules.
//! Operators resolve dtypes through this canonical enum only; backend-native
//! type names are mapped onto it by the backend descriptor.

mod casting;
pub mod complex;
mod element;
mod promotion;
mod scalar;

pub use casting::{can_cast, Casting};
pub use complex::{Complex128, Complex64};
pub use element::Element;
pub use promotion::{promote_types, result_type, Operand};
pub use scalar::{Defaults, Scalar};

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// DType Enum
// ============================================================================

/// Category tag of a dtype
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DTypeCategory {
    /// Boolean
    Bool,
    /// Unsigned integers
    UnsignedInt,
    /// Signed integers
    SignedInt,
    /// Real floating point
    Float,
    /// Complex floating point
    Complex,
}

impl DTypeCategory {
    /// Kind ordering used by the `same_kind` casting rule: bool < uint < int < float < complex
    #[inline]
    pub const fn kind_rank(self) -> u8 {
        match self {
            Self::Bool => 0,
            Self::UnsignedInt => 1,
            Self::SignedInt => 2,
            Self::Float => 3,
            Self::Complex => 4,
        }
    }
}

/// Canonical element types understood by every backend
///
/// # Discriminant Values
///
/// - Floats: 0-9 (F64=0, F32=1, F16=2, BF16=3)
/// - Signed ints: 10-19 (I64=10, I32=11, I16=12, I8=13)
/// - Unsigned ints: 20-29 (U64=20, U32=21, U16=22, U8=23)
/// - Bool: 30
/// - Complex: 40-49 (Complex64=40, Complex128=41)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
#[repr(u8)]
pub enum DType {
    /// 64-bit floating point
    F64 = 0,
    /// 32-bit floating point
    F32 = 1,
    /// 16-bit floating point (IEEE 754)
    F16 = 2,
    /// 16-bit brain floating point
    BF16 = 3,

    /// 64-bit signed integer
    I64 = 10,
    /// 32-bit signed integer
    I32 = 11,
    /// 16-bit signed integer
    I16 = 12,
    /// 8-bit signed integer
    I8 = 13,

    /// 64-bit unsigned integer
    U64 = 20,
    /// 32-bit unsigned integer
    U32 = 21,
    /// 16-bit unsigned integer
    U16 = 22,
    /// 8-bit unsigned integer
    U8 = 23,

    /// Boolean type
    Bool = 30,

    /// 64-bit complex (two f32: re, im)
    Complex64 = 40,
    /// 128-bit complex (two f64: re, im)
    Complex128 = 41,
}

impl DType {
    /// Every canonical dtype, narrowest first within each category
    pub const ALL: [DType; 15] = [
        DType::Bool,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::F16,
        DType::BF16,
        DType::F32,
        DType::F64,
        DType::Complex64,
        DType::Complex128,
    ];

    /// Category tag
    #[inline]
    pub const fn category(self) -> DTypeCategory {
        match self {
            Self::Bool => DTypeCategory::Bool,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => DTypeCategory::SignedInt,
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => DTypeCategory::UnsignedInt,
            Self::F16 | Self::BF16 | Self::F32 | Self::F64 => DTypeCategory::Float,
            Self::Complex64 | Self::Complex128 => DTypeCategory::Complex,
        }
    }

    /// Width in bits (complex types count both components)
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 8,
            Self::I16 | Self::U16 | Self::F16 | Self::BF16 => 16,
            Self::I32 | Self::U32 | Self::F32 => 32,
            Self::I64 | Self::U64 | Self::F64 | Self::Complex64 => 64,
            Self::Complex128 => 128,
        }
    }

    /// Size of one element in bytes
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        (self.bits() / 8) as usize
    }

    /// Returns true if this is a real floating point type
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self.category(), DTypeCategory::Float)
    }

    /// Returns true if this is a complex number type
    #[inline]
    pub const fn is_complex(self) -> bool {
        matches!(self.category(), DTypeCategory::Complex)
    }

    /// Returns true if this is a signed integer type
    #[inline]
    pub const fn is_signed_int(self) -> bool {
        matches!(self.category(), DTypeCategory::SignedInt)
    }

    /// Returns true if this is an unsigned integer type
    #[inline]
    pub const fn is_unsigned_int(self) -> bool {
        matches!(self.category(), DTypeCategory::UnsignedInt)
    }

    /// Returns true if this is any integer type (signed or unsigned)
    #[inline]
    pub const fn is_int(self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    /// Returns true if this is a boolean type
    #[inline]
    pub const fn is_bool(self) -> bool {
        matches!(self, Self::Bool)
    }

    /// Returns true if this is a float or complex type
    #[inline]
    pub const fn is_inexact(self) -> bool {
        self.is_float() || self.is_complex()
    }

    /// Returns true if this type can represent negative values
    #[inline]
    pub const fn is_signed(self) -> bool {
        self.is_float() || self.is_signed_int() || self.is_complex()
    }

    /// Component dtype of a complex type, or the dtype itself otherwise
    #[inline]
    pub const fn real_dtype(self) -> Self {
        match self {
            Self::Complex64 => Self::F32,
            Self::Complex128 => Self::F64,
            other => other,
        }
    }

    /// Look up the dtype with a given category and bit width
    pub fn with_bits(category: DTypeCategory, bits: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| {
            d.category() == category && d.bits() == bits && *d != DType::BF16
        })
    }

    /// Canonical name (e.g. "float32", "int64")
    pub const fn name(self) -> &'static str {
        match self {
            Self::F64 => "float64",
            Self::F32 => "float32",
            Self::F16 => "float16",
            Self::BF16 => "bfloat16",
            Self::I64 => "int64",
            Self::I32 => "int32",
            Self::I16 => "int16",
            Self::I8 => "int8",
            Self::U64 => "uint64",
            Self::U32 => "uint32",
            Self::U16 => "uint16",
            Self::U8 => "uint8",
            Self::Bool => "bool",
            Self::Complex64 => "complex64",
            Self::Complex128 => "complex128",
        }
    }

    /// Short name for summaries (e.g. "f32", "i64")
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::F16 => "f16",
            Self::BF16 => "bf16",
            Self::I64 => "i64",
            Self::I32 => "i32",
            Self::I16 => "i16",
            Self::I8 => "i8",
            Self::U64 => "u64",
            Self::U32 => "u32",
            Self::U16 => "u16",
            Self::U8 => "u8",
            Self::Bool => "bool",
            Self::Complex64 => "c64",
            Self::Complex128 => "c128",
        }
    }

    /// Resolve a canonical or short name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.name() == name || d.short_name() == name)
            .or(match name {
                "half" => Some(Self::F16),
                "float" | "single" => Some(Self::F32),
                "double" => Some(Self::F64),
                "int" | "long" => Some(Self::I64),
                "short" => Some(Self::I16),
                "boolean" => Some(Self::Bool),
                "cfloat" => Some(Self::Complex64),
                "cdouble" => Some(Self::Complex128),
                _ => None,
            })
    }

    /// Minimum value representable by this dtype (as f64)
    ///
    /// For complex types, returns the minimum value of each component
    pub fn min_value(self) -> f64 {
        match self {
            Self::F64 | Self::Complex128 => f64::MIN,
            Self::F32 | Self::Complex64 => f32::MIN as f64,
            Self::F16 => half::f16::MIN.to_f64(),
            Self::BF16 => half::bf16::MIN.to_f64(),
            Self::I64 => i64::MIN as f64,
            Self::I32 => i32::MIN as f64,
            Self::I16 => i16::MIN as f64,
            Self::I8 => i8::MIN as f64,
            Self::U64 | Self::U32 | Self::U16 | Self::U8 | Self::Bool => 0.0,
        }
    }

    /// Maximum value representable by this dtype (as f64)
    pub fn max_value(self) -> f64 {
        match self {
            Self::F64 | Self::Complex128 => f64::MAX,
            Self::F32 | Self::Complex64 => f32::MAX as f64,
            Self::F16 => half::f16::MAX.to_f64(),
            Self::BF16 => half::bf16::MAX.to_f64(),
            Self::I64 => i64::MAX as f64,
            Self::I32 => i32::MAX as f64,
            Self::I16 => i16::MAX as f64,
            Self::I8 => i8::MAX as f64,
            Self::U64 => u64::MAX as f64,
            Self::U32 => u32::MAX as f64,
            Self::U16 => u16::MAX as f64,
            Self::U8 => u8::MAX as f64,
            Self::Bool => 1.0,
        }
    }

    /// Machine epsilon of a float or complex dtype's component
    pub fn epsilon(self) -> Option<f64> {
        match self.real_dtype() {
            Self::F64 => Some(f64::EPSILON),
            Self::F32 => Some(f32::EPSILON as f64),
            Self::F16 => Some(half::f16::EPSILON.to_f64()),
            Self::BF16 => Some(half::bf16::EPSILON.to_f64()),
            _ => None,
        }
    }

    /// Round a value into the set representable by this dtype.
    ///
    /// Integers truncate toward zero and wrap modulo 2^bits; floats round to
    /// the nearest representable value; bool maps any non-zero (or NaN) to 1.
    /// Complex dtypes quantise each component with their real dtype.
    pub fn quantize(self, v: f64) -> f64 {
        match self {
            Self::F64 | Self::Complex128 => v,
            Self::F32 | Self::Complex64 => v as f32 as f64,
            Self::F16 => half::f16::from_f64(v).to_f64(),
            Self::BF16 => half::bf16::from_f64(v).to_f64(),
            Self::Bool => {
                if v != 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            int => wrap_int(v, int.bits(), int.is_signed_int()),
        }
    }
}

fn wrap_int(v: f64, bits: u32, signed: bool) -> f64 {
    if !v.is_finite() {
        return 0.0;
    }
    let t = v.trunc() as i128;
    let modulus: i128 = 1 << bits;
    let mut x = t.rem_euclid(modulus);
    if signed && x >= modulus / 2 {
        x -= modulus;
    }
    x as f64
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| Error::invalid_argument("dtype", format!("unknown dtype '{s}'")))
    }
}

impl TryFrom<String> for DType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Width in bits of a dtype
#[inline]
pub fn dtype_bits(dtype: DType) -> u32 {
    dtype.bits()
}

// ============================================================================
// DTypeSet
// ============================================================================

/// Set of dtypes for efficient membership testing
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DTypeSet {
    bits: u64,
}

impl DTypeSet {
    /// Empty set
    pub const EMPTY: Self = Self { bits: 0 };

    /// All floating point types
    pub const FLOATS: Self = Self {
        bits: (1 << DType::F64 as u8)
            | (1 << DType::F32 as u8)
            | (1 << DType::F16 as u8)
            | (1 << DType::BF16 as u8),
    };

    /// All signed integer types
    pub const SIGNED_INTS: Self = Self {
        bits: (1 << DType::I64 as u8)
            | (1 << DType::I32 as u8)
            | (1 << DType::I16 as u8)
            | (1 << DType::I8 as u8),
    };

    /// All unsigned integer types
    pub const UNSIGNED_INTS: Self = Self {
        bits: (1 << DType::U64 as u8)
            | (1 << DType::U32 as u8)
            | (1 << DType::U16 as u8)
            | (1 << DType::U8 as u8),
    };

    /// All integer types
    pub const INTS: Self = Self {
        bits: Self::SIGNED_INTS.bits | Self::UNSIGNED_INTS.bits,
    };

    /// All complex types
    pub const COMPLEX: Self = Self {
        bits: (1 << DType::Complex64 as u8) | (1 << DType::Complex128 as u8),
    };

    /// Boolean only
    pub const BOOL: Self = Self {
        bits: 1 << DType::Bool as u8,
    };

    /// Half-precision floats
    pub const HALF: Self = Self {
        bits: (1 << DType::F16 as u8) | (1 << DType::BF16 as u8),
    };

    /// All numeric types (ints + floats + complex)
    pub const NUMERIC: Self = Self {
        bits: Self::INTS.bits | Self::FLOATS.bits | Self::COMPLEX.bits,
    };

    /// Every dtype
    pub const ALL: Self = Self {
        bits: Self::NUMERIC.bits | Self::BOOL.bits,
    };

    /// Create a set containing a single dtype
    #[inline]
    pub const fn single(dtype: DType) -> Self {
        Self {
            bits: 1 << dtype as u8,
        }
    }

    /// Create a set from a list of dtypes
    pub fn of(dtypes: &[DType]) -> Self {
        dtypes.iter().copied().collect()
    }

    /// Check if the set contains a dtype
    #[inline]
    pub const fn contains(self, dtype: DType) -> bool {
        self.bits & (1 << dtype as u8) != 0
    }

    /// Union of two sets
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Intersection of two sets
    #[inline]
    pub const fn intersection(self, other: Self) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    /// Set difference
    #[inline]
    pub const fn difference(self, other: Self) -> Self {
        Self {
            bits: self.bits & !other.bits,
        }
    }

    /// Check if set is empty
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Members in `DType::ALL` order
    pub fn iter(self) -> impl Iterator<Item = DType> {
        DType::ALL.into_iter().filter(move |d| self.contains(*d))
    }

    /// Closest member able to stand in for `dtype`.
    ///
    /// Prefers the narrowest member that holds every value of `dtype`, then
    /// the widest narrower member of the same category. An integer is only
    /// held by a float whose mantissa is wider than the integer.
    pub fn nearest(self, dtype: DType) -> Option<DType> {
        if self.contains(dtype) {
            return Some(dtype);
        }
        self.iter()
            .filter(|&d| can_cast(dtype, d, Casting::Safe))
            .min_by_key(|d| d.bits())
            .or_else(|| {
                self.iter()
                    .filter(|d| d.category() == dtype.category() && d.bits() < dtype.bits())
                    .max_by_key(|d| d.bits())
            })
    }
}

impl FromIterator<DType> for DTypeSet {
    fn from_iter<I: IntoIterator<Item = DType>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::EMPTY, |set, d| set.union(Self::single(d)))
    }
}

// ============================================================================
// Type information
// ============================================================================

/// Machine limits of a floating point dtype
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FloatInfo {
    /// Width in bits
    pub bits: u32,
    /// Machine epsilon
    pub eps: f64,
    /// Largest finite value
    pub max: f64,
    /// Smallest finite value
    pub min: f64,
    /// Smallest positive normal value
    pub smallest_normal: f64,
}

/// Machine limits of an integer dtype
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntInfo {
    /// Width in bits
    pub bits: u32,
    /// Smallest value
    pub min: i128,
    /// Largest value
    pub max: i128,
}

/// Machine limits of a float or complex dtype
pub fn finfo(dtype: DType) -> Result<FloatInfo> {
    let real = dtype.real_dtype();
    let smallest_normal = match real {
        DType::F64 => f64::MIN_POSITIVE,
        DType::F32 => f32::MIN_POSITIVE as f64,
        DType::F16 => half::f16::MIN_POSITIVE.to_f64(),
        DType::BF16 => half::bf16::MIN_POSITIVE.to_f64(),
        _ => {
            return Err(Error::invalid_argument(
                "dtype",
                format!("finfo requires a float dtype, got {dtype}"),
            ))
        }
    };
    Ok(FloatInfo {
        bits: real.bits(),
        eps: real.epsilon().unwrap_or(f64::EPSILON),
        max: real.max_value(),
        min: real.min_value(),
        smallest_normal,
    })
}

/// Machine limits of an integer dtype
pub fn iinfo(dtype: DType) -> Result<IntInfo> {
    if !dtype.is_int() {
        return Err(Error::invalid_argument(
            "dtype",
            format!("iinfo requires an integer dtype, got {dtype}"),
        ));
    }
    let bits = dtype.bits();
    let (min, max) = if dtype.is_signed_int() {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    } else {
        (0, (1i128 << bits) - 1)
    };
    Ok(IntInfo { bits, min, max })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_size() {
        assert_eq!(DType::F64.size_in_bytes(), 8);
        assert_eq!(DType::F16.size_in_bytes(), 2);
        assert_eq!(DType::Bool.size_in_bytes(), 1);
        assert_eq!(DType::Complex128.size_in_bytes(), 16);
        assert_eq!(dtype_bits(DType::I32), 32);
    }

    #[test]
    fn test_dtype_categories() {
        assert!(DType::F32.is_float());
        assert!(!DType::I32.is_float());
        assert!(DType::I32.is_signed_int());
        assert!(DType::U32.is_unsigned_int());
        assert!(!DType::U32.is_signed());
        assert!(DType::Complex64.is_complex());
        assert_eq!(DType::Complex64.real_dtype(), DType::F32);
        assert_eq!(DType::Bool.category(), DTypeCategory::Bool);
    }

    #[test]
    fn test_names_round_trip() {
        for d in DType::ALL {
            assert_eq!(DType::from_name(d.name()), Some(d));
            assert_eq!(DType::from_name(d.short_name()), Some(d));
        }
        assert_eq!("double".parse::<DType>().unwrap(), DType::F64);
        assert!("float128".parse::<DType>().is_err());
    }

    #[test]
    fn test_with_bits() {
        assert_eq!(DType::with_bits(DTypeCategory::Float, 16), Some(DType::F16));
        assert_eq!(DType::with_bits(DTypeCategory::SignedInt, 64), Some(DType::I64));
        assert_eq!(DType::with_bits(DTypeCategory::UnsignedInt, 128), None);
    }

    #[test]
    fn test_quantize() {
        assert_eq!(DType::U8.quantize(257.0), 1.0);
        assert_eq!(DType::I8.quantize(128.0), -128.0);
        assert_eq!(DType::I32.quantize(-2.7), -2.0);
        assert_eq!(DType::Bool.quantize(-3.0), 1.0);
        assert_eq!(DType::F32.quantize(0.1), 0.1f32 as f64);
        assert_eq!(DType::I64.quantize(f64::NAN), 0.0);
    }

    #[test]
    fn test_dtype_set() {
        assert!(DTypeSet::FLOATS.contains(DType::F32));
        assert!(!DTypeSet::FLOATS.contains(DType::I32));
        assert!(DTypeSet::INTS.contains(DType::U8));
        assert!(DTypeSet::ALL.contains(DType::Bool));
        let set = DTypeSet::of(&[DType::F64, DType::I64]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![DType::I64, DType::F64]);
        assert!(set.difference(DTypeSet::FLOATS).contains(DType::I64));
    }

    #[test]
    fn test_nearest() {
        let no_half = DTypeSet::ALL.difference(DTypeSet::HALF);
        assert_eq!(no_half.nearest(DType::F16), Some(DType::F32));
        let no_wide_uint = DTypeSet::ALL.difference(DTypeSet::of(&[DType::U16, DType::U32]));
        assert_eq!(no_wide_uint.nearest(DType::U16), Some(DType::I32));
        let floats_and_i8 = DTypeSet::of(&[DType::F16, DType::F32, DType::F64, DType::I8]);
        assert_eq!(floats_and_i8.nearest(DType::U8), Some(DType::F16));
        assert_eq!(floats_and_i8.nearest(DType::U16), Some(DType::F32));
        assert_eq!(floats_and_i8.nearest(DType::I32), Some(DType::F64));
        assert_eq!(DTypeSet::of(&[DType::F16, DType::I8]).nearest(DType::I16), Some(DType::I8));
        let narrow = DTypeSet::of(&[DType::F32, DType::I32, DType::Complex64]);
        assert_eq!(narrow.nearest(DType::F64), Some(DType::F32));
        assert_eq!(narrow.nearest(DType::Complex128), Some(DType::Complex64));
        assert_eq!(DTypeSet::BOOL.nearest(DType::F32), None);
    }

    #[test]
    fn test_type_info() {
        let info = iinfo(DType::I8).unwrap();
        assert_eq!((info.min, info.max), (-128, 127));
        assert_eq!(iinfo(DType::U16).unwrap().max, 65535);
        assert!(iinfo(DType::F32).is_err());
        let f = finfo(DType::F32).unwrap();
        assert_eq!(f.eps, f32::EPSILON as f64);
        assert_eq!(finfo(DType::Complex128).unwrap().bits, 64);
    }
}
