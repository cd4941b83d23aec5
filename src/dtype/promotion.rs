//! Type promotion rules for binary and n-ary operations

use super::{DType, DTypeCategory, Defaults, Scalar};
use crate::error::{Error, Result};

/// An operand taking part in promotion
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Operand {
    /// An array of the given dtype
    Array(DType),
    /// A plain value whose dtype is inferred against the arrays
    Scalar(Scalar),
}

/// Promote two dtypes to a common dtype
///
/// Follows the array-API lattice:
/// - Same category widens to the larger width
/// - Mixed signed/unsigned promotes to a signed type wide enough for both,
///   falling back to float64 when no integer is wide enough
/// - Mixed int/float promotes to a float at least as wide as the integer
/// - Bool is the identity: it takes the other operand's dtype
/// - Anything with complex promotes to a complex type wide enough for both
pub fn promote_types(lhs: DType, rhs: DType) -> DType {
    use DTypeCategory::*;

    if lhs == rhs {
        return lhs;
    }

    match (lhs.category(), rhs.category()) {
        (Bool, _) => rhs,
        (_, Bool) => lhs,
        (SignedInt, SignedInt) | (UnsignedInt, UnsignedInt) | (Float, Float)
            if lhs.bits() != rhs.bits() =>
        {
            if lhs.bits() > rhs.bits() {
                lhs
            } else {
                rhs
            }
        }
        // float16 vs bfloat16: neither holds the other
        (Float, Float) => DType::F32,
        (SignedInt, UnsignedInt) => mixed_int(lhs, rhs),
        (UnsignedInt, SignedInt) => mixed_int(rhs, lhs),
        (Float, SignedInt | UnsignedInt) => float_at_least(lhs, rhs.bits()),
        (SignedInt | UnsignedInt, Float) => float_at_least(rhs, lhs.bits()),
        (Complex, _) => complex_at_least(lhs, rhs),
        (_, Complex) => complex_at_least(rhs, lhs),
        // same category and same width is only possible when lhs == rhs
        _ => lhs,
    }
}

fn mixed_int(signed: DType, unsigned: DType) -> DType {
    let needed = signed.bits().max(unsigned.bits() * 2);
    DType::with_bits(DTypeCategory::SignedInt, needed).unwrap_or(DType::F64)
}

fn float_at_least(float: DType, int_bits: u32) -> DType {
    if float.bits() >= int_bits {
        float
    } else {
        DType::with_bits(DTypeCategory::Float, int_bits).unwrap_or(DType::F64)
    }
}

fn complex_at_least(complex: DType, other: DType) -> DType {
    let component_bits = match other.category() {
        DTypeCategory::Complex => other.real_dtype().bits(),
        DTypeCategory::Bool => 0,
        _ => other.bits(),
    };
    if complex.real_dtype().bits().max(component_bits) > 32 {
        DType::Complex128
    } else {
        DType::Complex64
    }
}

/// Kind rank for scalar inference: bool < int < float < complex
fn scalar_rank(category: DTypeCategory) -> u8 {
    match category {
        DTypeCategory::Bool => 0,
        DTypeCategory::SignedInt | DTypeCategory::UnsignedInt => 1,
        DTypeCategory::Float => 2,
        DTypeCategory::Complex => 3,
    }
}

/// Dtype a plain value takes when combined with an array of dtype `base`.
///
/// A value of the same or lower kind adopts the array's dtype as long as its
/// magnitude fits; otherwise the narrowest dtype of the same kind that holds
/// it is used. A value of a higher kind takes the default dtype of its kind.
fn infer_scalar(value: Scalar, base: DType, defaults: &Defaults) -> DType {
    if scalar_rank(value.kind()) > scalar_rank(base.category()) {
        return value.natural_dtype(defaults);
    }
    if value.fits(base.real_dtype()) {
        return base;
    }
    let candidates: &[DType] = match (value, base.category()) {
        (Scalar::Int(v), DTypeCategory::UnsignedInt) if v >= 0 => {
            &[DType::U8, DType::U16, DType::U32, DType::U64]
        }
        (Scalar::Int(_), _) => &[DType::I8, DType::I16, DType::I32, DType::I64],
        (_, DTypeCategory::Complex) => &[DType::Complex64, DType::Complex128],
        _ => &[DType::F16, DType::F32, DType::F64],
    };
    candidates
        .iter()
        .copied()
        .find(|d| value.fits(d.real_dtype()))
        .unwrap_or_else(|| value.natural_dtype(defaults))
}

/// Result dtype of an operation over arrays and plain values.
///
/// Arrays are promoted among themselves first; each plain value then has its
/// dtype inferred against that result (same-category fast path) before being
/// promoted in. With no arrays at all the result is the configured default
/// dtype of the highest kind among the values.
pub fn result_type(operands: &[Operand], defaults: &Defaults) -> Result<DType> {
    let mut arrays = operands.iter().filter_map(|op| match op {
        Operand::Array(d) => Some(*d),
        Operand::Scalar(_) => None,
    });
    let scalars = operands.iter().filter_map(|op| match op {
        Operand::Scalar(s) => Some(*s),
        Operand::Array(_) => None,
    });

    match arrays.next() {
        Some(first) => {
            let base = arrays.fold(first, promote_types);
            Ok(scalars.fold(base, |acc, s| {
                promote_types(acc, infer_scalar(s, acc, defaults))
            }))
        }
        // values alone take the default dtype of their highest kind
        None => scalars
            .max_by_key(|s| scalar_rank(s.kind()))
            .map(|s| s.natural_dtype(defaults))
            .ok_or_else(|| Error::invalid_argument("operands", "result_type needs at least one operand")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DType::*;

    #[test]
    fn test_same_type_promotion() {
        assert_eq!(promote_types(F32, F32), F32);
        assert_eq!(promote_types(I64, I64), I64);
    }

    #[test]
    fn test_float_promotion() {
        assert_eq!(promote_types(F32, F64), F64);
        assert_eq!(promote_types(F16, F32), F32);
        assert_eq!(promote_types(F16, BF16), F32);
    }

    #[test]
    fn test_int_float_promotion() {
        assert_eq!(promote_types(I8, F16), F16);
        assert_eq!(promote_types(I32, F16), F32);
        assert_eq!(promote_types(I64, F32), F64);
        assert_eq!(promote_types(U16, BF16), BF16);
    }

    #[test]
    fn test_signed_unsigned_promotion() {
        assert_eq!(promote_types(I32, U32), I64);
        assert_eq!(promote_types(I16, U16), I32);
        assert_eq!(promote_types(I8, U8), I16);
        assert_eq!(promote_types(I64, U8), I64);
        assert_eq!(promote_types(I64, U64), F64);
    }

    #[test]
    fn test_bool_is_identity() {
        for d in DType::ALL {
            assert_eq!(promote_types(Bool, d), d);
            assert_eq!(promote_types(d, Bool), d);
        }
    }

    #[test]
    fn test_complex_promotion() {
        assert_eq!(promote_types(Complex64, F64), Complex128);
        assert_eq!(promote_types(Complex64, F16), Complex64);
        assert_eq!(promote_types(I64, Complex64), Complex128);
        assert_eq!(promote_types(Complex64, Complex128), Complex128);
    }

    #[test]
    fn test_promotion_is_commutative_and_idempotent() {
        for a in DType::ALL {
            for b in DType::ALL {
                let ab = promote_types(a, b);
                assert_eq!(ab, promote_types(b, a), "{a} vs {b}");
                assert_eq!(promote_types(ab, b), ab, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_scalar_fast_path() {
        let d = Defaults::default();
        let rt = |ops: &[Operand]| result_type(ops, &d).unwrap();

        assert_eq!(rt(&[Operand::Array(U8), Operand::Scalar(Scalar::Int(1))]), U8);
        assert_eq!(rt(&[Operand::Array(U8), Operand::Scalar(Scalar::Int(300))]), U16);
        assert_eq!(rt(&[Operand::Array(U8), Operand::Scalar(Scalar::Int(-1))]), I16);
        assert_eq!(rt(&[Operand::Array(F16), Operand::Scalar(Scalar::Float(2.5))]), F16);
        assert_eq!(rt(&[Operand::Array(F16), Operand::Scalar(Scalar::Float(1e6))]), F32);
        assert_eq!(rt(&[Operand::Array(I32), Operand::Scalar(Scalar::Float(0.5))]), F32);
        assert_eq!(rt(&[Operand::Array(I8), Operand::Scalar(Scalar::Bool(true))]), I8);
        assert_eq!(rt(&[Operand::Scalar(Scalar::Int(1)), Operand::Scalar(Scalar::Float(1.0))]), F32);
        assert_eq!(rt(&[Operand::Scalar(Scalar::Bool(true)), Operand::Scalar(Scalar::Int(7))]), I64);
        assert_eq!(
            rt(&[Operand::Scalar(Scalar::Int(1)), Operand::Scalar(Scalar::Complex(0.0, 1.0))]),
            d.complex()
        );
        let wide = Defaults { float: F64, ..Defaults::default() };
        assert_eq!(
            result_type(&[Operand::Scalar(Scalar::Int(1)), Operand::Scalar(Scalar::Float(2.5))], &wide).unwrap(),
            F64
        );
        assert!(result_type(&[], &d).is_err());
    }
}
