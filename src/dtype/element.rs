//! Element trait for mapping Rust types to DType

use super::complex::{Complex128, Complex64};
use super::DType;
use bytemuck::{Pod, Zeroable};
use num_traits::AsPrimitive;
use std::fmt;

/// Trait for Rust types that can be read into or out of an array
///
/// This trait connects Rust's type system to the runtime dtype system. Every
/// implementor is `Pod`, so typed buffers can also be viewed as raw bytes.
///
/// Values cross the boundary as an `(re, im)` pair of f64; real types leave
/// the imaginary part at zero.
pub trait Element: Copy + Send + Sync + Pod + Zeroable + fmt::Debug + 'static {
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Convert to an `(re, im)` pair
    fn to_parts(self) -> (f64, f64);

    /// Convert from an `(re, im)` pair, dropping the imaginary part for real types
    fn from_parts(re: f64, im: f64) -> Self;

    /// Convert to f64 (real part for complex types)
    #[inline]
    fn to_f64(self) -> f64 {
        self.to_parts().0
    }

    /// Convert from f64
    #[inline]
    fn from_f64(v: f64) -> Self {
        Self::from_parts(v, 0.0)
    }
}

macro_rules! impl_real_element {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const DTYPE: DType = DType::$dtype;

                #[inline]
                fn to_parts(self) -> (f64, f64) {
                    (AsPrimitive::<f64>::as_(self), 0.0)
                }

                #[inline]
                fn from_parts(re: f64, _im: f64) -> Self {
                    AsPrimitive::<$t>::as_(re)
                }
            }
        )*
    };
}

// `as` semantics: floats round, integers truncate and saturate
impl_real_element!(
    f64 => F64,
    f32 => F32,
    half::f16 => F16,
    half::bf16 => BF16,
    i64 => I64,
    i32 => I32,
    i16 => I16,
    i8 => I8,
    u64 => U64,
    u32 => U32,
    u16 => U16,
    u8 => U8,
);

// ============================================================================
// Complex types
// ============================================================================

impl Element for Complex64 {
    const DTYPE: DType = DType::Complex64;

    #[inline]
    fn to_parts(self) -> (f64, f64) {
        (self.re as f64, self.im as f64)
    }

    #[inline]
    fn from_parts(re: f64, im: f64) -> Self {
        Self::new(re as f32, im as f32)
    }
}

impl Element for Complex128 {
    const DTYPE: DType = DType::Complex128;

    #[inline]
    fn to_parts(self) -> (f64, f64) {
        (self.re, self.im)
    }

    #[inline]
    fn from_parts(re: f64, im: f64) -> Self {
        Self::new(re, im)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_dtype() {
        assert_eq!(f64::DTYPE, DType::F64);
        assert_eq!(f32::DTYPE, DType::F32);
        assert_eq!(i32::DTYPE, DType::I32);
        assert_eq!(u8::DTYPE, DType::U8);
        assert_eq!(half::bf16::DTYPE, DType::BF16);
        assert_eq!(Complex64::DTYPE, DType::Complex64);
    }

    #[test]
    fn test_element_conversions() {
        assert_eq!(f32::from_f64(2.5).to_f64(), 2.5f32 as f64);
        assert_eq!(i32::from_f64(42.0), 42);
        assert_eq!(Complex128::from_parts(1.0, -2.0).to_parts(), (1.0, -2.0));
        assert_eq!(Complex64::from_f64(3.0).to_parts(), (3.0, 0.0));
        assert_eq!(u8::from_f64(300.0), 255);
        assert_eq!(half::f16::from_f64(0.1).to_parts().0, half::f16::from_f64(0.1).to_f64());
    }
}
