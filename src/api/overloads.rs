//! Arithmetic operators on array handles
//!
//! Each operator dispatches through the unified surface, so the result is a
//! `Result<Array>`: `(&a + &b)?`.

use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

use crate::error::Result;
use crate::tensor::Array;

macro_rules! binary_overload {
    ($($trait:ident::$method:ident => $op:ident),* $(,)?) => {
        $(
            impl $trait<&Array> for &Array {
                type Output = Result<Array>;

                fn $method(self, rhs: &Array) -> Self::Output {
                    super::$op(self, rhs)
                }
            }

            impl $trait<f64> for &Array {
                type Output = Result<Array>;

                fn $method(self, rhs: f64) -> Self::Output {
                    super::$op(self, rhs)
                }
            }

            impl $trait<&Array> for f64 {
                type Output = Result<Array>;

                fn $method(self, rhs: &Array) -> Self::Output {
                    super::$op(self, rhs)
                }
            }
        )*
    };
}

binary_overload!(
    Add::add => add,
    Sub::sub => subtract,
    Mul::mul => multiply,
    Div::div => divide,
    Rem::rem => remainder,
);

impl Neg for &Array {
    type Output = Result<Array>;

    fn neg(self) -> Self::Output {
        super::negative(self)
    }
}
