//! Random sampling from the process-wide generator

use super::call;
use crate::dtype::DType;
use crate::error::Result;
use crate::ops::{dispatch, CallFrame, OpId, UNIFIED_CHAIN};
use crate::tensor::{Array, ArrayLike};

/// Reseed the generator shared by every backend
pub fn seed(seed: u64) -> Result<()> {
    dispatch(CallFrame::new(OpId::Seed).kw("seed", seed as i64), UNIFIED_CHAIN).map(drop)
}

/// Samples from `U[low, high)`
pub fn random_uniform(low: f64, high: f64, shape: &[usize], dtype: Option<DType>) -> Result<Array> {
    call(
        CallFrame::new(OpId::RandomUniform)
            .kw("low", low)
            .kw("high", high)
            .kw("shape", shape)
            .dtype(dtype),
    )
}

/// Samples from `N(mean, std²)`
pub fn random_normal(mean: f64, std: f64, shape: &[usize], dtype: Option<DType>) -> Result<Array> {
    call(
        CallFrame::new(OpId::RandomNormal)
            .kw("mean", mean)
            .kw("std", std)
            .kw("shape", shape)
            .dtype(dtype),
    )
}

/// Integers drawn uniformly from `[low, high)`
pub fn randint(low: i64, high: i64, shape: &[usize], dtype: Option<DType>) -> Result<Array> {
    call(
        CallFrame::new(OpId::Randint)
            .kw("low", low)
            .kw("high", high)
            .kw("shape", shape)
            .dtype(dtype),
    )
}

/// Random permutation of `x` along `axis`
pub fn shuffle(x: impl Into<ArrayLike>, axis: isize) -> Result<Array> {
    call(CallFrame::new(OpId::Shuffle).arg(x).kw("axis", axis))
}
