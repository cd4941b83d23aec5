//! Per-operator signature declarations consumed by the adapter chain

use super::op_id::{Family, OpId};

/// Which operands take part in cross-argument promotion
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Promote {
    /// Operands keep their own dtypes
    None,
    /// Array-like operands at this position and after promote together
    From(usize),
}

/// Value kept at positions a `where` mask switches off, when no `out` is given
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WhereFill {
    /// Zero
    Zero,
    /// The first operand
    Input,
}

/// How a `dtype` request is applied
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DtypeHint {
    /// The dtype of the array being created
    Output,
    /// Inputs are cast to it before computing
    CastInputs,
}

/// Declared calling contract of an operator
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// Promotion rule
    pub promote: Promote,
    /// Masked-out fill policy
    pub where_fill: WhereFill,
    /// Dtype request semantics
    pub dtype_hint: DtypeHint,
}

impl Signature {
    const fn new(promote: Promote, where_fill: WhereFill, dtype_hint: DtypeHint) -> Self {
        Self {
            promote,
            where_fill,
            dtype_hint,
        }
    }

    /// Whether the operand at `position` takes part in promotion
    #[inline]
    pub fn promotes(&self, position: usize) -> bool {
        matches!(self.promote, Promote::From(start) if position >= start)
    }
}

/// Signature of `op`
pub fn signature(op: OpId) -> Signature {
    use DtypeHint::*;
    use Promote::From;
    use WhereFill::*;

    match op {
        OpId::Where => Signature::new(From(1), Zero, CastInputs),
        OpId::Clip => Signature::new(From(0), Input, CastInputs),
        OpId::Matmul
        | OpId::Solve
        | OpId::Outer
        | OpId::Concat
        | OpId::Stack
        | OpId::Searchsorted
        | OpId::Conv => Signature::new(From(0), Zero, CastInputs),
        OpId::Astype => Signature::new(Promote::None, Input, Output),
        _ => match op.family() {
            Family::Creation | Family::Random => Signature::new(Promote::None, Zero, Output),
            Family::Binary => Signature::new(From(0), Zero, CastInputs),
            Family::Unary | Family::Activation => Signature::new(Promote::None, Input, CastInputs),
            _ => Signature::new(Promote::None, Zero, CastInputs),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_signatures() {
        assert!(signature(OpId::Add).promotes(1));
        assert!(!signature(OpId::Where).promotes(0));
        assert!(signature(OpId::Where).promotes(2));
        assert!(!signature(OpId::Sum).promotes(0));
        assert_eq!(signature(OpId::Zeros).dtype_hint, DtypeHint::Output);
        assert_eq!(signature(OpId::Relu).where_fill, WhereFill::Input);
    }
}
