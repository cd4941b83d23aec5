//! Call frames: one operator invocation as seen by the adapter chain

use super::op_id::OpId;
use crate::device::Device;
use crate::dtype::{Casting, DType, Scalar};
use crate::tensor::{Array, ArrayLike};

/// An argument value
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absent optional argument
    #[default]
    None,
    /// Array-like operand
    Array(ArrayLike),
    /// Sequence of array-like operands (concat, stack, ...)
    Arrays(Vec<ArrayLike>),
    /// Boolean parameter
    Bool(bool),
    /// Integer parameter (axis, count, ...)
    Int(i64),
    /// Float parameter
    Float(f64),
    /// Integer sequence parameter (shape, axes, ...)
    Ints(Vec<i64>),
    /// Numeric parameter that is not an operand (fill value, bound, ...)
    Scalar(Scalar),
    /// String parameter (padding mode, ...)
    Str(String),
    /// Dtype parameter
    Dtype(DType),
    /// Device parameter
    Device(Device),
}

impl Value {
    /// Whether the value is absent
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Integer view; whole floats and bools convert
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Bool(b) => Some(*b as i64),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Scalar(s) => Some(s.as_i64()),
            _ => None,
        }
    }

    /// Float view
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(v) => Some(*v as f64),
            Self::Scalar(s) => Some(s.as_f64()),
            _ => None,
        }
    }

    /// Bool view
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Integer sequence view; a single integer is a one-element sequence
    pub fn as_ints(&self) -> Option<Vec<i64>> {
        match self {
            Self::Ints(v) => Some(v.clone()),
            Self::Int(v) => Some(vec![*v]),
            _ => None,
        }
    }

    /// Scalar view of any numeric parameter
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Self::Scalar(s) => Some(*s),
            Self::Int(v) => Some(Scalar::Int(*v)),
            Self::Float(f) => Some(Scalar::Float(*f)),
            Self::Bool(b) => Some(Scalar::Bool(*b)),
            Self::Array(ArrayLike::Scalar(s)) => Some(*s),
            _ => None,
        }
    }

    /// String view
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

value_from!(
    bool => Bool,
    i64 => Int,
    f64 => Float,
    Vec<i64> => Ints,
    Scalar => Scalar,
    String => Str,
    &str => Str,
    DType => Dtype,
    Device => Device,
    ArrayLike => Array,
    Vec<ArrayLike> => Arrays,
);

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<&[usize]> for Value {
    fn from(v: &[usize]) -> Self {
        Self::Ints(v.iter().map(|&d| d as i64).collect())
    }
}

impl From<&[isize]> for Value {
    fn from(v: &[isize]) -> Self {
        Self::Ints(v.iter().map(|&d| d as i64).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::None, Into::into)
    }
}

/// A single operator call travelling through the adapter chain
#[derive(Clone, Debug)]
pub struct CallFrame {
    /// Operator being called
    pub op: OpId,
    /// Positional arguments (operands first)
    pub args: Vec<Value>,
    /// Named parameters
    pub kwargs: Vec<(&'static str, Value)>,
    /// Pre-allocated output
    pub out: Option<Array>,
    /// Boolean mask selecting where the result is computed
    pub where_mask: Option<ArrayLike>,
    /// Requested dtype
    pub dtype: Option<DType>,
    /// Requested placement
    pub device: Option<Device>,
    /// Casting policy (frontend calls only)
    pub casting: Option<Casting>,
    /// Fail instead of substituting dtypes the backend cannot take
    pub strict_dtypes: bool,
}

impl CallFrame {
    /// Empty frame for `op`
    pub fn new(op: OpId) -> Self {
        Self {
            op,
            args: Vec::new(),
            kwargs: Vec::new(),
            out: None,
            where_mask: None,
            dtype: None,
            device: None,
            casting: None,
            strict_dtypes: false,
        }
    }

    /// Append an array-like operand
    pub fn arg(mut self, value: impl Into<ArrayLike>) -> Self {
        self.args.push(Value::Array(value.into()));
        self
    }

    /// Append an optional operand, keeping its position when absent
    pub fn opt_arg(mut self, value: Option<impl Into<ArrayLike>>) -> Self {
        self.args.push(value.map_or(Value::None, |v| Value::Array(v.into())));
        self
    }

    /// Append a sequence of operands
    pub fn arrays(mut self, values: Vec<ArrayLike>) -> Self {
        self.args.push(Value::Arrays(values));
        self
    }

    /// Set a named parameter
    pub fn kw(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.kwargs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.kwargs.push((name, value)),
        }
        self
    }

    /// Named parameter lookup
    pub fn get_kw(&self, name: &str) -> Option<&Value> {
        self.kwargs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
            .filter(|v| !v.is_none())
    }

    /// Set the output array
    pub fn out(mut self, out: Option<&Array>) -> Self {
        self.out = out.cloned();
        self
    }

    /// Set the where mask
    pub fn where_mask(mut self, mask: Option<ArrayLike>) -> Self {
        self.where_mask = mask;
        self
    }

    /// Set the requested dtype
    pub fn dtype(mut self, dtype: Option<DType>) -> Self {
        self.dtype = dtype;
        self
    }

    /// Set the requested device
    pub fn device(mut self, device: Option<Device>) -> Self {
        self.device = device;
        self
    }

    /// Set the casting policy
    pub fn casting(mut self, casting: Option<Casting>) -> Self {
        self.casting = casting;
        self
    }

    /// Forbid dtype substitution
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_dtypes = strict;
        self
    }

    /// Visit every array-like operand, including those inside sequences
    pub fn operands_mut(&mut self) -> impl Iterator<Item = &mut ArrayLike> {
        self.args.iter_mut().flat_map(|v| match v {
            Value::Array(a) => std::slice::from_mut(a).iter_mut(),
            Value::Arrays(list) => list.iter_mut(),
            _ => Default::default(),
        })
    }

    /// Dtype/shape summary of the operands, e.g. `f32[2, 2], f32[2]`
    pub fn summary(&self) -> String {
        let mut s = String::new();
        let mut push = |like: &ArrayLike| {
            if !s.is_empty() {
                s.push_str(", ");
            }
            s.push_str(&like.describe());
        };
        for v in &self.args {
            match v {
                Value::Array(a) => push(a),
                Value::Arrays(list) => list.iter().for_each(&mut push),
                _ => {}
            }
        }
        s
    }
}
