//! Operator identifiers: the whitelist of every name the unified surface knows

use std::fmt;

/// Operator family, as grouped on the unified surface
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    /// Array construction
    Creation,
    /// One-input elementwise
    Unary,
    /// Two-input elementwise
    Binary,
    /// Three-input elementwise
    Ternary,
    /// Reductions and scans
    Reduction,
    /// Statistics
    Statistical,
    /// Linear algebra
    Linalg,
    /// Shape and layout manipulation
    Manipulation,
    /// Index searches
    Searching,
    /// Sorting
    Sorting,
    /// Random sampling
    Random,
    /// Set operations
    Set,
    /// Activation functions
    Activation,
    /// Network layers
    Layer,
    /// Gradient control
    Gradient,
    /// Device placement
    Device,
    /// Dtype conversion
    Dtype,
}

macro_rules! operators {
    ($($family:ident => [$($variant:ident = $name:literal),* $(,)?]),* $(,)?) => {
        /// Canonical operator identifier
        ///
        /// The discriminant indexes a backend's operator table directly.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u16)]
        pub enum OpId {
            $($(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )*)*
        }

        impl OpId {
            /// Every operator, in declaration order
            pub const ALL: &'static [OpId] = &[$($(OpId::$variant,)*)*];

            /// Number of operators
            pub const COUNT: usize = Self::ALL.len();

            /// Canonical name
            pub const fn name(self) -> &'static str {
                match self {
                    $($(OpId::$variant => $name,)*)*
                }
            }

            /// Family the operator belongs to
            pub const fn family(self) -> Family {
                match self {
                    $($(OpId::$variant => Family::$family,)*)*
                }
            }

            /// Look up a canonical name
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($($name => Some(OpId::$variant),)*)*
                    _ => None,
                }
            }

            /// Table slot
            #[inline]
            pub const fn index(self) -> usize {
                self as usize
            }
        }
    };
}

operators! {
    Creation => [
        Zeros = "zeros",
        Ones = "ones",
        Full = "full",
        Empty = "empty",
        Arange = "arange",
        Linspace = "linspace",
        Eye = "eye",
        ZerosLike = "zeros_like",
        OnesLike = "ones_like",
        FullLike = "full_like",
        Tril = "tril",
        Triu = "triu",
        OneHot = "one_hot",
    ],
    Unary => [
        Abs = "abs",
        Negative = "negative",
        Positive = "positive",
        Exp = "exp",
        Expm1 = "expm1",
        Log = "log",
        Log1p = "log1p",
        Log2 = "log2",
        Log10 = "log10",
        Sqrt = "sqrt",
        Square = "square",
        Sin = "sin",
        Cos = "cos",
        Tan = "tan",
        Sinh = "sinh",
        Cosh = "cosh",
        Tanh = "tanh",
        Floor = "floor",
        Ceil = "ceil",
        Round = "round",
        Trunc = "trunc",
        Sign = "sign",
        Reciprocal = "reciprocal",
        LogicalNot = "logical_not",
        Isnan = "isnan",
        Isinf = "isinf",
        Isfinite = "isfinite",
        Real = "real",
        Imag = "imag",
        Conj = "conj",
    ],
    Binary => [
        Add = "add",
        Subtract = "subtract",
        Multiply = "multiply",
        Divide = "divide",
        FloorDivide = "floor_divide",
        Remainder = "remainder",
        Pow = "pow",
        Maximum = "maximum",
        Minimum = "minimum",
        Atan2 = "atan2",
        Equal = "equal",
        NotEqual = "not_equal",
        Less = "less",
        LessEqual = "less_equal",
        Greater = "greater",
        GreaterEqual = "greater_equal",
        LogicalAnd = "logical_and",
        LogicalOr = "logical_or",
        LogicalXor = "logical_xor",
    ],
    Ternary => [
        Where = "where",
        Clip = "clip",
    ],
    Reduction => [
        Sum = "sum",
        Prod = "prod",
        Mean = "mean",
        Max = "max",
        Min = "min",
        All = "all",
        Any = "any",
        Cumsum = "cumsum",
        Cumprod = "cumprod",
    ],
    Statistical => [
        Var = "var",
        Std = "std",
        Median = "median",
    ],
    Linalg => [
        Matmul = "matmul",
        Diag = "diag",
        Solve = "solve",
        Cholesky = "cholesky",
        Inv = "inv",
        Det = "det",
        MatrixRank = "matrix_rank",
        Svdvals = "svdvals",
        Outer = "outer",
        VectorNorm = "vector_norm",
        Trace = "trace",
    ],
    Manipulation => [
        Reshape = "reshape",
        Concat = "concat",
        PermuteDims = "permute_dims",
        Squeeze = "squeeze",
        ExpandDims = "expand_dims",
        Stack = "stack",
        Split = "split",
        Tile = "tile",
        Pad = "pad",
        Flip = "flip",
        Roll = "roll",
        BroadcastTo = "broadcast_to",
        Repeat = "repeat",
        Gather = "gather",
    ],
    Searching => [
        Argmin = "argmin",
        Argmax = "argmax",
        Nonzero = "nonzero",
        Searchsorted = "searchsorted",
    ],
    Sorting => [
        Sort = "sort",
        Argsort = "argsort",
    ],
    Random => [
        Seed = "seed",
        RandomUniform = "random_uniform",
        RandomNormal = "random_normal",
        Randint = "randint",
        Shuffle = "shuffle",
    ],
    Set => [
        UniqueAll = "unique_all",
    ],
    Activation => [
        Relu = "relu",
        LeakyRelu = "leaky_relu",
        Sigmoid = "sigmoid",
        Softmax = "softmax",
        LogSoftmax = "log_softmax",
        Gelu = "gelu",
        Softplus = "softplus",
        Silu = "silu",
    ],
    Layer => [
        Conv = "conv",
    ],
    Gradient => [
        StopGradient = "stop_gradient",
    ],
    Device => [
        ToDevice = "to_device",
    ],
    Dtype => [
        Astype = "astype",
    ],
}

/// Operators every backend must bind
pub const REQUIRED: &[OpId] = &[OpId::Astype, OpId::Where, OpId::ZerosLike, OpId::ToDevice];

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique_and_resolvable() {
        for (i, op) in OpId::ALL.iter().enumerate() {
            assert_eq!(op.index(), i);
            assert_eq!(OpId::from_name(op.name()), Some(*op));
        }
        assert_eq!(OpId::from_name("frobnicate"), None);
    }

    #[test]
    fn test_families() {
        assert_eq!(OpId::Matmul.family(), Family::Linalg);
        assert_eq!(OpId::Where.family(), Family::Ternary);
        assert_eq!(OpId::Isnan.name(), "isnan");
    }
}
