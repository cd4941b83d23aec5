//! Elementwise and activation operators

use super::{call, Opts};
use crate::error::Result;
use crate::ops::{CallFrame, OpId};
use crate::tensor::{Array, ArrayLike};

macro_rules! unary_ops {
    ($($name:ident => $op:ident),* $(,)?) => {
        paste::paste! {
            $(
                #[doc = concat!("Elementwise `", stringify!($name), "`")]
                pub fn $name(x: impl Into<ArrayLike>) -> Result<Array> {
                    [<$name _with>](x, &Opts::default())
                }

                #[doc = concat!("Elementwise `", stringify!($name), "` with `out`/`where`/`dtype` options")]
                pub fn [<$name _with>](x: impl Into<ArrayLike>, opts: &Opts) -> Result<Array> {
                    call(opts.apply(CallFrame::new(OpId::$op).arg(x)))
                }
            )*
        }
    };
}

macro_rules! binary_ops {
    ($($name:ident => $op:ident),* $(,)?) => {
        paste::paste! {
            $(
                #[doc = concat!("Elementwise `", stringify!($name), "` with broadcasting")]
                pub fn $name(x: impl Into<ArrayLike>, y: impl Into<ArrayLike>) -> Result<Array> {
                    [<$name _with>](x, y, &Opts::default())
                }

                #[doc = concat!("Elementwise `", stringify!($name), "` with `out`/`where`/`dtype` options")]
                pub fn [<$name _with>](
                    x: impl Into<ArrayLike>,
                    y: impl Into<ArrayLike>,
                    opts: &Opts,
                ) -> Result<Array> {
                    call(opts.apply(CallFrame::new(OpId::$op).arg(x).arg(y)))
                }
            )*
        }
    };
}

unary_ops! {
    abs => Abs,
    negative => Negative,
    positive => Positive,
    exp => Exp,
    expm1 => Expm1,
    log => Log,
    log1p => Log1p,
    log2 => Log2,
    log10 => Log10,
    sqrt => Sqrt,
    square => Square,
    sin => Sin,
    cos => Cos,
    tan => Tan,
    sinh => Sinh,
    cosh => Cosh,
    tanh => Tanh,
    floor => Floor,
    ceil => Ceil,
    round => Round,
    trunc => Trunc,
    sign => Sign,
    reciprocal => Reciprocal,
    logical_not => LogicalNot,
    isnan => Isnan,
    isinf => Isinf,
    isfinite => Isfinite,
    real => Real,
    imag => Imag,
    conj => Conj,
    relu => Relu,
    sigmoid => Sigmoid,
    softplus => Softplus,
    silu => Silu,
}

binary_ops! {
    add => Add,
    subtract => Subtract,
    multiply => Multiply,
    divide => Divide,
    floor_divide => FloorDivide,
    remainder => Remainder,
    pow => Pow,
    maximum => Maximum,
    minimum => Minimum,
    atan2 => Atan2,
    equal => Equal,
    not_equal => NotEqual,
    less => Less,
    less_equal => LessEqual,
    greater => Greater,
    greater_equal => GreaterEqual,
    logical_and => LogicalAnd,
    logical_or => LogicalOr,
    logical_xor => LogicalXor,
}

/// Round half to even at `decimals` decimal places
pub fn round_decimals(x: impl Into<ArrayLike>, decimals: i64) -> Result<Array> {
    call(CallFrame::new(OpId::Round).arg(x).kw("decimals", decimals))
}

/// Pick from `x` where `condition` is true, else from `y`
pub fn where_(
    condition: impl Into<ArrayLike>,
    x: impl Into<ArrayLike>,
    y: impl Into<ArrayLike>,
) -> Result<Array> {
    call(CallFrame::new(OpId::Where).arg(condition).arg(x).arg(y))
}

/// Clamp `x` into `[min, max]`; either bound may be omitted
pub fn clip(
    x: impl Into<ArrayLike>,
    min: Option<impl Into<ArrayLike>>,
    max: Option<impl Into<ArrayLike>>,
) -> Result<Array> {
    clip_with(x, min, max, &Opts::default())
}

/// [`clip`] with shared options
pub fn clip_with(
    x: impl Into<ArrayLike>,
    min: Option<impl Into<ArrayLike>>,
    max: Option<impl Into<ArrayLike>>,
    opts: &Opts,
) -> Result<Array> {
    call(opts.apply(CallFrame::new(OpId::Clip).arg(x).opt_arg(min).opt_arg(max)))
}

/// `x` where positive, `negative_slope * x` elsewhere
pub fn leaky_relu(x: impl Into<ArrayLike>, negative_slope: f64) -> Result<Array> {
    call(CallFrame::new(OpId::LeakyRelu).arg(x).kw("negative_slope", negative_slope))
}

/// Gaussian error linear unit; `approximate` selects the tanh form
pub fn gelu(x: impl Into<ArrayLike>, approximate: bool) -> Result<Array> {
    call(CallFrame::new(OpId::Gelu).arg(x).kw("approximate", approximate))
}

/// Softmax along `axis` (default last)
pub fn softmax(x: impl Into<ArrayLike>, axis: Option<isize>) -> Result<Array> {
    call(CallFrame::new(OpId::Softmax).arg(x).kw("axis", axis))
}

/// Log-softmax along `axis` (default last)
pub fn log_softmax(x: impl Into<ArrayLike>, axis: Option<isize>) -> Result<Array> {
    call(CallFrame::new(OpId::LogSoftmax).arg(x).kw("axis", axis))
}
