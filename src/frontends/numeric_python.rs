//! numpy-shaped façade
//!
//! Ufuncs and reductions follow numpy's calling conventions: `out`, `where`,
//! `casting` and `dtype` options, and a plain scalar in place of 0-d
//! results. Array constructors default to float64, narrowed to the closest
//! dtype the active backend supports.

use super::common::{frontend_array, run};
use super::version::{Library, Versioned};
use crate::api;
use crate::dtype::{Casting, DType, Scalar};
use crate::error::{Error, Result};
use crate::ops::{CallFrame, OpId, Output, FRONTEND_CHAIN};
use crate::tensor::{Array, ArrayLike};

/// The emulated library
pub static LIBRARY: Library = Library {
    name: "numeric-python",
    env: "UNITENSOR_NUMERIC_PYTHON_VERSION",
    pinned: "1.26",
};

frontend_array!(
    /// numpy-style n-dimensional array
    NdArray
);

impl NdArray {
    /// Dimensions, as numpy's shape tuple
    pub fn shape(&self) -> Vec<usize> {
        self.0.shape().to_vec()
    }

    /// Number of elements
    pub fn size(&self) -> usize {
        self.0.numel()
    }

    /// Raw little-endian bytes, as `ndarray.tobytes()`
    pub fn tobytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    /// Cast to `dtype`; numpy's method casts unsafely
    pub fn astype(&self, dtype: DType) -> Result<NdArray> {
        api::astype(&self.0, dtype).map(NdArray)
    }

    /// Reshape; one entry may be `-1`
    pub fn reshape(&self, shape: &[i64]) -> Result<NdArray> {
        reshape(self, shape)
    }

    /// Reversed axes, as `ndarray.T`
    #[allow(non_snake_case)]
    pub fn T(&self) -> Result<NdArray> {
        transpose(self, None)
    }

    /// The single element as a plain value
    pub fn item(&self) -> Result<Scalar> {
        self.0.item()
    }

    /// Sum over `axis`
    pub fn sum(&self, axis: Option<&[isize]>) -> Result<NpOutput> {
        sum(self, axis, false)
    }
}

/// Result of a ufunc or reduction: numpy returns a plain scalar for 0-d
/// results
#[derive(Clone, Debug)]
pub enum NpOutput {
    /// An array result
    Array(NdArray),
    /// A 0-d result
    Scalar(Scalar),
}

impl NpOutput {
    /// The array, materialising a scalar as a 0-d array
    pub fn into_array(self) -> Result<NdArray> {
        match self {
            Self::Array(a) => Ok(a),
            Self::Scalar(s) => api::asarray(s, None).map(NdArray),
        }
    }

    /// The scalar, extracting it from a one-element array
    pub fn into_scalar(self) -> Result<Scalar> {
        match self {
            Self::Array(a) => a.item(),
            Self::Scalar(s) => Ok(s),
        }
    }
}

impl From<Output> for NpOutput {
    fn from(output: Output) -> Self {
        match output {
            Output::Array(a) => Self::Array(NdArray(a)),
            Output::Scalar(s) => Self::Scalar(s),
        }
    }
}

/// numpy's ufunc keyword options
#[derive(Clone, Debug, Default)]
pub struct UfuncOpts {
    /// Array the result is written into
    pub out: Option<NdArray>,
    /// Compute only where true; other positions keep `out`, or zero
    pub where_: Option<ArrayLike>,
    /// Casting rule; the configured policy when unset
    pub casting: Option<Casting>,
    /// Computation dtype
    pub dtype: Option<DType>,
}

impl UfuncOpts {
    /// Write into `out`
    pub fn out(mut self, out: &NdArray) -> Self {
        self.out = Some(out.clone());
        self
    }

    /// Compute where `mask` is true
    pub fn where_mask(mut self, mask: impl Into<ArrayLike>) -> Self {
        self.where_ = Some(mask.into());
        self
    }

    /// Casting rule for the inputs and `out`
    pub fn casting(mut self, casting: Casting) -> Self {
        self.casting = Some(casting);
        self
    }

    /// Computation dtype
    pub fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    fn apply(&self, frame: CallFrame) -> CallFrame {
        frame
            .out(self.out.as_ref().map(NdArray::handle))
            .where_mask(self.where_.clone())
            .casting(self.casting)
            .dtype(self.dtype)
    }
}

fn ufunc(frame: CallFrame, opts: &UfuncOpts) -> Result<NpOutput> {
    run(opts.apply(frame), FRONTEND_CHAIN).map(NpOutput::from)
}

fn scalar_or_array(frame: CallFrame) -> Result<NpOutput> {
    run(frame, FRONTEND_CHAIN).map(NpOutput::from)
}

fn array(frame: CallFrame) -> Result<NdArray> {
    api::call(frame).map(NdArray)
}

macro_rules! unary_ufuncs {
    ($($name:ident => $op:ident),* $(,)?) => {
        paste::paste! {
            $(
                #[doc = concat!("`numpy.", stringify!($name), "`")]
                pub fn $name(x: impl Into<ArrayLike>) -> Result<NpOutput> {
                    [<$name _with>](x, &UfuncOpts::default())
                }

                #[doc = concat!("`numpy.", stringify!($name), "` with ufunc options")]
                pub fn [<$name _with>](x: impl Into<ArrayLike>, opts: &UfuncOpts) -> Result<NpOutput> {
                    ufunc(CallFrame::new(OpId::$op).arg(x), opts)
                }
            )*
        }
    };
}

macro_rules! binary_ufuncs {
    ($($name:ident => $op:ident),* $(,)?) => {
        paste::paste! {
            $(
                #[doc = concat!("`numpy.", stringify!($name), "`")]
                pub fn $name(x1: impl Into<ArrayLike>, x2: impl Into<ArrayLike>) -> Result<NpOutput> {
                    [<$name _with>](x1, x2, &UfuncOpts::default())
                }

                #[doc = concat!("`numpy.", stringify!($name), "` with ufunc options")]
                pub fn [<$name _with>](
                    x1: impl Into<ArrayLike>,
                    x2: impl Into<ArrayLike>,
                    opts: &UfuncOpts,
                ) -> Result<NpOutput> {
                    ufunc(CallFrame::new(OpId::$op).arg(x1).arg(x2), opts)
                }
            )*
        }
    };
}

unary_ufuncs! {
    absolute => Abs,
    negative => Negative,
    exp => Exp,
    log => Log,
    sqrt => Sqrt,
    square => Square,
    sin => Sin,
    cos => Cos,
    tanh => Tanh,
    floor => Floor,
    ceil => Ceil,
    sign => Sign,
    reciprocal => Reciprocal,
    isnan => Isnan,
    isfinite => Isfinite,
    logical_not => LogicalNot,
}

binary_ufuncs! {
    add => Add,
    subtract => Subtract,
    multiply => Multiply,
    divide => Divide,
    floor_divide => FloorDivide,
    remainder => Remainder,
    power => Pow,
    maximum => Maximum,
    minimum => Minimum,
    arctan2 => Atan2,
    equal => Equal,
    not_equal => NotEqual,
    less => Less,
    less_equal => LessEqual,
    greater => Greater,
    greater_equal => GreaterEqual,
    logical_and => LogicalAnd,
    logical_or => LogicalOr,
}

// ============================================================================
// Construction
// ============================================================================

fn float_default(dtype: Option<DType>) -> Option<DType> {
    Some(dtype.unwrap_or(DType::F64))
}

/// `numpy.array`
pub fn asarray(object: impl Into<ArrayLike>, dtype: Option<DType>) -> Result<NdArray> {
    api::asarray(object, dtype).map(NdArray)
}

/// `numpy.zeros`
pub fn zeros(shape: &[usize], dtype: Option<DType>) -> Result<NdArray> {
    api::zeros(shape, float_default(dtype)).map(NdArray)
}

/// `numpy.ones`
pub fn ones(shape: &[usize], dtype: Option<DType>) -> Result<NdArray> {
    api::ones(shape, float_default(dtype)).map(NdArray)
}

/// `numpy.full`; the dtype follows `fill_value` when unset
pub fn full(shape: &[usize], fill_value: impl Into<Scalar>, dtype: Option<DType>) -> Result<NdArray> {
    api::full(shape, fill_value, dtype).map(NdArray)
}

/// `numpy.arange`
pub fn arange(start: f64, stop: f64, step: f64, dtype: Option<DType>) -> Result<NdArray> {
    api::arange(start, stop, step, float_default(dtype)).map(NdArray)
}

/// `numpy.linspace`
pub fn linspace(start: f64, stop: f64, num: usize, endpoint: bool) -> Result<NdArray> {
    api::linspace(start, stop, num, endpoint, Some(DType::F64)).map(NdArray)
}

/// `numpy.eye`
pub fn eye(n: usize, m: Option<usize>, k: i64, dtype: Option<DType>) -> Result<NdArray> {
    api::eye(n, m, k, float_default(dtype)).map(NdArray)
}

/// `numpy.frombuffer`: a 1-D array over little-endian `buffer`
pub fn frombuffer(buffer: &[u8], dtype: DType) -> Result<NdArray> {
    use crate::dtype::{Complex128, Complex64};
    use half::{bf16, f16};

    let width = dtype.size_in_bytes();
    if buffer.len() % width != 0 {
        return Err(Error::invalid_argument(
            "buffer",
            format!("buffer size {} is not a multiple of element size {width}", buffer.len()),
        ));
    }
    let n = buffer.len() / width;
    macro_rules! decode {
        ($t:ty) => {{
            let data: Vec<$t> = buffer
                .chunks_exact(width)
                .map(bytemuck::pod_read_unaligned::<$t>)
                .collect();
            Array::from_slice(&data, &[n])?
        }};
    }
    let handle = match dtype {
        DType::F64 => decode!(f64),
        DType::F32 => decode!(f32),
        DType::F16 => decode!(f16),
        DType::BF16 => decode!(bf16),
        DType::I64 => decode!(i64),
        DType::I32 => decode!(i32),
        DType::I16 => decode!(i16),
        DType::I8 => decode!(i8),
        DType::U64 => decode!(u64),
        DType::U32 => decode!(u32),
        DType::U16 => decode!(u16),
        DType::U8 => decode!(u8),
        DType::Bool => api::astype(decode!(u8), DType::Bool)?,
        DType::Complex64 => decode!(Complex64),
        DType::Complex128 => decode!(Complex128),
    };
    api::asarray(handle, None).map(NdArray)
}

// ============================================================================
// Reductions and searches
// ============================================================================

macro_rules! reductions {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            #[doc = concat!("`numpy.", stringify!($name), "`; a full reduction returns a scalar")]
            pub fn $name(a: impl Into<ArrayLike>, axis: Option<&[isize]>, keepdims: bool) -> Result<NpOutput> {
                scalar_or_array(CallFrame::new(OpId::$op).arg(a).kw("axis", axis).kw("keepdims", keepdims))
            }
        )*
    };
}

reductions! {
    sum => Sum,
    prod => Prod,
    mean => Mean,
    max => Max,
    min => Min,
    all => All,
    any => Any,
    median => Median,
}

/// `numpy.std`
pub fn std(a: impl Into<ArrayLike>, axis: Option<&[isize]>, ddof: f64) -> Result<NpOutput> {
    scalar_or_array(CallFrame::new(OpId::Std).arg(a).kw("axis", axis).kw("correction", ddof))
}

/// `numpy.var`
pub fn var(a: impl Into<ArrayLike>, axis: Option<&[isize]>, ddof: f64) -> Result<NpOutput> {
    scalar_or_array(CallFrame::new(OpId::Var).arg(a).kw("axis", axis).kw("correction", ddof))
}

/// `numpy.cumsum`.
///
/// Keeps the input dtype unless `dtype` is given; booleans accumulate in the
/// default integer dtype.
pub fn cumsum(a: impl Into<ArrayLike>, axis: Option<isize>, dtype: Option<DType>) -> Result<NdArray> {
    api::cumsum(a, axis, dtype).map(NdArray)
}

/// `numpy.cumprod`, with the dtype rule of [`cumsum`]
pub fn cumprod(a: impl Into<ArrayLike>, axis: Option<isize>, dtype: Option<DType>) -> Result<NdArray> {
    api::cumprod(a, axis, dtype).map(NdArray)
}

/// `numpy.argmax`; ties resolve to the first index
pub fn argmax(a: impl Into<ArrayLike>, axis: Option<isize>) -> Result<NpOutput> {
    scalar_or_array(CallFrame::new(OpId::Argmax).arg(a).kw("axis", axis).kw("keepdims", false))
}

/// `numpy.argmin`; ties resolve to the first index
pub fn argmin(a: impl Into<ArrayLike>, axis: Option<isize>) -> Result<NpOutput> {
    scalar_or_array(CallFrame::new(OpId::Argmin).arg(a).kw("axis", axis).kw("keepdims", false))
}

/// `numpy.matmul`; two vectors give a scalar
pub fn matmul(x1: impl Into<ArrayLike>, x2: impl Into<ArrayLike>) -> Result<NpOutput> {
    scalar_or_array(CallFrame::new(OpId::Matmul).arg(x1).arg(x2))
}

/// `numpy.sort`
pub fn sort(a: impl Into<ArrayLike>, axis: isize) -> Result<NdArray> {
    api::sort(a, axis, false, true).map(NdArray)
}

/// `numpy.argsort`; `kind = "stable"` (or `"mergesort"`) keeps ties in order
pub fn argsort(a: impl Into<ArrayLike>, axis: isize, kind: Option<&str>) -> Result<NdArray> {
    let stable = match kind.unwrap_or("quicksort") {
        "stable" | "mergesort" => true,
        "quicksort" | "heapsort" => false,
        other => return Err(Error::invalid_argument("kind", format!("unknown sort kind '{other}'"))),
    };
    api::argsort(a, axis, false, stable).map(NdArray)
}

/// `numpy.where` with three arguments
pub fn where_(condition: impl Into<ArrayLike>, x: impl Into<ArrayLike>, y: impl Into<ArrayLike>) -> Result<NdArray> {
    api::where_(condition, x, y).map(NdArray)
}

/// `numpy.clip`
pub fn clip(a: impl Into<ArrayLike>, a_min: Option<f64>, a_max: Option<f64>) -> Result<NdArray> {
    api::clip(a, a_min, a_max).map(NdArray)
}

// ============================================================================
// Manipulation
// ============================================================================

/// `numpy.reshape`
pub fn reshape(a: impl Into<ArrayLike>, newshape: &[i64]) -> Result<NdArray> {
    api::reshape(a, newshape).map(NdArray)
}

/// `numpy.transpose`; `None` reverses the axes
pub fn transpose(a: impl Into<ArrayLike>, axes: Option<&[isize]>) -> Result<NdArray> {
    api::permute_dims(a, axes).map(NdArray)
}

/// `numpy.concatenate`
pub fn concatenate<A: Into<ArrayLike>>(arrays: impl IntoIterator<Item = A>, axis: Option<isize>) -> Result<NdArray> {
    api::concat(arrays, axis).map(NdArray)
}

/// `numpy.stack`
pub fn stack<A: Into<ArrayLike>>(arrays: impl IntoIterator<Item = A>, axis: isize) -> Result<NdArray> {
    api::stack(arrays, axis).map(NdArray)
}

/// `numpy.squeeze`
pub fn squeeze(a: impl Into<ArrayLike>, axis: Option<&[isize]>) -> Result<NdArray> {
    api::squeeze(a, axis).map(NdArray)
}

/// `numpy.expand_dims`
pub fn expand_dims(a: impl Into<ArrayLike>, axis: isize) -> Result<NdArray> {
    api::expand_dims(a, axis).map(NdArray)
}

/// `numpy.diag`
pub fn diag(v: impl Into<ArrayLike>, k: i64) -> Result<NdArray> {
    let v = api::asarray(v, None)?;
    if v.ndim() == 1 {
        // numpy grows the matrix so the whole offset diagonal fits
        let n = v.numel() + k.unsigned_abs() as usize;
        return api::diag_padded(&v, k, Some(n), Some(n), 0).map(NdArray);
    }
    array(CallFrame::new(OpId::Diag).arg(&v).kw("offset", k))
}

// ============================================================================
// unique
// ============================================================================

/// Options of `numpy.unique`
#[derive(Copy, Clone, Debug)]
pub struct UniqueOpts {
    /// Also return the first index of each value
    pub return_index: bool,
    /// Also return the position of each input element among the values
    pub return_inverse: bool,
    /// Also return the occurrences of each value
    pub return_counts: bool,
    /// Collapse NaNs into one value (numpy 1.24 and later)
    pub equal_nan: bool,
}

impl Default for UniqueOpts {
    fn default() -> Self {
        Self {
            return_index: false,
            return_inverse: false,
            return_counts: false,
            equal_nan: true,
        }
    }
}

/// Result of `numpy.unique`; the optional parts are present when requested
#[derive(Clone, Debug)]
pub struct Unique {
    /// Sorted distinct values
    pub values: NdArray,
    /// First index of each value
    pub indices: Option<NdArray>,
    /// Position of each input element among the values, flattened
    pub inverse: Option<NdArray>,
    /// Occurrences of each value
    pub counts: Option<NdArray>,
}

/// Signature shared by the versions of `unique`
pub type UniqueFn = fn(ArrayLike, &UniqueOpts) -> Result<Unique>;

static UNIQUE: Versioned<UniqueFn> = Versioned {
    canonical: "unique",
    library: &LIBRARY,
    symbols: &[
        ("unique_v_1p23_and_below", unique_v_1p23_and_below as UniqueFn),
        ("unique_v_1p24_and_above", unique_v_1p24_and_above as UniqueFn),
    ],
};

fn select(all: api::UniqueAll, opts: &UniqueOpts) -> Result<Unique> {
    let inverse = if opts.return_inverse {
        Some(NdArray(api::reshape(&all.inverse_indices, &[-1])?))
    } else {
        None
    };
    Ok(Unique {
        values: NdArray(all.values),
        indices: opts.return_index.then_some(NdArray(all.indices)),
        inverse,
        counts: opts.return_counts.then_some(NdArray(all.counts)),
    })
}

/// `numpy.unique` for the detected numpy version
pub fn unique(ar: impl Into<ArrayLike>, opts: &UniqueOpts) -> Result<Unique> {
    UNIQUE.resolve()?(ar.into(), opts)
}

/// `numpy.unique` up to 1.23: every NaN is a distinct value
pub fn unique_v_1p23_and_below(ar: ArrayLike, opts: &UniqueOpts) -> Result<Unique> {
    let flat = api::reshape(ar, &[-1])?;
    select(api::unique_all(flat)?, opts)
}

/// `numpy.unique` from 1.24: NaNs collapse into one value unless
/// `equal_nan` is unset
pub fn unique_v_1p24_and_above(ar: ArrayLike, opts: &UniqueOpts) -> Result<Unique> {
    let flat = api::reshape(ar, &[-1])?;
    let all = api::unique_all(flat)?;
    if !opts.equal_nan || !all.values.dtype().is_inexact() {
        return select(all, opts);
    }
    let nans = api::sum(api::isnan(&all.values)?, None, false)?.item()?.as_i64();
    if nans <= 1 {
        return select(all, opts);
    }
    // NaNs sort last; keep the first and fold the others into it
    let n = all.values.numel() as i64;
    let keep = n - nans + 1;
    let int = api::default_int_dtype()?;
    let head = api::arange(0i64, keep, 1i64, Some(int))?;
    let counted = api::arange(0i64, keep - 1, 1i64, Some(int))?;
    let folded = api::arange(keep - 1, n, 1i64, Some(int))?;
    let nan_count = api::sum(api::gather(&all.counts, &folded, 0)?, None, true)?;
    let collapsed = api::UniqueAll {
        values: api::gather(&all.values, &head, 0)?,
        indices: api::gather(&all.indices, &head, 0)?,
        inverse_indices: api::minimum(&all.inverse_indices, keep - 1)?,
        counts: api::concat([api::gather(&all.counts, &counted, 0)?, nan_count], Some(0))?,
    };
    select(collapsed, opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_routing_follows_version() {
        assert_eq!(UNIQUE.symbols.len(), 2);
        assert!(UNIQUE.get("unique_v_1p23_and_below").is_ok());
        assert!(UNIQUE.get("unique_v_1p22_and_below").is_err());
    }
}
