//! Error types for unitensor

use crate::dtype::{Casting, DType};
use thiserror::Error;

/// Result type alias using unitensor's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while dispatching or executing an operator
#[derive(Error, Debug)]
pub enum Error {
    /// A dtype reached an operator that cannot accept it and substitution was not allowed
    #[error("Unsupported dtype {dtype} for operation '{op}' on backend '{backend}'")]
    DtypeUnsupported {
        /// The rejected dtype
        dtype: DType,
        /// The operation name
        op: &'static str,
        /// The active backend
        backend: &'static str,
    },

    /// The requested backend has never been registered and no builtin loader knows it
    #[error("Backend '{name}' is not registered")]
    BackendNotRegistered {
        /// Requested backend name
        name: String,
    },

    /// The operator exists but the active backend does not bind it
    #[error("Operator '{op}' is not implemented by backend '{backend}'")]
    BackendMissingOperator {
        /// Requested operator name
        op: String,
        /// The active backend
        backend: &'static str,
    },

    /// The operator name is not part of the unified surface at all
    #[error("Unknown operator '{name}'")]
    UnknownOperator {
        /// Requested operator name
        name: String,
    },

    /// A frontend casting policy rejected an implicit conversion
    #[error("Cannot cast {from} to {to} under casting rule '{casting}'")]
    CastingNotAllowed {
        /// Source dtype
        from: DType,
        /// Target dtype
        to: DType,
        /// Policy in force
        casting: Casting,
    },

    /// Shape mismatch in an operation
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// Shapes cannot be broadcast together
    #[error("Cannot broadcast shapes {lhs:?} and {rhs:?}")]
    BroadcastError {
        /// Left-hand side shape
        lhs: Vec<usize>,
        /// Right-hand side shape
        rhs: Vec<usize>,
    },

    /// Axis out of range
    #[error("Invalid dimension {dim} for tensor with {ndim} dimensions")]
    InvalidDimension {
        /// The invalid dimension
        dim: isize,
        /// Number of dimensions
        ndim: usize,
    },

    /// Requested placement is not among the backend's valid devices
    #[error("Device '{device}' is not available on backend '{backend}'")]
    DeviceUnavailable {
        /// Requested device
        device: String,
        /// The active backend
        backend: &'static str,
    },

    /// A frontend symbol has no implementation for the detected library version
    #[error("'{symbol}' is not available for version {version}")]
    VersionUnsupported {
        /// Canonical symbol name
        symbol: String,
        /// Detected library version
        version: String,
    },

    /// A leaf reported a numerical exception (singular matrix, non-PSD input, ...)
    #[error("Numerical failure in '{op}': {reason}")]
    NumericalFailure {
        /// The operation name
        op: &'static str,
        /// Description of the failure
        reason: String,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// A backend leaf failed outside the taxonomy (e.g. it panicked)
    #[error("Backend error: {0}")]
    Backend(String),

    /// Failure annotated with the call it happened in
    #[error("'{op}' failed on backend '{backend}' with arguments [{args}]: {source}")]
    Op {
        /// The operation name
        op: &'static str,
        /// The active backend
        backend: &'static str,
        /// Argument dtype/shape summary
        args: String,
        /// Original failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create a broadcast error
    pub fn broadcast(lhs: &[usize], rhs: &[usize]) -> Self {
        Self::BroadcastError {
            lhs: lhs.to_vec(),
            rhs: rhs.to_vec(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create a numerical failure error
    pub fn numerical(op: &'static str, reason: impl Into<String>) -> Self {
        Self::NumericalFailure {
            op,
            reason: reason.into(),
        }
    }

    /// Wrap this error with the operator call it surfaced from.
    ///
    /// Errors that already carry call context are returned unchanged so the
    /// innermost call stays visible.
    pub fn in_call(self, op: &'static str, backend: &'static str, args: String) -> Self {
        match self {
            Self::Op { .. } => self,
            other => Self::Op {
                op,
                backend,
                args,
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any call context stripped
    pub fn root(&self) -> &Error {
        match self {
            Self::Op { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this is a broadcasting / axis / shape failure
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self.root(),
            Self::ShapeMismatch { .. } | Self::BroadcastError { .. } | Self::InvalidDimension { .. }
        )
    }
}
