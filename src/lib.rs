//! # unitensor
//!
//! **One tensor-operation surface over interchangeable array backends.**
//!
//! unitensor exposes a flat catalogue of array operators (creation,
//! elementwise math, reductions, linear algebra, manipulation, sorting,
//! random sampling, layers) whose implementation is chosen at runtime from
//! the active backend. On top of that surface sit frontends that mimic the
//! calling conventions of foreign array libraries.
//!
//! ## Layers
//!
//! - **dtype**: backend-independent dtypes, promotion and casting rules
//! - **backend**: descriptors, the registry and the process-wide active backend
//! - **ops**: operator identities, per-backend operator tables and the
//!   adapter chain every call runs through
//! - **api**: the unified operator surface, re-exported at the crate root
//! - **frontends**: numpy-, torch-, tensorflow- and jax-shaped façades
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use unitensor::prelude::*;
//!
//! let _guard = backend::scoped_activate("numpy-like")?;
//! let a = unitensor::asarray(vec![vec![1.0f32, 2.0], vec![3.0, 4.0]], None)?;
//! let b = unitensor::asarray(vec![5.0f32, 6.0], None)?;
//! let c = unitensor::matmul(&a, &b)?; // [17, 39]
//! let d = (&c + 1.0)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): multi-threaded reference kernels

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod api;
pub mod backend;
pub mod config;
pub mod device;
pub mod dtype;
pub mod error;
pub mod frontends;
pub(crate) mod kernels;
pub mod ops;
pub mod tensor;

pub use api::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::api::Opts;
    pub use crate::backend::{self, BackendDescriptor};
    pub use crate::device::{Device, DeviceKind};
    pub use crate::dtype::{Casting, DType, Scalar};
    pub use crate::error::{Error, Result};
    pub use crate::tensor::{Array, ArrayLike, Shape};
}
