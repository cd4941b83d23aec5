//! Frontend façades
//!
//! Each submodule emulates the API of one foreign array library on top of
//! the unified surface: foreign argument conventions go in, the library's
//! own array type comes out. Symbols whose behaviour changed between
//! library versions are routed by [`version`].
//!
//! | module | emulates |
//! |--------|----------|
//! | [`numeric_python`] | numpy |
//! | [`autograd_tracer`] | torch |
//! | [`tensor_train`] | tensorflow |
//! | [`accelerator_numeric`] | jax.numpy |

pub(crate) mod common;
pub mod version;

pub mod accelerator_numeric;
pub mod autograd_tracer;
pub mod numeric_python;
pub mod tensor_train;

pub use version::{parse_version, Library, VersionRange, Versioned};
