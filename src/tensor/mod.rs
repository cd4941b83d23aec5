//! Arrays: handles, array-like inputs and host reference storage

mod handle;
mod host;
mod like;
pub mod shape;

pub use handle::Array;
pub use host::{zip_broadcast, HostArray};
pub use like::{ArrayInterface, ArrayLike, Nested};
pub use shape::Shape;
