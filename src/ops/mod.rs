//! Operator identities, tables and the dispatch machinery
//!
//! A call travels as a [`CallFrame`] through an ordered list of
//! [`Adapter`]s, reaches the leaf bound in the active backend's
//! [`OperatorTable`] and comes back out as array handles.

mod dispatch;
mod frame;
mod kernel;
mod marshal;
mod op_id;
mod signature;
mod table;
mod wrappers;

pub use dispatch::{call_by_name, dispatch, dispatch_one, Output};
pub use frame::{CallFrame, Value};
pub use kernel::{Invocation, Kernel, KernelValue};
pub use marshal::{cast_native, take_substitutions, to_native, Substitution};
pub use op_id::{Family, OpId, REQUIRED};
pub use signature::{signature, DtypeHint, Promote, Signature, WhereFill};
pub use table::{OpEntry, OperatorTable};
pub use wrappers::{Adapter, CallContext, Produced, FRONTEND_CHAIN, UNIFIED_CHAIN};
