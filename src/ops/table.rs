//! Operator tables: a backend's vtable keyed by `OpId`

use super::kernel::Kernel;
use super::op_id::OpId;
use crate::dtype::DTypeSet;

/// A bound operator implementation and the flags declared on it
#[derive(Copy, Clone)]
pub struct OpEntry {
    /// Leaf implementation
    pub kernel: Kernel,
    /// The leaf writes directly into a supplied `out` array
    pub support_native_out: bool,
    /// Dtypes this leaf cannot take even though the backend can
    pub unsupported_dtypes: DTypeSet,
    /// Sorting leaves only: equal keys keep their input order
    pub stable: bool,
}

impl OpEntry {
    /// Entry with default flags
    pub const fn new(kernel: Kernel) -> Self {
        Self {
            kernel,
            support_native_out: false,
            unsupported_dtypes: DTypeSet::EMPTY,
            stable: true,
        }
    }

    /// Mark the leaf as writing into `out` itself
    pub const fn native_out(mut self) -> Self {
        self.support_native_out = true;
        self
    }

    /// Declare dtypes the leaf rejects
    pub const fn unsupported(mut self, dtypes: DTypeSet) -> Self {
        self.unsupported_dtypes = self.unsupported_dtypes.union(dtypes);
        self
    }

    /// Mark a sorting leaf as not order-preserving for equal keys
    pub const fn unstable(mut self) -> Self {
        self.stable = false;
        self
    }
}

impl std::fmt::Debug for OpEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpEntry")
            .field("support_native_out", &self.support_native_out)
            .field("unsupported_dtypes", &self.unsupported_dtypes)
            .field("stable", &self.stable)
            .finish_non_exhaustive()
    }
}

/// Operator table with O(1) lookup by `OpId`
#[derive(Clone, Debug)]
pub struct OperatorTable {
    entries: Vec<Option<OpEntry>>,
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self {
            entries: vec![None; OpId::COUNT],
        }
    }
}

impl OperatorTable {
    /// Bound entry for `op`
    #[inline]
    pub fn get(&self, op: OpId) -> Option<&OpEntry> {
        self.entries[op.index()].as_ref()
    }

    /// Mutable bound entry for `op`
    #[inline]
    pub fn get_mut(&mut self, op: OpId) -> Option<&mut OpEntry> {
        self.entries[op.index()].as_mut()
    }

    /// Bind `op`, replacing any previous entry
    pub fn insert(&mut self, op: OpId, entry: OpEntry) {
        self.entries[op.index()] = Some(entry);
    }

    /// Unbind `op`
    pub fn remove(&mut self, op: OpId) -> Option<OpEntry> {
        self.entries[op.index()].take()
    }

    /// Whether `op` is bound
    #[inline]
    pub fn contains(&self, op: OpId) -> bool {
        self.get(op).is_some()
    }

    /// Bound operators in declaration order
    pub fn ops(&self) -> impl Iterator<Item = OpId> + '_ {
        OpId::ALL.iter().copied().filter(|op| self.contains(*op))
    }

    /// Number of bound operators
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// Whether nothing is bound
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
