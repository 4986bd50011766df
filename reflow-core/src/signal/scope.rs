//! Tracking scope.
//!
//! Every recompute runs against an explicit [`Scope`] handed to the compute
//! or effect closure. Reads made through the scope are recorded and replace
//! the reading node's dependency edges once the evaluation finishes. There
//! is no ambient "currently running computation" global: code that does not
//! hold a scope cannot create edges.

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::combinators::Readable;

use super::node::NodeId;

type ReadList = SmallVec<[NodeId; 8]>;

/// The tracking context for one evaluation of a computed node or effect.
pub struct Scope {
    reader: NodeId,
    reads: Mutex<ReadList>,
}

impl Scope {
    pub(crate) fn new(reader: NodeId) -> Self {
        Self {
            reader,
            reads: Mutex::new(SmallVec::new()),
        }
    }

    /// Read `source` and record it as a dependency of the evaluating node.
    pub fn get<T>(&self, source: &impl Readable<T>) -> T {
        source.read(self)
    }

    /// The node this scope is evaluating.
    pub fn reader(&self) -> NodeId {
        self.reader
    }

    pub(crate) fn record(&self, id: NodeId) {
        self.reads.lock().push(id);
    }

    pub(crate) fn take_reads(&self) -> ReadList {
        std::mem::take(&mut *self.reads.lock())
    }
}
