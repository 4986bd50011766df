//! Computed: a memoized derived node.
//!
//! The computation runs lazily: first read computes, later reads return the
//! memo until a dependency changes. Each run executes inside a fresh
//! tracking scope and the recorded reads replace the node's dependency
//! edges, so a branch that stops reading a source stops being notified by
//! it.
//!
//! Re-entering a computed during its own evaluation is a cycle: the
//! evaluation unwinds with `ReactiveError::CyclicDependency` naming the
//! node. `try_get` hands the error back; `get` treats it as a programming
//! error and panics.

use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::combinators::Readable;
use crate::error::ReactiveError;

use super::node::{NodeId, NodeKind};
use super::runtime::{AnyNode, RuntimeInner};
use super::scope::Scope;

type ComputeFn<T> = Box<dyn Fn(&Scope) -> T + Send + Sync>;

/// A cached derived value. Created through `Runtime::computed`.
pub struct Computed<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    inner: Arc<ComputedInner<T>>,
}

struct ComputedInner<T> {
    id: NodeId,
    rt: Arc<RuntimeInner>,
    compute: ComputeFn<T>,
    value: RwLock<Option<T>>,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    pub(crate) fn register(rt: Arc<RuntimeInner>, compute: ComputeFn<T>) -> Self {
        let id = NodeId::fresh();
        rt.add_node(id, NodeKind::Computed);
        let inner = Arc::new(ComputedInner {
            id,
            rt,
            compute,
            value: RwLock::new(None),
        });
        let node: Arc<dyn AnyNode> = inner.clone();
        inner.rt.register_node(id, Arc::downgrade(&node));
        Self { inner }
    }

    /// This node's identity.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Read the current value, recomputing if a dependency changed.
    ///
    /// Panics if the computation cyclically reads itself; use [`try_get`]
    /// to handle that as a value.
    ///
    /// [`try_get`]: Computed::try_get
    pub fn get(&self) -> T {
        match self.inner.read_latest() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fallible read: returns `CyclicDependency` instead of panicking.
    pub fn try_get(&self) -> Result<T, ReactiveError> {
        self.inner.read_latest()
    }

    /// Whether the computation has produced a value yet.
    pub fn has_value(&self) -> bool {
        self.inner.value.read().is_some()
    }
}

impl<T> ComputedInner<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Return the memoized value, recomputing first if the node is dirty or
    /// has never run.
    fn read_latest(&self) -> Result<T, ReactiveError> {
        if self.rt.is_dirty(self.id) || self.value.read().is_none() {
            self.refresh()?;
        }
        Ok(self
            .value
            .read()
            .clone()
            .expect("refreshed computed holds a value"))
    }
}

impl<T> AnyNode for ComputedInner<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn refresh(&self) -> Result<bool, ReactiveError> {
        let _guard = self.rt.enter_eval(self.id)?;
        let scope = Scope::new(self.id);

        // A cyclic read deeper in the evaluation unwinds with a typed
        // payload; catch it here and surface it as this node's failure.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.compute)(&scope)));
        let new_value = match outcome {
            Ok(value) => value,
            Err(payload) => match payload.downcast::<ReactiveError>() {
                Ok(err) => return Err(*err),
                Err(other) => panic::resume_unwind(other),
            },
        };

        self.rt.replace_dependencies(self.id, scope.take_reads());

        let changed = {
            let current = self.value.read();
            current.as_ref() != Some(&new_value)
        };
        *self.value.write() = Some(new_value);
        self.rt.mark_clean(self.id);
        Ok(changed)
    }
}

impl<T> Readable<T> for Computed<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn node_id(&self) -> NodeId {
        self.inner.id
    }

    fn read_untracked(&self) -> T {
        self.get()
    }

    fn read(&self, scope: &Scope) -> T {
        scope.record(self.inner.id);
        match self.inner.read_latest() {
            Ok(value) => value,
            // Unwind to the enclosing evaluation's catch so the error names
            // the node and aborts only the work reachable from it.
            Err(err) => panic::panic_any(err),
        }
    }
}

impl<T> Clone for Computed<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Computed<T>
where
    T: Clone + Send + Sync + PartialEq + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("has_value", &self.has_value())
            .finish()
    }
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.rt.remove_node(self.id);
    }
}
