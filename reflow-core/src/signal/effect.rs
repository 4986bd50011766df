//! Effect: an eager side-effecting leaf.
//!
//! Registration runs the action once immediately to establish its
//! dependency set. After that the runtime reruns it at the end of every
//! propagation pass in which a transitive dependency actually changed.
//!
//! An effect stays live while a handle is held or until `dispose()`;
//! either way the node is unlinked so no notification path leaks.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::ReactiveError;

use super::node::{NodeId, NodeKind};
use super::runtime::{AnyNode, RuntimeInner};
use super::scope::Scope;

type ActionFn = Box<dyn Fn(&Scope) + Send + Sync>;

/// Handle to a registered effect. Created through `Runtime::effect`.
pub struct Effect {
    inner: Arc<EffectInner>,
}

struct EffectInner {
    id: NodeId,
    rt: Arc<RuntimeInner>,
    action: ActionFn,
    disposed: AtomicBool,
    runs: AtomicUsize,
}

impl Effect {
    pub(crate) fn register(rt: Arc<RuntimeInner>, action: ActionFn) -> Self {
        let id = NodeId::fresh();
        rt.add_node(id, NodeKind::Effect);
        let inner = Arc::new(EffectInner {
            id,
            rt,
            action,
            disposed: AtomicBool::new(false),
            runs: AtomicUsize::new(0),
        });
        let node: Arc<dyn AnyNode> = inner.clone();
        inner.rt.register_node(id, Arc::downgrade(&node));

        // Establish the initial dependency set.
        if let Err(err) = inner.refresh() {
            tracing::error!(%err, node = id.raw(), "effect failed during registration");
        }

        Self { inner }
    }

    /// This node's identity.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Unlink the effect; it will never run again.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.inner.rt.remove_node(self.inner.id);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Number of times the action has run, the registration run included.
    pub fn run_count(&self) -> usize {
        self.inner.runs.load(Ordering::SeqCst)
    }
}

impl AnyNode for EffectInner {
    fn refresh(&self) -> Result<bool, ReactiveError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Ok(false);
        }

        let _guard = self.rt.enter_eval(self.id)?;
        let scope = Scope::new(self.id);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.action)(&scope)));
        if let Err(payload) = outcome {
            match payload.downcast::<ReactiveError>() {
                Ok(err) => return Err(*err),
                Err(other) => panic::resume_unwind(other),
            }
        }

        self.rt.replace_dependencies(self.id, scope.take_reads());
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        self.rt.remove_node(self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    use crate::signal::Runtime;

    #[test]
    fn effect_runs_on_registration() {
        let rt = Runtime::new();
        let runs = Arc::new(AtomicI32::new(0));
        let runs_clone = runs.clone();

        let effect = rt.effect(move |_scope| {
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_reruns_when_dependency_changes() {
        let rt = Runtime::new();
        let cell = rt.cell(0);
        let observed = Arc::new(AtomicI32::new(-1));

        let effect = rt.effect({
            let cell = cell.clone();
            let observed = observed.clone();
            move |scope| {
                observed.store(scope.get(&cell), Ordering::SeqCst);
            }
        });

        assert_eq!(observed.load(Ordering::SeqCst), 0);

        cell.set(42);
        assert_eq!(observed.load(Ordering::SeqCst), 42);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn disposed_effect_does_not_run() {
        let rt = Runtime::new();
        let cell = rt.cell(0);
        let runs = Arc::new(AtomicI32::new(0));

        let effect = rt.effect({
            let cell = cell.clone();
            let runs = runs.clone();
            move |scope| {
                scope.get(&cell);
                runs.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        effect.dispose();
        assert!(effect.is_disposed());

        cell.set(1);
        cell.set(2);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_the_handle_unlinks_the_effect() {
        let rt = Runtime::new();
        let cell = rt.cell(0);
        let runs = Arc::new(AtomicI32::new(0));

        let effect = rt.effect({
            let cell = cell.clone();
            let runs = runs.clone();
            move |scope| {
                scope.get(&cell);
                runs.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(cell.dependent_count(), 1);

        drop(effect);
        assert_eq!(cell.dependent_count(), 0);

        cell.set(1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_writing_a_cell_queues_a_follow_up_pass() {
        let rt = Runtime::new();
        let source = rt.cell(1);
        let echo = rt.cell(0);

        let _effect = rt.effect({
            let (source, echo) = (source.clone(), echo.clone());
            move |scope| {
                let v = scope.get(&source);
                echo.set(v * 10);
            }
        });
        assert_eq!(echo.get(), 10);

        let seen = Arc::new(AtomicI32::new(0));
        let _watcher = rt.effect({
            let echo = echo.clone();
            let seen = seen.clone();
            move |scope| {
                seen.store(scope.get(&echo), Ordering::SeqCst);
            }
        });

        source.set(7);
        assert_eq!(echo.get(), 70);
        assert_eq!(seen.load(Ordering::SeqCst), 70);
    }
}
