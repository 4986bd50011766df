//! Shared combinator machinery.
//!
//! Per-value operator logic lives here once and is specialized by both
//! cores: the stream operators feed values through [`Transform`] stages, and
//! the signal helpers wrap the same stages in computed nodes. [`Readable`]
//! is the minimal pull capability (a node identity plus a tracked read) that
//! the tracking scope and the signal helpers are written against.
//!
//! [`LatestSet`] and [`SwitchGate`] carry the stateful parts of
//! `combine_latest` and `switch_map`.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ReactiveError;
use crate::signal::{NodeId, Scope};

/// A fallible per-value stage.
///
/// `Ok(Some(out))` emits, `Ok(None)` drops the value, `Err` terminates the
/// consuming pipeline with an operator error.
pub trait Transform<I, O>: Send {
    fn apply(&mut self, input: I) -> Result<Option<O>, ReactiveError>;
}

/// Infallible mapping stage.
#[derive(Clone)]
pub struct MapFn<F>(pub F);

impl<I, O, F> Transform<I, O> for MapFn<F>
where
    F: FnMut(I) -> O + Send,
{
    fn apply(&mut self, input: I) -> Result<Option<O>, ReactiveError> {
        Ok(Some((self.0)(input)))
    }
}

/// Predicate stage: passes values through unchanged when the predicate holds.
#[derive(Clone)]
pub struct FilterFn<F>(pub F);

impl<I, F> Transform<I, I> for FilterFn<F>
where
    F: FnMut(&I) -> bool + Send,
{
    fn apply(&mut self, input: I) -> Result<Option<I>, ReactiveError> {
        if (self.0)(&input) {
            Ok(Some(input))
        } else {
            Ok(None)
        }
    }
}

/// Fallible mapping stage.
#[derive(Clone)]
pub struct TryMapFn<F>(pub F);

impl<I, O, F> Transform<I, O> for TryMapFn<F>
where
    F: FnMut(I) -> Result<O, ReactiveError> + Send,
{
    fn apply(&mut self, input: I) -> Result<Option<O>, ReactiveError> {
        (self.0)(input).map(Some)
    }
}

/// The pull capability shared by cells and computed nodes.
///
/// A tracked read records a dependency edge on the reading node; an
/// untracked read just yields the current value.
pub trait Readable<T> {
    /// Identity of this node in its dependency graph.
    fn node_id(&self) -> NodeId;

    /// Read the current value without registering a dependency.
    fn read_untracked(&self) -> T;

    /// Read the current value inside a tracking scope, registering the edge.
    fn read(&self, scope: &Scope) -> T;
}

/// Latest-value slots for an N-way combination.
///
/// Becomes ready once every slot has been filled at least once; after that,
/// each store produces a fresh snapshot in slot order.
pub struct LatestSet<T> {
    slots: Vec<Option<T>>,
    filled: usize,
}

impl<T: Clone> LatestSet<T> {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| None).collect(),
            filled: 0,
        }
    }

    /// Store the latest value for `index`.
    pub fn store(&mut self, index: usize, value: T) {
        if self.slots[index].is_none() {
            self.filled += 1;
        }
        self.slots[index] = Some(value);
    }

    /// Whether every slot has emitted at least once.
    pub fn ready(&self) -> bool {
        self.filled == self.slots.len()
    }

    /// Snapshot of all slots in slot order, once ready.
    pub fn snapshot(&self) -> Option<Vec<T>> {
        self.slots.iter().cloned().collect()
    }
}

/// Generation counter gating latest-wins delivery.
///
/// Each upstream value advances the generation; emissions from an inner
/// producer are admitted only while their generation is still current.
pub struct SwitchGate {
    generation: AtomicU64,
}

impl SwitchGate {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
        }
    }

    /// Open a new generation, invalidating all previous ones.
    pub fn advance(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `generation` is still the current one.
    pub fn admit(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

impl Default for SwitchGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_fn_transforms_every_value() {
        let mut stage = MapFn(|v: i32| v * 2);
        assert!(matches!(stage.apply(3), Ok(Some(6))));
        assert!(matches!(stage.apply(0), Ok(Some(0))));
    }

    #[test]
    fn filter_fn_drops_failing_values() {
        let mut stage = FilterFn(|v: &i32| *v > 10);
        assert!(matches!(stage.apply(20), Ok(Some(20))));
        assert!(matches!(stage.apply(5), Ok(None)));
    }

    #[test]
    fn try_map_fn_surfaces_errors() {
        let mut stage = TryMapFn(|v: i32| {
            if v < 0 {
                Err(ReactiveError::Operator("negative input".into()))
            } else {
                Ok(v + 1)
            }
        });
        assert!(matches!(stage.apply(1), Ok(Some(2))));
        assert!(matches!(stage.apply(-1), Err(ReactiveError::Operator(_))));
    }

    #[test]
    fn latest_set_waits_for_all_slots() {
        let mut set = LatestSet::new(3);
        set.store(0, "a");
        set.store(2, "c");
        assert!(!set.ready());
        assert!(set.snapshot().is_none());

        set.store(1, "b");
        assert!(set.ready());
        assert_eq!(set.snapshot(), Some(vec!["a", "b", "c"]));

        // Later stores refresh the snapshot without losing readiness.
        set.store(0, "a2");
        assert_eq!(set.snapshot(), Some(vec!["a2", "b", "c"]));
    }

    #[test]
    fn switch_gate_admits_only_current_generation() {
        let gate = SwitchGate::new();
        let first = gate.advance();
        assert!(gate.admit(first));

        let second = gate.advance();
        assert!(!gate.admit(first));
        assert!(gate.admit(second));
    }
}
