//! Push-to-pull bridge.
//!
//! Feeds an [`Observable`]'s emissions into a [`Cell`], so signal-side
//! computeds and effects can consume a push source through ordinary
//! dependency tracking. Stream errors do not poison the cell: the last
//! good value stays readable and the error is surfaced on a side channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::ReactiveError;
use crate::signal::{Cell, Runtime};
use crate::stream::{Observable, Observer, Subject, Subscription};

/// A cell driven by a push source.
///
/// Holds the seed value until the source first emits, then tracks every
/// emission. Deliberately not `Clone`: dropping the bridge cancels the
/// feeding subscription, and that ownership must stay in one place.
pub struct BridgeCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    cell: Cell<T>,
    errors: Subject<ReactiveError>,
    completed: Arc<AtomicBool>,
    subscription: Subscription,
}

impl Runtime {
    /// Bind `source` to a new cell seeded with `initial`.
    ///
    /// Every emission becomes a cell write and propagates through the
    /// graph with the usual equality suppression. On a stream error the
    /// cell keeps its last value and the error is re-emitted on
    /// [`BridgeCell::on_error`]; completion freezes the cell at its final
    /// value.
    pub fn bridge<T>(&self, source: &Observable<T>, initial: T) -> BridgeCell<T>
    where
        T: Clone + Send + Sync + PartialEq + 'static,
    {
        let cell = self.cell(initial);
        let errors = Subject::new();
        let completed = Arc::new(AtomicBool::new(false));

        let subscription = source.subscribe(
            Observer::new({
                let cell = cell.clone();
                move |value| cell.set(value)
            })
            .with_error({
                let errors = errors.clone();
                move |err| {
                    tracing::warn!(error = %err, "bridge source errored");
                    errors.next(ReactiveError::BridgeSource(err.to_string()));
                }
            })
            .with_complete({
                let completed = completed.clone();
                move || completed.store(true, Ordering::SeqCst)
            }),
        );

        BridgeCell {
            cell,
            errors,
            completed,
            subscription,
        }
    }
}

impl<T> BridgeCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The cell tracking the source. Clone it freely; the bridge keeps
    /// feeding it for as long as the bridge itself is alive.
    pub fn cell(&self) -> &Cell<T> {
        &self.cell
    }

    /// Stream-side failures, re-emitted without disturbing the cell.
    pub fn on_error(&self) -> Observable<ReactiveError> {
        self.errors.as_observable()
    }

    /// Whether the source has completed. The cell keeps its final value.
    pub fn is_complete(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }
}

impl<T> Drop for BridgeCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.subscription.cancel();
    }
}
