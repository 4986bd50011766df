//! Operators over observables.
//!
//! Every operator is a pure transformation over the observer contract: it
//! wraps the downstream observer and subscribes upstream, returning a
//! parent subscription that owns every resource the stage created. Failing
//! a stage delivers `on_error` downstream and cancels the subscription
//! tree; errors never leak into sibling subscriptions.
//!
//! Per-value logic lives in [`crate::combinators`] and is shared with the
//! signal core.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::combinators::{FilterFn, LatestSet, MapFn, SwitchGate, Transform, TryMapFn};
use crate::error::ReactiveError;
use crate::timer::{TimerHandle, TimerService};

use super::observable::Observable;
use super::observer::Observer;
use super::subscription::Subscription;

type SharedObserver<T> = Arc<Mutex<Observer<T>>>;

/// An observer that forwards all three signals into a shared downstream.
fn forward_into<T>(shared: &SharedObserver<T>) -> Observer<T>
where
    T: Clone + Send + Sync + 'static,
{
    let on_next = shared.clone();
    let on_error = shared.clone();
    let on_complete = shared.clone();
    Observer::new(move |value| on_next.lock().next(value))
        .with_error(move |err| on_error.lock().error(err))
        .with_complete(move || on_complete.lock().complete())
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Feed every upstream value through a shared [`Transform`] stage.
    ///
    /// Each subscription gets its own copy of the stage. A stage failure is
    /// delivered as `on_error` and tears the subscription down.
    pub fn transform<U, S>(&self, stage: S) -> Observable<U>
    where
        U: Clone + Send + Sync + 'static,
        S: Transform<T, U> + Clone + Send + Sync + 'static,
    {
        let source = self.clone();
        Observable::new(move |observer| {
            let parent = Subscription::empty();
            let shared = Arc::new(Mutex::new(observer));
            let mut stage = stage.clone();

            let upstream = source.subscribe(
                Observer::new({
                    let shared = shared.clone();
                    let parent = parent.clone();
                    move |value| match stage.apply(value) {
                        Ok(Some(out)) => shared.lock().next(out),
                        Ok(None) => {}
                        Err(err) => {
                            shared.lock().error(err);
                            parent.cancel();
                        }
                    }
                })
                .with_error({
                    let shared = shared.clone();
                    move |err| shared.lock().error(err)
                })
                .with_complete({
                    let shared = shared.clone();
                    move || shared.lock().complete()
                }),
            );
            parent.add(upstream);
            parent
        })
    }

    /// Transform every value.
    pub fn map<U, F>(&self, f: F) -> Observable<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnMut(T) -> U + Clone + Send + Sync + 'static,
    {
        self.transform(MapFn(f))
    }

    /// Keep only values matching the predicate.
    pub fn filter<F>(&self, predicate: F) -> Observable<T>
    where
        F: FnMut(&T) -> bool + Clone + Send + Sync + 'static,
    {
        self.transform(FilterFn(predicate))
    }

    /// Fallible transform; an `Err` terminates the subscription with a
    /// stream error.
    pub fn try_map<U, F>(&self, f: F) -> Observable<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnMut(T) -> Result<U, ReactiveError> + Clone + Send + Sync + 'static,
    {
        self.transform(TryMapFn(f))
    }

    /// Emit `initial` to each new subscriber before any upstream values.
    pub fn start_with(&self, initial: T) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |observer| {
            let shared = Arc::new(Mutex::new(observer));
            shared.lock().next(initial.clone());
            source.subscribe(forward_into(&shared))
        })
    }

    /// Delay each value by `delay`, dropping it if a newer value arrives
    /// first. Completion drops any pending value and completes
    /// immediately; so does an upstream error.
    pub fn debounce_time(&self, delay: Duration, timers: &TimerService) -> Observable<T> {
        let source = self.clone();
        let timers = timers.clone();
        Observable::new(move |observer| {
            let parent = Subscription::empty();
            let shared = Arc::new(Mutex::new(observer));
            let pending: Arc<Mutex<Option<TimerHandle>>> = Arc::new(Mutex::new(None));

            let upstream = source.subscribe(
                Observer::new({
                    let shared = shared.clone();
                    let pending = pending.clone();
                    let timers = timers.clone();
                    move |value: T| {
                        let mut slot = pending.lock();
                        if let Some(superseded) = slot.take() {
                            superseded.cancel();
                        }
                        let shared = shared.clone();
                        *slot = Some(timers.schedule(delay, move || {
                            shared.lock().next(value);
                        }));
                    }
                })
                .with_error({
                    let shared = shared.clone();
                    let pending = pending.clone();
                    move |err| {
                        let dropped = pending.lock().take();
                        if let Some(handle) = dropped {
                            handle.cancel();
                        }
                        shared.lock().error(err);
                    }
                })
                .with_complete({
                    let shared = shared.clone();
                    let pending = pending.clone();
                    move || {
                        let dropped = pending.lock().take();
                        if let Some(handle) = dropped {
                            handle.cancel();
                        }
                        shared.lock().complete();
                    }
                }),
            );
            parent.add(upstream);
            parent.add(Subscription::new({
                let pending = pending.clone();
                move || {
                    let dropped = pending.lock().take();
                    if let Some(handle) = dropped {
                        handle.cancel();
                    }
                }
            }));
            parent
        })
    }

    /// Map each value to an inner observable and forward only the latest
    /// inner's emissions; each new value unsubscribes the previous inner.
    /// Inner completion does not complete the outer; outer completion
    /// completes downstream and cancels the in-flight inner.
    pub fn switch_map<U, F>(&self, project: F) -> Observable<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnMut(T) -> Observable<U> + Clone + Send + Sync + 'static,
    {
        let source = self.clone();
        Observable::new(move |observer| {
            let parent = Subscription::empty();
            let shared = Arc::new(Mutex::new(observer));
            let gate = Arc::new(SwitchGate::new());
            let inner_sub: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
            let mut project = project.clone();

            let upstream = source.subscribe(
                Observer::new({
                    let shared = shared.clone();
                    let gate = gate.clone();
                    let inner_sub = inner_sub.clone();
                    let parent = parent.clone();
                    move |value: T| {
                        let generation = gate.advance();
                        let previous = inner_sub.lock().take();
                        if let Some(previous) = previous {
                            previous.cancel();
                        }
                        let inner = project(value);
                        let sub = inner.subscribe(
                            Observer::new({
                                let shared = shared.clone();
                                let gate = gate.clone();
                                move |inner_value| {
                                    if gate.admit(generation) {
                                        shared.lock().next(inner_value);
                                    }
                                }
                            })
                            .with_error({
                                let shared = shared.clone();
                                let gate = gate.clone();
                                let parent = parent.clone();
                                move |err| {
                                    if gate.admit(generation) {
                                        shared.lock().error(err);
                                        parent.cancel();
                                    }
                                }
                            }),
                        );
                        *inner_sub.lock() = Some(sub);
                    }
                })
                .with_error({
                    let shared = shared.clone();
                    let inner_sub = inner_sub.clone();
                    move |err| {
                        let inner = inner_sub.lock().take();
                        if let Some(inner) = inner {
                            inner.cancel();
                        }
                        shared.lock().error(err);
                    }
                })
                .with_complete({
                    let shared = shared.clone();
                    let gate = gate.clone();
                    let inner_sub = inner_sub.clone();
                    move || {
                        gate.advance();
                        let inner = inner_sub.lock().take();
                        if let Some(inner) = inner {
                            inner.cancel();
                        }
                        shared.lock().complete();
                    }
                }),
            );
            parent.add(upstream);
            parent.add(Subscription::new({
                let gate = gate.clone();
                let inner_sub = inner_sub.clone();
                move || {
                    gate.advance();
                    let inner = inner_sub.lock().take();
                    if let Some(inner) = inner {
                        inner.cancel();
                    }
                }
            }));
            parent
        })
    }

    /// Forward upstream values until `notifier` emits once, then complete
    /// downstream and tear down both subscriptions. A notifier error is
    /// forwarded downstream as the stream error.
    pub fn take_until<N>(&self, notifier: &Observable<N>) -> Observable<T>
    where
        N: Clone + Send + Sync + 'static,
    {
        let source = self.clone();
        let notifier = notifier.clone();
        Observable::new(move |observer| {
            let parent = Subscription::empty();
            let shared = Arc::new(Mutex::new(observer));

            let notifier_sub = notifier.subscribe(
                Observer::new({
                    let shared = shared.clone();
                    let parent = parent.clone();
                    move |_signal| {
                        shared.lock().complete();
                        parent.cancel();
                    }
                })
                .with_error({
                    let shared = shared.clone();
                    let parent = parent.clone();
                    move |err| {
                        shared.lock().error(err);
                        parent.cancel();
                    }
                }),
            );
            parent.add(notifier_sub);

            let upstream = source.subscribe(forward_into(&shared));
            parent.add(upstream);
            parent
        })
    }
}

/// Combine the latest values of all sources, in source-list order.
///
/// Emits nothing until every source has emitted once, then exactly once
/// per subsequent emission with a snapshot of all latest values. Completes
/// once every source has completed; an error on any source errors the
/// combination.
pub fn combine_latest<T>(sources: Vec<Observable<T>>) -> Observable<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
{
    Observable::new(move |observer| {
        let parent = Subscription::empty();
        let shared = Arc::new(Mutex::new(observer));

        if sources.is_empty() {
            shared.lock().complete();
            return parent;
        }

        let latest = Arc::new(Mutex::new(LatestSet::new(sources.len())));
        let open = Arc::new(AtomicUsize::new(sources.len()));

        for (index, source) in sources.iter().enumerate() {
            let sub = source.subscribe(
                Observer::new({
                    let shared = shared.clone();
                    let latest = latest.clone();
                    move |value| {
                        let snapshot = {
                            let mut set = latest.lock();
                            set.store(index, value);
                            set.snapshot()
                        };
                        if let Some(values) = snapshot {
                            shared.lock().next(values);
                        }
                    }
                })
                .with_error({
                    let shared = shared.clone();
                    let parent = parent.clone();
                    move |err| {
                        shared.lock().error(err);
                        parent.cancel();
                    }
                })
                .with_complete({
                    let shared = shared.clone();
                    let open = open.clone();
                    move || {
                        if open.fetch_sub(1, Ordering::SeqCst) == 1 {
                            shared.lock().complete();
                        }
                    }
                }),
            );
            parent.add(sub);
        }
        parent
    })
}
