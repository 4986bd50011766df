//! Subject and BehaviorSubject: hot multicast points.
//!
//! A subject delivers each pushed value synchronously to every observer
//! registered at that moment, in registration order. Once completed or
//! errored it is closed: further pushes are rejected (logged, non-fatal)
//! and late subscribers receive the terminal signal immediately.
//!
//! A `BehaviorSubject` additionally holds a current value that every new
//! subscriber receives synchronously before any live values.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::ReactiveError;

use super::observable::Observable;
use super::observer::Observer;
use super::subscription::Subscription;

enum Closed {
    Completed,
    Errored(ReactiveError),
}

struct Slot<T> {
    id: u64,
    observer: Arc<Mutex<Observer<T>>>,
}

struct SubjectState<T> {
    slots: Vec<Slot<T>>,
    closed: Option<Closed>,
    next_slot_id: u64,
}

/// A hot broadcast point. Clones share the same observer registry.
pub struct Subject<T> {
    state: Arc<Mutex<SubjectState<T>>>,
}

impl<T> Subject<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SubjectState {
                slots: Vec::new(),
                closed: None,
                next_slot_id: 0,
            })),
        }
    }

    /// Register an observer. On a closed subject the terminal signal is
    /// delivered immediately and no registration happens.
    pub fn subscribe(&self, observer: Observer<T>) -> Subscription {
        let observer = Arc::new(Mutex::new(observer));
        let id = {
            let mut state = self.state.lock();
            match &state.closed {
                Some(Closed::Completed) => {
                    drop(state);
                    observer.lock().complete();
                    return Subscription::empty();
                }
                Some(Closed::Errored(err)) => {
                    let err = err.clone();
                    drop(state);
                    observer.lock().error(err);
                    return Subscription::empty();
                }
                None => {}
            }
            let id = state.next_slot_id;
            state.next_slot_id += 1;
            state.slots.push(Slot {
                id,
                observer: observer.clone(),
            });
            id
        };

        let state = Arc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = state.upgrade() {
                state.lock().slots.retain(|slot| slot.id != id);
            }
        })
    }

    /// Convenience: subscribe with a next callback only.
    pub fn subscribe_next<F>(&self, next: F) -> Subscription
    where
        F: FnMut(T) + Send + 'static,
    {
        self.subscribe(Observer::new(next))
    }

    /// Push a value to all current observers, in registration order.
    /// A push into a closed subject is reported back to the caller.
    pub fn try_next(&self, value: T) -> Result<(), ReactiveError> {
        let observers = {
            let state = self.state.lock();
            if state.closed.is_some() {
                return Err(ReactiveError::ClosedSubject);
            }
            state
                .slots
                .iter()
                .map(|slot| slot.observer.clone())
                .collect::<Vec<_>>()
        };
        // Deliver outside the registry lock so observers may subscribe or
        // cancel reentrantly.
        for observer in observers {
            observer.lock().next(value.clone());
        }
        Ok(())
    }

    /// Push a value; a write into a closed subject is logged and ignored.
    pub fn next(&self, value: T) {
        if let Err(err) = self.try_next(value) {
            tracing::warn!(%err, "ignoring write into closed subject");
        }
    }

    /// Close the subject and notify all observers of completion.
    pub fn complete(&self) {
        let observers = {
            let mut state = self.state.lock();
            if state.closed.is_some() {
                return;
            }
            state.closed = Some(Closed::Completed);
            std::mem::take(&mut state.slots)
        };
        for slot in observers {
            slot.observer.lock().complete();
        }
    }

    /// Close the subject and notify all observers of the error.
    pub fn error(&self, err: ReactiveError) {
        let observers = {
            let mut state = self.state.lock();
            if state.closed.is_some() {
                return;
            }
            state.closed = Some(Closed::Errored(err.clone()));
            std::mem::take(&mut state.slots)
        };
        for slot in observers {
            slot.observer.lock().error(err.clone());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed.is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// View this subject as a (hot, multicast) observable.
    pub fn as_observable(&self) -> Observable<T> {
        let subject = self.clone();
        Observable::new(move |observer| subject.subscribe(observer))
    }
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Default for Subject<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A subject with a current value, replayed to every new subscriber.
pub struct BehaviorSubject<T> {
    subject: Subject<T>,
    current: Arc<RwLock<T>>,
}

impl<T> BehaviorSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        Self {
            subject: Subject::new(),
            current: Arc::new(RwLock::new(initial)),
        }
    }

    /// The current value.
    pub fn value(&self) -> T {
        self.current.read().clone()
    }

    /// Push a value: updates the current value, then broadcasts.
    pub fn next(&self, value: T) {
        *self.current.write() = value.clone();
        self.subject.next(value);
    }

    /// Register an observer; it receives the current value synchronously
    /// before any live values.
    pub fn subscribe(&self, observer: Observer<T>) -> Subscription {
        let observer = {
            let mut observer = observer;
            if !self.subject.is_closed() {
                observer.next(self.value());
            }
            observer
        };
        self.subject.subscribe(observer)
    }

    pub fn subscribe_next<F>(&self, next: F) -> Subscription
    where
        F: FnMut(T) + Send + 'static,
    {
        self.subscribe(Observer::new(next))
    }

    pub fn complete(&self) {
        self.subject.complete();
    }

    pub fn error(&self, err: ReactiveError) {
        self.subject.error(err);
    }

    pub fn is_closed(&self) -> bool {
        self.subject.is_closed()
    }

    pub fn observer_count(&self) -> usize {
        self.subject.observer_count()
    }

    /// View as a hot observable that replays the current value on
    /// subscribe.
    pub fn as_observable(&self) -> Observable<T> {
        let subject = self.clone();
        Observable::new(move |observer| subject.subscribe(observer))
    }
}

impl<T> Clone for BehaviorSubject<T> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            current: Arc::clone(&self.current),
        }
    }
}
