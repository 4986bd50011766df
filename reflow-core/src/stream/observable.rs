//! Observable: a lazy description of a value-producing pipeline.
//!
//! An observable is nothing but a boxed subscribe function: creating or
//! composing one performs no work. Each `subscribe` runs the source from
//! scratch (unicast), unless the source is a subject, in which case all
//! subscribers share the hot broadcast.

use std::sync::Arc;

use super::observer::Observer;
use super::subscription::Subscription;

type SourceFn<T> = dyn Fn(Observer<T>) -> Subscription + Send + Sync;

pub struct Observable<T> {
    source: Arc<SourceFn<T>>,
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wrap a subscribe function.
    pub fn new<F>(source: F) -> Self
    where
        F: Fn(Observer<T>) -> Subscription + Send + Sync + 'static,
    {
        Self {
            source: Arc::new(source),
        }
    }

    /// A cold observable that emits the given values and completes. Each
    /// subscriber replays the whole sequence.
    pub fn of(values: Vec<T>) -> Self {
        Self::new(move |mut observer| {
            for value in &values {
                observer.next(value.clone());
            }
            observer.complete();
            Subscription::empty()
        })
    }

    /// An observable that never emits and never completes.
    pub fn never() -> Self {
        Self::new(|_observer| Subscription::empty())
    }

    /// Run the pipeline for one observer.
    pub fn subscribe(&self, observer: Observer<T>) -> Subscription {
        (self.source)(observer)
    }

    /// Convenience: subscribe with a next callback only.
    pub fn subscribe_next<F>(&self, next: F) -> Subscription
    where
        F: FnMut(T) + Send + 'static,
    {
        self.subscribe(Observer::new(next))
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}
