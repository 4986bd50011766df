//! Observer: the downstream contract of the push core.
//!
//! A triple of callbacks: `next` is required, `error` and `complete` are
//! optional. After a terminal signal (error or complete) the observer is
//! stopped and further signals are ignored, so operators never have to
//! guard against double termination themselves.

use crate::error::ReactiveError;

type NextFn<T> = Box<dyn FnMut(T) + Send>;
type ErrorFn = Box<dyn FnMut(ReactiveError) + Send>;
type CompleteFn = Box<dyn FnMut() + Send>;

pub struct Observer<T> {
    next: NextFn<T>,
    error: Option<ErrorFn>,
    complete: Option<CompleteFn>,
    stopped: bool,
}

impl<T> Observer<T> {
    pub fn new<F>(next: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        Self {
            next: Box::new(next),
            error: None,
            complete: None,
            stopped: false,
        }
    }

    pub fn with_error<F>(mut self, error: F) -> Self
    where
        F: FnMut(ReactiveError) + Send + 'static,
    {
        self.error = Some(Box::new(error));
        self
    }

    pub fn with_complete<F>(mut self, complete: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.complete = Some(Box::new(complete));
        self
    }

    /// Deliver a value. Ignored after a terminal signal.
    pub fn next(&mut self, value: T) {
        if self.stopped {
            return;
        }
        (self.next)(value);
    }

    /// Deliver an error and stop. An unhandled error is logged so no
    /// failure is silent.
    pub fn error(&mut self, err: ReactiveError) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        match &mut self.error {
            Some(callback) => callback(err),
            None => tracing::warn!(%err, "stream error with no error observer"),
        }
    }

    /// Deliver completion and stop.
    pub fn complete(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Some(callback) = &mut self.complete {
            callback();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}
