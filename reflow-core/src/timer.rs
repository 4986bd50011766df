//! Timer Service
//!
//! A virtual-clock scheduler for delayed, cancellable callbacks. Debounce is
//! built on top of it, and tests drive time explicitly with [`TimerService::advance`].
//!
//! The clock only moves when `advance` is called, so a scheduled callback
//! resumes work as a new top-level event: scheduling returns immediately and
//! nothing fires until the host advances time. Callbacks run outside the
//! queue lock, so a firing callback may schedule or cancel further timers.
//!
//! Same-deadline callbacks fire in scheduling order; the queue is keyed by
//! `(deadline, sequence)`.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

type Callback = Box<dyn FnOnce() + Send>;

/// Queue key: deadline in milliseconds, then scheduling sequence.
type TimerKey = (u64, u64);

struct TimerState {
    now_ms: u64,
    next_seq: u64,
    queue: BTreeMap<TimerKey, Callback>,
}

/// A shared virtual-time scheduler.
///
/// Handles are cheap clones of the same underlying queue.
#[derive(Clone)]
pub struct TimerService {
    inner: Arc<Mutex<TimerState>>,
}

/// Handle to a scheduled callback.
///
/// Cancelling is idempotent and a no-op once the callback has fired.
pub struct TimerHandle {
    service: Weak<Mutex<TimerState>>,
    key: TimerKey,
}

impl TimerHandle {
    /// Remove the scheduled callback from the queue, if it is still pending.
    pub fn cancel(&self) {
        if let Some(state) = self.service.upgrade() {
            state.lock().queue.remove(&self.key);
        }
    }
}

impl TimerService {
    /// Create a new service with the clock at zero.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TimerState {
                now_ms: 0,
                next_seq: 0,
                queue: BTreeMap::new(),
            })),
        }
    }

    /// Schedule `callback` to fire `delay` after the current virtual time.
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.inner.lock();
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let deadline = state.now_ms.saturating_add(delay_ms);
        let key = (deadline, state.next_seq);
        state.next_seq += 1;
        state.queue.insert(key, Box::new(callback));
        TimerHandle {
            service: Arc::downgrade(&self.inner),
            key,
        }
    }

    /// Move virtual time forward, firing every callback whose deadline is
    /// reached, in deadline order.
    ///
    /// While a callback runs, the clock reads its deadline, so work it
    /// schedules is measured from that instant.
    pub fn advance(&self, by: Duration) {
        let target = {
            let state = self.inner.lock();
            let by_ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
            state.now_ms.saturating_add(by_ms)
        };
        loop {
            let due = {
                let mut state = self.inner.lock();
                match state.queue.pop_first() {
                    Some((key, callback)) if key.0 <= target => {
                        state.now_ms = key.0;
                        Some(callback)
                    }
                    Some((key, callback)) => {
                        state.queue.insert(key, callback);
                        None
                    }
                    None => None,
                }
            };
            match due {
                Some(callback) => callback(),
                None => break,
            }
        }
        self.inner.lock().now_ms = target;
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        Duration::from_millis(self.inner.lock().now_ms)
    }

    /// Number of callbacks still waiting to fire.
    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }
}

impl Default for TimerService {
    fn default() -> Self {
        Self::new()
    }
}
