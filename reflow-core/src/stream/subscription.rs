//! Subscription: the ownership handle for an active pipeline.
//!
//! A subscription owns one optional teardown action plus any number of
//! child subscriptions contributed by composed operators. Cancelling runs
//! the teardown exactly once, then cancels the children depth-first, each
//! exactly once. Cancelling again — including from inside an ancestor's
//! teardown — is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type Teardown = Box<dyn FnOnce() + Send>;

/// Handle returned by subscribing. Clones share the same cancellation
/// state.
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

struct SubscriptionInner {
    cancelled: AtomicBool,
    teardown: Mutex<Option<Teardown>>,
    children: Mutex<Vec<Subscription>>,
}

impl Subscription {
    /// A subscription with a teardown action.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            inner: Arc::new(SubscriptionInner {
                cancelled: AtomicBool::new(false),
                teardown: Mutex::new(Some(Box::new(teardown))),
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A subscription with no teardown of its own, used as a parent for
    /// operator-composed children.
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                cancelled: AtomicBool::new(false),
                teardown: Mutex::new(None),
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Attach a child that is cancelled together with this subscription.
    /// Adding to an already-cancelled subscription cancels the child
    /// immediately.
    pub fn add(&self, child: Subscription) {
        if self.is_cancelled() {
            child.cancel();
            return;
        }
        self.inner.children.lock().push(child);
    }

    /// Cancel this subscription and, transitively, all children.
    /// Idempotent.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(teardown) = self.inner.teardown.lock().take() {
            teardown();
        }
        let children = std::mem::take(&mut *self.inner.children.lock());
        for child in children {
            child.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }
}

impl Clone for Subscription {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
