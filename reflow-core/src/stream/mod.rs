//! Stream Core: push-based reactive values.
//!
//! A [`Subject`] multicasts values it is handed to every live subscriber;
//! a [`BehaviorSubject`] additionally holds the latest value and replays
//! it on subscription. An [`Observable`] is a lazy recipe that does no
//! work until subscribed. [`Subscription`] trees own pipeline resources
//! and cancel depth-first.
//!
//! Operators live in [`operators`] and are methods on [`Observable`].

mod observable;
mod observer;
mod operators;
mod subject;
mod subscription;

pub use observable::Observable;
pub use observer::Observer;
pub use operators::combine_latest;
pub use subject::{BehaviorSubject, Subject};
pub use subscription::Subscription;
