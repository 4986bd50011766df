//! Error taxonomy for both reactive cores.
//!
//! Failures are split into recoverable faults that are logged and absorbed
//! (writing into a closed subject) and faults that terminate exactly one
//! computation or subscription (cycles, operator failures, bridge source
//! failures). Independent subscriptions and effects are isolated failure
//! domains: an error in one never crosses into another.

use thiserror::Error;

use crate::signal::NodeId;

/// Errors produced by the stream core, the signal core, or the bridge.
#[derive(Debug, Clone, Error)]
pub enum ReactiveError {
    /// A value was pushed into a subject that already completed or errored.
    ///
    /// Recoverable: the write is ignored and logged. `Subject::next` absorbs
    /// it; `Subject::try_next` hands it back to the caller.
    #[error("value delivered to a closed subject")]
    ClosedSubject,

    /// A computed node re-entered its own evaluation.
    ///
    /// Fatal to that computation. During a propagation pass only the work
    /// reachable from the cycle is aborted; the rest of the pass completes.
    #[error("cyclic dependency detected while evaluating node {node:?}")]
    CyclicDependency {
        /// The node whose evaluation was re-entered.
        node: NodeId,
    },

    /// A fallible operator stage failed.
    ///
    /// Delivered downstream as a stream error; terminates that subscription
    /// only (its teardown runs).
    #[error("operator stage failed: {0}")]
    Operator(String),

    /// The push source behind a bridge failed.
    ///
    /// The bridged cell retains its last good value; the error is surfaced
    /// on the bridge's side channel.
    #[error("bridge source failed: {0}")]
    BridgeSource(String),
}
