//! Pull-based signal core.
//!
//! Mutable [`Cell`]s are the roots; [`Computed`] nodes memoize derivations
//! and track their dependencies dynamically; [`Effect`]s synchronize the
//! graph with the outside world. A per-instance [`Runtime`] owns the
//! dependency graph and schedules glitch-free, batched recomputation: one
//! cell write finalizes each affected node at most once, in dependency
//! order, with effects running last.
//!
//! Dependency tracking is explicit: compute and effect closures receive a
//! [`Scope`] and read their sources through it. Reads outside a scope are
//! untracked.

mod cell;
mod computed;
mod effect;
mod graph;
mod node;
mod runtime;
mod scope;

pub use cell::Cell;
pub use computed::Computed;
pub use effect::Effect;
pub use node::{NodeId, NodeKind};
pub use runtime::Runtime;
pub use scope::Scope;
