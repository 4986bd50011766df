//! Reflow Core
//!
//! Two reactive state models over the same values, side by side:
//!
//! - `stream`: push-based observables. Sources multicast values to
//!   subscribers as they happen; pipelines are built from operators
//!   (`map`, `filter`, `debounce_time`, `switch_map`, `combine_latest`)
//!   and torn down through [`stream::Subscription`] trees.
//! - `signal`: pull-based signals. Cells hold current values, computeds
//!   memoize derivations over them, and a dependency graph recomputes
//!   exactly what a write affects, glitch-free and with equality pruning.
//! - `bridge`: feeds a push source into a cell so the two sides compose.
//!
//! Time is virtual: `timer` provides a deterministic scheduler that tests
//! (and debounce) drive explicitly.
//!
//! # Example
//!
//! ```rust
//! use reflow_core::signal::Runtime;
//!
//! let rt = Runtime::new();
//! let count = rt.cell(1);
//!
//! let doubled = rt.computed({
//!     let count = count.clone();
//!     move |scope| scope.get(&count) * 2
//! });
//!
//! assert_eq!(doubled.get(), 2);
//! count.set(5);
//! assert_eq!(doubled.get(), 10);
//! ```

pub mod bridge;
pub mod combinators;
pub mod error;
pub mod signal;
pub mod stream;
pub mod timer;

pub use bridge::BridgeCell;
pub use error::ReactiveError;
pub use signal::{Cell, Computed, Effect, Runtime, Scope};
pub use stream::{combine_latest, BehaviorSubject, Observable, Observer, Subject, Subscription};
pub use timer::{TimerHandle, TimerService};
