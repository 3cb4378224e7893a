//! Reactive Primitives
//!
//! This module implements the reactive system: signals, derived values and
//! effects, plus the runtime that connects them.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a running computation, the signal registers that computation as a
//! dependent. When the signal is written, all dependents are scheduled.
//!
//! ## Derived Values
//!
//! A Derived value is a signal whose value is owned by a formula. It is
//! recomputed eagerly whenever one of the signals the formula read changes,
//! and it can itself be read by other computations.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs once on creation and
//! again whenever its dependencies change.
//!
//! # Implementation Notes
//!
//! Each [`Runtime`] owns a tracker stack to detect dependencies. When a
//! signal is read, the runtime checks whether a computation is running and,
//! if so, records the edge. Dependencies are rediscovered on every run, so
//! conditional reads subscribe and unsubscribe as branches change.
//!
//! Writes are batched: propagation happens in a flush deferred to the
//! runtime's [`MicrotaskQueue`], so any number of writes in one synchronous
//! block cause a single flush.

mod context;
mod derived;
mod effect;
mod microtask;
mod runtime;
mod signal;

pub use context::{Tracker, TrackingScope};
pub use derived::Derived;
pub use effect::Effect;
pub use microtask::{LocalQueue, MicrotaskQueue, Task, TokioQueue};
pub use runtime::{ErrorHandler, Runtime};
pub use signal::{ReadSignal, Signal, WriteSignal};
