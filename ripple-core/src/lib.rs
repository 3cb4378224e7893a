//! Ripple Core
//!
//! This crate provides a fine-grained reactive runtime. It implements:
//!
//! - Reactive primitives (signals, derived values, effects)
//! - Automatic, dynamic dependency tracking
//! - Microtask-batched, deduplicated propagation
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: the user-facing primitives and the runtime that drives them
//! - `graph`: arena storage for cells and computations, and the scheduler
//! - `config`: runtime tunables, loadable from JSON
//! - `error`: the error type reported by the runtime
//!
//! # Example
//!
//! ```rust
//! use ripple_core::Runtime;
//!
//! let rt = Runtime::new();
//!
//! // Create a signal
//! let (count, set_count) = rt.create_signal(0);
//!
//! // Create a derived value
//! let doubled = {
//!     let count = count.clone();
//!     rt.create_derived(move || count.get() * 2)
//! };
//!
//! // Create an effect
//! let reader = doubled.clone();
//! rt.create_effect(move || {
//!     println!("Count: {}, Doubled: {}", count.get(), reader.get());
//! });
//!
//! // Update the signal; propagation waits for the microtask queue
//! set_count.set(5);
//! rt.run_microtasks();
//! // Effect ran again, printing: "Count: 5, Doubled: 10"
//! assert_eq!(doubled.get(), 10);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::RuntimeConfig;
pub use error::{ReactiveError, Result};
pub use graph::{CellId, ComputationId};
pub use reactive::{
    Derived, Effect, LocalQueue, MicrotaskQueue, ReadSignal, Runtime, Signal, TokioQueue,
    WriteSignal,
};
