//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency is written, the effect is enqueued and re-runs
//!    in the next flush, once per flush no matter how many of its
//!    dependencies were written.
//!
//! 3. Before every run, the effect drops all of its subscriptions and picks
//!    up new ones from whatever it reads this time. A branch that stops
//!    reading a signal stops depending on it.
//!
//! # Lifetime
//!
//! The returned [`Effect`] is only a handle. Dropping it leaves the effect
//! running for as long as the runtime lives; call [`Effect::dispose`] to
//! stop it.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::runtime::RuntimeInner;
use crate::graph::ComputationId;

/// Handle to a running effect.
///
/// # Example
///
/// ```rust
/// use ripple_core::Runtime;
///
/// let rt = Runtime::new();
/// let (count, set_count) = rt.create_signal(0);
///
/// let effect = rt.create_effect(move || {
///     println!("Count is: {}", count.get());
/// });
///
/// set_count.set(5);
/// rt.run_microtasks(); // Prints: "Count is: 5"
///
/// effect.dispose();
/// ```
#[derive(Clone)]
pub struct Effect {
    id: ComputationId,

    /// Shared with the graph node; survives disposal.
    runs: Rc<Cell<usize>>,

    runtime: Weak<RuntimeInner>,
}

impl Effect {
    pub(crate) fn new(
        runtime: &Rc<RuntimeInner>,
        id: ComputationId,
        runs: Rc<Cell<usize>>,
    ) -> Self {
        Self {
            id,
            runs,
            runtime: Rc::downgrade(runtime),
        }
    }

    /// Get the effect's computation id.
    pub fn id(&self) -> ComputationId {
        self.id
    }

    /// Number of times the body has started, the creation run included.
    pub fn run_count(&self) -> usize {
        self.runs.get()
    }

    /// Stop the effect.
    ///
    /// Unsubscribes it from every signal, drops its closure, and skips it if
    /// it is already pending in the current flush. Safe to call from inside
    /// the effect's own body. Returns `false` if it was already disposed.
    pub fn dispose(&self) -> bool {
        match self.runtime.upgrade() {
            Some(runtime) => runtime.dispose(self.id),
            None => false,
        }
    }

    /// Check if the effect has been disposed (or its runtime dropped).
    pub fn is_disposed(&self) -> bool {
        match self.runtime.upgrade() {
            Some(runtime) => !runtime.graph().contains_computation(self.id),
            None => true,
        }
    }

    /// Number of signals read during the last run.
    pub fn dependency_count(&self) -> usize {
        self.runtime
            .upgrade()
            .map(|runtime| runtime.graph().dependency_count(self.id))
            .unwrap_or(0)
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
