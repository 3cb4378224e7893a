//! Derived Values
//!
//! A derived value is a signal whose only writer is an internal effect:
//! the effect runs the formula and stores the result in the signal. Other
//! computations read it like any signal, which is how chains such as
//! `sum -> doubled` propagate.
//!
//! Derived values are eager. A dependency write recomputes the formula in
//! the next flush whether or not anyone reads the result, and reads never
//! trigger computation. The formula runs once during construction, so the
//! value is available as soon as `create_derived` returns.

use std::fmt::{self, Debug};
use std::rc::Rc;

use super::effect::Effect;
use super::runtime::RuntimeInner;
use super::signal::{ReadSignal, Signal};
use crate::graph::{CellId, ComputationKind};

/// A read-only value recomputed from a formula.
pub struct Derived<T: 'static> {
    /// `None` only if the formula's first run panicked.
    value: ReadSignal<Option<T>>,
    effect: Effect,
}

impl<T: 'static> Derived<T> {
    pub(crate) fn new<F>(runtime: &Rc<RuntimeInner>, mut formula: F) -> Self
    where
        F: FnMut() -> T + 'static,
    {
        let cell = Signal::new(runtime, None);
        let writer = cell.write_only();

        let (id, runs) = runtime.spawn(
            ComputationKind::Derived,
            Box::new(move || {
                writer.set(Some(formula()));
                Ok(())
            }),
        );
        runtime.set_cell_owner(cell.id(), id);

        Self {
            value: cell.read_only(),
            effect: Effect::new(runtime, id, runs),
        }
    }

    /// Get the id of the cell holding the result.
    pub fn id(&self) -> CellId {
        self.value.id()
    }

    /// Get a clone of the current value, subscribing the running computation.
    ///
    /// # Panics
    ///
    /// Panics if the formula panicked on its first run and has not produced
    /// a value since. Use [`Derived::try_get`] to avoid this.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Like [`Derived::get`], but `None` if no value was ever produced.
    pub fn try_get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.value.get()
    }

    /// Borrow the current value, subscribing the running computation.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.value.with(|value| {
            f(value
                .as_ref()
                .expect("derived formula never completed; see Derived::try_get"))
        })
    }

    /// Get a clone of the current value without subscribing.
    ///
    /// # Panics
    ///
    /// Same contract as [`Derived::get`].
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.value.with_untracked(|value| {
            value
                .clone()
                .expect("derived formula never completed; see Derived::try_get_untracked")
        })
    }

    pub fn try_get_untracked(&self) -> Option<T>
    where
        T: Clone,
    {
        self.value.get_untracked()
    }

    /// Stop recomputing. The last value stays readable.
    pub fn dispose(&self) -> bool {
        self.effect.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.effect.is_disposed()
    }

    /// Number of times the formula has run.
    pub fn recompute_count(&self) -> usize {
        self.effect.run_count()
    }

    /// Number of signals the formula read during its last run.
    pub fn dependency_count(&self) -> usize {
        self.effect.dependency_count()
    }

    /// Number of computations that read this value during their last run.
    pub fn subscriber_count(&self) -> usize {
        self.value.subscriber_count()
    }
}

impl<T: 'static> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            effect: self.effect.clone(),
        }
    }
}

impl<T: Debug + 'static> Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("value", &self.value)
            .field("effect", &self.effect)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
