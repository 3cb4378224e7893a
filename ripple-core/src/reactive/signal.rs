//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a running computation, the runtime
//!    subscribes that computation to the signal's cell.
//!
//! 2. When a signal is written, every current subscriber is enqueued and a
//!    flush is queued. There is no equality check: writing the same value
//!    still notifies.
//!
//! 3. Reads outside any computation just return the value.
//!
//! # Handles
//!
//! [`Signal`] can read and write. [`ReadSignal`] and [`WriteSignal`] are the
//! getter and setter halves returned by `Runtime::create_signal`. All three
//! share one cell; the cell's graph slot is freed when the last handle is
//! dropped.
//!
//! If the runtime itself has been dropped, handles keep working as plain
//! shared values: nothing is tracked and nothing is scheduled.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use super::runtime::RuntimeInner;
use crate::graph::CellId;

struct SignalInner<T> {
    id: CellId,
    value: RefCell<T>,
    runtime: Weak<RuntimeInner>,
}

impl<T> SignalInner<T> {
    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.track(self.id);
        }
        f(&*self.value.borrow())
    }

    fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.value.borrow())
    }

    fn write(&self, f: impl FnOnce(&mut T)) {
        f(&mut *self.value.borrow_mut());
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.notify(self.id);
        }
    }

    fn subscriber_count(&self) -> usize {
        self.runtime
            .upgrade()
            .map(|runtime| runtime.graph().subscriber_count(self.id))
            .unwrap_or(0)
    }
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.release_cell(self.id);
        }
    }
}

/// A reactive value that can be read and written.
///
/// # Example
///
/// ```rust
/// use ripple_core::Runtime;
///
/// let rt = Runtime::new();
/// let count = rt.signal(0);
///
/// count.set(5);
/// count.update(|n| n + 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct Signal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Signal<T> {
    pub(crate) fn new(runtime: &Rc<RuntimeInner>, value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                id: runtime.allocate_cell(),
                value: RefCell::new(value),
                runtime: Rc::downgrade(runtime),
            }),
        }
    }

    /// Get the signal's cell id.
    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Get a clone of the current value.
    ///
    /// If called within a running computation, this also subscribes it.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.with(T::clone)
    }

    /// Borrow the current value, subscribing the running computation.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.with_untracked(T::clone)
    }

    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with_untracked(f)
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        self.inner.write(|slot| *slot = value);
    }

    /// Replace the value with `f(old)` and notify subscribers.
    ///
    /// The old value is read and replaced in one step, so several updates in
    /// the same batch compose.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.inner.write(|slot| *slot = f(slot));
    }

    /// Mutate the value in place and notify subscribers.
    pub fn update_in_place(&self, f: impl FnOnce(&mut T)) {
        self.inner.write(f);
    }

    /// Number of computations that read this signal during their last run.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }

    /// A getter sharing this signal's cell.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            inner: Rc::clone(&self.inner),
        }
    }

    /// A setter sharing this signal's cell.
    pub fn write_only(&self) -> WriteSignal<T> {
        WriteSignal {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Split into getter and setter halves.
    pub fn split(self) -> (ReadSignal<T>, WriteSignal<T>) {
        (self.read_only(), self.write_only())
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// The getter half of a signal.
pub struct ReadSignal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> ReadSignal<T> {
    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Get a clone of the current value, subscribing the running computation.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.with(T::clone)
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.with_untracked(T::clone)
    }

    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with_untracked(f)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }
}

impl<T: 'static> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadSignal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

/// The setter half of a signal.
pub struct WriteSignal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> WriteSignal<T> {
    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        self.inner.write(|slot| *slot = value);
    }

    /// Replace the value with `f(old)` and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.inner.write(|slot| *slot = f(slot));
    }

    pub fn update_in_place(&self, f: impl FnOnce(&mut T)) {
        self.inner.write(f);
    }
}

impl<T: 'static> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSignal")
            .field("id", &self.inner.id)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
