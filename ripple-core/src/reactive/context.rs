//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! the runtime asks the tracker who is reading and subscribes it.
//!
//! # Implementation
//!
//! Each runtime owns one stack. Running a computation pushes its id; the
//! returned [`TrackingScope`] pops it when dropped, so the stack stays
//! balanced even when a body panics and unwinds.
//!
//! A `None` frame marks an untracked region: reads inside it see no
//! current computation even though one is running further down the stack.

use std::cell::RefCell;

use crate::graph::ComputationId;

/// Stack of running computations for one runtime.
#[derive(Debug, Default)]
pub struct Tracker {
    stack: RefCell<Vec<Option<ComputationId>>>,
}

impl Tracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `id` as the current computation until the scope is dropped.
    pub fn enter(&self, id: ComputationId) -> TrackingScope<'_> {
        self.push(Some(id))
    }

    /// Suspend tracking until the scope is dropped.
    pub fn suspend(&self) -> TrackingScope<'_> {
        self.push(None)
    }

    fn push(&self, frame: Option<ComputationId>) -> TrackingScope<'_> {
        self.stack.borrow_mut().push(frame);
        TrackingScope {
            tracker: self,
            frame,
        }
    }

    /// The computation that reads should subscribe, if any.
    pub fn current(&self) -> Option<ComputationId> {
        self.stack.borrow().last().copied().flatten()
    }

    /// Check if reads are currently being tracked.
    pub fn is_active(&self) -> bool {
        self.current().is_some()
    }

    /// Number of frames on the stack, untracked ones included.
    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }
}

/// Guard that pops its frame when dropped.
#[must_use = "dropping the scope immediately ends tracking"]
pub struct TrackingScope<'a> {
    tracker: &'a Tracker,
    frame: Option<ComputationId>,
}

impl Drop for TrackingScope<'_> {
    fn drop(&mut self) {
        let popped = self.tracker.stack.borrow_mut().pop();

        debug_assert_eq!(
            popped,
            Some(self.frame),
            "TrackingScope mismatch: expected {:?}, got {:?}",
            self.frame,
            popped
        );
    }
}
