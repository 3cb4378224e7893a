//! Update Scheduler
//!
//! The scheduler owns the set of computations that are due to run and the
//! bookkeeping for one flush.
//!
//! # Algorithm
//!
//! 1. A cell write enqueues each of the cell's subscribers. Enqueueing is
//!    idempotent, so a computation reachable from several written cells is
//!    run once per flush (diamond dependencies).
//!
//! 2. The first write of a batch requests a flush; further writes before
//!    the flush starts only add to `pending`.
//!
//! 3. A flush repeatedly takes the shallowest pending computation, and among
//!    equal depths the one that became due first. Entries added while the
//!    flush is draining are picked up by the same flush, so a chain of
//!    derived values settles in one flush and a diamond's sink runs after
//!    every derived value it reads.
//!
//! 4. A computation that already ran in the current flush is never enqueued
//!    again before the flush ends.

use std::collections::BTreeMap;

use indexmap::IndexSet;

use super::node::ComputationId;

/// Pending-set scheduler with a single-flight flush guard.
#[derive(Debug, Default)]
pub struct Scheduler {
    /// Computations due to run, keyed by `(depth, arrival)`.
    pending: BTreeMap<(u32, u64), ComputationId>,

    /// Membership of `pending`.
    queued: IndexSet<ComputationId>,

    /// Computations that already ran in the current flush.
    visited: IndexSet<ComputationId>,

    /// Arrival counter, keeps equal depths in enqueue order.
    arrivals: u64,

    flushing: bool,

    /// A flush task has been queued and has not started yet.
    flush_queued: bool,
}

impl Scheduler {
    /// Create an idle scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a computation as due at the given depth.
    ///
    /// Returns `true` if this call added new work.
    pub fn enqueue(&mut self, id: ComputationId, depth: u32) -> bool {
        if self.visited.contains(&id) || !self.queued.insert(id) {
            return false;
        }
        self.pending.insert((depth, self.arrivals), id);
        self.arrivals += 1;
        true
    }

    /// Ask for a flush to be queued.
    ///
    /// Returns `true` exactly once per batch: when there is work, no flush is
    /// queued yet, and no flush is currently draining (which would pick the
    /// work up itself).
    pub fn request_flush(&mut self) -> bool {
        if self.flushing || self.flush_queued || self.pending.is_empty() {
            return false;
        }
        self.flush_queued = true;
        true
    }

    /// Enter the flush. Returns `false` if a flush is already running.
    pub fn begin_flush(&mut self) -> bool {
        if self.flushing {
            return false;
        }
        self.flushing = true;
        self.flush_queued = false;
        self.visited.clear();
        true
    }

    /// Next computation to run in the current flush.
    pub fn next(&mut self) -> Option<ComputationId> {
        let (_, id) = self.pending.pop_first()?;
        self.queued.swap_remove(&id);
        self.visited.insert(id);
        Some(id)
    }

    /// Leave the flush, clearing all pending work and the guard.
    pub fn end_flush(&mut self) {
        self.pending.clear();
        self.queued.clear();
        self.visited.clear();
        self.arrivals = 0;
        self.flushing = false;
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing
    }

    pub fn is_flush_queued(&self) -> bool {
        self.flush_queued
    }

    /// Number of computations waiting to run.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
