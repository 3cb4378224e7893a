//! Graph Nodes
//!
//! This module defines the node records that live in the dependency graph
//! and the `Graph` that owns them.
//!
//! # Shape of the Graph
//!
//! - A **cell** holds the insertion-ordered set of computations that read it
//!   during their most recent run.
//! - A **computation** holds the list of cells it is a member of, which is
//!   what lets it unsubscribe from everything before it re-runs.
//! - A cell written by a derived value records that derived computation as
//!   its **owner**. A computation's **depth** is one more than the deepest
//!   owner among the cells it read last run (plain signals count as 0), and
//!   the scheduler runs shallower computations first.
//!
//! Both sides of every edge are kept in sync by `Graph::subscribe` and
//! `Graph::cleanup`; nothing else touches the adjacency.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::arena::{Arena, Key};

/// Identifier of a cell (signal) in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(Key);

impl CellId {
    /// Get the underlying arena key.
    pub fn key(&self) -> Key {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// Identifier of a computation (effect or derived) in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputationId(Key);

impl ComputationId {
    /// Get the underlying arena key.
    pub fn key(&self) -> Key {
        self.0
    }
}

impl fmt::Display for ComputationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "computation#{}", self.0)
    }
}

/// What a computation was created as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationKind {
    /// A side-effecting body created by `create_effect`.
    Effect,

    /// The internal body of a derived value.
    Derived,
}

/// The re-runnable body of a computation.
///
/// An `Err` carries a human-readable failure message.
pub type Body = Box<dyn FnMut() -> Result<(), String>>;

/// A cell in the dependency graph.
#[derive(Debug, Default)]
pub struct CellNode {
    /// Computations that read this cell during their last run,
    /// in order of first subscription.
    subscribers: IndexSet<ComputationId>,

    /// The derived computation that writes this cell, if any.
    owner: Option<ComputationId>,
}

impl CellNode {
    pub fn subscribers(&self) -> &IndexSet<ComputationId> {
        &self.subscribers
    }

    pub fn owner(&self) -> Option<ComputationId> {
        self.owner
    }
}

/// A computation in the dependency graph.
pub struct ComputationNode {
    kind: ComputationKind,

    /// `None` while the body is running (it is moved out so the graph
    /// is not borrowed during user code).
    body: Option<Body>,

    /// Cells whose subscriber sets currently contain this computation.
    member_of: SmallVec<[CellId; 4]>,

    /// Scheduling depth as of the last completed run.
    depth: u32,

    /// Shared with the user-facing handle so the count survives disposal.
    runs: Rc<Cell<usize>>,
}

impl ComputationNode {
    pub fn kind(&self) -> ComputationKind {
        self.kind
    }

    pub fn member_of(&self) -> &[CellId] {
        &self.member_of
    }

    pub fn run_count(&self) -> usize {
        self.runs.get()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Whether the body is currently checked out for a run.
    pub fn is_running(&self) -> bool {
        self.body.is_none()
    }
}

impl fmt::Debug for ComputationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputationNode")
            .field("kind", &self.kind)
            .field("member_of", &self.member_of)
            .field("depth", &self.depth)
            .field("runs", &self.runs.get())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Arena-backed storage for cells and computations plus their edges.
#[derive(Debug, Default)]
pub struct Graph {
    cells: Arena<CellNode>,
    computations: Arena<ComputationNode>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new cell with no subscribers.
    pub fn add_cell(&mut self) -> CellId {
        CellId(self.cells.insert(CellNode::default()))
    }

    /// Free a cell and detach it from every computation that read it.
    ///
    /// Returns `false` if the cell was already gone.
    pub fn remove_cell(&mut self, cell: CellId) -> bool {
        let Some(node) = self.cells.remove(cell.0) else {
            return false;
        };

        for computation in node.subscribers {
            if let Some(comp) = self.computations.get_mut(computation.0) {
                comp.member_of.retain(|c| *c != cell);
            }
        }
        true
    }

    pub fn cell(&self, cell: CellId) -> Option<&CellNode> {
        self.cells.get(cell.0)
    }

    /// Register a computation. The returned counter is shared with the node.
    pub fn add_computation(
        &mut self,
        kind: ComputationKind,
        body: Body,
    ) -> (ComputationId, Rc<Cell<usize>>) {
        let runs = Rc::new(Cell::new(0));
        let key = self.computations.insert(ComputationNode {
            kind,
            body: Some(body),
            member_of: SmallVec::new(),
            depth: 1,
            runs: Rc::clone(&runs),
        });
        (ComputationId(key), runs)
    }

    /// Mark `computation` as the writer of `cell`.
    pub fn set_owner(&mut self, cell: CellId, computation: ComputationId) -> bool {
        if !self.computations.contains(computation.0) {
            return false;
        }
        match self.cells.get_mut(cell.0) {
            Some(node) => {
                node.owner = Some(computation);
                true
            }
            None => false,
        }
    }

    /// Depth of the computation writing `cell`, or 0 for a plain signal.
    fn cell_depth(&self, cell: CellId) -> u32 {
        self.cells
            .get(cell.0)
            .and_then(CellNode::owner)
            .and_then(|owner| self.computations.get(owner.0))
            .map(|comp| comp.depth)
            .unwrap_or(0)
    }

    pub fn computation(&self, computation: ComputationId) -> Option<&ComputationNode> {
        self.computations.get(computation.0)
    }

    pub fn contains_computation(&self, computation: ComputationId) -> bool {
        self.computations.contains(computation.0)
    }

    /// Record that `computation` read `cell`.
    ///
    /// Idempotent; returns `true` only when a new edge was added.
    pub fn subscribe(&mut self, cell: CellId, computation: ComputationId) -> bool {
        let Some(comp) = self.computations.get_mut(computation.0) else {
            return false;
        };
        let Some(node) = self.cells.get_mut(cell.0) else {
            return false;
        };

        if node.subscribers.insert(computation) {
            comp.member_of.push(cell);
            true
        } else {
            false
        }
    }

    /// Remove `computation` from every subscriber set it belongs to.
    pub fn cleanup(&mut self, computation: ComputationId) {
        let Some(comp) = self.computations.get_mut(computation.0) else {
            return;
        };

        for cell in comp.member_of.drain(..) {
            if let Some(node) = self.cells.get_mut(cell.0) {
                // shift_remove keeps the remaining subscribers in order
                node.subscribers.shift_remove(&computation);
            }
        }
    }

    /// Check the body out for a run and bump the run counter.
    ///
    /// Returns `None` if the computation was disposed or is already running.
    pub fn take_body(&mut self, computation: ComputationId) -> Option<Body> {
        let comp = self.computations.get_mut(computation.0)?;
        let body = comp.body.take()?;
        comp.runs.set(comp.runs.get() + 1);
        Some(body)
    }

    /// Return a body after a run and recompute the depth from what it read.
    ///
    /// If the computation was disposed in the meantime the body is handed
    /// back so the caller can drop it outside of any graph borrow.
    pub fn restore_body(&mut self, computation: ComputationId, body: Body) -> Option<Body> {
        let Some(comp) = self.computations.get(computation.0) else {
            return Some(body);
        };
        let depth = 1 + comp
            .member_of
            .iter()
            .map(|cell| self.cell_depth(*cell))
            .max()
            .unwrap_or(0);

        if let Some(comp) = self.computations.get_mut(computation.0) {
            comp.body = Some(body);
            comp.depth = depth;
        }
        None
    }

    /// Unsubscribe and free a computation.
    ///
    /// Returns the body (if it was not checked out) so the caller can drop
    /// it outside of any graph borrow; captured cells release themselves
    /// through the graph when dropped.
    pub fn dispose(&mut self, computation: ComputationId) -> Option<Body> {
        self.cleanup(computation);
        self.computations.remove(computation.0)?.body
    }

    /// Number of computations currently subscribed to `cell`.
    pub fn subscriber_count(&self, cell: CellId) -> usize {
        self.cells
            .get(cell.0)
            .map(|node| node.subscribers.len())
            .unwrap_or(0)
    }

    /// Number of cells `computation` read during its last run.
    pub fn dependency_count(&self, computation: ComputationId) -> usize {
        self.computations
            .get(computation.0)
            .map(|comp| comp.member_of.len())
            .unwrap_or(0)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn computation_count(&self) -> usize {
        self.computations.len()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
