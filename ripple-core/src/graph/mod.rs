//! Dependency Graph
//!
//! This module implements the storage side of the reactive system: where
//! cells and computations live, how their edges are recorded, and how due
//! computations are queued.
//!
//! # Overview
//!
//! - Cells and computations are arena entries addressed by generational
//!   integer ids rather than pointers.
//! - An edge `cell -> computation` exists exactly when the computation read
//!   the cell during its most recent run. Edges are dropped wholesale before
//!   every re-run and rediscovered by the run itself, so the graph is
//!   dynamic rather than declared up front.
//! - The scheduler is a deduplicating pending set ordered by depth, then by
//!   arrival.
//!
//! # Design Decisions
//!
//! 1. Values are not stored here. Typed values live in the signal handles;
//!    the graph only knows ids, which keeps it free of generics.
//!
//! 2. Bodies are checked out of the graph while they run, so user code never
//!    executes while the graph is borrowed.

mod arena;
mod node;
mod scheduler;

pub use arena::{Arena, Key};
pub use node::{Body, CellId, CellNode, ComputationId, ComputationKind, ComputationNode, Graph};
pub use scheduler::Scheduler;
