//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, derived
//! values and effects. It owns the dependency graph, the tracker stack and
//! the scheduler, and it decides when flushes happen.
//!
//! # How It Works
//!
//! 1. Reading a signal while a computation runs subscribes that
//!    computation to the signal's cell.
//!
//! 2. Writing a signal enqueues every current subscriber and, for the first
//!    write of a batch, queues one flush task on the microtask queue.
//!
//! 3. The flush drains the pending set, shallowest computation first. Each
//!    computation is unsubscribed from everything, re-run under the tracker,
//!    and re-subscribes to whatever it reads this time. Writes made by the
//!    run enqueue more work into the same flush; a computation never runs
//!    twice in one flush and never enqueues itself.
//!
//! 4. A panic or error from one body is reported and the flush moves on.
//!    The single-flight guard and the checked-out body are restored on every
//!    exit path, unwinding included.
//!
//! # Ownership
//!
//! `Runtime` is a cheap handle to shared state. Signals, effects and derived
//! values only hold weak references back to it, so closures stored in the
//! graph never keep the runtime alive.

use std::cell::{Cell, Ref, RefCell};
use std::fmt::{self, Display};
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace, warn};

use super::context::Tracker;
use super::derived::Derived;
use super::effect::Effect;
use super::microtask::{LocalQueue, MicrotaskQueue};
use super::signal::{ReadSignal, Signal, WriteSignal};
use crate::config::RuntimeConfig;
use crate::error::{panic_message, ReactiveError};
use crate::graph::{Body, CellId, ComputationId, ComputationKind, Graph, Scheduler};

/// Callback receiving errors from computation bodies.
pub type ErrorHandler = Box<dyn FnMut(&ReactiveError)>;

/// Handle to an independent reactive graph.
///
/// # Example
///
/// ```rust
/// use ripple_core::Runtime;
///
/// let rt = Runtime::new();
/// let (count, set_count) = rt.create_signal(0);
/// let doubled = rt.create_derived(move || count.get() * 2);
///
/// set_count.set(5);
/// rt.run_microtasks();
/// assert_eq!(doubled.get(), 10);
/// ```
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

pub(crate) struct RuntimeInner {
    graph: RefCell<Graph>,
    tracker: Tracker,
    scheduler: RefCell<Scheduler>,
    queue: Box<dyn MicrotaskQueue>,
    config: RuntimeConfig,
    error_handler: RefCell<Option<ErrorHandler>>,
}

impl Runtime {
    /// Create a runtime with the default config and a [`LocalQueue`].
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_queue(config, LocalQueue::new())
    }

    /// Create a runtime that defers flushes onto `queue`.
    pub fn with_queue(config: RuntimeConfig, queue: impl MicrotaskQueue + 'static) -> Self {
        debug!(?config, "runtime created");
        Self {
            inner: Rc::new(RuntimeInner {
                graph: RefCell::new(Graph::new()),
                tracker: Tracker::new(),
                scheduler: RefCell::new(Scheduler::new()),
                queue: Box::new(queue),
                config,
                error_handler: RefCell::new(None),
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Create a read/write signal.
    pub fn signal<T: 'static>(&self, value: T) -> Signal<T> {
        Signal::new(&self.inner, value)
    }

    /// Create a signal and return its getter and setter halves.
    pub fn create_signal<T: 'static>(&self, value: T) -> (ReadSignal<T>, WriteSignal<T>) {
        self.signal(value).split()
    }

    /// Create an effect.
    ///
    /// `f` runs once synchronously before this returns, then again after
    /// every flush in which one of the signals it last read was written.
    /// Dropping the returned handle does not stop the effect.
    pub fn create_effect<F>(&self, mut f: F) -> Effect
    where
        F: FnMut() + 'static,
    {
        self.spawn_effect(Box::new(move || {
            f();
            Ok(())
        }))
    }

    /// Create an effect whose body can fail.
    ///
    /// An `Err` is reported to the error handler like a panic would be; the
    /// effect stays subscribed to whatever it read before failing.
    pub fn create_fallible_effect<F, E>(&self, mut f: F) -> Effect
    where
        F: FnMut() -> Result<(), E> + 'static,
        E: Display,
    {
        self.spawn_effect(Box::new(move || f().map_err(|err| err.to_string())))
    }

    fn spawn_effect(&self, body: Body) -> Effect {
        let (id, runs) = self.inner.spawn(ComputationKind::Effect, body);
        Effect::new(&self.inner, id, runs)
    }

    /// Create an eagerly recomputed derived value.
    pub fn create_derived<T, F>(&self, f: F) -> Derived<T>
    where
        T: 'static,
        F: FnMut() -> T + 'static,
    {
        Derived::new(&self.inner, f)
    }

    /// Run `f` without subscribing the current computation to its reads.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let _scope = self.inner.tracker.suspend();
        f()
    }

    /// Drain pending work now instead of waiting for the queued flush.
    ///
    /// A no-op when called from inside a running flush.
    pub fn flush(&self) {
        self.inner.flush();
    }

    /// Run every task on the microtask queue (queued flushes included).
    ///
    /// Returns the number of tasks run. Always 0 for queues driven by an
    /// external executor.
    pub fn run_microtasks(&self) -> usize {
        self.inner.queue.run_pending()
    }

    /// Route computation errors to `handler` instead of the log.
    pub fn on_error<F>(&self, handler: F)
    where
        F: FnMut(&ReactiveError) + 'static,
    {
        *self.inner.error_handler.borrow_mut() = Some(Box::new(handler));
    }

    pub fn is_flushing(&self) -> bool {
        self.inner.scheduler.borrow().is_flushing()
    }

    /// Check if a computation is currently tracking reads.
    pub fn is_tracking(&self) -> bool {
        self.inner.tracker.is_active()
    }

    /// Computations waiting for the next flush.
    pub fn pending_count(&self) -> usize {
        self.inner.scheduler.borrow().pending_count()
    }

    /// Live cells in the graph.
    pub fn cell_count(&self) -> usize {
        self.inner.graph().cell_count()
    }

    /// Live (not disposed) computations in the graph.
    pub fn computation_count(&self) -> usize {
        self.inner.graph().computation_count()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("cells", &self.cell_count())
            .field("computations", &self.computation_count())
            .field("pending", &self.pending_count())
            .field("flushing", &self.is_flushing())
            .finish()
    }
}

impl RuntimeInner {
    pub(crate) fn graph(&self) -> Ref<'_, Graph> {
        self.graph.borrow()
    }

    pub(crate) fn allocate_cell(&self) -> CellId {
        let cell = self.graph.borrow_mut().add_cell();
        trace!(%cell, "allocated");
        cell
    }

    /// Free a cell whose last handle was dropped.
    pub(crate) fn release_cell(&self, cell: CellId) {
        match self.graph.try_borrow_mut() {
            Ok(mut graph) => {
                graph.remove_cell(cell);
                trace!(%cell, "released");
            }
            Err(_) => warn!(%cell, "graph busy while releasing cell; slot leaked"),
        }
    }

    /// Subscribe the running computation, if any, to `cell`.
    pub(crate) fn track(&self, cell: CellId) {
        if let Some(computation) = self.tracker.current() {
            if self.graph.borrow_mut().subscribe(cell, computation) {
                trace!(%cell, %computation, "subscribed");
            }
        }
    }

    /// Mark `computation` as the writer of `cell` for depth ordering.
    pub(crate) fn set_cell_owner(&self, cell: CellId, computation: ComputationId) {
        self.graph.borrow_mut().set_owner(cell, computation);
    }

    /// Enqueue the subscribers of a written cell and queue a flush.
    pub(crate) fn notify(self: &Rc<Self>, cell: CellId) {
        let queue_flush = {
            let graph = self.graph.borrow();
            let mut scheduler = self.scheduler.borrow_mut();
            if let Some(node) = graph.cell(cell) {
                for &computation in node.subscribers() {
                    let Some(comp) = graph.computation(computation) else {
                        continue;
                    };
                    // A body writing what it reads does not wake itself
                    if comp.is_running() {
                        trace!(%cell, %computation, "skipped: writer is running");
                        continue;
                    }
                    if scheduler.enqueue(computation, comp.depth()) {
                        trace!(%cell, %computation, depth = comp.depth(), "enqueued");
                    }
                }
            }
            scheduler.request_flush()
        };

        if queue_flush {
            trace!("flush queued");
            let runtime: Weak<Self> = Rc::downgrade(self);
            self.queue.queue(Box::new(move || {
                if let Some(runtime) = runtime.upgrade() {
                    runtime.flush();
                }
            }));
        }
    }

    /// Register a computation and perform its first run.
    pub(crate) fn spawn(
        &self,
        kind: ComputationKind,
        body: Body,
    ) -> (ComputationId, Rc<Cell<usize>>) {
        let (id, runs) = self.graph.borrow_mut().add_computation(kind, body);
        trace!(computation = %id, ?kind, "created");
        self.run_computation(id);
        (id, runs)
    }

    /// Unsubscribe, re-track and run one computation.
    fn run_computation(&self, id: ComputationId) {
        let body = {
            let mut graph = self.graph.borrow_mut();
            let body = graph.take_body(id);
            if body.is_some() {
                graph.cleanup(id);
            }
            body
        };
        let Some(body) = body else {
            trace!(computation = %id, "skipped: disposed or already running");
            return;
        };

        trace!(computation = %id, "running");
        let outcome = {
            let mut checkout = BodyCheckout {
                graph: &self.graph,
                id,
                body: Some(body),
            };
            // Dropped before `checkout`, so the tracker pops first
            let _scope = self.tracker.enter(id);
            if self.config.catch_panics {
                panic::catch_unwind(AssertUnwindSafe(|| checkout.call()))
            } else {
                Ok(checkout.call())
            }
        };

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(message)) => self.report(ReactiveError::ComputationFailed { id, message }),
            Err(payload) => self.report(ReactiveError::ComputationPanicked {
                id,
                message: panic_message(&*payload),
            }),
        }
    }

    /// Dispose a computation. Returns `false` if it was already gone.
    pub(crate) fn dispose(&self, id: ComputationId) -> bool {
        let (existed, body) = {
            let mut graph = self.graph.borrow_mut();
            let existed = graph.contains_computation(id);
            (existed, graph.dispose(id))
        };
        drop(body);

        if existed {
            debug!(computation = %id, "disposed");
        }
        existed
    }

    /// Drain the pending set until it settles.
    pub(crate) fn flush(&self) {
        if !self.scheduler.borrow_mut().begin_flush() {
            trace!("flush already in progress");
            return;
        }
        let _guard = FlushGuard {
            scheduler: &self.scheduler,
        };

        debug!(pending = self.scheduler.borrow().pending_count(), "flush started");
        let mut runs = 0usize;
        while let Some(id) = self.next_due() {
            self.run_computation(id);
            runs += 1;
        }
        debug!(runs, "flush settled");
    }

    // Keeps the scheduler borrow out of the loop body.
    fn next_due(&self) -> Option<ComputationId> {
        self.scheduler.borrow_mut().next()
    }

    fn report(&self, err: ReactiveError) {
        if let Ok(mut slot) = self.error_handler.try_borrow_mut() {
            if let Some(handler) = slot.as_mut() {
                handler(&err);
                return;
            }
        }
        error!(error = %err, "unhandled reactive error");
    }
}

/// A body checked out of the graph for one run.
///
/// Dropping it hands the body back, so a panic that unwinds through the run
/// does not leave the computation stuck as "running".
struct BodyCheckout<'a> {
    graph: &'a RefCell<Graph>,
    id: ComputationId,
    body: Option<Body>,
}

impl BodyCheckout<'_> {
    fn call(&mut self) -> Result<(), String> {
        match self.body.as_mut() {
            Some(body) => body(),
            None => Ok(()),
        }
    }
}

impl Drop for BodyCheckout<'_> {
    fn drop(&mut self) {
        let Some(body) = self.body.take() else {
            return;
        };
        let leftover = match self.graph.try_borrow_mut() {
            Ok(mut graph) => graph.restore_body(self.id, body),
            Err(_) => {
                error!(computation = %self.id, "graph borrowed while restoring body; computation lost");
                Some(body)
            }
        };
        // Disposed mid-run: drop the body now that the graph is free
        drop(leftover);
    }
}

/// Releases the flush guard and clears pending work on every exit path.
struct FlushGuard<'a> {
    scheduler: &'a RefCell<Scheduler>,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        match self.scheduler.try_borrow_mut() {
            Ok(mut scheduler) => scheduler.end_flush(),
            Err(_) => error!("scheduler borrowed while ending flush; guard left set"),
        }
    }
}
