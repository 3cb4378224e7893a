//! Microtask Queue
//!
//! Writes never flush synchronously. The first write of a batch hands a
//! flush task to a [`MicrotaskQueue`], and the host decides when "after the
//! current synchronous block" is:
//!
//! - [`LocalQueue`] keeps tasks until [`Runtime::run_microtasks`] is called.
//!   This is the default and what the tests drive.
//! - [`TokioQueue`] spawns the task on the current `tokio::task::LocalSet`,
//!   so it runs at the next await point of the surrounding task.
//!
//! [`Runtime::run_microtasks`]: crate::Runtime::run_microtasks

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce() + 'static>;

/// Where deferred flushes go.
pub trait MicrotaskQueue {
    /// Defer `task` until the current synchronous block has finished.
    fn queue(&self, task: Task);

    /// Run every queued task, including tasks queued by those tasks.
    ///
    /// Returns the number of tasks run. Queues driven by an external
    /// executor have nothing to run here.
    fn run_pending(&self) -> usize {
        0
    }

    /// Number of tasks waiting, if the queue can tell.
    fn len(&self) -> usize {
        0
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// FIFO queue drained explicitly by the host.
#[derive(Default)]
pub struct LocalQueue {
    tasks: RefCell<VecDeque<Task>>,
}

impl LocalQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MicrotaskQueue for LocalQueue {
    fn queue(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }

    fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // Release the borrow before running: tasks may queue more tasks
            let next = self.tasks.borrow_mut().pop_front();
            let Some(task) = next else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }

    fn len(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl fmt::Debug for LocalQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalQueue")
            .field("len", &self.len())
            .finish()
    }
}

/// Defers tasks onto the current `tokio` `LocalSet`.
///
/// Writes must happen inside `LocalSet::run_until` (or a task spawned on
/// the set); `tokio::task::spawn_local` panics anywhere else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioQueue;

impl MicrotaskQueue for TokioQueue {
    fn queue(&self, task: Task) {
        // Detached: completion is observed through the graph, not the handle
        drop(tokio::task::spawn_local(async move { task() }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use std::cell::Cell;

    #[test]
    fn local_queue_runs_in_order() {
        let queue = LocalQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let log = Rc::clone(&log);
            queue.queue(Box::new(move || log.borrow_mut().push(i)));
        }
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.run_pending(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn tasks_queued_while_draining_also_run() {
        let queue = Rc::new(LocalQueue::new());
        let ran = Rc::new(Cell::new(false));

        let inner_queue = Rc::clone(&queue);
        let inner_ran = Rc::clone(&ran);
        queue.queue(Box::new(move || {
            inner_queue.queue(Box::new(move || inner_ran.set(true)));
        }));

        assert_eq!(queue.run_pending(), 2);
        assert!(ran.get());
    }
}
