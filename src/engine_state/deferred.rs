//! # Deferred GL Tasks
//!
//! Render-thread work (texture and buffer uploads) that was requested from a
//! context where GL calls are not allowed. The busy loop drains the queue in
//! bounded slices so that uploads keep flowing while a worker loads content.

use std::collections::VecDeque;

use log::debug;
use web_time::{Duration, Instant};

/// Queue of foreground-only GL work, as seen by the busy runner.
pub trait DeferredTaskQueue {
    /// Runs queued work until the queue is empty or `budget_ms` milliseconds
    /// have elapsed. A budget of zero means no limit. Returns the number of
    /// tasks executed.
    fn process_deferred_tasks(&mut self, budget_ms: u32) -> usize;

    /// Number of tasks still waiting.
    fn deferred_task_count(&self) -> usize;
}

/// A unit of deferred render-thread work.
pub type DeferredTask = Box<dyn FnOnce()>;

/// FIFO implementation of [`DeferredTaskQueue`].
///
/// Tasks are not `Send`: they are enqueued and run on the foreground thread.
#[derive(Default)]
pub struct DeferredUploadQueue {
    tasks: VecDeque<DeferredTask>,
}

impl DeferredUploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue<F>(&mut self, task: F)
    where
        F: FnOnce() + 'static,
    {
        self.tasks.push_back(Box::new(task));
    }
}

impl DeferredTaskQueue for DeferredUploadQueue {
    fn process_deferred_tasks(&mut self, budget_ms: u32) -> usize {
        let deadline = (budget_ms > 0)
            .then(|| Instant::now() + Duration::from_millis(u64::from(budget_ms)));

        let mut executed = 0;
        while let Some(task) = self.tasks.pop_front() {
            task();
            executed += 1;
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                break;
            }
        }

        if executed > 0 {
            debug!(
                "Processed {} deferred tasks ({} remaining)",
                executed,
                self.tasks.len()
            );
        }
        executed
    }

    fn deferred_task_count(&self) -> usize {
        self.tasks.len()
    }
}
