//! # Busy Audiences
//!
//! Listener lists for busy-mode lifecycle notifications. Listeners are
//! notified in registration order and cannot stop the notification or the
//! runner; a listener that needs shared state captures an `StResource`.

use super::task::BusyTaskInfo;

/// Listener for notifications about a specific task.
pub type TaskListener = Box<dyn FnMut(&BusyTaskInfo)>;

/// Listener that performs a slice of GL work during the busy loop. Returns
/// `true` if it still has work pending.
pub type DeferredGlListener = Box<dyn FnMut() -> bool>;

#[derive(Default)]
pub struct BusyAudiences {
    busy_begin: Vec<TaskListener>,
    busy_end: Vec<TaskListener>,
    task_will_start: Vec<TaskListener>,
    deferred_gl_task: Vec<DeferredGlListener>,
}

impl BusyAudiences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Busy mode is about to be entered for a task.
    pub fn add_busy_begin<F: FnMut(&BusyTaskInfo) + 'static>(&mut self, listener: F) {
        self.busy_begin.push(Box::new(listener));
    }

    /// Busy mode has been left; the task is complete.
    pub fn add_busy_end<F: FnMut(&BusyTaskInfo) + 'static>(&mut self, listener: F) {
        self.busy_end.push(Box::new(listener));
    }

    /// The worker for a task is about to be started.
    pub fn add_task_will_start<F: FnMut(&BusyTaskInfo) + 'static>(&mut self, listener: F) {
        self.task_will_start.push(Box::new(listener));
    }

    /// Called every busy frame once the home overlay is hidden.
    pub fn add_deferred_gl_task<F: FnMut() -> bool + 'static>(&mut self, listener: F) {
        self.deferred_gl_task.push(Box::new(listener));
    }

    pub(super) fn notify_busy_begin(&mut self, task: &BusyTaskInfo) {
        self.busy_begin.iter_mut().for_each(|listener| listener(task));
    }

    pub(super) fn notify_busy_end(&mut self, task: &BusyTaskInfo) {
        self.busy_end.iter_mut().for_each(|listener| listener(task));
    }

    pub(super) fn notify_task_will_start(&mut self, task: &BusyTaskInfo) {
        self.task_will_start
            .iter_mut()
            .for_each(|listener| listener(task));
    }

    /// Runs every deferred GL listener. Returns whether any of them still
    /// has work pending.
    pub(super) fn notify_deferred_gl_task(&mut self) -> bool {
        self.deferred_gl_task
            .iter_mut()
            .fold(false, |pending, listener| listener() || pending)
    }
}
