//! # Busy Worker Thread
//!
//! Runs one task entry on a dedicated thread and reports back exactly once.
//!
//! The worker and the foreground thread share no mutable state besides the
//! progress counter. The outcome travels over a one-shot channel: the
//! foreground owns the receiver, so it cannot observe a result before the
//! worker has sent it, and the worker never touches window or GL state.
//!
//! ## Failure capture
//! - An `Err` returned by the entry is captured as its display text
//! - A panic is caught and its payload text captured the same way
//! - [`WorkerContext::abort`] on the worker thread reports the failure and
//!   then parks the thread forever; the foreground tears busy mode down
//!   without waiting for it

use std::{
    any::Any,
    cell::Cell,
    panic::{self, AssertUnwindSafe},
    sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError},
    thread::{self, JoinHandle},
};

use log::{debug, error, warn};
use web_time::Duration;

use crate::engine_state::{error::BusyError, progress::ProgressReporter};

use super::task::WorkerEntry;

thread_local! {
    static IS_BUSY_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// True when called from a busy worker thread.
pub fn is_worker_thread() -> bool {
    IS_BUSY_WORKER.with(Cell::get)
}

/// Why a worker did not produce an exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    pub message: String,
    /// The worker aborted and is parked; it must not be joined.
    pub stalled: bool,
}

impl WorkerFailure {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stalled: false,
        }
    }
}

/// The single message a worker sends when it is done.
pub type WorkerOutcome = Result<i32, WorkerFailure>;

/// Panic payload used by [`WorkerContext::abort`] off the worker thread.
struct WorkerAbort(String);

/// What a task entry can see of the busy machinery.
pub struct WorkerContext {
    progress: ProgressReporter,
    completion: Sender<WorkerOutcome>,
}

impl WorkerContext {
    /// Publishes raw progress in `0..=max_progress`.
    pub fn set_progress(&self, value: u32) {
        self.progress.set(value);
    }

    /// Fails the task with `message` and never returns.
    ///
    /// On a worker thread the failure is sent to the foreground and the
    /// thread parks forever. When the entry runs inline (headless mode) the
    /// failure unwinds to the inline runner instead.
    pub fn abort(&self, message: impl Into<String>) -> ! {
        let message = message.into();
        if is_worker_thread() {
            error!("Busy worker aborted: {}", message);
            let _ = self.completion.send(Err(WorkerFailure {
                message,
                stalled: true,
            }));
            loop {
                thread::park();
            }
        }
        panic::panic_any(WorkerAbort(message))
    }
}

/// Foreground handle of a running (or finished) busy worker.
pub struct WorkerThread {
    receiver: Receiver<WorkerOutcome>,
    outcome: Option<WorkerOutcome>,
    finished: bool,
    stalled: bool,
    handle: Option<JoinHandle<()>>,
}

impl WorkerThread {
    /// Spawns the worker thread and starts running `entry`.
    pub fn start(
        name: &str,
        entry: WorkerEntry,
        progress: ProgressReporter,
    ) -> Result<Self, BusyError> {
        let (sender, receiver) = channel();
        let context = WorkerContext {
            progress,
            completion: sender.clone(),
        };

        let handle = thread::Builder::new()
            .name(format!("busy-worker: {name}"))
            .spawn(move || {
                IS_BUSY_WORKER.with(|flag| flag.set(true));
                let outcome = run_entry(entry, &context);
                IS_BUSY_WORKER.with(|flag| flag.set(false));
                let _ = sender.send(outcome);
            })
            .map_err(BusyError::ThreadSpawn)?;

        debug!("Busy worker '{}' started", name);

        Ok(Self {
            receiver,
            outcome: None,
            finished: false,
            stalled: false,
            handle: Some(handle),
        })
    }

    /// Runs `entry` on the calling thread. Used when there is no video
    /// output and therefore nothing to keep responsive.
    pub fn run_inline(entry: WorkerEntry, progress: ProgressReporter) -> WorkerOutcome {
        let (completion, _receiver) = channel();
        let context = WorkerContext {
            progress,
            completion,
        };
        run_entry(entry, &context)
    }

    /// Checks for the completion message without blocking.
    pub fn poll(&mut self) -> bool {
        if !self.finished {
            match self.receiver.try_recv() {
                Ok(outcome) => self.complete(outcome),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.complete_without_report(),
            }
        }
        self.finished
    }

    /// Waits up to `timeout` for the completion message.
    pub fn wait_timeout(&mut self, timeout: Duration) -> bool {
        if !self.finished {
            match self.receiver.recv_timeout(timeout) {
                Ok(outcome) => self.complete(outcome),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => self.complete_without_report(),
            }
        }
        self.finished
    }

    /// True once the completion message has been received here.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Takes the outcome. `None` until finished, and after the first take.
    pub fn take_outcome(&mut self) -> Option<WorkerOutcome> {
        self.outcome.take()
    }

    fn complete(&mut self, outcome: WorkerOutcome) {
        self.stalled = matches!(&outcome, Err(failure) if failure.stalled);
        self.outcome = Some(outcome);
        self.finished = true;
    }

    fn complete_without_report(&mut self) {
        self.complete(Err(WorkerFailure::new(
            "busy worker exited without reporting a result",
        )));
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if !self.finished {
            warn!("Busy worker dropped while still running; detaching it");
        } else if self.stalled {
            debug!("Detaching aborted busy worker");
        } else if handle.join().is_err() {
            warn!("Busy worker panicked after reporting its outcome");
        }
    }
}

fn run_entry(entry: WorkerEntry, context: &WorkerContext) -> WorkerOutcome {
    match panic::catch_unwind(AssertUnwindSafe(move || entry(context))) {
        Ok(Ok(code)) => Ok(code),
        Ok(Err(err)) => Err(WorkerFailure::new(err.to_string())),
        Err(payload) => Err(WorkerFailure::new(panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(WorkerAbort(message)) = payload.downcast_ref::<WorkerAbort>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "busy worker panicked".to_string()
    }
}
