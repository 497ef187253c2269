//! # Busy Task Description
//!
//! A `BusyTask` describes one blocking unit of work: the closure to run on
//! the worker thread plus the mode flags and progress range the runner uses
//! to present it.
//!
//! ## Ownership
//! - The entry closure owns whatever context it needs and is moved onto the
//!   worker thread; it must therefore be `Send + 'static`
//! - Everything else stays with the runner as a [`BusyTaskInfo`], so the
//!   worker can never mutate the description of its own task

use std::{
    fmt,
    ops::{BitOr, BitOrAssign},
};

use crate::engine_state::progress::ProgressRange;

use super::worker::WorkerContext;

/// Presentation and behaviour flags of a busy task.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BusyMode(u32);

impl BusyMode {
    /// Show a progress bar driven by the worker's reported progress.
    pub const PROGRESS_BAR: BusyMode = BusyMode(1 << 0);
    /// The progress bar is an indeterminate activity indicator.
    pub const ACTIVITY: BusyMode = BusyMode(1 << 1);
    /// Show console output on the busy screen.
    pub const CONSOLE_OUTPUT: BusyMode = BusyMode(1 << 2);
    /// Engine startup: no transition; fade in from black when done.
    pub const STARTUP: BusyMode = BusyMode(1 << 3);
    /// Do not drain deferred GL uploads during or after the task.
    pub const NO_UPLOADS: BusyMode = BusyMode(1 << 4);
    /// Animate the exit from busy mode.
    pub const TRANSITION: BusyMode = BusyMode(1 << 5);

    const NAMES: [(BusyMode, &'static str); 6] = [
        (Self::PROGRESS_BAR, "PROGRESS_BAR"),
        (Self::ACTIVITY, "ACTIVITY"),
        (Self::CONSOLE_OUTPUT, "CONSOLE_OUTPUT"),
        (Self::STARTUP, "STARTUP"),
        (Self::NO_UPLOADS, "NO_UPLOADS"),
        (Self::TRANSITION, "TRANSITION"),
    ];

    pub const fn empty() -> Self {
        BusyMode(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when every flag in `other` is set.
    pub const fn contains(self, other: BusyMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for BusyMode {
    type Output = BusyMode;

    fn bitor(self, rhs: Self) -> Self::Output {
        BusyMode(self.0 | rhs.0)
    }
}

impl BitOrAssign for BusyMode {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for BusyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

/// Closure executed on the busy worker thread.
///
/// `Ok(code)` becomes the task's exit code; an `Err` is captured as the
/// failure message and routed through the abort path.
pub type WorkerEntry = Box<dyn FnOnce(&WorkerContext) -> anyhow::Result<i32> + Send>;

/// The runner-visible half of a task.
#[derive(Debug, Clone, PartialEq)]
pub struct BusyTaskInfo {
    pub name: Option<String>,
    pub mode: BusyMode,
    pub progress: ProgressRange,
}

impl BusyTaskInfo {
    /// Name used for logging and the progress text.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Busy task")
    }
}

/// A unit of blocking work to run under busy mode.
pub struct BusyTask {
    entry: WorkerEntry,
    info: BusyTaskInfo,
}

impl BusyTask {
    /// Creates a task with the default progress range and no name.
    pub fn new<F>(mode: BusyMode, entry: F) -> Self
    where
        F: FnOnce(&WorkerContext) -> anyhow::Result<i32> + Send + 'static,
    {
        Self {
            entry: Box::new(entry),
            info: BusyTaskInfo {
                name: None,
                mode,
                progress: ProgressRange::default(),
            },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.info.name = Some(name.into());
        self
    }

    /// Sets how worker-reported progress maps onto the progress bar.
    pub fn with_progress(mut self, max_progress: u32, start: u32, end: u32) -> Self {
        self.info.progress = ProgressRange::new(max_progress, start, end);
        self
    }

    pub fn info(&self) -> &BusyTaskInfo {
        &self.info
    }

    pub(crate) fn into_parts(self) -> (BusyTaskInfo, WorkerEntry) {
        (self.info, self.entry)
    }
}

impl fmt::Debug for BusyTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusyTask")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}
