//! # Busy Progress
//!
//! Workers report raw progress in `0..=max_progress`; the foreground maps it
//! into the task's display range `progress_start..=progress_end` once per
//! frame. The displayed value never moves backwards within a task, so a
//! worker that reports out of order cannot make the bar jitter.

use crate::core::MtResource;

/// Display range of a task's progress bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRange {
    /// Value the worker reports when it is done.
    pub max_progress: u32,
    /// Displayed value when the worker reports zero.
    pub start: u32,
    /// Displayed value when the worker reports `max_progress`.
    pub end: u32,
}

impl ProgressRange {
    pub fn new(max_progress: u32, start: u32, end: u32) -> Self {
        Self {
            max_progress,
            start,
            end,
        }
    }

    /// Maps a raw worker value into the display range.
    pub fn map(&self, value: u32) -> f32 {
        if self.max_progress == 0 {
            return self.end as f32;
        }
        let fraction = value.min(self.max_progress) as f32 / self.max_progress as f32;
        let start = self.start as f32;
        let end = self.end as f32;
        start + (end - start) * fraction
    }
}

impl Default for ProgressRange {
    fn default() -> Self {
        Self::new(200, 0, 200)
    }
}

/// Worker-side handle for publishing progress.
#[derive(Clone)]
pub struct ProgressReporter {
    value: MtResource<u32>,
}

impl ProgressReporter {
    /// Publishes a new raw progress value.
    pub fn set(&self, value: u32) {
        *self.value.get_mut() = value;
    }

    pub fn get(&self) -> u32 {
        *self.value.get()
    }
}

/// Foreground-side view of a task's progress.
pub struct ProgressTracker {
    range: ProgressRange,
    value: MtResource<u32>,
    displayed: Option<f32>,
}

impl ProgressTracker {
    pub fn new(range: ProgressRange) -> Self {
        Self {
            range,
            value: MtResource::new(0),
            displayed: None,
        }
    }

    /// Creates a reporter that writes into this tracker.
    pub fn reporter(&self) -> ProgressReporter {
        ProgressReporter {
            value: self.value.clone(),
        }
    }

    pub fn range(&self) -> ProgressRange {
        self.range
    }

    /// Last value handed to the display, if any.
    pub fn displayed(&self) -> Option<f32> {
        self.displayed
    }

    /// Samples the worker's latest value. Returns the new display value when
    /// it advanced since the previous call.
    pub fn update(&mut self) -> Option<f32> {
        let mapped = self.range.map(*self.value.get());
        match self.displayed {
            Some(previous) if mapped <= previous => None,
            _ => {
                self.displayed = Some(mapped);
                Some(mapped)
            }
        }
    }
}
