//! # Timing
//!
//! Tick-rate glue shared by the busy loop and the transition animator.
//!
//! * `TickClock` measures time in sharp ticks (fixed 35 Hz simulation steps).
//! * `FrameLimiter` paces the foreground loop while busy.
//! * `EngineTimer` feeds frame deltas to the game and can be reset so that
//!   the time spent in busy mode is never perceived by the simulation.

use web_time::{Duration, Instant};

/// Fixed simulation rate, in ticks per second.
pub const SHARP_TICK_RATE: f64 = 35.0;

/// Converts a wall-clock duration to (fractional) sharp ticks.
pub fn duration_to_ticks(duration: Duration) -> f64 {
    duration.as_secs_f64() * SHARP_TICK_RATE
}

/// A monotonic clock counting sharp ticks since it was created.
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    origin: Instant,
}

impl TickClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Current time in fractional sharp ticks.
    pub fn now_ticks(&self) -> f64 {
        duration_to_ticks(self.origin.elapsed())
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Caps how often the foreground loop runs.
///
/// With no rate set the limiter never asks the caller to wait.
#[derive(Debug)]
pub struct FrameLimiter {
    frame_interval: Option<Duration>,
    next_frame: Instant,
}

impl FrameLimiter {
    pub fn new() -> Self {
        Self {
            frame_interval: None,
            next_frame: Instant::now(),
        }
    }

    /// Sets the cap in frames per second; `None` or zero removes it.
    pub fn set_rate(&mut self, frames_per_second: Option<u32>) {
        self.frame_interval = frames_per_second
            .filter(|&fps| fps > 0)
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps)));
        self.next_frame = Instant::now();
    }

    pub fn is_limited(&self) -> bool {
        self.frame_interval.is_some()
    }

    /// Time left before the next frame is due.
    pub fn remaining(&self) -> Duration {
        self.next_frame.saturating_duration_since(Instant::now())
    }

    /// Deadline of the next frame, if a cap is active.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.frame_interval.map(|_| self.next_frame)
    }

    /// Records that a frame has been produced and schedules the next one.
    pub fn mark_frame(&mut self) {
        let Some(interval) = self.frame_interval else {
            return;
        };
        let now = Instant::now();
        self.next_frame += interval;
        // Don't try to catch up after a long stall.
        if self.next_frame < now {
            self.next_frame = now + interval;
        }
    }
}

impl Default for FrameLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Produces per-frame deltas for the game loop.
#[derive(Debug)]
pub struct EngineTimer {
    last_frame: Instant,
    resets: u32,
}

impl EngineTimer {
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            resets: 0,
        }
    }

    /// Time elapsed since the previous call (or reset).
    pub fn advance(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;
        delta
    }

    /// Forgets all time elapsed up to now.
    pub fn reset(&mut self) {
        self.last_frame = Instant::now();
        self.resets += 1;
    }

    pub fn reset_count(&self) -> u32 {
        self.resets
    }
}

impl Default for EngineTimer {
    fn default() -> Self {
        Self::new()
    }
}
