//! # Engine State Module
//!
//! The composition root of the busy-mode engine: owns the busy runner, the
//! engine timer and the queue of tasks waiting to run, and tags every tick
//! of the application's event loop with an [`EngineMode`].
//!
//! ## Key Components
//!
//! * `EngineState` - The per-application state container
//! * `task_management` - Busy runner, tasks, worker thread and audiences
//! * `transition` - Exit animation played when busy mode ends
//! * `deferred` - Render-thread work drained while busy
//! * `progress` - Worker progress reporting and display mapping
//! * `settings` / `timing` / `error` - Configuration, clocks and error types
//!
//! ## Architecture
//!
//! There is no global busy state. The application lends its host window,
//! input, deferred queue and abort handler to `update()` each tick as a
//! [`BusyEnvironment`]; in `EngineMode::Busy` the tick is a busy frame,
//! otherwise it is a regular frame that also advances the exit transition.

pub mod deferred;
pub mod error;
pub mod progress;
pub mod settings;
pub mod task_management;
pub mod timing;
pub mod transition;

use std::collections::VecDeque;

use log::{info, warn};
use web_time::{Duration, Instant};

use crate::core::StResource;
use error::BusyError;
use settings::BusySettings;
use task_management::{
    environment::BusyEnvironment, task::BusyTask, BusyOutcome, BusyRunner,
};
use timing::EngineTimer;
use transition::TransitionSurface;

/// What the event loop is doing this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    Normal,
    /// A busy task is running; ticks are busy frames.
    Busy,
}

/// The main state container for a busy-mode application.
///
/// # Examples
///
/// ```ignore
/// let mut engine = EngineState::new(settings);
/// engine.queue_tasks(startup_tasks());
///
/// // Once per event-loop tick:
/// if let Some(Err(err)) = engine.update(&mut env) {
///     log::error!("{err}");
/// }
/// engine.render(&mut host);
/// ```
pub struct EngineState {
    runner: BusyRunner,
    mode: EngineMode,
    pending_tasks: VecDeque<BusyTask>,
    /// Shared with the busy-end listener, which resets it.
    timer: StResource<EngineTimer>,
    frame_delta: Duration,
}

impl EngineState {
    pub fn new(settings: BusySettings) -> Self {
        let mut runner = BusyRunner::new(settings);
        let timer = StResource::new(EngineTimer::new());

        let busy_end_timer = timer.clone();
        runner
            .audiences_mut()
            .add_busy_end(move |_| busy_end_timer.get_mut().reset());

        Self {
            runner,
            mode: EngineMode::Normal,
            pending_tasks: VecDeque::new(),
            timer,
            frame_delta: Duration::ZERO,
        }
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    pub fn runner(&self) -> &BusyRunner {
        &self.runner
    }

    pub fn runner_mut(&mut self) -> &mut BusyRunner {
        &mut self.runner
    }

    pub fn settings(&self) -> &BusySettings {
        self.runner.settings()
    }

    /// Number of queued tasks that have not started yet.
    pub fn pending_task_count(&self) -> usize {
        self.pending_tasks.len()
    }

    /// Game time elapsed during the last normal tick. Busy time never shows
    /// up here.
    pub fn frame_delta(&self) -> Duration {
        self.frame_delta
    }

    pub fn timer_resets(&self) -> u32 {
        self.timer.get().reset_count()
    }

    /// Appends tasks to run, in order, as soon as the engine is idle.
    pub fn queue_tasks(&mut self, tasks: impl IntoIterator<Item = BusyTask>) {
        self.pending_tasks.extend(tasks);
    }

    /// True while a task runs or more are queued.
    pub fn has_work(&self) -> bool {
        self.mode == EngineMode::Busy || !self.pending_tasks.is_empty()
    }

    /// True while the event loop should keep ticking without waiting for
    /// window events.
    pub fn needs_continuous_updates(&self) -> bool {
        self.has_work() || self.runner.transition().is_in_progress()
    }

    /// When the next busy frame is due, if one is scheduled.
    pub fn next_wake(&self) -> Option<Instant> {
        match self.mode {
            EngineMode::Busy => self.runner.next_frame_deadline(),
            EngineMode::Normal => None,
        }
    }

    /// Runs one tick. Returns the result of a busy run that finished during
    /// this tick, or of a queued task that failed to start.
    pub fn update(
        &mut self,
        env: &mut BusyEnvironment<'_>,
    ) -> Option<Result<BusyOutcome, BusyError>> {
        let finished = match self.mode {
            EngineMode::Busy => self.runner.poll(env).map(|result| {
                self.mode = EngineMode::Normal;
                self.after_run(&result);
                result
            }),
            EngineMode::Normal => {
                self.frame_delta = self.timer.get_mut().advance();
                None
            }
        };

        if let Some(result) = finished {
            self.runner.tick_transition(&mut *env.host);
            return Some(result);
        }

        let started = self.start_next(env);
        self.runner.tick_transition(&mut *env.host);
        started.err().map(Err)
    }

    /// Draws the exit transition over the current frame, if one is playing.
    pub fn render<S: TransitionSurface + ?Sized>(&self, surface: &mut S) {
        self.runner.draw_transition(surface);
    }

    fn start_next(&mut self, env: &mut BusyEnvironment<'_>) -> Result<(), BusyError> {
        if self.mode == EngineMode::Busy {
            return Ok(());
        }
        let Some(task) = self.pending_tasks.pop_front() else {
            return Ok(());
        };
        if let Err(err) = self.runner.begin_task(env, task) {
            self.discard_pending("failed to start");
            return Err(err);
        }
        self.mode = EngineMode::Busy;
        Ok(())
    }

    fn after_run(&mut self, result: &Result<BusyOutcome, BusyError>) {
        match result {
            Ok(outcome) if outcome.exit_code == 0 => {}
            Ok(outcome) => {
                info!("Busy task exited with code {}", outcome.exit_code);
                self.discard_pending("exited with a non-zero code");
            }
            Err(_) => self.discard_pending("failed"),
        }
    }

    fn discard_pending(&mut self, reason: &str) {
        if self.pending_tasks.is_empty() {
            return;
        }
        warn!(
            "Busy task {}; dropping {} queued tasks",
            reason,
            self.pending_tasks.len()
        );
        self.pending_tasks.clear();
    }
}
