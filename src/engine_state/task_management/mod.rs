//! # Busy Task Management
//!
//! Runs blocking work (engine startup, map loading, resource reloads) on a
//! worker thread while the foreground thread keeps the window responsive.
//!
//! ## Architecture Overview
//! - `BusyRunner`: the orchestrator; owns the lifecycle state machine, the
//!   transition animator and the listener lists
//! - `BusyTask`: what to run and how to present it
//! - `WorkerThread`: the one background thread of a busy run
//! - `BusyEnvironment`: borrowed host window, input, deferred GL queue and
//!   abort handler
//!
//! ## Lifecycle
//! `Idle → Starting → Running → Finishing → Idle`
//!
//! 1. `begin_task()` notifies the busy-begin audience, switches the host to
//!    busy display, ignores input and spawns the worker
//! 2. `poll()` runs one busy frame: drains input, services deferred GL work
//!    and checks the worker's completion channel
//! 3. When the worker's outcome arrives, `poll()` finishes the run: abort
//!    path on failure, exit transition, final upload flush, busy-end audience
//!
//! Only the arrival of the worker's outcome moves a run out of `Running`.
//! There is no timeout and no cancellation.
//!
//! ## Example Usage
//! ```rust,ignore
//! let mut runner = BusyRunner::new(BusySettings::default());
//! let task = BusyTask::new(BusyMode::PROGRESS_BAR, |context| {
//!     context.set_progress(100);
//!     Ok(0)
//! });
//!
//! // Blocking form, keeps pumping the host until the worker is done:
//! let outcome = runner.run_task(&mut env, task)?;
//!
//! // Or from an existing event loop:
//! runner.begin_task(&mut env, task)?;
//! // ... once per frame:
//! if let Some(result) = runner.poll(&mut env) { /* busy mode is over */ }
//! ```

pub mod audience;
pub mod environment;
pub mod task;
pub mod worker;

#[cfg(test)]
mod test_support;

use log::{error, info, warn};
use web_time::{Duration, Instant};

use audience::BusyAudiences;
use environment::{BusyEnvironment, BusyHost, FadeDirection, ProgressMode, WindowMode};
use task::{BusyMode, BusyTask, BusyTaskInfo};
use worker::{WorkerOutcome, WorkerThread};

use super::{
    error::BusyError,
    progress::ProgressTracker,
    settings::BusySettings,
    timing::{FrameLimiter, TickClock},
    transition::{should_animate, TransitionAnimator, TransitionSurface},
};

/// Lifecycle state of the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyState {
    Idle,
    Starting,
    Running,
    Finishing,
}

/// Result of a completed busy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyOutcome {
    pub success: bool,
    pub exit_code: i32,
}

enum ActiveWorker {
    Threaded(WorkerThread),
    /// Headless: the entry already ran inside `begin_task`.
    Inline(Option<WorkerOutcome>),
}

impl ActiveWorker {
    fn take_outcome(&mut self) -> Option<WorkerOutcome> {
        match self {
            ActiveWorker::Threaded(worker) => {
                worker.poll();
                worker.take_outcome()
            }
            ActiveWorker::Inline(outcome) => outcome.take(),
        }
    }
}

struct ActiveTask {
    info: BusyTaskInfo,
    worker: ActiveWorker,
    progress: ProgressTracker,
    input_was_ignored: bool,
    animate: bool,
}

/// Runs tasks under busy mode. At most one task is active at a time.
pub struct BusyRunner {
    settings: BusySettings,
    state: BusyState,
    active: Option<ActiveTask>,
    audiences: BusyAudiences,
    transition: TransitionAnimator,
    tick_clock: TickClock,
    frame_limiter: FrameLimiter,
    deferred_pending: bool,
}

impl BusyRunner {
    pub fn new(settings: BusySettings) -> Self {
        Self {
            settings,
            state: BusyState::Idle,
            active: None,
            audiences: BusyAudiences::new(),
            transition: TransitionAnimator::new(),
            tick_clock: TickClock::new(),
            frame_limiter: FrameLimiter::new(),
            deferred_pending: false,
        }
    }

    pub fn settings(&self) -> &BusySettings {
        &self.settings
    }

    pub fn audiences_mut(&mut self) -> &mut BusyAudiences {
        &mut self.audiences
    }

    pub fn state(&self) -> BusyState {
        self.state
    }

    /// True from `begin_task` until the run has been torn down.
    pub fn is_busy(&self) -> bool {
        self.state != BusyState::Idle
    }

    pub fn current_task(&self) -> Option<&BusyTaskInfo> {
        self.active.as_ref().map(|active| &active.info)
    }

    pub fn transition(&self) -> &TransitionAnimator {
        &self.transition
    }

    /// Whether a deferred GL listener reported unfinished work on the last
    /// busy frame.
    pub fn has_pending_deferred_work(&self) -> bool {
        self.deferred_pending
    }

    /// When the next busy frame is due, if the frame rate is capped.
    pub fn next_frame_deadline(&self) -> Option<Instant> {
        self.frame_limiter.next_deadline()
    }

    /// Runs `task` to completion, pumping the host between frames.
    pub fn run_task(
        &mut self,
        env: &mut BusyEnvironment<'_>,
        task: BusyTask,
    ) -> Result<BusyOutcome, BusyError> {
        self.begin_task(env, task)?;
        loop {
            if !self.settings.novideo {
                env.host.pump_events();
            }
            if let Some(result) = self.poll(env) {
                return result;
            }
            self.wait_for_worker();
        }
    }

    /// Runs `tasks` one after another. Stops at the first task that fails
    /// or exits with a non-zero code and returns its outcome.
    pub fn run_tasks(
        &mut self,
        env: &mut BusyEnvironment<'_>,
        tasks: Vec<BusyTask>,
    ) -> Result<BusyOutcome, BusyError> {
        let mut outcome = BusyOutcome {
            success: true,
            exit_code: 0,
        };
        for task in tasks {
            let name = task.info().display_name().to_string();
            outcome = self.run_task(env, task)?;
            if outcome.exit_code != 0 {
                warn!(
                    "Busy task '{}' exited with code {}; skipping remaining tasks",
                    name, outcome.exit_code
                );
                break;
            }
        }
        Ok(outcome)
    }

    /// Enters busy mode and starts `task`'s worker.
    pub fn begin_task(
        &mut self,
        env: &mut BusyEnvironment<'_>,
        task: BusyTask,
    ) -> Result<(), BusyError> {
        if self.state != BusyState::Idle {
            error!(
                "Rejected busy task '{}': busy mode is already active",
                task.info().display_name()
            );
            return Err(BusyError::AlreadyBusy);
        }
        self.state = BusyState::Starting;

        let (info, entry) = task.into_parts();
        let headless = self.settings.novideo;
        let animate = should_animate(&self.settings, info.mode);

        // Never carry a snapshot from an earlier run into this one.
        self.transition.abort(&mut *env.host);
        if animate {
            self.transition.configure(&self.settings);
        }

        info!("Entering busy mode: {}", info.display_name());
        self.audiences.notify_busy_begin(&info);
        let input_was_ignored = env.input.ignore_events(true);
        let progress = ProgressTracker::new(info.progress);

        if !headless {
            env.host.set_mode(WindowMode::Busy);
            env.host
                .show_console_output(info.mode.contains(BusyMode::CONSOLE_OUTPUT));
            if info.mode.contains(BusyMode::PROGRESS_BAR) {
                configure_progress(env.host, &info);
            }
            self.frame_limiter
                .set_rate(Some(self.settings.busy_frame_rate));
        }

        self.audiences.notify_task_will_start(&info);

        let worker = if headless {
            ActiveWorker::Inline(Some(WorkerThread::run_inline(entry, progress.reporter())))
        } else {
            match WorkerThread::start(info.display_name(), entry, progress.reporter()) {
                Ok(worker) => ActiveWorker::Threaded(worker),
                Err(err) => {
                    error!("{}", err);
                    self.roll_back(env, &info, input_was_ignored);
                    return Err(err);
                }
            }
        };

        self.active = Some(ActiveTask {
            info,
            worker,
            progress,
            input_was_ignored,
            animate,
        });
        self.state = BusyState::Running;
        Ok(())
    }

    /// Runs one busy frame and checks for completion. Returns the run's
    /// result once the worker has finished and busy mode has been left;
    /// otherwise schedules the next frame (see `next_frame_deadline`).
    pub fn poll(
        &mut self,
        env: &mut BusyEnvironment<'_>,
    ) -> Option<Result<BusyOutcome, BusyError>> {
        if self.state != BusyState::Running {
            return None;
        }
        self.busy_loop(env);

        let headless = self.settings.novideo;
        let active = self.active.as_mut()?;
        if !headless {
            update_progress(env.host, active);
        }
        let Some(outcome) = active.worker.take_outcome() else {
            self.frame_limiter.mark_frame();
            return None;
        };

        let active = self.active.take()?;
        Some(self.finish(env, active, outcome))
    }

    /// The per-frame busy work: drain input, keep the GL context current,
    /// let listeners piggyback GL work, and drain a slice of deferred
    /// uploads. Does nothing unless a task is running.
    pub fn busy_loop(&mut self, env: &mut BusyEnvironment<'_>) {
        if self.state != BusyState::Running {
            return;
        }
        let Some(mode) = self.active.as_ref().map(|active| active.info.mode) else {
            return;
        };

        env.input.process_events(Duration::ZERO);
        env.input.process_sharp_events(Duration::ZERO);

        if self.settings.novideo {
            return;
        }

        env.host.gl_activate_main();
        self.transition.ensure_snapshot(&mut *env.host);

        if env.host.is_home_hidden() {
            self.deferred_pending = self.audiences.notify_deferred_gl_task();
        }

        if !mode.contains(BusyMode::NO_UPLOADS) {
            env.deferred
                .process_deferred_tasks(self.settings.deferred_budget_ms);
        }
    }

    /// Advances the exit transition to the current time.
    pub fn tick_transition<S: TransitionSurface + ?Sized>(&mut self, surface: &mut S) {
        let now = self.tick_clock.now_ticks();
        self.transition.tick(surface, now);
    }

    pub fn draw_transition<S: TransitionSurface + ?Sized>(&self, surface: &mut S) {
        self.transition.draw(surface);
    }

    /// Changes the configured transition length; zero stops a running one.
    pub fn set_transition_ticks<S: TransitionSurface + ?Sized>(
        &mut self,
        ticks: u32,
        surface: &mut S,
    ) {
        self.settings.transition_ticks = ticks;
        self.transition.set_duration_ticks(ticks, surface);
    }

    /// Sleeps until the next busy frame is due, waking early if the worker
    /// finishes first.
    fn wait_for_worker(&mut self) {
        let timeout = self.frame_limiter.remaining();
        if let Some(ActiveTask {
            worker: ActiveWorker::Threaded(worker),
            ..
        }) = self.active.as_mut()
        {
            worker.wait_timeout(timeout);
        }
    }

    fn finish(
        &mut self,
        env: &mut BusyEnvironment<'_>,
        active: ActiveTask,
        outcome: WorkerOutcome,
    ) -> Result<BusyOutcome, BusyError> {
        self.state = BusyState::Finishing;
        let ActiveTask {
            info,
            worker,
            input_was_ignored,
            animate,
            ..
        } = active;
        let headless = self.settings.novideo;

        let result = match outcome {
            Ok(exit_code) => {
                info!(
                    "Busy task '{}' finished with exit code {}",
                    info.display_name(),
                    exit_code
                );
                Ok(BusyOutcome {
                    success: true,
                    exit_code,
                })
            }
            Err(failure) => {
                error!(
                    "Busy task '{}' failed: {}",
                    info.display_name(),
                    failure.message
                );
                env.abort.abort(&failure.message);
                Err(BusyError::WorkerFailed(failure.message))
            }
        };

        if !headless && info.mode.contains(BusyMode::STARTUP) {
            env.host.fade_content(
                FadeDirection::FromBlack,
                Duration::from_secs_f32(self.settings.fade_in_seconds.max(0.0)),
            );
        }

        // Joins a finished worker; a parked (aborted) one is detached.
        drop(worker);

        if !headless {
            env.host.gl_activate_main();
            if animate && result.is_ok() {
                let now = self.tick_clock.now_ticks();
                self.transition.begin(&mut *env.host, now);
            } else {
                self.transition.abort(&mut *env.host);
            }
            if !info.mode.contains(BusyMode::NO_UPLOADS) {
                env.deferred.process_deferred_tasks(0);
            }
            if info.mode.contains(BusyMode::PROGRESS_BAR) {
                env.host.show_progress(false);
            }
        }

        self.leave_busy_mode(env, &info, input_was_ignored);
        info!("Left busy mode: {}", info.display_name());
        result
    }

    /// Undoes `begin_task` after the worker could not be started.
    fn roll_back(
        &mut self,
        env: &mut BusyEnvironment<'_>,
        info: &BusyTaskInfo,
        input_was_ignored: bool,
    ) {
        self.transition.abort(&mut *env.host);
        if info.mode.contains(BusyMode::PROGRESS_BAR) {
            env.host.show_progress(false);
        }
        self.leave_busy_mode(env, info, input_was_ignored);
    }

    fn leave_busy_mode(
        &mut self,
        env: &mut BusyEnvironment<'_>,
        info: &BusyTaskInfo,
        input_was_ignored: bool,
    ) {
        self.audiences.notify_busy_end(info);
        env.input.ignore_events(input_was_ignored);
        if !self.settings.novideo {
            env.host.set_mode(WindowMode::Normal);
        }
        self.frame_limiter.set_rate(None);
        self.deferred_pending = false;
        self.active = None;
        self.state = BusyState::Idle;
    }
}

fn configure_progress(host: &mut dyn BusyHost, info: &BusyTaskInfo) {
    let mode = if info.mode.contains(BusyMode::ACTIVITY) {
        ProgressMode::Indeterminate
    } else {
        ProgressMode::Ranged {
            start: info.progress.start as f32,
            end: info.progress.end as f32,
        }
    };
    host.set_progress_mode(mode);
    host.set_progress_text(info.display_name());
    host.set_progress(info.progress.start as f32);
    host.show_progress(true);
}

fn update_progress(host: &mut dyn BusyHost, active: &mut ActiveTask) {
    let Some(value) = active.progress.update() else {
        return;
    };
    let mode = active.info.mode;
    if mode.contains(BusyMode::PROGRESS_BAR) && !mode.contains(BusyMode::ACTIVITY) {
        host.set_progress(value);
    }
}

#[cfg(test)]
mod tests;
