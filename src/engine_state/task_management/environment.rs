//! # Busy Environment
//!
//! Interfaces of the subsystems the busy runner drives but does not own:
//! the host window, the input subsystem, the deferred GL queue and the
//! global abort path. The application owns the implementations and lends
//! them to the runner for each call through a [`BusyEnvironment`].

use log::error;
use web_time::Duration;

use crate::engine_state::{deferred::DeferredTaskQueue, transition::TransitionSurface};

/// Display mode of the host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    /// Regular game/UI rendering.
    Normal,
    /// Busy-mode feedback only.
    Busy,
}

/// Direction of a whole-window content fade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    FromBlack,
    ToBlack,
}

/// How the host presents the progress bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressMode {
    /// Spinning activity indicator without a value.
    Indeterminate,
    /// Bar spanning `start..=end`.
    Ranged { start: f32, end: f32 },
}

/// Window/UI operations used while busy.
pub trait BusyHost: TransitionSurface {
    /// Switching to `WindowMode::Busy` cancels any fade still running.
    fn set_mode(&mut self, mode: WindowMode);

    /// Makes the main window's GL context current on this thread.
    fn gl_activate_main(&mut self);

    fn fade_content(&mut self, direction: FadeDirection, duration: Duration);

    fn show_progress(&mut self, visible: bool);

    fn set_progress_text(&mut self, text: &str);

    fn set_progress_mode(&mut self, mode: ProgressMode);

    fn set_progress(&mut self, value: f32);

    /// Toggles console output on the busy screen.
    fn show_console_output(&mut self, _visible: bool) {}

    /// Dispatches pending window/input events without blocking.
    fn pump_events(&mut self);

    /// False while the home/launcher overlay is still on screen.
    fn is_home_hidden(&self) -> bool;
}

/// Input subsystem operations used while busy.
pub trait InputSystem {
    /// Processes queued events with the given time delta. Returns how many
    /// events were consumed.
    fn process_events(&mut self, dt: Duration) -> usize;

    /// Processes events bound to the fixed-rate sharp tick.
    fn process_sharp_events(&mut self, dt: Duration) -> usize;

    /// Sets whether events are discarded. Returns the previous setting.
    fn ignore_events(&mut self, ignore: bool) -> bool;
}

/// The global abort path.
pub trait AbortHandler {
    /// Reports a fatal error. Called on the foreground thread.
    fn abort(&mut self, message: &str);
}

/// Abort handler that logs the message and remembers that the application
/// should shut down.
#[derive(Debug, Default)]
pub struct LoggingAbortHandler {
    messages: Vec<String>,
}

impl LoggingAbortHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once any abort has been reported.
    pub fn exit_requested(&self) -> bool {
        !self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl AbortHandler for LoggingAbortHandler {
    fn abort(&mut self, message: &str) {
        error!("Fatal error in busy task: {}", message);
        self.messages.push(message.to_string());
    }
}

/// Borrowed collaborators handed to the runner for one call.
pub struct BusyEnvironment<'a> {
    pub host: &'a mut dyn BusyHost,
    pub input: &'a mut dyn InputSystem,
    pub deferred: &'a mut dyn DeferredTaskQueue,
    pub abort: &'a mut dyn AbortHandler,
}
