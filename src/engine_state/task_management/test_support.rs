//! Recording doubles for the busy runner's collaborators.

use web_time::Duration;

use super::environment::{
    AbortHandler, BusyEnvironment, BusyHost, FadeDirection, InputSystem, ProgressMode, WindowMode,
};
use crate::engine_state::{
    deferred::DeferredTaskQueue,
    transition::{vertex::TransitionVertex, SnapshotHandle, TransitionSurface, Viewport},
};

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    SetMode(WindowMode),
    GlActivate,
    Fade(FadeDirection),
    ShowProgress(bool),
    ProgressText(String),
    ProgressMode(ProgressMode),
    Progress(f32),
    ConsoleOutput(bool),
    Capture(SnapshotHandle),
    Release(SnapshotHandle),
    Draw(SnapshotHandle),
}

#[derive(Default)]
pub struct RecordingHost {
    pub calls: Vec<HostCall>,
    pub pumps: usize,
    pub home_hidden: bool,
    next_snapshot: u64,
    live: Vec<SnapshotHandle>,
}

impl RecordingHost {
    pub fn count(&self, matches: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.iter().filter(|call| matches(call)).count()
    }

    pub fn live_snapshots(&self) -> usize {
        self.live.len()
    }

    pub fn progress_values(&self) -> Vec<f32> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                HostCall::Progress(value) => Some(*value),
                _ => None,
            })
            .collect()
    }
}

impl TransitionSurface for RecordingHost {
    fn capture_snapshot(&mut self) -> Option<SnapshotHandle> {
        self.next_snapshot += 1;
        let snapshot = SnapshotHandle(self.next_snapshot);
        self.live.push(snapshot);
        self.calls.push(HostCall::Capture(snapshot));
        Some(snapshot)
    }

    fn release_snapshot(&mut self, snapshot: SnapshotHandle) {
        let index = self
            .live
            .iter()
            .position(|live| *live == snapshot)
            .expect("released a snapshot that is not live");
        self.live.remove(index);
        self.calls.push(HostCall::Release(snapshot));
    }

    fn draw_transition(&mut self, snapshot: SnapshotHandle, vertices: &[TransitionVertex]) {
        assert!(self.live.contains(&snapshot), "drew a released snapshot");
        assert!(!vertices.is_empty());
        self.calls.push(HostCall::Draw(snapshot));
    }

    fn viewport(&self) -> Option<Viewport> {
        Some(Viewport {
            width: 320,
            height: 200,
        })
    }
}

impl BusyHost for RecordingHost {
    fn set_mode(&mut self, mode: WindowMode) {
        self.calls.push(HostCall::SetMode(mode));
    }

    fn gl_activate_main(&mut self) {
        self.calls.push(HostCall::GlActivate);
    }

    fn fade_content(&mut self, direction: FadeDirection, _duration: Duration) {
        self.calls.push(HostCall::Fade(direction));
    }

    fn show_progress(&mut self, visible: bool) {
        self.calls.push(HostCall::ShowProgress(visible));
    }

    fn set_progress_text(&mut self, text: &str) {
        self.calls.push(HostCall::ProgressText(text.to_string()));
    }

    fn set_progress_mode(&mut self, mode: ProgressMode) {
        self.calls.push(HostCall::ProgressMode(mode));
    }

    fn set_progress(&mut self, value: f32) {
        self.calls.push(HostCall::Progress(value));
    }

    fn show_console_output(&mut self, visible: bool) {
        self.calls.push(HostCall::ConsoleOutput(visible));
    }

    fn pump_events(&mut self) {
        self.pumps += 1;
    }

    fn is_home_hidden(&self) -> bool {
        self.home_hidden
    }
}

#[derive(Default)]
pub struct RecordingInput {
    pub ignoring: bool,
    pub processed: usize,
    pub sharp_processed: usize,
}

impl InputSystem for RecordingInput {
    fn process_events(&mut self, _dt: Duration) -> usize {
        self.processed += 1;
        0
    }

    fn process_sharp_events(&mut self, _dt: Duration) -> usize {
        self.sharp_processed += 1;
        0
    }

    fn ignore_events(&mut self, ignore: bool) -> bool {
        std::mem::replace(&mut self.ignoring, ignore)
    }
}

#[derive(Default)]
pub struct RecordingDeferred {
    pub budgets: Vec<u32>,
}

impl DeferredTaskQueue for RecordingDeferred {
    fn process_deferred_tasks(&mut self, budget_ms: u32) -> usize {
        self.budgets.push(budget_ms);
        0
    }

    fn deferred_task_count(&self) -> usize {
        0
    }
}

#[derive(Default)]
pub struct RecordingAbort {
    pub messages: Vec<String>,
}

impl AbortHandler for RecordingAbort {
    fn abort(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

#[derive(Default)]
pub struct Collaborators {
    pub host: RecordingHost,
    pub input: RecordingInput,
    pub deferred: RecordingDeferred,
    pub abort: RecordingAbort,
}

impl Collaborators {
    pub fn env(&mut self) -> BusyEnvironment<'_> {
        BusyEnvironment {
            host: &mut self.host,
            input: &mut self.input,
            deferred: &mut self.deferred,
            abort: &mut self.abort,
        }
    }
}
