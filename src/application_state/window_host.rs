//! # Window Host
//!
//! [`BusyHost`] implementation on top of a winit window. Busy-mode feedback
//! (mode, progress text and bar) is presented through the window title;
//! snapshots are bookkeeping handles for the last presented frame.

use std::sync::Arc;

use log::{debug, trace, warn};
use web_time::{Duration, Instant};
use winit::window::Window;

use crate::engine_state::{
    task_management::environment::{BusyHost, FadeDirection, ProgressMode, WindowMode},
    transition::{vertex::TransitionVertex, SnapshotHandle, TransitionSurface, Viewport},
};

const BAR_WIDTH: usize = 20;

struct Fade {
    direction: FadeDirection,
    started: Instant,
    duration: Duration,
}

pub struct WindowHost {
    window: Option<Arc<Window>>,
    base_title: String,
    mode: WindowMode,
    progress_visible: bool,
    progress_text: String,
    progress_mode: ProgressMode,
    progress: f32,
    console_visible: bool,
    /// A home/launcher overlay drawn over the content.
    home_visible: bool,
    fade: Option<Fade>,
    next_snapshot: u64,
    live_snapshots: Vec<SnapshotHandle>,
    /// Title is stale; written out by `refresh_title`.
    dirty: bool,
}

impl WindowHost {
    pub fn new(base_title: impl Into<String>) -> Self {
        Self {
            window: None,
            base_title: base_title.into(),
            mode: WindowMode::Normal,
            progress_visible: false,
            progress_text: String::new(),
            progress_mode: ProgressMode::Indeterminate,
            progress: 0.0,
            console_visible: false,
            home_visible: false,
            fade: None,
            next_snapshot: 0,
            live_snapshots: Vec::new(),
            dirty: false,
        }
    }

    pub fn attach(&mut self, window: Arc<Window>) {
        self.window = Some(window);
        self.dirty = true;
        self.refresh_title();
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.window.as_ref()
    }

    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    pub fn set_home_visible(&mut self, visible: bool) {
        self.home_visible = visible;
    }

    pub fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    /// Current content brightness in `0.0..=1.0`, following the active fade.
    pub fn fade_level(&mut self) -> f32 {
        let Some(fade) = &self.fade else {
            return 1.0;
        };
        let t = if fade.duration.is_zero() {
            1.0
        } else {
            (fade.started.elapsed().as_secs_f32() / fade.duration.as_secs_f32()).min(1.0)
        };
        let level = match fade.direction {
            FadeDirection::FromBlack => t,
            FadeDirection::ToBlack => 1.0 - t,
        };
        if t >= 1.0 {
            self.fade = None;
        }
        level
    }

    /// Writes pending state changes to the window title.
    pub fn refresh_title(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        let Some(window) = &self.window else {
            return;
        };
        window.set_title(&self.title());
    }

    fn title(&self) -> String {
        if self.mode == WindowMode::Normal || !self.progress_visible {
            return match self.mode {
                WindowMode::Normal => self.base_title.clone(),
                WindowMode::Busy => format!("{} (busy)", self.base_title),
            };
        }

        let status = match self.progress_mode {
            ProgressMode::Indeterminate => "...".to_string(),
            ProgressMode::Ranged { start, end } => {
                let span = (end - start).max(f32::EPSILON);
                let fraction = ((self.progress - start) / span).clamp(0.0, 1.0);
                let filled = (fraction * BAR_WIDTH as f32).round() as usize;
                format!(
                    "[{}{}] {:>3.0}%",
                    "#".repeat(filled),
                    "-".repeat(BAR_WIDTH - filled),
                    fraction * 100.0
                )
            }
        };
        format!("{} - {} {}", self.base_title, self.progress_text, status)
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl TransitionSurface for WindowHost {
    fn capture_snapshot(&mut self) -> Option<SnapshotHandle> {
        self.window.as_ref()?;
        self.next_snapshot += 1;
        let snapshot = SnapshotHandle(self.next_snapshot);
        self.live_snapshots.push(snapshot);
        debug!("Captured frame snapshot {:?}", snapshot);
        Some(snapshot)
    }

    fn release_snapshot(&mut self, snapshot: SnapshotHandle) {
        match self.live_snapshots.iter().position(|live| *live == snapshot) {
            Some(index) => {
                self.live_snapshots.swap_remove(index);
                debug!("Released frame snapshot {:?}", snapshot);
            }
            None => warn!("Release of unknown snapshot {:?}", snapshot),
        }
    }

    fn draw_transition(&mut self, snapshot: SnapshotHandle, vertices: &[TransitionVertex]) {
        trace!(
            "Transition overlay from {:?}: {} vertices ({} bytes)",
            snapshot,
            vertices.len(),
            bytemuck::cast_slice::<TransitionVertex, u8>(vertices).len()
        );
    }

    fn viewport(&self) -> Option<Viewport> {
        let size = self.window.as_ref()?.inner_size();
        Some(Viewport {
            width: size.width,
            height: size.height,
        })
    }
}

impl BusyHost for WindowHost {
    fn set_mode(&mut self, mode: WindowMode) {
        if mode == WindowMode::Busy && self.fade.take().is_some() {
            debug!("Busy mode cancelled a running fade");
        }
        self.mode = mode;
        self.mark_dirty();
    }

    fn gl_activate_main(&mut self) {
        trace!("Main render context active");
    }

    fn fade_content(&mut self, direction: FadeDirection, duration: Duration) {
        self.fade = Some(Fade {
            direction,
            started: Instant::now(),
            duration,
        });
    }

    fn show_progress(&mut self, visible: bool) {
        self.progress_visible = visible;
        self.mark_dirty();
    }

    fn set_progress_text(&mut self, text: &str) {
        self.progress_text = text.to_string();
        self.mark_dirty();
    }

    fn set_progress_mode(&mut self, mode: ProgressMode) {
        self.progress_mode = mode;
        self.mark_dirty();
    }

    fn set_progress(&mut self, value: f32) {
        self.progress = value;
        self.mark_dirty();
    }

    fn show_console_output(&mut self, visible: bool) {
        self.console_visible = visible;
    }

    fn pump_events(&mut self) {
        // The application's event loop delivers window events between ticks.
    }

    fn is_home_hidden(&self) -> bool {
        !self.home_visible
    }
}
