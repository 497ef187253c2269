//! # Busy Transition
//!
//! Masks the content swap when busy mode ends. While a worker runs, the
//! screen shows busy-mode feedback; when it finishes the game frame may look
//! completely different. The animator keeps a snapshot of the last frame
//! drawn before busy mode and plays it out over the new content, either as a
//! crossfade or as a column "melt" wipe.
//!
//! ## Lifecycle
//! 1. `configure()` when a busy run starts and [`should_animate`] allows it
//! 2. `ensure_snapshot()` on the first busy frame (lazy capture)
//! 3. `begin()` right after the worker finishes
//! 4. `tick()` every foreground frame until the position reaches 1.0
//!
//! The snapshot itself belongs to the host surface; the animator only holds
//! its handle and guarantees it is released exactly once per capture.

pub mod vertex;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{settings::BusySettings, task_management::task::BusyMode};
use vertex::{push_quad, TransitionVertex};

/// Number of per-column noise samples used by the wipe styles.
pub const NOISE_SAMPLES: usize = 320;

/// Fraction of the animation by which the slowest column may lag.
const MAX_COLUMN_DELAY: f32 = 0.5;

/// Visual style of the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionStyle {
    /// The snapshot fades out over the new frame.
    #[default]
    Crossfade,
    /// Columns slide down with offsets interpolated between neighbours.
    SmoothWipe,
    /// Columns slide down in whole-pixel steps.
    BlockyWipe,
}

impl TransitionStyle {
    fn uses_noise(self) -> bool {
        matches!(self, TransitionStyle::SmoothWipe | TransitionStyle::BlockyWipe)
    }
}

/// Opaque reference to a frame snapshot owned by the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotHandle(pub u64);

/// Size of the area the transition covers, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// The part of the host window the animator draws through.
pub trait TransitionSurface {
    /// Grabs the last presented frame. `None` when there is no window.
    fn capture_snapshot(&mut self) -> Option<SnapshotHandle>;

    /// Frees a snapshot previously returned by `capture_snapshot`.
    fn release_snapshot(&mut self, snapshot: SnapshotHandle);

    /// Draws `vertices` textured with `snapshot` over the current frame.
    fn draw_transition(&mut self, snapshot: SnapshotHandle, vertices: &[TransitionVertex]);

    /// Current drawable size. `None` when there is no window.
    fn viewport(&self) -> Option<Viewport>;
}

/// Decides whether leaving busy mode for a task with `mode` is animated.
pub fn should_animate(settings: &BusySettings, mode: BusyMode) -> bool {
    !settings.novideo
        && !settings.net_game
        && !mode.contains(BusyMode::STARTUP)
        && mode.contains(BusyMode::TRANSITION)
        && settings.transition_ticks > 0
}

/// State machine driving the busy-mode exit animation.
#[derive(Debug)]
pub struct TransitionAnimator {
    style: TransitionStyle,
    duration_ticks: u32,
    /// Armed for the current busy run but not started yet.
    configured: bool,
    in_progress: bool,
    start_tick: f64,
    position: f32,
    snapshot: Option<SnapshotHandle>,
    noise: Vec<f32>,
}

impl TransitionAnimator {
    pub fn new() -> Self {
        Self {
            style: TransitionStyle::default(),
            duration_ticks: 0,
            configured: false,
            in_progress: false,
            start_tick: 0.0,
            position: 0.0,
            snapshot: None,
            noise: Vec::new(),
        }
    }

    /// Arms the animator for the busy run that is about to start.
    pub fn configure(&mut self, settings: &BusySettings) {
        self.style = settings.transition_style;
        self.duration_ticks = settings.transition_ticks;
        self.configured = true;
        self.in_progress = false;
        self.position = 0.0;

        if self.style.uses_noise() {
            let seed = settings.noise_seed.unwrap_or_else(|| fastrand::u64(..));
            self.noise = seed_noise(seed);
        } else {
            self.noise.clear();
        }
        debug!(
            "Transition configured: {:?} over {} ticks",
            self.style, self.duration_ticks
        );
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn style(&self) -> TransitionStyle {
        self.style
    }

    pub fn snapshot(&self) -> Option<SnapshotHandle> {
        self.snapshot
    }

    /// Captures the snapshot if the animator is armed and has none yet.
    /// Returns whether a snapshot is available.
    pub fn ensure_snapshot<S: TransitionSurface + ?Sized>(&mut self, surface: &mut S) -> bool {
        if !self.configured && !self.in_progress {
            return false;
        }
        if self.snapshot.is_none() {
            self.snapshot = surface.capture_snapshot();
            if self.snapshot.is_none() {
                warn!("No frame available for the busy transition snapshot");
            }
        }
        self.snapshot.is_some()
    }

    /// Starts the animation at `now_tick`. Returns `false` (and disarms)
    /// when no snapshot can be obtained or the duration is zero.
    pub fn begin<S: TransitionSurface + ?Sized>(&mut self, surface: &mut S, now_tick: f64) -> bool {
        if !self.configured {
            return false;
        }
        if self.duration_ticks == 0 || !self.ensure_snapshot(surface) {
            self.abort(surface);
            return false;
        }

        self.configured = false;
        self.start_tick = now_tick;
        self.position = 0.0;
        self.in_progress = true;
        debug!("Transition started at tick {:.2}", now_tick);
        true
    }

    /// Advances the animation to `now_tick`, ending it once complete.
    pub fn tick<S: TransitionSurface + ?Sized>(&mut self, surface: &mut S, now_tick: f64) {
        if !self.in_progress {
            return;
        }
        if self.duration_ticks == 0 {
            self.end(surface);
            return;
        }

        let elapsed = (now_tick - self.start_tick).max(0.0);
        self.position = (elapsed / f64::from(self.duration_ticks)).min(1.0) as f32;
        if self.position >= 1.0 {
            self.end(surface);
        }
    }

    /// Changes the duration. Zero ends a running transition immediately.
    pub fn set_duration_ticks<S: TransitionSurface + ?Sized>(&mut self, ticks: u32, surface: &mut S) {
        self.duration_ticks = ticks;
        if ticks == 0 {
            if self.in_progress {
                self.end(surface);
            } else if self.configured {
                self.abort(surface);
            }
        }
    }

    /// Cancels any armed or running transition and frees the snapshot.
    pub fn abort<S: TransitionSurface + ?Sized>(&mut self, surface: &mut S) {
        self.configured = false;
        self.in_progress = false;
        self.release(surface);
    }

    fn end<S: TransitionSurface + ?Sized>(&mut self, surface: &mut S) {
        self.in_progress = false;
        self.position = 1.0;
        self.release(surface);
        debug!("Transition finished");
    }

    fn release<S: TransitionSurface + ?Sized>(&mut self, surface: &mut S) {
        if let Some(snapshot) = self.snapshot.take() {
            surface.release_snapshot(snapshot);
        }
    }

    /// Draws the current animation frame. No-op unless in progress.
    pub fn draw<S: TransitionSurface + ?Sized>(&self, surface: &mut S) {
        if !self.in_progress {
            return;
        }
        let (Some(snapshot), Some(viewport)) = (self.snapshot, surface.viewport()) else {
            return;
        };
        let vertices = self.geometry(viewport);
        surface.draw_transition(snapshot, &vertices);
    }

    /// Builds the overlay geometry for the current position.
    pub fn geometry(&self, viewport: Viewport) -> Vec<TransitionVertex> {
        let mut vertices = Vec::new();
        if !self.in_progress || viewport.width == 0 || viewport.height == 0 {
            return vertices;
        }

        let width = viewport.width as f32;
        let height = viewport.height as f32;

        match self.style {
            TransitionStyle::Crossfade => {
                push_quad(
                    &mut vertices,
                    (0.0, width),
                    (0.0, 0.0),
                    height,
                    (0.0, 1.0),
                    1.0 - self.position,
                );
            }
            TransitionStyle::SmoothWipe if !self.noise.is_empty() => {
                let columns = self.noise.len();
                let edge_offset = |edge: usize| {
                    self.column_offset(self.noise[edge.min(columns - 1)]) * height
                };
                for column in 0..columns {
                    let x0 = width * column as f32 / columns as f32;
                    let x1 = width * (column + 1) as f32 / columns as f32;
                    push_quad(
                        &mut vertices,
                        (x0, x1),
                        (edge_offset(column), edge_offset(column + 1)),
                        height,
                        (x0 / width, x1 / width),
                        1.0,
                    );
                }
            }
            TransitionStyle::BlockyWipe => {
                let columns = self.noise.len();
                for (column, &sample) in self.noise.iter().enumerate() {
                    let x0 = (width * column as f32 / columns as f32).floor();
                    let x1 = (width * (column + 1) as f32 / columns as f32).floor();
                    if x1 <= x0 {
                        continue;
                    }
                    let offset = (self.column_offset(sample) * height).floor();
                    push_quad(
                        &mut vertices,
                        (x0, x1),
                        (offset, offset),
                        height,
                        (x0 / width, x1 / width),
                        1.0,
                    );
                }
            }
            TransitionStyle::SmoothWipe => {}
        }
        vertices
    }

    /// Normalized downward offset of a column with the given noise sample.
    fn column_offset(&self, sample: f32) -> f32 {
        ((self.position - sample * MAX_COLUMN_DELAY) / (1.0 - MAX_COLUMN_DELAY)).clamp(0.0, 1.0)
    }
}

impl Default for TransitionAnimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Random walk in `0..=1`, so neighbouring columns start close together.
fn seed_noise(seed: u64) -> Vec<f32> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut noise = Vec::with_capacity(NOISE_SAMPLES);
    let mut sample = rng.f32();
    for _ in 0..NOISE_SAMPLES {
        noise.push(sample);
        sample = (sample + (rng.f32() - 0.5) * 0.1).clamp(0.0, 1.0);
    }
    noise
}
