#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Busy Mode
//!
//! Runs long blocking work (startup, level loads, reloads) on a worker
//! thread while the window stays responsive, then hides the content swap
//! behind an exit transition.
//!
//! ## Key Modules
//!
//! * `application_state` - winit event loop callbacks, window host and input
//! * `core` - Shared-ownership resource handles
//! * `engine_state` - Busy runner, worker thread, transition animator and
//!   the engine state tying them together
//!
//! ## Usage
//!
//! ```rust,no_run
//! fn main() -> anyhow::Result<()> {
//!     busy_mode::run()
//! }
//! ```
//!
//! Settings are read from `busy.json` in the working directory when it
//! exists. Setting `BUSY_NOVIDEO=1` runs the startup sequence headless.

use std::path::Path;

use application_state::ApplicationState;
use engine_state::settings::BusySettings;
use log::{info, warn};
use winit::event_loop::EventLoop;

pub mod application_state;
pub mod core;
pub mod engine_state;

/// Optional settings file, relative to the working directory.
pub const SETTINGS_FILE: &str = "busy.json";

pub fn run() -> anyhow::Result<()> {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let mut state = ApplicationState::new(load_settings(Path::new(SETTINGS_FILE)));

    if state.is_headless() {
        state.run_headless()?;
        return Ok(());
    }

    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut state)?;
    Ok(())
}

fn load_settings(path: &Path) -> BusySettings {
    if path.exists() {
        match BusySettings::load(path) {
            Ok(settings) => return settings,
            Err(err) => warn!("{}; using default busy-mode settings", err),
        }
    }
    let mut settings = BusySettings::default();
    settings.apply_env_overrides();
    settings
}
