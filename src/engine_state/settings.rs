//! # Busy Mode Settings
//!
//! Configuration consumed by the busy runner and the transition animator.
//! Settings are plain serde data so they can be read from a JSON file next to
//! the executable; every field has a default, so a partial file is valid.
//!
//! ```json
//! { "transition_style": "smooth_wipe", "transition_ticks": 35 }
//! ```

use std::{fs, path::Path};

use log::info;
use serde::{Deserialize, Serialize};

use super::{error::SettingsError, transition::TransitionStyle};

/// Environment variable that forces headless (no video) operation.
pub const NOVIDEO_ENV_VAR: &str = "BUSY_NOVIDEO";

/// Tunables for busy mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusySettings {
    /// Headless operation: busy tasks run inline on the calling thread and
    /// no transitions are drawn.
    pub novideo: bool,
    /// A networked game is in progress; transitions are suppressed.
    pub net_game: bool,
    /// Animation played when leaving busy mode.
    pub transition_style: TransitionStyle,
    /// Transition length in sharp ticks. Zero disables transitions.
    pub transition_ticks: u32,
    /// Foreground frame-rate cap while busy.
    pub busy_frame_rate: u32,
    /// Per-frame budget for draining deferred GL tasks while busy.
    pub deferred_budget_ms: u32,
    /// Length of the fade from black after a startup task.
    pub fade_in_seconds: f32,
    /// Seed for the wipe noise buffer. A fresh seed is drawn when absent.
    pub noise_seed: Option<u64>,
}

impl Default for BusySettings {
    fn default() -> Self {
        Self {
            novideo: false,
            net_game: false,
            transition_style: TransitionStyle::Crossfade,
            transition_ticks: 28,
            busy_frame_rate: 60,
            deferred_budget_ms: 15,
            fade_in_seconds: 2.0,
            noise_seed: None,
        }
    }
}

impl BusySettings {
    /// Parses settings from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads settings from `path`, then applies environment overrides.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_json_str(&json)?;
        settings.apply_env_overrides();
        info!("Loaded busy-mode settings from {}", path.display());
        Ok(settings)
    }

    /// Applies `BUSY_NOVIDEO` if it is set to `1` or `true`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(NOVIDEO_ENV_VAR) {
            self.novideo = matches!(value.trim(), "1" | "true" | "TRUE" | "yes");
        }
    }
}
