//! # Busy Mode Errors
//!
//! Error types surfaced by the busy runner and the settings loader.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures a busy-mode run can report to its caller.
#[derive(Debug, Error)]
pub enum BusyError {
    /// `run_task`/`begin_task` was called while another busy run was active.
    #[error("busy mode is already active; nested busy tasks are not supported")]
    AlreadyBusy,
    /// The operating system refused to create the worker thread.
    #[error("failed to spawn busy worker thread: {0}")]
    ThreadSpawn(#[source] io::Error),
    /// The worker's entry returned an error or panicked. The message has
    /// already been routed through the abort handler.
    #[error("busy worker failed: {0}")]
    WorkerFailed(String),
}

/// Failures while loading [`BusySettings`](super::settings::BusySettings).
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse busy-mode settings: {0}")]
    Parse(#[from] serde_json::Error),
}
