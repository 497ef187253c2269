//! Demonstration workloads run under busy mode by the binary.

use log::info;
use web_time::Duration;

use crate::engine_state::task_management::{
    task::{BusyMode, BusyTask},
    worker::{is_worker_thread, WorkerContext},
};

const RESOURCE_STEPS: u32 = 20;

/// Simulated chunked read with ranged progress.
fn read_resources(context: &WorkerContext, step_time: Duration) -> anyhow::Result<i32> {
    for step in 0..=RESOURCE_STEPS {
        context.set_progress(step * 200 / RESOURCE_STEPS);
        std::thread::sleep(step_time);
    }
    info!(
        "Resources read ({})",
        if is_worker_thread() { "worker thread" } else { "inline" }
    );
    Ok(0)
}

/// The tasks run once when the application starts.
pub fn startup_sequence() -> Vec<BusyTask> {
    vec![
        BusyTask::new(BusyMode::PROGRESS_BAR | BusyMode::STARTUP, |context| {
            read_resources(context, Duration::from_millis(40))
        })
        .with_name("Reading resources"),
        BusyTask::new(
            BusyMode::PROGRESS_BAR | BusyMode::ACTIVITY | BusyMode::STARTUP | BusyMode::NO_UPLOADS,
            |_| {
                std::thread::sleep(Duration::from_millis(400));
                Ok(0)
            },
        )
        .with_name("Preparing level"),
    ]
}

/// A level reload that plays the exit transition when done.
pub fn reload_task() -> BusyTask {
    BusyTask::new(BusyMode::PROGRESS_BAR | BusyMode::TRANSITION, |context| {
        read_resources(context, Duration::from_millis(25))
    })
    .with_name("Reloading level")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_tasks_never_animate() {
        let tasks = startup_sequence();
        assert_eq!(tasks.len(), 2);
        assert!(tasks
            .iter()
            .all(|task| task.info().mode.contains(BusyMode::STARTUP)));
        assert!(reload_task().info().mode.contains(BusyMode::TRANSITION));
    }
}
