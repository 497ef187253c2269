use std::{sync::mpsc::channel, thread};

use anyhow::anyhow;
use web_time::{Duration, Instant};

use super::{
    test_support::{Collaborators, HostCall},
    worker::is_worker_thread,
    *,
};
use crate::{
    core::st_resource::StResource,
    engine_state::{settings::BusySettings, transition::TransitionStyle},
};

fn drive(runner: &mut BusyRunner, collab: &mut Collaborators) -> Result<BusyOutcome, BusyError> {
    loop {
        if let Some(result) = runner.poll(&mut collab.env()) {
            return result;
        }
        thread::sleep(Duration::from_millis(1));
    }
}

fn sleeping_task(mode: BusyMode, millis: u64) -> BusyTask {
    BusyTask::new(mode, move |_| {
        thread::sleep(Duration::from_millis(millis));
        Ok(0)
    })
}

#[test]
fn nested_begin_is_rejected_while_a_task_runs() {
    let mut runner = BusyRunner::new(BusySettings::default());
    let mut collab = Collaborators::default();
    let begins = StResource::new(0u32);
    let counter = begins.clone();
    runner
        .audiences_mut()
        .add_busy_begin(move |_| *counter.get_mut() += 1);

    let (release, gate) = channel::<()>();
    let task = BusyTask::new(BusyMode::empty(), move |_| {
        gate.recv()?;
        Ok(0)
    });
    runner.begin_task(&mut collab.env(), task).unwrap();
    assert_eq!(runner.state(), BusyState::Running);

    let nested = runner.begin_task(&mut collab.env(), sleeping_task(BusyMode::empty(), 0));
    assert!(matches!(nested, Err(BusyError::AlreadyBusy)));
    assert_eq!(runner.state(), BusyState::Running);
    assert_eq!(*begins.get(), 1);

    release.send(()).unwrap();
    assert!(drive(&mut runner, &mut collab).is_ok());
    assert_eq!(runner.state(), BusyState::Idle);
}

#[test]
fn startup_task_runs_to_completion_and_fades_in() {
    let mut runner = BusyRunner::new(BusySettings::default());
    let mut collab = Collaborators::default();
    let task = BusyTask::new(BusyMode::PROGRESS_BAR | BusyMode::STARTUP, |context| {
        context.set_progress(50);
        thread::sleep(Duration::from_millis(50));
        context.set_progress(200);
        Ok(0)
    });

    assert!(!runner.is_busy());
    let started = Instant::now();
    let outcome = runner.run_task(&mut collab.env(), task).unwrap();

    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(
        outcome,
        BusyOutcome {
            success: true,
            exit_code: 0
        }
    );
    assert!(!runner.is_busy());
    assert!(runner.current_task().is_none());

    let host = &collab.host;
    assert_eq!(host.calls.first(), Some(&HostCall::SetMode(WindowMode::Busy)));
    assert_eq!(host.calls.last(), Some(&HostCall::SetMode(WindowMode::Normal)));
    assert!(host
        .calls
        .contains(&HostCall::ProgressMode(ProgressMode::Ranged { start: 0.0, end: 200.0 })));
    assert!(host.calls.contains(&HostCall::ShowProgress(true)));
    assert!(host.calls.contains(&HostCall::ShowProgress(false)));
    assert_eq!(host.count(|call| *call == HostCall::Fade(FadeDirection::FromBlack)), 1);
    assert!(host.pumps > 0);
    // Startup runs never animate.
    assert_eq!(host.count(|call| matches!(call, HostCall::Capture(_))), 0);
}

#[test]
fn progress_display_is_monotonic_within_range() {
    let mut runner = BusyRunner::new(BusySettings::default());
    let mut collab = Collaborators::default();
    let task = BusyTask::new(BusyMode::PROGRESS_BAR, |context| {
        for value in [50, 120, 90, 200] {
            context.set_progress(value);
            thread::sleep(Duration::from_millis(15));
        }
        Ok(0)
    })
    .with_progress(200, 50, 200);

    runner.run_task(&mut collab.env(), task).unwrap();

    let values = collab.host.progress_values();
    assert_eq!(values.first(), Some(&50.0));
    assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(values.iter().all(|value| (50.0..=200.0).contains(value)));
}

#[test]
fn activity_mode_uses_an_indeterminate_bar() {
    let mut runner = BusyRunner::new(BusySettings::default());
    let mut collab = Collaborators::default();
    let task = sleeping_task(BusyMode::PROGRESS_BAR | BusyMode::ACTIVITY, 10).with_name("Loading");

    runner.run_task(&mut collab.env(), task).unwrap();

    let host = &collab.host;
    assert!(host
        .calls
        .contains(&HostCall::ProgressMode(ProgressMode::Indeterminate)));
    assert!(host.calls.contains(&HostCall::ProgressText("Loading".to_string())));
    assert_eq!(host.progress_values(), vec![0.0]);
}

#[test]
fn worker_error_is_routed_to_the_abort_handler() {
    let mut runner = BusyRunner::new(BusySettings::default());
    let mut collab = Collaborators::default();
    let task = BusyTask::new(BusyMode::PROGRESS_BAR, |_| Err(anyhow!("disk read failed")));

    let result = runner.run_task(&mut collab.env(), task);

    match result {
        Err(BusyError::WorkerFailed(message)) => assert_eq!(message, "disk read failed"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(collab.abort.messages, vec!["disk read failed".to_string()]);
    assert!(!runner.is_busy());
    assert!(!collab.input.ignoring);
    assert_eq!(
        collab.host.calls.last(),
        Some(&HostCall::SetMode(WindowMode::Normal))
    );
}

#[test]
fn worker_side_abort_tears_down_without_joining() {
    let mut runner = BusyRunner::new(BusySettings::default());
    let mut collab = Collaborators::default();
    let task = BusyTask::new(BusyMode::empty(), |context| context.abort("map data missing"));

    let result = runner.run_task(&mut collab.env(), task);

    assert!(matches!(result, Err(BusyError::WorkerFailed(ref message)) if message == "map data missing"));
    assert_eq!(collab.abort.messages, vec!["map data missing".to_string()]);
    assert_eq!(runner.state(), BusyState::Idle);
}

#[test]
fn no_uploads_skips_deferred_draining() {
    let mut runner = BusyRunner::new(BusySettings::default());
    let mut collab = Collaborators::default();

    runner
        .run_task(&mut collab.env(), sleeping_task(BusyMode::NO_UPLOADS, 20))
        .unwrap();

    assert!(collab.deferred.budgets.is_empty());
    assert!(collab.input.processed > 0);
}

#[test]
fn uploads_drain_per_frame_then_flush_on_exit() {
    let mut runner = BusyRunner::new(BusySettings::default());
    let mut collab = Collaborators::default();

    // Even an instant worker gets one busy frame before completion.
    runner
        .run_task(&mut collab.env(), sleeping_task(BusyMode::empty(), 0))
        .unwrap();

    let budgets = &collab.deferred.budgets;
    assert_eq!(budgets.first(), Some(&15));
    assert_eq!(budgets.last(), Some(&0));
    assert_eq!(budgets.iter().filter(|budget| **budget == 0).count(), 1);
}

#[test]
fn deferred_gl_listeners_run_only_while_home_is_hidden() {
    let mut runner = BusyRunner::new(BusySettings::default());
    let mut collab = Collaborators::default();
    let calls = StResource::new(0u32);
    let counter = calls.clone();
    runner.audiences_mut().add_deferred_gl_task(move || {
        *counter.get_mut() += 1;
        true
    });

    runner
        .run_task(&mut collab.env(), sleeping_task(BusyMode::empty(), 10))
        .unwrap();
    assert_eq!(*calls.get(), 0);

    collab.host.home_hidden = true;
    let (release, gate) = channel::<()>();
    let task = BusyTask::new(BusyMode::empty(), move |_| {
        gate.recv()?;
        Ok(0)
    });
    runner.begin_task(&mut collab.env(), task).unwrap();
    assert!(runner.poll(&mut collab.env()).is_none());
    assert!(*calls.get() >= 1);
    assert!(runner.has_pending_deferred_work());

    release.send(()).unwrap();
    drive(&mut runner, &mut collab).unwrap();
    assert!(!runner.has_pending_deferred_work());
}

#[test]
fn transition_snapshot_is_captured_once_and_released_once() {
    let settings = BusySettings {
        transition_style: TransitionStyle::Crossfade,
        transition_ticks: 28,
        ..BusySettings::default()
    };
    let mut runner = BusyRunner::new(settings);
    let mut collab = Collaborators::default();

    runner
        .run_task(&mut collab.env(), sleeping_task(BusyMode::TRANSITION, 20))
        .unwrap();

    assert!(runner.transition().is_in_progress());
    assert_eq!(collab.host.count(|call| matches!(call, HostCall::Capture(_))), 1);
    assert_eq!(collab.host.live_snapshots(), 1);

    runner.draw_transition(&mut collab.host);
    assert_eq!(collab.host.count(|call| matches!(call, HostCall::Draw(_))), 1);

    // A following run without the transition flag drops the old snapshot.
    runner
        .run_task(&mut collab.env(), sleeping_task(BusyMode::empty(), 0))
        .unwrap();

    assert!(!runner.transition().is_in_progress());
    assert_eq!(collab.host.count(|call| matches!(call, HostCall::Capture(_))), 1);
    assert_eq!(collab.host.count(|call| matches!(call, HostCall::Release(_))), 1);
    assert_eq!(collab.host.live_snapshots(), 0);
}

#[test]
fn failed_task_does_not_animate() {
    let mut runner = BusyRunner::new(BusySettings::default());
    let mut collab = Collaborators::default();
    let task = BusyTask::new(BusyMode::TRANSITION, |_| Err(anyhow!("bad lump")));

    assert!(runner.run_task(&mut collab.env(), task).is_err());

    assert!(!runner.transition().is_in_progress());
    assert_eq!(collab.host.live_snapshots(), 0);
}

#[test]
fn zero_transition_ticks_stop_a_running_transition() {
    let mut runner = BusyRunner::new(BusySettings::default());
    let mut collab = Collaborators::default();
    runner
        .run_task(&mut collab.env(), sleeping_task(BusyMode::TRANSITION, 5))
        .unwrap();
    assert!(runner.transition().is_in_progress());

    runner.set_transition_ticks(0, &mut collab.host);

    assert!(!runner.transition().is_in_progress());
    assert_eq!(runner.settings().transition_ticks, 0);
    assert_eq!(collab.host.live_snapshots(), 0);
}

#[test]
fn task_sequence_stops_at_first_non_zero_exit() {
    let mut runner = BusyRunner::new(BusySettings::default());
    let mut collab = Collaborators::default();
    let started = StResource::new(Vec::new());
    let log = started.clone();
    runner
        .audiences_mut()
        .add_task_will_start(move |task| log.get_mut().push(task.display_name().to_string()));

    let tasks = vec![
        BusyTask::new(BusyMode::empty(), |_| Ok(0)).with_name("first"),
        BusyTask::new(BusyMode::empty(), |_| Ok(3)).with_name("second"),
        BusyTask::new(BusyMode::empty(), |_| Ok(0)).with_name("third"),
    ];
    let outcome = runner.run_tasks(&mut collab.env(), tasks).unwrap();

    assert_eq!(outcome.exit_code, 3);
    assert_eq!(*started.get(), vec!["first", "second"]);
}

#[test]
fn headless_runs_inline_without_touching_the_host() {
    let settings = BusySettings {
        novideo: true,
        ..BusySettings::default()
    };
    let mut runner = BusyRunner::new(settings);
    let mut collab = Collaborators::default();
    let task = BusyTask::new(
        BusyMode::PROGRESS_BAR | BusyMode::STARTUP | BusyMode::TRANSITION,
        |_| Ok(if is_worker_thread() { 1 } else { 0 }),
    );

    let outcome = runner.run_task(&mut collab.env(), task).unwrap();

    assert_eq!(outcome.exit_code, 0);
    assert!(collab.host.calls.is_empty());
    assert_eq!(collab.host.pumps, 0);
    assert!(collab.deferred.budgets.is_empty());
    assert!(!runner.is_busy());
}

#[test]
fn audiences_bracket_the_run_and_input_state_is_restored() {
    let mut runner = BusyRunner::new(BusySettings::default());
    let mut collab = Collaborators::default();
    collab.input.ignoring = true;

    let events = StResource::new(Vec::new());
    let (begin_log, start_log, end_log) = (events.clone(), events.clone(), events.clone());
    runner
        .audiences_mut()
        .add_busy_begin(move |_| begin_log.get_mut().push("begin"));
    runner
        .audiences_mut()
        .add_task_will_start(move |_| start_log.get_mut().push("start"));
    runner
        .audiences_mut()
        .add_busy_end(move |_| end_log.get_mut().push("end"));

    let (release, gate) = channel::<()>();
    let task = BusyTask::new(BusyMode::empty(), move |_| {
        gate.recv()?;
        Ok(0)
    });
    runner.begin_task(&mut collab.env(), task).unwrap();
    assert!(collab.input.ignoring);
    assert_eq!(*events.get(), vec!["begin", "start"]);

    release.send(()).unwrap();
    drive(&mut runner, &mut collab).unwrap();

    assert_eq!(*events.get(), vec!["begin", "start", "end"]);
    assert!(collab.input.ignoring);
}

#[test]
fn poll_is_inert_while_idle() {
    let mut runner = BusyRunner::new(BusySettings::default());
    let mut collab = Collaborators::default();

    assert!(runner.poll(&mut collab.env()).is_none());
    runner.busy_loop(&mut collab.env());

    assert_eq!(collab.input.processed, 0);
    assert!(collab.host.calls.is_empty());
}

#[test]
fn event_loop_polls_are_paced_by_the_busy_frame_rate() {
    let mut runner = BusyRunner::new(BusySettings::default());
    let mut collab = Collaborators::default();
    let (release, gate) = channel::<()>();
    let task = BusyTask::new(BusyMode::empty(), move |_| {
        gate.recv()?;
        Ok(0)
    });
    runner.begin_task(&mut collab.env(), task).unwrap();
    let first_deadline = runner.next_frame_deadline().unwrap();

    // Wake the way the window's event loop does: poll, then sleep until due.
    let started = Instant::now();
    let mut frames = 0;
    while started.elapsed() < Duration::from_millis(100) {
        assert!(runner.poll(&mut collab.env()).is_none());
        frames += 1;
        let deadline = runner.next_frame_deadline().unwrap();
        thread::sleep(deadline.saturating_duration_since(Instant::now()));
    }

    assert!(runner.next_frame_deadline().unwrap() > first_deadline);
    assert!(frames <= 10, "{frames} busy frames in 100ms at 60 Hz");

    release.send(()).unwrap();
    assert!(drive(&mut runner, &mut collab).is_ok());
    assert!(runner.next_frame_deadline().is_none());
}
