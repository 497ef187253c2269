//! # Application State Management
//!
//! This module handles the application's side of busy mode:
//! - Window creation and the winit event loop callbacks
//! - Input collection, applied once per tick
//! - The concrete host, deferred queue and abort handler lent to the engine
//! - Headless runs when there is no video output

pub mod input_manager;
pub mod input_state;
pub mod startup_tasks;
pub mod window_host;

use std::sync::Arc;

use input_manager::InputManager;
use log::{debug, error, info, trace};
use web_time::Duration;
use window_host::WindowHost;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::engine_state::{
    deferred::DeferredUploadQueue,
    error::BusyError,
    settings::BusySettings,
    task_management::{
        environment::{BusyEnvironment, InputSystem, LoggingAbortHandler},
        BusyOutcome,
    },
    EngineMode, EngineState,
};

const WINDOW_TITLE: &str = "Busy Mode";

/// Number of staged uploads queued alongside a level reload.
const RELOAD_UPLOADS: usize = 64;

/// The application container driven by the winit event loop.
///
/// Owns the engine state together with every collaborator the busy runner
/// borrows, so each tick can lend them out as one [`BusyEnvironment`].
pub struct ApplicationState {
    engine: EngineState,
    host: WindowHost,
    input: InputManager,
    deferred: DeferredUploadQueue,
    abort: LoggingAbortHandler,
}

impl ApplicationState {
    pub fn new(settings: BusySettings) -> Self {
        Self {
            engine: EngineState::new(settings),
            host: WindowHost::new(WINDOW_TITLE),
            input: InputManager::new(),
            deferred: DeferredUploadQueue::new(),
            abort: LoggingAbortHandler::new(),
        }
    }

    pub fn is_headless(&self) -> bool {
        self.engine.settings().novideo
    }

    /// Runs the startup sequence to completion without a window.
    pub fn run_headless(&mut self) -> Result<BusyOutcome, BusyError> {
        let mut env = BusyEnvironment {
            host: &mut self.host,
            input: &mut self.input,
            deferred: &mut self.deferred,
            abort: &mut self.abort,
        };
        let outcome = self
            .engine
            .runner_mut()
            .run_tasks(&mut env, startup_tasks::startup_sequence())?;
        info!("Headless startup finished with exit code {}", outcome.exit_code);
        Ok(outcome)
    }

    /// One event-loop tick: a busy frame or a normal frame.
    fn tick(&mut self, event_loop: &ActiveEventLoop) {
        let mut env = BusyEnvironment {
            host: &mut self.host,
            input: &mut self.input,
            deferred: &mut self.deferred,
            abort: &mut self.abort,
        };
        match self.engine.update(&mut env) {
            Some(Ok(outcome)) => debug!("Busy run finished: {:?}", outcome),
            Some(Err(err)) => error!("{}", err),
            None => {}
        }

        if self.abort.exit_requested() {
            info!("Exiting after a fatal busy-task error");
            event_loop.exit();
            return;
        }

        if self.engine.mode() == EngineMode::Normal {
            self.handle_input();
        }
        self.host.refresh_title();

        if let Some(deadline) = self.engine.next_wake() {
            event_loop.set_control_flow(ControlFlow::WaitUntil(deadline));
            self.host.request_redraw();
        } else if self.engine.needs_continuous_updates() {
            event_loop.set_control_flow(ControlFlow::Poll);
            self.host.request_redraw();
        } else {
            event_loop.set_control_flow(ControlFlow::Wait);
        }
    }

    fn handle_input(&mut self) {
        self.input.process_events(Duration::ZERO);
        self.input.process_sharp_events(Duration::ZERO);
        let input = self.input.get_and_reset_processed_input();

        if input.get_key_state(KeyCode::KeyR).is_just_pressed() {
            self.queue_reload();
        }
        if input.get_key_state(KeyCode::KeyT).is_just_pressed() {
            self.toggle_transition();
        }
    }

    fn queue_reload(&mut self) {
        if self.engine.has_work() {
            return;
        }
        for index in 0..RELOAD_UPLOADS {
            self.deferred
                .enqueue(move || trace!("Uploaded staged texture {}", index));
        }
        self.engine.queue_tasks([startup_tasks::reload_task()]);
    }

    fn toggle_transition(&mut self) {
        let ticks = match self.engine.settings().transition_ticks {
            0 => BusySettings::default().transition_ticks,
            _ => 0,
        };
        info!("Busy transition length set to {} ticks", ticks);
        self.engine
            .runner_mut()
            .set_transition_ticks(ticks, &mut self.host);
    }
}

impl ApplicationHandler for ApplicationState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.host.window().is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(960.0, 600.0));
        match event_loop.create_window(attributes) {
            Ok(window) => {
                self.host.attach(Arc::new(window));
                self.engine.queue_tasks(startup_tasks::startup_sequence());
            }
            Err(err) => {
                error!("Failed to create window: {}", err);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        self.input.intake_input(&event);

        match event {
            WindowEvent::Focused(false) => self.input.reset_inputs(),
            WindowEvent::RedrawRequested => {
                let level = self.host.fade_level();
                trace!("Frame at brightness {:.2}", level);
                self.engine.render(&mut self.host);
            }
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.intake_mouse_motion(delta);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.tick(event_loop);
    }
}
