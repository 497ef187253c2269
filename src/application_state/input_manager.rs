//! # Input Manager
//!
//! Collects window input as it arrives and applies it once per tick.
//!
//! Events are queued by `intake_input` and only take effect when the busy
//! runner (or the normal frame) calls [`InputSystem::process_events`]. While
//! input is ignored, queued edges are drained and dropped, so a key pressed
//! during a load does not fire once the load is over.

use std::collections::{HashMap, VecDeque};

use log::debug;
use web_time::Duration;
use winit::{
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use super::input_state::{InputEvent, ProcessedInputState, RawInputState};
use crate::engine_state::task_management::environment::InputSystem;

/// Reload and transition toggle.
const KEY_CODES: [KeyCode; 2] = [KeyCode::KeyR, KeyCode::KeyT];

/// Manages the state of tracked keys.
pub struct InputManager {
    keyboard_inputs_old: HashMap<KeyCode, bool>,
    keyboard_inputs_new: HashMap<KeyCode, bool>,
    /// Edges received since the last `process_events`.
    pending: VecDeque<InputEvent>,
    /// Mouse motion accumulated since the last sharp tick.
    mouse_motion: Option<(f64, f64)>,
    ignoring: bool,
}

impl InputManager {
    pub fn new() -> Self {
        let released_keys = || KEY_CODES.iter().map(|key| (*key, false)).collect();

        Self {
            keyboard_inputs_old: released_keys(),
            keyboard_inputs_new: released_keys(),
            pending: VecDeque::new(),
            mouse_motion: None,
            ignoring: false,
        }
    }

    pub fn is_ignoring(&self) -> bool {
        self.ignoring
    }

    /// Queues the key edges carried by a window event.
    pub fn intake_input(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state,
                        physical_key: PhysicalKey::Code(key),
                        repeat: false,
                        ..
                    },
                ..
            } if self.keyboard_inputs_new.contains_key(key) => {
                self.pending.push_back(InputEvent::Key {
                    key: *key,
                    pressed: *state == ElementState::Pressed,
                });
            }
            _ => {}
        }
    }

    pub fn intake_mouse_motion(&mut self, delta: (f64, f64)) {
        let (x, y) = self.mouse_motion.unwrap_or((0.0, 0.0));
        self.mouse_motion = Some((x + delta.0, y + delta.1));
    }

    /// Translates the applied states into per-key transitions.
    pub fn create_processed_input_state(&self) -> ProcessedInputState {
        let keyboard_states = self
            .keyboard_inputs_new
            .iter()
            .map(|(key, &new_state)| {
                let old_state = self.keyboard_inputs_old.get(key).copied().unwrap_or(false);
                (*key, RawInputState::from_raw_states(old_state, new_state))
            })
            .collect();

        ProcessedInputState { keyboard_states }
    }

    /// Returns this frame's transitions and starts the next frame.
    pub fn get_and_reset_processed_input(&mut self) -> ProcessedInputState {
        let processed_input = self.create_processed_input_state();
        self.move_old_states();
        processed_input
    }

    /// Releases everything, e.g. when the window loses focus.
    pub fn reset_inputs(&mut self) {
        self.pending.clear();
        self.mouse_motion = None;
        self.keyboard_inputs_new.values_mut().for_each(|state| *state = false);
        self.move_old_states();
    }

    fn move_old_states(&mut self) {
        self.keyboard_inputs_old.clone_from(&self.keyboard_inputs_new);
    }

    fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key { key, pressed } => {
                if let Some(state) = self.keyboard_inputs_new.get_mut(&key) {
                    *state = pressed;
                }
            }
        }
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSystem for InputManager {
    fn process_events(&mut self, _dt: Duration) -> usize {
        let drained = self.pending.len();
        while let Some(event) = self.pending.pop_front() {
            if !self.ignoring {
                self.apply(event);
            }
        }
        drained
    }

    fn process_sharp_events(&mut self, _dt: Duration) -> usize {
        match self.mouse_motion.take() {
            Some(_) if self.ignoring => 0,
            Some(_) => 1,
            None => 0,
        }
    }

    fn ignore_events(&mut self, ignore: bool) -> bool {
        if ignore && !self.ignoring {
            debug!("Ignoring input");
            self.reset_inputs();
        }
        std::mem::replace(&mut self.ignoring, ignore)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(manager: &mut InputManager, key: KeyCode, pressed: bool) {
        manager.pending.push_back(InputEvent::Key { key, pressed });
    }

    #[test]
    fn queued_presses_apply_on_process() {
        let mut manager = InputManager::new();
        press(&mut manager, KeyCode::KeyR, true);
        assert!(!manager.create_processed_input_state().get_key_state(KeyCode::KeyR).is_active());

        assert_eq!(manager.process_events(Duration::ZERO), 1);
        let input = manager.get_and_reset_processed_input();
        assert!(input.get_key_state(KeyCode::KeyR).is_just_pressed());

        let input = manager.get_and_reset_processed_input();
        assert_eq!(input.get_key_state(KeyCode::KeyR), RawInputState::Held);
    }

    #[test]
    fn ignored_input_is_drained_and_dropped() {
        let mut manager = InputManager::new();
        assert!(!manager.ignore_events(true));
        press(&mut manager, KeyCode::KeyR, true);

        assert_eq!(manager.process_events(Duration::ZERO), 1);
        assert!(manager.ignore_events(false));
        manager.process_events(Duration::ZERO);

        let input = manager.get_and_reset_processed_input();
        assert_eq!(input.get_key_state(KeyCode::KeyR), RawInputState::NotPressed);
    }

    #[test]
    fn ignoring_releases_held_keys() {
        let mut manager = InputManager::new();
        press(&mut manager, KeyCode::KeyT, true);
        manager.process_events(Duration::ZERO);
        manager.get_and_reset_processed_input();

        manager.ignore_events(true);

        let input = manager.get_and_reset_processed_input();
        assert_eq!(input.get_key_state(KeyCode::KeyT), RawInputState::NotPressed);
    }

    #[test]
    fn only_bound_keys_are_tracked() {
        let mut manager = InputManager::new();
        press(&mut manager, KeyCode::KeyQ, true);
        manager.process_events(Duration::ZERO);

        let input = manager.get_and_reset_processed_input();
        assert_eq!(input.keyboard_states.len(), KEY_CODES.len());
        assert_eq!(input.get_key_state(KeyCode::KeyQ), RawInputState::NotPressed);
    }
}
