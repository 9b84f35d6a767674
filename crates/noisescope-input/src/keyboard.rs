//! Keyboard state.

use hashbrown::HashMap;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::button::ButtonState;

/// State of every key seen so far, by physical key code.
#[derive(Debug, Default)]
pub struct KeyboardState {
    keys: HashMap<KeyCode, ButtonState>,
}

impl KeyboardState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a winit key event. Keys without a known code are ignored.
    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        if let PhysicalKey::Code(code) = event.physical_key {
            self.set_key(code, event.state == ElementState::Pressed);
        }
    }

    /// Record `key` going down or up.
    pub fn set_key(&mut self, key: KeyCode, down: bool) {
        self.keys.entry(key).or_default().set(down);
    }

    fn state(&self, key: KeyCode) -> ButtonState {
        self.keys.get(&key).copied().unwrap_or_default()
    }

    /// `key` is held down.
    #[must_use]
    pub fn is_down(&self, key: KeyCode) -> bool {
        self.state(key).is_down()
    }

    /// `key` went down this frame.
    #[must_use]
    pub fn was_pressed(&self, key: KeyCode) -> bool {
        self.state(key).was_pressed()
    }

    /// Either shift key is held.
    #[must_use]
    pub fn shift_down(&self) -> bool {
        self.is_down(KeyCode::ShiftLeft) || self.is_down(KeyCode::ShiftRight)
    }

    pub fn end_frame(&mut self) {
        self.keys.values_mut().for_each(ButtonState::end_frame);
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_only_on_first_frame() {
        let mut keyboard = KeyboardState::new();
        assert!(!keyboard.is_down(KeyCode::Tab));

        keyboard.set_key(KeyCode::Tab, true);
        assert!(keyboard.is_down(KeyCode::Tab));
        assert!(keyboard.was_pressed(KeyCode::Tab));

        keyboard.end_frame();
        assert!(keyboard.is_down(KeyCode::Tab));
        assert!(!keyboard.was_pressed(KeyCode::Tab));

        keyboard.set_key(KeyCode::Tab, false);
        assert!(!keyboard.is_down(KeyCode::Tab));
    }

    #[test]
    fn either_shift_counts() {
        let mut keyboard = KeyboardState::new();
        assert!(!keyboard.shift_down());
        keyboard.set_key(KeyCode::ShiftRight, true);
        assert!(keyboard.shift_down());

        keyboard.clear();
        assert!(!keyboard.shift_down());
    }
}
