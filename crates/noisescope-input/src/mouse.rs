//! Cursor position, movement and buttons.

use glam::Vec2;
use winit::event::{ElementState, MouseButton as WinitMouseButton};

use crate::button::ButtonState;

/// Mouse buttons the harness tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    const fn from_winit(button: WinitMouseButton) -> Option<Self> {
        match button {
            WinitMouseButton::Left => Some(Self::Left),
            WinitMouseButton::Right => Some(Self::Right),
            WinitMouseButton::Middle => Some(Self::Middle),
            _ => None,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Middle => 2,
        }
    }
}

/// Cursor position in window pixels and its movement this frame.
#[derive(Debug, Default)]
pub struct MouseState {
    position: Option<Vec2>,
    delta: Vec2,
    buttons: [ButtonState; 3],
}

impl MouseState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the cursor to `(x, y)`, accumulating the pixel delta.
    ///
    /// The first position after entering the window produces no delta.
    #[allow(clippy::cast_possible_truncation)]
    pub fn move_to(&mut self, x: f64, y: f64) {
        let position = Vec2::new(x as f32, y as f32);
        if let Some(previous) = self.position {
            self.delta += position - previous;
        }
        self.position = Some(position);
    }

    /// Forget the cursor position, e.g. when it leaves the window.
    pub fn leave(&mut self) {
        self.position = None;
    }

    /// Apply a winit button event. Extra buttons are ignored.
    pub fn handle_button(&mut self, button: WinitMouseButton, state: ElementState) {
        if let Some(button) = MouseButton::from_winit(button) {
            self.set_button(button, state == ElementState::Pressed);
        }
    }

    pub fn set_button(&mut self, button: MouseButton, down: bool) {
        self.buttons[button.index()].set(down);
    }

    #[must_use]
    pub const fn is_down(&self, button: MouseButton) -> bool {
        self.buttons[button.index()].is_down()
    }

    #[must_use]
    pub const fn was_pressed(&self, button: MouseButton) -> bool {
        self.buttons[button.index()].was_pressed()
    }

    /// Last known cursor position, or the origin when outside the window.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position.unwrap_or(Vec2::ZERO)
    }

    /// Pixels moved since the last [`end_frame`](Self::end_frame).
    #[must_use]
    pub const fn delta(&self) -> Vec2 {
        self.delta
    }

    pub fn end_frame(&mut self) {
        self.delta = Vec2::ZERO;
        self.buttons.iter_mut().for_each(ButtonState::end_frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn delta_accumulates_within_a_frame() {
        let mut mouse = MouseState::new();
        mouse.move_to(100.0, 100.0);
        assert_eq!(mouse.delta(), Vec2::ZERO);

        mouse.move_to(103.0, 98.0);
        mouse.move_to(110.0, 90.5);
        assert_relative_eq!(mouse.delta().x, 10.0);
        assert_relative_eq!(mouse.delta().y, -9.5);
        assert_relative_eq!(mouse.position().x, 110.0);

        mouse.end_frame();
        assert_eq!(mouse.delta(), Vec2::ZERO);
    }

    #[test]
    fn reentering_does_not_jump() {
        let mut mouse = MouseState::new();
        mouse.move_to(10.0, 10.0);
        mouse.leave();
        mouse.move_to(500.0, 500.0);
        assert_eq!(mouse.delta(), Vec2::ZERO);
    }

    #[test]
    fn buttons_are_independent() {
        let mut mouse = MouseState::new();
        mouse.set_button(MouseButton::Right, true);
        assert!(mouse.is_down(MouseButton::Right));
        assert!(mouse.was_pressed(MouseButton::Right));
        assert!(!mouse.is_down(MouseButton::Left));

        mouse.end_frame();
        assert!(!mouse.was_pressed(MouseButton::Right));
        assert!(mouse.is_down(MouseButton::Right));
    }
}
