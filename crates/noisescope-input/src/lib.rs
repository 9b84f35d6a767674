//! Keyboard and mouse state for the noisescope harness.
//!
//! [`InputState`] is fed winit window events during event polling and queried
//! by the application during its update; [`InputState::end_frame`] runs once
//! per frame after the update.
//!
//! ```ignore
//! if input.key_pressed(KeyCode::Tab) {
//!     mode = mode.toggled();
//! }
//! if input.mouse_down(MouseButton::Right) {
//!     view.rotate(input.mouse_delta());
//! }
//! ```

mod button;
mod keyboard;
mod mouse;

pub use button::ButtonState;
pub use keyboard::KeyboardState;
pub use mouse::{MouseButton, MouseState};

pub use winit::event::WindowEvent;
pub use winit::keyboard::KeyCode;

use glam::Vec2;

/// Window input as seen by the application.
#[derive(Debug, Default)]
pub struct InputState {
    keyboard: KeyboardState,
    mouse: MouseState,
    close_requested: bool,
}

impl InputState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a window event. Returns `true` if it was an input event.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                self.keyboard.handle_key_event(event);
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse.move_to(position.x, position.y);
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.mouse.leave();
                true
            }
            WindowEvent::MouseInput { button, state, .. } => {
                self.mouse.handle_button(*button, *state);
                true
            }
            WindowEvent::Focused(false) => {
                self.keyboard.clear();
                true
            }
            WindowEvent::CloseRequested => {
                self.close_requested = true;
                true
            }
            _ => false,
        }
    }

    /// Ask the runner to close the window after this frame.
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    #[must_use]
    pub const fn close_requested(&self) -> bool {
        self.close_requested
    }

    #[must_use]
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keyboard.is_down(key)
    }

    /// `key` went down this frame.
    #[must_use]
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keyboard.was_pressed(key)
    }

    #[must_use]
    pub fn shift_down(&self) -> bool {
        self.keyboard.shift_down()
    }

    #[must_use]
    pub const fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse.is_down(button)
    }

    #[must_use]
    pub fn cursor_position(&self) -> Vec2 {
        self.mouse.position()
    }

    /// Cursor movement in pixels this frame.
    #[must_use]
    pub const fn mouse_delta(&self) -> Vec2 {
        self.mouse.delta()
    }

    #[must_use]
    pub const fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    pub fn keyboard_mut(&mut self) -> &mut KeyboardState {
        &mut self.keyboard
    }

    #[must_use]
    pub const fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    pub fn mouse_mut(&mut self) -> &mut MouseState {
        &mut self.mouse
    }

    /// Drop this frame's transitions and movement.
    pub fn end_frame(&mut self) {
        self.keyboard.end_frame();
        self.mouse.end_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_request_sticks() {
        let mut input = InputState::new();
        assert!(!input.close_requested());
        assert!(input.handle_window_event(&WindowEvent::CloseRequested));
        input.end_frame();
        assert!(input.close_requested());
    }

    #[test]
    fn losing_focus_releases_keys() {
        let mut input = InputState::new();
        input.keyboard_mut().set_key(KeyCode::KeyW, true);
        assert!(input.key_down(KeyCode::KeyW));

        input.handle_window_event(&WindowEvent::Focused(false));
        assert!(!input.key_down(KeyCode::KeyW));
    }

    #[test]
    fn non_input_events_are_not_consumed() {
        let mut input = InputState::new();
        assert!(!input.handle_window_event(&WindowEvent::Focused(true)));
    }
}
