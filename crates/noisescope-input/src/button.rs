//! Per-frame button state.

/// Up/down state of a key or mouse button plus whether it changed this frame.
///
/// ```text
/// up ──set(true)──> down+changed ──end_frame()──> down
///  ^                                               │
///  └──end_frame()── up+changed <──set(false)───────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    down: bool,
    changed: bool,
}

impl ButtonState {
    /// Record the button going down (`true`) or up (`false`).
    ///
    /// Repeats of the current state are ignored, so OS key repeat does not
    /// produce extra presses.
    pub fn set(&mut self, down: bool) {
        if self.down != down {
            self.down = down;
            self.changed = true;
        }
    }

    /// Held down, including the frame it went down.
    #[inline]
    #[must_use]
    pub const fn is_down(self) -> bool {
        self.down
    }

    /// Went down this frame.
    #[inline]
    #[must_use]
    pub const fn was_pressed(self) -> bool {
        self.down && self.changed
    }

    /// Went up this frame.
    #[inline]
    #[must_use]
    pub const fn was_released(self) -> bool {
        !self.down && self.changed
    }

    /// Forget this frame's transition.
    #[inline]
    pub fn end_frame(&mut self) {
        self.changed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_hold_release() {
        let mut button = ButtonState::default();
        assert!(!button.is_down());

        button.set(true);
        assert!(button.is_down());
        assert!(button.was_pressed());

        button.end_frame();
        assert!(button.is_down());
        assert!(!button.was_pressed());

        button.set(false);
        assert!(!button.is_down());
        assert!(button.was_released());

        button.end_frame();
        assert!(!button.was_released());
    }

    #[test]
    fn repeated_down_is_not_a_new_press() {
        let mut button = ButtonState::default();
        button.set(true);
        button.end_frame();
        button.set(true);
        assert!(!button.was_pressed());
    }

    #[test]
    fn press_and_release_in_one_frame() {
        let mut button = ButtonState::default();
        button.set(true);
        button.set(false);
        assert!(!button.is_down());
        assert!(button.was_released());
    }
}
