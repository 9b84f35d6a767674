//! Keyboard and mouse bindings of the viewer.

use glam::{Vec2, Vec3};
use noisescope_input::{InputState, KeyCode, MouseButton};
use noisescope_noise::Interp;

/// Units moved per frame.
pub const MOVE_SPEED: f32 = 0.01;

/// Speed multiplier while Shift is held.
pub const FAST_MULTIPLIER: f32 = 10.0;

/// Degrees turned per pixel of mouse movement.
pub const LOOK_SENSITIVITY: f32 = 0.2;

/// Local translation for this frame: x right, y up the world axis, z
/// forward.
pub fn movement(input: &InputState) -> Vec3 {
    let speed = if input.shift_down() {
        MOVE_SPEED * FAST_MULTIPLIER
    } else {
        MOVE_SPEED
    };

    let axis = |positive: KeyCode, negative: KeyCode| {
        f32::from(u8::from(input.key_down(positive))) - f32::from(u8::from(input.key_down(negative)))
    };

    Vec3::new(
        axis(KeyCode::KeyD, KeyCode::KeyA),
        axis(KeyCode::KeyQ, KeyCode::KeyE),
        axis(KeyCode::KeyW, KeyCode::KeyS),
    ) * speed
}

/// Pitch and yaw in degrees while the right button drags.
pub fn look(input: &InputState) -> Option<Vec2> {
    if !input.mouse_down(MouseButton::Right) {
        return None;
    }
    let delta = input.mouse_delta();
    Some(Vec2::new(delta.y, -delta.x) * LOOK_SENSITIVITY)
}

/// Interpolation selected this frame, if any.
pub fn interp_choice(input: &InputState) -> Option<Interp> {
    [
        (KeyCode::F1, Interp::Linear),
        (KeyCode::F2, Interp::Smoothstep),
        (KeyCode::F3, Interp::Smootherstep),
    ]
    .into_iter()
    .find_map(|(key, interp)| input.key_pressed(key).then_some(interp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn opposite_keys_cancel() {
        let mut input = InputState::new();
        input.keyboard_mut().set_key(KeyCode::KeyW, true);
        input.keyboard_mut().set_key(KeyCode::KeyS, true);
        input.keyboard_mut().set_key(KeyCode::KeyD, true);

        let step = movement(&input);
        assert_relative_eq!(step.z, 0.0);
        assert_relative_eq!(step.x, MOVE_SPEED);
    }

    #[test]
    fn q_raises_and_e_lowers() {
        let mut input = InputState::new();
        input.keyboard_mut().set_key(KeyCode::KeyQ, true);
        assert_relative_eq!(movement(&input).y, MOVE_SPEED);

        input.keyboard_mut().set_key(KeyCode::KeyQ, false);
        input.keyboard_mut().set_key(KeyCode::KeyE, true);
        assert_relative_eq!(movement(&input).y, -MOVE_SPEED);
    }

    #[test]
    fn shift_speeds_up_movement() {
        let mut input = InputState::new();
        input.keyboard_mut().set_key(KeyCode::KeyW, true);
        input.keyboard_mut().set_key(KeyCode::ShiftLeft, true);

        assert_relative_eq!(movement(&input).z, MOVE_SPEED * FAST_MULTIPLIER);
    }

    #[test]
    fn look_needs_the_right_button() {
        let mut input = InputState::new();
        input.mouse_mut().move_to(10.0, 10.0);
        input.mouse_mut().move_to(20.0, 15.0);
        assert!(look(&input).is_none());

        input.mouse_mut().set_button(MouseButton::Right, true);
        let turn = look(&input).unwrap();
        assert_relative_eq!(turn.x, 5.0 * LOOK_SENSITIVITY);
        assert_relative_eq!(turn.y, -10.0 * LOOK_SENSITIVITY);
    }

    #[test]
    fn function_keys_pick_interpolation() {
        let mut input = InputState::new();
        assert_eq!(interp_choice(&input), None);

        input.keyboard_mut().set_key(KeyCode::F2, true);
        assert_eq!(interp_choice(&input), Some(Interp::Smoothstep));
    }
}
