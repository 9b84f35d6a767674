//! Two-dimensional noise shaded into a square patch.

use crate::canvas::{shade_color, Canvas, Pencil};
use crate::interp::Interp;
use crate::table::NoiseTable;

/// Side of the patch in pixels.
pub const PATCH_SIZE: u32 = 256;

const DEFAULT_FREQUENCY: f32 = 100.0;
const FREQUENCY_SCALE: f32 = 1.03;
const MIN_FREQUENCY: f32 = 1.0;
const MAX_FREQUENCY: f32 = 100.0;

/// The 2D noise visualisation, centred on the canvas.
#[derive(Debug, Clone)]
pub struct NoisePatch {
    table: NoiseTable,
    interp: Interp,
    frequency: f32,
    x_origin: u32,
    y_origin: u32,
}

impl NoisePatch {
    #[must_use]
    pub fn new(width: u32, height: u32, seed: u64) -> Self {
        Self {
            table: NoiseTable::new(seed),
            interp: Interp::default(),
            frequency: DEFAULT_FREQUENCY,
            x_origin: width.saturating_sub(PATCH_SIZE) / 2,
            y_origin: height.saturating_sub(PATCH_SIZE) / 2,
        }
    }

    /// Pixels per lattice cell.
    #[must_use]
    pub const fn frequency(&self) -> f32 {
        self.frequency
    }

    #[must_use]
    pub const fn origin(&self) -> (u32, u32) {
        (self.x_origin, self.y_origin)
    }

    pub fn set_interp(&mut self, interp: Interp) {
        self.interp = interp;
    }

    #[must_use]
    pub const fn interp(&self) -> Interp {
        self.interp
    }

    /// Grow the frequency one step, up to its maximum.
    pub fn increase_frequency(&mut self) {
        self.frequency = (self.frequency * FREQUENCY_SCALE).min(MAX_FREQUENCY);
    }

    /// Shrink the frequency one step, down to its minimum.
    pub fn decrease_frequency(&mut self) {
        self.frequency = (self.frequency / FREQUENCY_SCALE).max(MIN_FREQUENCY);
    }

    pub fn reseed(&mut self, seed: u64) {
        self.table = NoiseTable::new(seed);
    }

    /// Shade of patch pixel `(x, y)`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn shade(&self, x: u32, y: u32) -> u8 {
        let value = self.table.sample_2d(
            x as f32 / self.frequency,
            y as f32 / self.frequency,
            self.interp,
        );
        (value * 255.0) as u8
    }

    /// Paint the patch.
    #[allow(clippy::cast_possible_wrap)]
    pub fn draw(&self, canvas: &mut impl Canvas) {
        for y in 0..PATCH_SIZE {
            for x in 0..PATCH_SIZE {
                canvas.draw_point(
                    (self.x_origin + x) as i32,
                    (self.y_origin + y) as i32,
                    Pencil::pixel(shade_color(self.shade(x, y))),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::test_canvas::Pixels;
    use approx::assert_relative_eq;

    #[test]
    fn patch_is_centred() {
        let patch = NoisePatch::new(1600, 900, 0xDEAD_BEEF);
        assert_eq!(patch.origin(), (672, 322));
    }

    #[test]
    fn frequency_is_clamped() {
        let mut patch = NoisePatch::new(512, 512, 1);
        patch.increase_frequency();
        assert_relative_eq!(patch.frequency(), MAX_FREQUENCY);

        for _ in 0..500 {
            patch.decrease_frequency();
        }
        assert_relative_eq!(patch.frequency(), MIN_FREQUENCY);

        patch.increase_frequency();
        assert_relative_eq!(patch.frequency(), 1.03);
    }

    #[test]
    fn draws_only_inside_the_patch() {
        let patch = NoisePatch::new(300, 300, 4);
        let mut canvas = Pixels::new(300, 300);
        patch.draw(&mut canvas);

        let (ox, oy) = patch.origin();
        assert_eq!(canvas.at(0, 0), 0);
        assert_eq!(canvas.at(ox, oy), shade_color(patch.shade(0, 0)));
        assert_eq!(
            canvas.at(ox + PATCH_SIZE - 1, oy + PATCH_SIZE - 1) >> 24,
            0xFF
        );
        assert_eq!(canvas.at(ox + PATCH_SIZE, oy), 0);
    }
}
