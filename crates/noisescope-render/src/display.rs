//! CPU pixel buffer shown through the display texture.

use noisescope_gpu::{GraphicsMemory, Texture};
use noisescope_noise::{Canvas, Pencil};

use crate::error::Result;

/// Colour the display is cleared to each frame.
pub const CLEAR_COLOR: u32 = 0xFF10_1010;

/// Row-major `0xAABBGGRR` pixels.
#[derive(Debug, Clone)]
pub struct Display {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Display {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![CLEAR_COLOR; width as usize * height as usize],
        }
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// Copy the pixels into `texture`.
    pub fn upload(&self, memory: &mut GraphicsMemory, texture: &Texture) -> Result<()> {
        memory.copy_to_image(&texture.image, &self.pixels)?;
        Ok(())
    }
}

impl Canvas for Display {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    fn draw_point(&mut self, x: i32, y: i32, pencil: Pencil) {
        let reach = pencil.scale - 1;
        let x_range = (x - reach).max(0)..(x + pencil.scale).min(self.width as i32);
        let y_range = (y - reach).max(0)..(y + pencil.scale).min(self.height as i32);

        for py in y_range {
            let row = py as usize * self.width as usize;
            for px in x_range.clone() {
                self.pixels[row + px as usize] = pencil.color;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_display_is_cleared() {
        let display = Display::new(4, 3);
        assert_eq!(display.pixels().len(), 12);
        assert!(display.pixels().iter().all(|&p| p == CLEAR_COLOR));
    }

    #[test]
    fn pencil_scale_paints_a_square() {
        let mut display = Display::new(8, 8);
        display.clear(0);
        display.draw_point(3, 3, Pencil { color: 7, scale: 2 });

        let painted = display.pixels().iter().filter(|&&p| p == 7).count();
        assert_eq!(painted, 9);
        assert_eq!(display.pixel(2, 2), Some(7));
        assert_eq!(display.pixel(4, 4), Some(7));
        assert_eq!(display.pixel(5, 5), Some(0));
    }

    #[test]
    fn points_off_the_edge_are_clipped() {
        let mut display = Display::new(4, 4);
        display.clear(0);
        display.draw_point(-1, -1, Pencil { color: 1, scale: 2 });
        display.draw_point(10, 2, Pencil::pixel(2));
        display.draw_point(3, 3, Pencil { color: 3, scale: 3 });

        assert_eq!(display.pixel(0, 0), Some(1));
        assert!(!display.pixels().contains(&2));
        assert_eq!(display.pixel(2, 2), Some(3));
        assert_eq!(display.pixel(4, 4), None);
    }
}
