//! Pixel surfaces noise is plotted onto.

/// Colour and square size of plotted points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pencil {
    /// Packed `0xAABBGGRR` colour.
    pub color: u32,
    /// Half-width of the square drawn around each point; 1 is a single pixel.
    pub scale: i32,
}

impl Pencil {
    /// A one-pixel pencil.
    #[must_use]
    pub const fn pixel(color: u32) -> Self {
        Self { color, scale: 1 }
    }
}

/// Something that can be painted one point at a time.
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Fill every pixel with `color`.
    fn clear(&mut self, color: u32);

    /// Paint the `(2 * scale - 1)` square centred on `(x, y)`, skipping
    /// pixels outside the canvas.
    fn draw_point(&mut self, x: i32, y: i32, pencil: Pencil);
}

/// Grey with full alpha from an 8-bit shade.
#[must_use]
pub const fn shade_color(shade: u8) -> u32 {
    let s = shade as u32;
    0xFF00_0000 | s | (s << 8) | (s << 16)
}

#[cfg(test)]
pub(crate) mod test_canvas {
    use super::{Canvas, Pencil};

    /// Plain in-memory canvas for plotting tests.
    pub struct Pixels {
        pub width: u32,
        pub height: u32,
        pub data: Vec<u32>,
    }

    impl Pixels {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                data: vec![0; (width * height) as usize],
            }
        }

        pub fn at(&self, x: u32, y: u32) -> u32 {
            self.data[(y * self.width + x) as usize]
        }
    }

    impl Canvas for Pixels {
        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn clear(&mut self, color: u32) {
            self.data.fill(color);
        }

        fn draw_point(&mut self, x: i32, y: i32, pencil: Pencil) {
            for py in y - (pencil.scale - 1)..y + pencil.scale {
                for px in x - (pencil.scale - 1)..x + pencil.scale {
                    if px >= 0 && py >= 0 && (px as u32) < self.width && (py as u32) < self.height {
                        self.data[(py as u32 * self.width + px as u32) as usize] = pencil.color;
                    }
                }
            }
        }
    }
}
