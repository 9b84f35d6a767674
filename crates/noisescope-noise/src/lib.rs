//! Value noise for the noisescope harness.
//!
//! A seeded [`NoiseTable`] provides lattice values; [`NoiseGraphs`] plots 1D
//! samples as line graphs and [`NoisePatch`] shades a 2D patch. Both paint
//! onto any [`Canvas`].

pub mod canvas;
pub mod graph;
pub mod interp;
pub mod patch;
pub mod table;

pub use canvas::{shade_color, Canvas, Pencil};
pub use graph::{Graph, NoiseGraphs};
pub use interp::{lerp, linear, smootherstep, smoothstep, Interp};
pub use patch::NoisePatch;
pub use table::NoiseTable;

/// Which visualisation is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseMode {
    #[default]
    Graphs,
    Patch,
}

impl NoiseMode {
    /// The other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Graphs => Self::Patch,
            Self::Patch => Self::Graphs,
        }
    }

    /// Camera distance that frames the display for this mode.
    #[must_use]
    pub const fn view_distance(self) -> f32 {
        match self {
            Self::Graphs => -4.5,
            Self::Patch => -1.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_twice_is_identity() {
        assert_eq!(NoiseMode::Graphs.toggled(), NoiseMode::Patch);
        assert_eq!(NoiseMode::Graphs.toggled().toggled(), NoiseMode::Graphs);
    }
}
