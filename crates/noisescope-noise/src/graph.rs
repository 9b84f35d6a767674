//! One-dimensional noise plotted as stacked line graphs.
//!
//! Three base graphs sample the noise at decreasing frequency and amplitude;
//! a fourth shows their mean. Graphs span the canvas width and are stacked
//! from the bottom, each a quarter of the canvas high.

use crate::canvas::{Canvas, Pencil};
use crate::interp::Interp;
use crate::table::NoiseTable;

/// Number of base graphs; the composite follows them.
pub const BASE_GRAPH_COUNT: usize = 3;
/// Base graphs plus the composite.
pub const GRAPH_COUNT: usize = BASE_GRAPH_COUNT + 1;

const BASE_FREQUENCY: f32 = 128.0;
const BASE_AMPLITUDE: f32 = 1.0;
const OCTAVE_DIVISOR: f32 = 4.0;

/// Colour of the plotted lines.
pub const GRAPH_COLOR: u32 = 0xFF00_00FF;

/// Placement and samples of one graph.
#[derive(Debug, Clone)]
pub struct Graph {
    pub width: u32,
    pub height: u32,
    pub x_origin: u32,
    pub y_origin: u32,
    pub samples: Vec<f32>,
}

impl Graph {
    /// Draw the samples as connected vertical runs.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn draw(&self, canvas: &mut impl Canvas) {
        let Some(&first) = self.samples.first() else {
            return;
        };

        let pencil = Pencil::pixel(GRAPH_COLOR);
        let mut previous = first as i32;

        for (column, &sample) in self.samples.iter().enumerate() {
            let value = sample as i32;
            let x = self.x_origin as i32 + column as i32;
            let y0 = self.y_origin as i32;

            let step = (value - previous).signum();
            if step == 0 {
                canvas.draw_point(x, y0 + value, pencil);
            } else {
                let mut y = previous + step;
                loop {
                    canvas.draw_point(x, y0 + y, pencil);
                    if y == value {
                        break;
                    }
                    y += step;
                }
            }

            previous = value;
        }
    }
}

/// The 1D noise visualisation.
#[derive(Debug, Clone)]
pub struct NoiseGraphs {
    table: NoiseTable,
    interp: Interp,
    graphs: Vec<Graph>,
}

impl NoiseGraphs {
    /// Lay out graphs for a `width` x `height` canvas and sample them.
    #[must_use]
    pub fn new(width: u32, height: u32, seed: u64) -> Self {
        let graph_height = height / GRAPH_COUNT as u32;

        let graphs = (0..GRAPH_COUNT as u32)
            .map(|i| Graph {
                width,
                height: graph_height,
                x_origin: 0,
                y_origin: height - graph_height * (i + 1),
                samples: vec![0.0; width as usize],
            })
            .collect();

        let mut noise = Self {
            table: NoiseTable::new(seed),
            interp: Interp::default(),
            graphs,
        };
        noise.resample();
        noise
    }

    #[must_use]
    pub fn graphs(&self) -> &[Graph] {
        &self.graphs
    }

    #[must_use]
    pub const fn interp(&self) -> Interp {
        self.interp
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.table.seed()
    }

    /// Switch step function and resample.
    pub fn set_interp(&mut self, interp: Interp) {
        self.interp = interp;
        self.resample();
    }

    /// Regenerate the noise from `seed` and resample.
    pub fn reseed(&mut self, seed: u64) {
        self.table = NoiseTable::new(seed);
        self.resample();
    }

    #[allow(clippy::cast_precision_loss)]
    fn resample(&mut self) {
        let (base, composite) = self.graphs.split_at_mut(BASE_GRAPH_COUNT);

        let mut frequency = BASE_FREQUENCY;
        let mut amplitude = BASE_AMPLITUDE;
        for graph in base.iter_mut() {
            let scale = graph.height as f32 * amplitude;
            for (x, sample) in graph.samples.iter_mut().enumerate() {
                *sample = self.table.sample(x as f32 / frequency, self.interp) * scale;
            }
            frequency /= OCTAVE_DIVISOR;
            amplitude /= OCTAVE_DIVISOR;
        }

        let composite = &mut composite[0];
        for (x, sample) in composite.samples.iter_mut().enumerate() {
            let sum: f32 = base.iter().map(|graph| graph.samples[x]).sum();
            *sample = sum / BASE_GRAPH_COUNT as f32;
        }
    }

    /// Plot every graph.
    pub fn draw(&self, canvas: &mut impl Canvas) {
        for graph in &self.graphs {
            graph.draw(canvas);
        }
    }
}
