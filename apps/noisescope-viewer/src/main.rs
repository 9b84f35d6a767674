//! noisescope viewer
//!
//! Plots value noise into a texture shown on a quad, next to a flat-shaded
//! triangle, both viewed through a fly camera.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p noisescope-viewer -- [OPTIONS]
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)
//! - `NOISESCOPE_SHADER_DIR`: Directory holding the compiled `.spv` shaders

mod app;
mod controls;

use noisescope_app::{run_app, AppConfig};

use crate::app::{Viewer, ViewerParams};

const WIDTH: u32 = 1600;
const HEIGHT: u32 = 900;

fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    let params = ViewerParams::from_args();
    let mut config = AppConfig::new("noisescope")
        .with_size(WIDTH, HEIGHT)
        .with_vsync(params.vsync);
    if params.no_validation {
        config = config.with_validation(false);
    }

    run_app::<Viewer>(config)
}

fn print_help() {
    eprintln!(
        "noisescope viewer

USAGE:
    cargo run -p noisescope-viewer -- [OPTIONS]

OPTIONS:
    --mode <1d|2d>      Start with the noise graphs or the 2D patch (default: 1d)
    --seed <N>          Noise seed (default: random)
    --vsync             Present with vsync
    --no-validation     Disable Vulkan validation layers
    -h, --help          Print this help message

CONTROLS:
    Esc                 Quit
    W/A/S/D, Q/E        Move (hold Shift to go faster)
    Right mouse drag    Look around
    Tab                 Switch between 1D graphs and 2D patch
    F1/F2/F3            Linear, smoothstep or smootherstep interpolation
    G                   New random seed
    Left/Right          Patch frequency down/up

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)
    NOISESCOPE_SHADER_DIR   Directory holding the compiled shaders"
    );
}
