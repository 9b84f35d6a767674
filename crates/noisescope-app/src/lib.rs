//! Application framework for the noisescope harness.
//!
//! The runner owns the window, the GPU context and the frame loop; an
//! application only reacts to input, prepares per-frame data and records its
//! draws into the render pass:
//!
//! ```no_run
//! use noisescope_app::{run_app, AppConfig, AppContext, FrameContext, HarnessApp};
//!
//! struct Blank;
//!
//! impl HarnessApp for Blank {
//!     fn init(_ctx: &mut AppContext) -> anyhow::Result<Self> {
//!         Ok(Self)
//!     }
//!
//!     fn update(&mut self, _ctx: &mut AppContext, _dt: f32) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//!
//!     fn render(&mut self, _ctx: &AppContext, _frame: &FrameContext) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app::<Blank>(AppConfig::new("blank"))
//! }
//! ```

mod app;
mod context;
mod frame;
mod runner;

pub use app::HarnessApp;
pub use context::AppContext;
pub use frame::FrameContext;
pub use runner::{run_app, AppConfig};

pub use noisescope_gpu::{GpuContext, MemoryConfig};
pub use noisescope_input::{InputState, KeyCode, MouseButton};
