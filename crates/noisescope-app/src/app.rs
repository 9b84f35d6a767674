//! `HarnessApp` trait definition.

use crate::context::AppContext;
use crate::frame::FrameContext;

/// An application driven by the harness runner.
///
/// Each frame the runner calls [`update`](Self::update), acquires a frame
/// slot and swapchain image, calls [`prepare`](Self::prepare), begins the
/// render pass, calls [`render`](Self::render) and then submits and
/// presents.
pub trait HarnessApp: Sized {
    /// Called once after the window, device and frame loop exist.
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self>;

    /// React to this frame's input. `dt` is in seconds.
    ///
    /// Calling [`InputState::request_close`](noisescope_input::InputState::request_close)
    /// on `ctx.input` ends the loop before anything is drawn.
    fn update(&mut self, ctx: &mut AppContext, dt: f32) -> anyhow::Result<()>;

    /// Upload per-frame data. The current slot's previous submission has
    /// completed when this runs.
    #[allow(unused_variables)]
    fn prepare(&mut self, ctx: &mut AppContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Record draws into `frame.command_buffer`, inside the render pass.
    fn render(&mut self, ctx: &AppContext, frame: &FrameContext) -> anyhow::Result<()>;

    /// Release GPU resources. The device is idle.
    #[allow(unused_variables)]
    fn cleanup(&mut self, ctx: &mut AppContext) {}
}
