//! Application runner and event loop.

use std::sync::Arc;
use std::time::Instant;

use noisescope_gpu::{GpuContextBuilder, MemoryConfig};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::app::HarnessApp;
use crate::context::AppContext;
use crate::frame::FrameContext;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Present with FIFO instead of the lowest-latency mode available.
    pub vsync: bool,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    pub frames_in_flight: usize,
    /// RGBA the swapchain image is cleared to.
    pub clear_color: [f32; 4],
    pub memory: MemoryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "noisescope".to_string(),
            width: 1600,
            height: 900,
            vsync: false,
            validation: cfg!(debug_assertions),
            frames_in_flight: 2,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            memory: MemoryConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    #[must_use]
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    #[must_use]
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames.max(1);
        self
    }

    #[must_use]
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    #[must_use]
    pub fn with_memory(mut self, memory: MemoryConfig) -> Self {
        self.memory = memory;
        self
    }
}

/// Run `A` until its window closes.
///
/// Installs the log subscriber, creates the window and device and drives the
/// frame loop. The first error from initialisation or any frame stops the
/// loop and is returned.
pub fn run_app<A: HarnessApp + 'static>(config: AppConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("{} starting...", config.title);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner::<A> {
        config,
        state: None,
        failure: None,
    };
    event_loop.run_app(&mut runner)?;

    match runner.failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct AppRunner<A: HarnessApp> {
    config: AppConfig,
    state: Option<AppState<A>>,
    failure: Option<anyhow::Error>,
}

struct AppState<A: HarnessApp> {
    ctx: AppContext,
    app: A,
    fps: FpsStats,
}

impl<A: HarnessApp + 'static> AppRunner<A> {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState<A>> {
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let (gpu, surface) = GpuContextBuilder::new()
            .app_name(&self.config.title)
            .validation(self.config.validation)
            .build_for_window(window.as_ref())?;

        info!("GPU: {}", gpu.capabilities().summary());

        let mut ctx = unsafe { AppContext::new(window, gpu, surface, &self.config)? };
        let app = match A::init(&mut ctx) {
            Ok(app) => app,
            Err(e) => {
                release_context(&mut ctx);
                return Err(e);
            }
        };

        Ok(AppState {
            ctx,
            app,
            fps: FpsStats::default(),
        })
    }

    /// Record `e` and leave the event loop.
    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!("{e:#}");
        if self.failure.is_none() {
            self.failure = Some(e);
        }
        event_loop.exit();
    }
}

impl<A: HarnessApp + 'static> ApplicationHandler for AppRunner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.failure.is_some() {
            return;
        }

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Application ready");
            }
            Err(e) => self.fail(event_loop, e.context("initialisation failed")),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            return;
        };

        if state.ctx.input.handle_window_event(&event) {
            return;
        }

        match event {
            WindowEvent::RedrawRequested => {
                if let Err(e) = state.render_frame() {
                    self.fail(event_loop, e);
                    return;
                }
                if state.ctx.input.close_requested() {
                    info!("Close requested");
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(size) => {
                debug!("Ignoring resize to {}x{}", size.width, size.height);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            if state.ctx.input.close_requested() {
                event_loop.exit();
            } else {
                state.ctx.window.request_redraw();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut state) = self.state.take() {
            state.cleanup();
        }
    }
}

impl<A: HarnessApp> AppState<A> {
    fn render_frame(&mut self) -> anyhow::Result<()> {
        let now = Instant::now();
        let dt = now.duration_since(self.ctx.last_frame_time).as_secs_f32();
        self.ctx.last_frame_time = now;
        self.fps.record(dt);

        self.app.update(&mut self.ctx, dt)?;
        if self.ctx.input.close_requested() {
            return Ok(());
        }

        let ctx = &mut self.ctx;
        unsafe {
            ctx.frames
                .next_frame(ctx.gpu.device(), &ctx.swapchain, &ctx.surface.swapchain_loader)?;
        }

        self.app.prepare(&mut self.ctx)?;

        let ctx = &self.ctx;
        let device = ctx.gpu.device();
        let command_buffer = unsafe {
            ctx.frames
                .begin_render_cmds(device, &ctx.render_pass, &ctx.framebuffers, ctx.swapchain.extent)?
        };

        let frame = FrameContext {
            command_buffer,
            image_index: ctx.frames.image_index(),
            slot: ctx.frames.slot(),
            dt,
            frame_number: ctx.frame_count,
        };
        self.app.render(ctx, &frame)?;

        unsafe {
            ctx.frames.end_render_cmds(device)?;
            ctx.frames.submit_render_cmds(
                device,
                ctx.gpu.graphics_queue(),
                ctx.gpu.present_queue(),
                &ctx.swapchain,
                &ctx.surface.swapchain_loader,
            )?;
        }
        ctx.gpu.check_validation()?;

        self.ctx.input.end_frame();
        self.ctx.frame_count += 1;
        Ok(())
    }

    fn cleanup(&mut self) {
        if let Some(summary) = self.fps.summary() {
            info!("{summary}");
        }

        if let Err(e) = self.ctx.gpu.wait_idle() {
            error!("Failed to wait idle: {e}");
        }

        self.app.cleanup(&mut self.ctx);
        unsafe { self.ctx.cleanup() };
        info!("Cleanup complete");
    }
}

/// Destroy a context whose application never started.
fn release_context(ctx: &mut AppContext) {
    if let Err(e) = ctx.gpu.wait_idle() {
        error!("Failed to wait idle: {e}");
    }
    unsafe { ctx.cleanup() };
}

/// Frame rate extremes and average over a run.
#[derive(Debug, Clone, Copy)]
struct FpsStats {
    min: f64,
    max: f64,
    sum: f64,
    frames: u64,
}

impl Default for FpsStats {
    fn default() -> Self {
        Self {
            min: f64::MAX,
            max: 0.0,
            sum: 0.0,
            frames: 0,
        }
    }
}

impl FpsStats {
    fn record(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let fps = 1.0 / f64::from(dt);
        self.min = self.min.min(fps);
        self.max = self.max.max(fps);
        self.sum += fps;
        self.frames += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    fn average(&self) -> Option<f64> {
        (self.frames > 0).then(|| self.sum / self.frames as f64)
    }

    fn summary(&self) -> Option<String> {
        self.average().map(|avg| {
            format!(
                "FPS min {:.1}, max {:.1}, avg {avg:.1} over {} frames",
                self.min, self.max, self.frames
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AppConfig::default();
        assert_eq!((config.width, config.height), (1600, 900));
        assert_eq!(config.frames_in_flight, 2);
        assert!(!config.vsync);
        assert_eq!(config.validation, cfg!(debug_assertions));
    }

    #[test]
    fn builder_overrides_fields() {
        let config = AppConfig::new("viewer")
            .with_size(800, 600)
            .with_vsync(true)
            .with_validation(false)
            .with_frames_in_flight(0);

        assert_eq!(config.title, "viewer");
        assert_eq!((config.width, config.height), (800, 600));
        assert!(config.vsync);
        assert!(!config.validation);
        assert_eq!(config.frames_in_flight, 1);
    }

    #[test]
    fn fps_stats_ignore_zero_frame_times() {
        let mut fps = FpsStats::default();
        assert!(fps.summary().is_none());

        fps.record(0.0);
        fps.record(0.5);
        fps.record(0.25);

        assert_eq!(fps.frames, 2);
        assert!((fps.min - 2.0).abs() < 1e-9);
        assert!((fps.max - 4.0).abs() < 1e-9);
        assert!((fps.average().unwrap() - 3.0).abs() < 1e-9);
    }
}
