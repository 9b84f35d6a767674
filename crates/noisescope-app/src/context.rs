//! Application context.

use std::sync::Arc;
use std::time::Instant;

use ash::vk;
use noisescope_gpu::render_pass::{acquire_dependency, present_color_attachment};
use noisescope_gpu::{
    FrameLoop, Framebuffers, GpuContext, GraphicsMemory, RenderPass, RenderPassInfo,
    SubpassInfo, SurfaceContext, Swapchain,
};
use noisescope_input::InputState;
use winit::window::Window;

use crate::runner::AppConfig;

/// Everything an application reaches through the runner: window, device,
/// presentation objects, graphics memory and input.
pub struct AppContext {
    pub window: Arc<Window>,
    pub gpu: GpuContext,
    pub surface: SurfaceContext,
    pub swapchain: Swapchain,
    /// Single-subpass pass clearing and presenting the swapchain image.
    pub render_pass: RenderPass,
    pub framebuffers: Framebuffers,
    pub frames: FrameLoop,
    pub memory: GraphicsMemory,
    pub input: InputState,
    /// Frames submitted so far.
    pub frame_count: u64,
    pub(crate) last_frame_time: Instant,
}

/// Render pass, framebuffers and frame loop for `swapchain`. Nothing is left
/// behind if a step fails.
///
/// # Safety
/// `swapchain` must belong to `gpu`.
unsafe fn create_targets(
    gpu: &GpuContext,
    swapchain: &Swapchain,
    config: &AppConfig,
) -> anyhow::Result<(RenderPass, Framebuffers, FrameLoop)> {
    let device = gpu.device();
    let mut pass_info = RenderPassInfo::new();
    let color = pass_info.push_attachment(
        present_color_attachment(swapchain.format),
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: config.clear_color,
            },
        },
    )?;
    pass_info.push_subpass(
        SubpassInfo::new().color(color, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
    )?;
    pass_info.push_dependency(acquire_dependency())?;
    let render_pass = unsafe { pass_info.create(device)? };

    let framebuffers = match unsafe {
        Framebuffers::new(device, &render_pass, &swapchain.image_views, swapchain.extent)
    } {
        Ok(framebuffers) => framebuffers,
        Err(e) => {
            unsafe { render_pass.destroy(device) };
            return Err(e.into());
        }
    };

    let frames = match unsafe {
        FrameLoop::new(
            device,
            gpu.queue_families().graphics,
            config.frames_in_flight,
            swapchain.image_count(),
        )
    } {
        Ok(frames) => frames,
        Err(e) => {
            unsafe {
                framebuffers.destroy(device);
                render_pass.destroy(device);
            }
            return Err(e.into());
        }
    };

    Ok((render_pass, framebuffers, frames))
}

impl AppContext {
    /// Build the presentation objects and graphics memory for `window`.
    /// On failure everything created so far, the surface included, is
    /// destroyed again.
    ///
    /// # Safety
    /// `surface` must have been created for `window` by `gpu`.
    pub(crate) unsafe fn new(
        window: Arc<Window>,
        gpu: GpuContext,
        surface: SurfaceContext,
        config: &AppConfig,
    ) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let swapchain = match unsafe {
            surface.create_swapchain(&gpu, size.width.max(1), size.height.max(1), config.vsync)
        } {
            Ok(swapchain) => swapchain,
            Err(e) => {
                unsafe { surface.destroy() };
                return Err(e.into());
            }
        };

        let device = gpu.device();
        let (render_pass, framebuffers, frames) =
            match unsafe { create_targets(&gpu, &swapchain, config) } {
                Ok(targets) => targets,
                Err(e) => {
                    unsafe {
                        swapchain.destroy(device, &surface.swapchain_loader);
                        surface.destroy();
                    }
                    return Err(e);
                }
            };

        let memory = match GraphicsMemory::new(&gpu, config.memory) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe {
                    frames.destroy(device);
                    framebuffers.destroy(device);
                    render_pass.destroy(device);
                    swapchain.destroy(device, &surface.swapchain_loader);
                    surface.destroy();
                }
                return Err(e.into());
            }
        };

        Ok(Self {
            window,
            gpu,
            surface,
            swapchain,
            render_pass,
            framebuffers,
            frames,
            memory,
            input: InputState::new(),
            frame_count: 0,
            last_frame_time: Instant::now(),
        })
    }

    pub fn device(&self) -> &ash::Device {
        self.gpu.device()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    pub fn width(&self) -> u32 {
        self.swapchain.extent.width
    }

    pub fn height(&self) -> u32 {
        self.swapchain.extent.height
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(&self) -> f32 {
        self.swapchain.extent.width as f32 / self.swapchain.extent.height.max(1) as f32
    }

    /// Destroy everything created in [`new`](Self::new). The context itself
    /// releases the device when dropped.
    ///
    /// # Safety
    /// The device must be idle.
    pub(crate) unsafe fn cleanup(&mut self) {
        if let Err(e) = unsafe { self.memory.destroy(&self.gpu) } {
            tracing::error!("Failed to free graphics memory: {e}");
        }

        let device = self.gpu.device();
        unsafe {
            self.frames.destroy(device);
            self.framebuffers.destroy(device);
            self.render_pass.destroy(device);
            self.swapchain.destroy(device, &self.surface.swapchain_loader);
            self.surface.destroy();
        }
    }
}
