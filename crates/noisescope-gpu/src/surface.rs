//! Window surface and swapchain loader.

use crate::context::GpuContext;
use crate::error::Result;
use crate::swapchain::{calculate_extent, select_present_mode, select_surface_format, Swapchain};
use ash::vk;

/// Surface of the harness window plus the extension loaders that use it.
///
/// Created by [`GpuContextBuilder::build_for_window`](crate::GpuContextBuilder::build_for_window)
/// and destroyed explicitly before the context is dropped.
pub struct SurfaceContext {
    /// The Vulkan surface handle.
    pub surface: vk::SurfaceKHR,
    /// Surface extension loader.
    pub surface_loader: ash::khr::surface::Instance,
    /// Swapchain extension loader.
    pub swapchain_loader: ash::khr::swapchain::Device,
}

impl SurfaceContext {
    pub(crate) fn new(
        surface: vk::SurfaceKHR,
        surface_loader: ash::khr::surface::Instance,
        swapchain_loader: ash::khr::swapchain::Device,
    ) -> Self {
        Self {
            surface,
            surface_loader,
            swapchain_loader,
        }
    }

    /// Query surface capabilities.
    pub fn capabilities(&self, gpu: &GpuContext) -> Result<SurfaceCapabilities> {
        unsafe {
            let capabilities = self
                .surface_loader
                .get_physical_device_surface_capabilities(gpu.physical_device(), self.surface)?;

            let formats = self
                .surface_loader
                .get_physical_device_surface_formats(gpu.physical_device(), self.surface)?;

            let present_modes = self
                .surface_loader
                .get_physical_device_surface_present_modes(gpu.physical_device(), self.surface)?;

            Ok(SurfaceCapabilities {
                capabilities,
                formats,
                present_modes,
            })
        }
    }

    /// Create a swapchain sized for a `width` x `height` window.
    ///
    /// # Safety
    /// The GPU context must be the one this surface was created with.
    pub unsafe fn create_swapchain(
        &self,
        gpu: &GpuContext,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<Swapchain> {
        let caps = self.capabilities(gpu)?;

        let surface_format = select_surface_format(&caps.formats)?;
        let present_mode = select_present_mode(&caps.present_modes, vsync);
        let extent = calculate_extent(&caps.capabilities, width, height);

        let swapchain = unsafe {
            Swapchain::new(
                gpu.device(),
                &self.swapchain_loader,
                self.surface,
                &caps.capabilities,
                surface_format,
                present_mode,
                extent,
                gpu.queue_families(),
            )?
        };

        tracing::info!(
            "Swapchain created: {}x{} ({} images, {:?}, {:?})",
            swapchain.extent.width,
            swapchain.extent.height,
            swapchain.images.len(),
            swapchain.format,
            present_mode,
        );

        Ok(swapchain)
    }

    /// Destroy the surface.
    ///
    /// # Safety
    /// The surface must not be in use and its swapchain must be destroyed.
    pub unsafe fn destroy(&self) {
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

/// Surface capabilities query result.
pub struct SurfaceCapabilities {
    /// Raw surface capabilities.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}
