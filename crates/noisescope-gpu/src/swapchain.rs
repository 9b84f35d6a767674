//! Swapchain creation, acquisition and presentation.
//!
//! The swapchain is created once for the window size at startup. Out-of-date
//! results are not recovered from: the harness window is not resizable, and
//! `ERROR_OUT_OF_DATE_KHR` propagates as a fatal error.

use crate::error::{validate, GpuError, Result};
use crate::instance::QueueFamilies;
use ash::vk;

/// Swapchain wrapper.
pub struct Swapchain {
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a new swapchain.
    ///
    /// # Safety
    /// All handles must be valid.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn new(
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
        surface: vk::SurfaceKHR,
        surface_capabilities: &vk::SurfaceCapabilitiesKHR,
        surface_format: vk::SurfaceFormatKHR,
        present_mode: vk::PresentModeKHR,
        extent: vk::Extent2D,
        families: QueueFamilies,
    ) -> Result<Self> {
        let image_count = image_count(surface_capabilities);

        let family_indices = [families.graphics, families.present];
        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(surface_capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);

        create_info = if families.graphics == families.present {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        } else {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&family_indices)
        };

        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;

        let images = unsafe { swapchain_loader.get_swapchain_images(swapchain)? };

        let image_views = images
            .iter()
            .map(|&image| {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(surface_format.format)
                    .components(vk::ComponentMapping::default())
                    .subresource_range(
                        vk::ImageSubresourceRange::default()
                            .aspect_mask(vk::ImageAspectFlags::COLOR)
                            .level_count(1)
                            .layer_count(1),
                    );

                unsafe { device.create_image_view(&view_info, None) }
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            swapchain,
            images,
            image_views,
            format: surface_format.format,
            extent,
        })
    }

    /// Number of presentable images.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Acquire the next image, signalling `semaphore` when it is ready.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn acquire_next_image(
        &self,
        swapchain_loader: &ash::khr::swapchain::Device,
        semaphore: vk::Semaphore,
        timeout_ns: u64,
    ) -> Result<u32> {
        let acquired = unsafe {
            swapchain_loader.acquire_next_image(
                self.swapchain,
                timeout_ns,
                semaphore,
                vk::Fence::null(),
            )
        };
        acquired_image(acquired)
    }

    /// Present `image_index` once `wait_semaphores` are signalled.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn present(
        &self,
        swapchain_loader: &ash::khr::swapchain::Device,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphores: &[vk::Semaphore],
    ) -> Result<()> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let presented = unsafe { swapchain_loader.queue_present(queue, &present_info) };
        presented_status(presented)
    }

    /// Destroy the swapchain and its image views.
    ///
    /// # Safety
    /// All handles must be valid and swapchain must not be in use.
    pub unsafe fn destroy(
        &self,
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
    ) {
        unsafe {
            for &view in &self.image_views {
                device.destroy_image_view(view, None);
            }
            swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

/// One more than the surface minimum, clamped to its maximum (0 = unbounded).
pub fn image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Prefer `B8G8R8A8_UNORM` with the sRGB non-linear colour space.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> Result<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|format| {
            format.format == vk::Format::B8G8R8A8_UNORM
                && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| available.first())
        .copied()
        .ok_or_else(|| GpuError::SwapchainCreation("surface reports no formats".to_string()))
}

/// FIFO with vsync; otherwise mailbox when available, else FIFO.
pub fn select_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if !vsync && available.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Use the surface's current extent, or clamp the window size when the
/// surface leaves it to the application.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

const fn flagged_status(suboptimal: bool) -> vk::Result {
    if suboptimal {
        vk::Result::SUBOPTIMAL_KHR
    } else {
        vk::Result::SUCCESS
    }
}

/// Image index of an acquire call, with its status run through [`validate`].
///
/// Timeouts and `NOT_READY` pass validation but leave no image, so they are
/// still returned as errors.
fn acquired_image(acquired: std::result::Result<(u32, bool), vk::Result>) -> Result<u32> {
    match acquired {
        Ok((index, suboptimal)) => {
            validate(flagged_status(suboptimal))?;
            Ok(index)
        }
        Err(status) => {
            validate(status)?;
            Err(GpuError::Vulkan(status))
        }
    }
}

/// Status of a present call run through [`validate`].
fn presented_status(presented: std::result::Result<bool, vk::Result>) -> Result<()> {
    match presented {
        Ok(suboptimal) => validate(flagged_status(suboptimal)),
        Err(status) => validate(status),
    }
}
