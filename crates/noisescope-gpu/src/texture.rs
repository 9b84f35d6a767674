//! Sampled 2D textures.

use crate::context::GpuContext;
use crate::error::Result;
use crate::memory::GpuImage;
use crate::transfer::GraphicsMemory;
use ash::vk;
use gpu_allocator::MemoryLocation;

/// Texel format of harness textures.
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// A device-local image sampled by fragment shaders.
///
/// The image is kept in `SHADER_READ_ONLY_OPTIMAL` between uploads.
pub struct Texture {
    pub image: GpuImage,
    pub view: vk::ImageView,
    pub sampler: vk::Sampler,
}

impl Texture {
    /// Create a `width` x `height` texture and make it shader-readable.
    pub fn create(
        ctx: &GpuContext,
        memory: &GraphicsMemory,
        width: u32,
        height: u32,
        name: &str,
    ) -> Result<Self> {
        let create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(TEXTURE_FORMAT)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = ctx
            .allocator()
            .lock()
            .create_image(&create_info, MemoryLocation::GpuOnly, name)?;

        let device = ctx.device();
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(TEXTURE_FORMAT)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .level_count(1)
                    .layer_count(1),
            );
        let view = unsafe { device.create_image_view(&view_info, None)? };

        let sampler_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::NEAREST)
            .min_filter(vk::Filter::NEAREST)
            .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .max_lod(1.0)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK);
        let sampler = unsafe { device.create_sampler(&sampler_info, None)? };

        memory.transition_image(
            image.image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )?;

        tracing::debug!("Created texture '{name}' ({width}x{height})");

        Ok(Self {
            image,
            view,
            sampler,
        })
    }

    /// Image info for a combined image sampler write.
    pub fn descriptor_info(&self) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo {
            sampler: self.sampler,
            image_view: self.view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }
    }

    /// Release the sampler, view and image.
    ///
    /// # Safety
    /// The texture must not be in use.
    pub unsafe fn destroy(&mut self, ctx: &GpuContext) -> Result<()> {
        unsafe {
            ctx.device().destroy_sampler(self.sampler, None);
            ctx.device().destroy_image_view(self.view, None);
        }
        ctx.allocator().lock().free_image(&mut self.image)
    }
}
