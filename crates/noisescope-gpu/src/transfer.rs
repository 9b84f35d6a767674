//! Moving host data into GPU memory.
//!
//! [`GraphicsMemory`] owns the host-visible and device-local stacks together
//! with a staging array carved from the host stack. Host arrays are written
//! straight through the mapping; device arrays and images go through staging
//! and a synchronous copy on the graphics queue.

use crate::command::{CommandPool, TempCommands};
use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::memory::GpuImage;
use crate::stack::{GpuArray, MemoryStack, StackDesc, Visibility};
use ash::vk;
use bytemuck::Pod;
use std::ops::Range;
use std::sync::Arc;

const MIB: u64 = 1024 * 1024;

/// Sizes of the harness memory stacks and shared mesh arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Host-visible stack size in bytes.
    pub host_stack_size: u64,
    /// Device-local stack size in bytes.
    pub device_stack_size: u64,
    /// Staging array size in bytes, taken from the host stack.
    pub staging_size: u32,
    /// Capacity of the shared vertex array.
    pub mesh_vertex_capacity: u32,
    /// Capacity of the shared index array.
    pub mesh_index_capacity: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            host_stack_size: 256 * MIB,
            device_stack_size: 512 * MIB,
            staging_size: (128 * MIB) as u32,
            mesh_vertex_capacity: 1024,
            mesh_index_capacity: 4096,
        }
    }
}

/// Access masks and pipeline stages for a supported layout transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionMasks {
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
}

/// Barrier masks for moving an image from `old` to `new`.
///
/// Only the transitions the harness performs are known; anything else is an
/// [`GpuError::InvalidState`].
pub fn transition_masks(old: vk::ImageLayout, new: vk::ImageLayout) -> Result<TransitionMasks> {
    use vk::ImageLayout as L;

    let masks = match (old, new) {
        (L::UNDEFINED, L::TRANSFER_DST_OPTIMAL) => TransitionMasks {
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::TRANSFER_WRITE,
            src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags::TRANSFER,
        },
        (L::TRANSFER_DST_OPTIMAL, L::SHADER_READ_ONLY_OPTIMAL) => TransitionMasks {
            src_access: vk::AccessFlags::TRANSFER_WRITE,
            dst_access: vk::AccessFlags::SHADER_READ,
            src_stage: vk::PipelineStageFlags::TRANSFER,
            dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
        },
        (L::UNDEFINED, L::SHADER_READ_ONLY_OPTIMAL) => TransitionMasks {
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::SHADER_READ,
            src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
        },
        _ => {
            return Err(GpuError::InvalidState(format!(
                "unsupported layout transition {old:?} -> {new:?}"
            )))
        }
    };

    Ok(masks)
}

unsafe fn record_image_barrier(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    old: vk::ImageLayout,
    new: vk::ImageLayout,
) -> Result<()> {
    let masks = transition_masks(old, new)?;

    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old)
        .new_layout(new)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .level_count(1)
                .layer_count(1),
        )
        .src_access_mask(masks.src_access)
        .dst_access_mask(masks.dst_access);

    unsafe {
        device.cmd_pipeline_barrier(
            cmd,
            masks.src_stage,
            masks.dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }

    Ok(())
}

fn element_count(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| GpuError::InvalidState(format!("{len} elements do not fit a GPU array")))
}

/// Bytes per texel of the colour formats images are uploaded in.
pub fn texel_size(format: vk::Format) -> Result<u64> {
    match format {
        vk::Format::R8G8B8A8_UNORM
        | vk::Format::R8G8B8A8_SRGB
        | vk::Format::B8G8R8A8_UNORM
        | vk::Format::B8G8R8A8_SRGB => Ok(4),
        other => Err(GpuError::InvalidState(format!(
            "no upload path for image format {other:?}"
        ))),
    }
}

/// Check that `byte_len` bytes exactly cover an image of `extent`.
pub fn check_image_bytes(extent: vk::Extent3D, texel_size: u64, byte_len: usize) -> Result<()> {
    let expected = u64::from(extent.width)
        * u64::from(extent.height)
        * u64::from(extent.depth.max(1))
        * texel_size;
    if byte_len as u64 != expected {
        return Err(GpuError::InvalidState(format!(
            "image of {}x{}x{} needs {expected} bytes, got {byte_len}",
            extent.width, extent.height, extent.depth
        )));
    }
    Ok(())
}

/// The harness's GPU memory: two stacks, staging, and the transfer commands.
pub struct GraphicsMemory {
    device: Arc<ash::Device>,
    host: MemoryStack,
    local: MemoryStack,
    staging: GpuArray<u8>,
    pool: CommandPool,
    temp: TempCommands,
    config: MemoryConfig,
}

impl GraphicsMemory {
    /// Create both stacks, the staging array and the temp command buffer.
    pub fn new(ctx: &GpuContext, config: MemoryConfig) -> Result<Self> {
        let mut host = MemoryStack::create(
            ctx,
            &StackDesc {
                name: "host stack",
                size: config.host_stack_size,
                usage: vk::BufferUsageFlags::UNIFORM_BUFFER | vk::BufferUsageFlags::TRANSFER_SRC,
                visibility: Visibility::Host,
            },
        )?;

        let local = MemoryStack::create(
            ctx,
            &StackDesc {
                name: "device stack",
                size: config.device_stack_size,
                usage: vk::BufferUsageFlags::UNIFORM_BUFFER
                    | vk::BufferUsageFlags::VERTEX_BUFFER
                    | vk::BufferUsageFlags::INDEX_BUFFER
                    | vk::BufferUsageFlags::TRANSFER_DST,
                visibility: Visibility::Device,
            },
        )?;

        let staging = host.create_array::<u8>(config.staging_size, 1)?;

        let device = ctx.device.clone();
        let pool = unsafe { CommandPool::new(&device, ctx.queue_families().graphics)? };
        let temp = unsafe { TempCommands::new(&device, &pool, ctx.graphics_queue())? };

        Ok(Self {
            device,
            host,
            local,
            staging,
            pool,
            temp,
            config,
        })
    }

    /// The configuration the stacks were created with.
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Reserve an array on the host-visible stack.
    pub fn create_host_array<T: Pod>(&mut self, capacity: u32, align: u64) -> Result<GpuArray<T>> {
        self.host.create_array(capacity, align)
    }

    /// Reserve an array on the device-local stack.
    pub fn create_device_array<T: Pod>(
        &mut self,
        capacity: u32,
        align: u64,
    ) -> Result<GpuArray<T>> {
        self.local.create_array(capacity, align)
    }

    pub fn host_stack(&self) -> &MemoryStack {
        &self.host
    }

    pub fn device_stack(&self) -> &MemoryStack {
        &self.local
    }

    /// The reusable transfer command buffer.
    pub fn temp_commands(&self) -> &TempCommands {
        &self.temp
    }

    /// Append `data` to `array`, returning the index of its first element.
    ///
    /// Device arrays are filled through staging; the copy has completed by
    /// the time this returns. The count only advances once the data has been
    /// written, so any failure leaves the array untouched.
    pub fn push<T: Pod>(&mut self, array: &mut GpuArray<T>, data: &[T]) -> Result<u32> {
        let pushed = element_count(data.len())?;
        if pushed == 0 {
            return Ok(array.count());
        }
        array.check_push(pushed)?;

        let bytes: &[u8] = bytemuck::cast_slice(data);
        let start = array.count();

        match array.region().visibility {
            Visibility::Host => {
                self.host
                    .buffer()
                    .write_bytes(array.byte_offset(start), bytes)?;
            }
            Visibility::Device => {
                self.staging.clear();
                let staged = self.staging.reserve(element_count(bytes.len())?)?;

                self.host
                    .buffer()
                    .write_bytes(self.staging.byte_offset(staged), bytes)?;

                let region = vk::BufferCopy::default()
                    .src_offset(self.staging.byte_offset(staged))
                    .dst_offset(array.byte_offset(start))
                    .size(bytes.len() as u64);
                let src = self.staging.region().buffer;
                let dst = array.region().buffer;
                let device = &self.device;

                unsafe {
                    self.temp.record(device, |cmd| {
                        device.cmd_copy_buffer(cmd, src, dst, &[region]);
                        Ok(())
                    })?;
                }

                tracing::debug!("Uploaded {} bytes to device offset {}", bytes.len(), region.dst_offset);
            }
        }

        array.reserve(pushed)
    }

    /// Upload tightly packed `pixels` covering all of `image`.
    ///
    /// The image ends in `SHADER_READ_ONLY_OPTIMAL`, visible to fragment
    /// shaders.
    pub fn copy_to_image<T: Pod>(&mut self, image: &GpuImage, pixels: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(pixels);
        check_image_bytes(image.extent, texel_size(image.format)?, bytes.len())?;

        self.staging.clear();
        let staged = self.staging.reserve(element_count(bytes.len())?)?;
        self.host
            .buffer()
            .write_bytes(self.staging.byte_offset(staged), bytes)?;

        let copy = vk::BufferImageCopy::default()
            .buffer_offset(self.staging.byte_offset(staged))
            .image_subresource(
                vk::ImageSubresourceLayers::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .layer_count(1),
            )
            .image_extent(image.extent);
        let src = self.staging.region().buffer;
        let target = image.image;
        let device = &self.device;

        // Starting from TOP_OF_PIPE is only sound because temp submissions
        // wait for the queue to idle, so earlier sampling has finished.
        unsafe {
            self.temp.record(device, |cmd| {
                record_image_barrier(
                    device,
                    cmd,
                    target,
                    vk::ImageLayout::UNDEFINED,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                )?;
                device.cmd_copy_buffer_to_image(
                    cmd,
                    src,
                    target,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[copy],
                );
                record_image_barrier(
                    device,
                    cmd,
                    target,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                )
            })
        }
    }

    /// Move `image` between layouts in a one-off submission.
    pub fn transition_image(
        &self,
        image: vk::Image,
        old: vk::ImageLayout,
        new: vk::ImageLayout,
    ) -> Result<()> {
        let device = &self.device;
        unsafe {
            self.temp
                .record(device, |cmd| record_image_barrier(device, cmd, image, old, new))
        }
    }

    /// Read elements `range` of a host array back.
    pub fn read<T: Pod>(&self, array: &GpuArray<T>, range: Range<u32>) -> Result<Vec<T>> {
        if array.region().visibility != Visibility::Host {
            return Err(GpuError::InvalidState(
                "only host arrays can be read back".to_string(),
            ));
        }
        if range.start > range.end || range.end > array.count() {
            return Err(GpuError::InvalidState(format!(
                "read range {range:?} outside pushed elements 0..{}",
                array.count()
            )));
        }

        let mut out = vec![T::zeroed(); (range.end - range.start) as usize];
        self.host.buffer().read_bytes(
            array.byte_offset(range.start),
            bytemuck::cast_slice_mut(&mut out),
        )?;
        Ok(out)
    }

    /// Release the stacks and the command pool.
    ///
    /// # Safety
    /// No submitted work may still reference this memory.
    pub unsafe fn destroy(&mut self, ctx: &GpuContext) -> Result<()> {
        unsafe { self.pool.destroy(&self.device) };
        self.local.destroy(ctx)?;
        self.host.destroy(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GpuContextBuilder;
    use crate::texture::Texture;

    #[test]
    fn default_config_matches_harness_sizes() {
        let config = MemoryConfig::default();
        assert_eq!(config.host_stack_size, 256 * MIB);
        assert_eq!(config.device_stack_size, 512 * MIB);
        assert_eq!(u64::from(config.staging_size), 128 * MIB);
        assert!(u64::from(config.staging_size) < config.host_stack_size);
    }

    #[test]
    fn upload_transitions_are_known() {
        let to_dst = transition_masks(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )
        .unwrap();
        assert_eq!(to_dst.src_access, vk::AccessFlags::empty());
        assert_eq!(to_dst.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(to_dst.dst_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(to_dst.dst_stage, vk::PipelineStageFlags::TRANSFER);

        let to_read = transition_masks(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
        .unwrap();
        assert_eq!(to_read.src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(to_read.dst_access, vk::AccessFlags::SHADER_READ);
        assert_eq!(to_read.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }

    #[test]
    fn unknown_transition_is_rejected() {
        assert!(transition_masks(
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::ImageLayout::UNDEFINED,
        )
        .is_err());
    }

    #[test]
    fn image_bytes_must_cover_the_extent() {
        let extent = vk::Extent3D {
            width: 16,
            height: 9,
            depth: 1,
        };
        let texel = texel_size(vk::Format::R8G8B8A8_UNORM).unwrap();
        assert_eq!(texel, 4);

        check_image_bytes(extent, texel, 16 * 9 * 4).unwrap();
        assert!(matches!(
            check_image_bytes(extent, texel, 16 * 9 * 4 - 4),
            Err(GpuError::InvalidState(_))
        ));
        assert!(check_image_bytes(extent, texel, 16 * 9 * 4 + 1).is_err());
        assert!(texel_size(vk::Format::D32_SFLOAT).is_err());
    }

    fn small_config() -> MemoryConfig {
        MemoryConfig {
            host_stack_size: 4 * MIB,
            device_stack_size: 4 * MIB,
            staging_size: MIB as u32,
            ..MemoryConfig::default()
        }
    }

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn host_round_trip() {
        let gpu = GpuContextBuilder::new().validation(false).build().unwrap();
        let mut memory = GraphicsMemory::new(&gpu, small_config()).unwrap();

        let mut array = memory.create_host_array::<u32>(16, 16).unwrap();
        let data = [7_u32, 11, 13, 17, 19];
        assert_eq!(memory.push(&mut array, &data).unwrap(), 0);
        assert_eq!(memory.push(&mut array, &data[..2]).unwrap(), 5);

        assert_eq!(memory.read(&array, 0..5).unwrap(), data);
        assert_eq!(memory.read(&array, 5..7).unwrap(), [7, 11]);
        assert!(memory.read(&array, 0..8).is_err());

        unsafe { memory.destroy(&gpu).unwrap() };
    }

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn device_push_overflow_leaves_array_untouched() {
        let gpu = GpuContextBuilder::new().validation(false).build().unwrap();
        let mut memory = GraphicsMemory::new(&gpu, small_config()).unwrap();

        let mut array = memory.create_device_array::<f32>(4, 16).unwrap();
        assert_eq!(memory.push(&mut array, &[1.0, 2.0, 3.0]).unwrap(), 0);
        assert!(memory.push(&mut array, &[4.0, 5.0]).is_err());
        assert_eq!(array.count(), 3);
        assert!(memory.read(&array, 0..1).is_err());

        unsafe { memory.destroy(&gpu).unwrap() };
    }

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn failed_staging_leaves_device_array_untouched() {
        let gpu = GpuContextBuilder::new().validation(false).build().unwrap();
        let mut memory = GraphicsMemory::new(&gpu, small_config()).unwrap();

        // Fits the array but not the 1 MiB staging area.
        let mut array = memory.create_device_array::<u32>(512 * 1024, 16).unwrap();
        let data = vec![3_u32; 300 * 1024];
        assert!(memory.push(&mut array, &data).is_err());
        assert_eq!(array.count(), 0);

        assert_eq!(memory.push(&mut array, &data[..1024]).unwrap(), 0);
        assert_eq!(array.count(), 1024);

        unsafe { memory.destroy(&gpu).unwrap() };
    }

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn image_upload_checks_pixel_count() {
        let gpu = GpuContextBuilder::new().validation(false).build().unwrap();
        let mut memory = GraphicsMemory::new(&gpu, small_config()).unwrap();

        let mut texture = Texture::create(&gpu, &memory, 8, 4, "upload test").unwrap();

        let pixels = vec![0xFF00_FF00_u32; 8 * 4];
        memory.copy_to_image(&texture.image, &pixels).unwrap();
        assert!(memory.copy_to_image(&texture.image, &pixels[..31]).is_err());

        unsafe {
            texture.destroy(&gpu).unwrap();
            memory.destroy(&gpu).unwrap();
        }
    }

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn failed_recording_is_still_submitted() {
        let gpu = GpuContextBuilder::new().validation(false).build().unwrap();
        let mut memory = GraphicsMemory::new(&gpu, small_config()).unwrap();
        let device = gpu.device();

        let err = unsafe {
            memory.temp_commands().record(device, |_| -> Result<()> {
                Err(GpuError::InvalidState("recording failed".to_string()))
            })
        }
        .unwrap_err();
        assert!(matches!(err, GpuError::InvalidState(_)));

        // The buffer is back in the initial state and usable again.
        let value = unsafe { memory.temp_commands().record(device, |_| Ok(7)) }.unwrap();
        assert_eq!(value, 7);

        unsafe { memory.destroy(&gpu).unwrap() };
    }
}
