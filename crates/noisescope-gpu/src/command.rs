//! Command pools, queue submission and the one-shot transfer command buffer.

use crate::error::Result;
use ash::vk;

/// Command pool for allocating command buffers.
pub struct CommandPool {
    pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a pool whose buffers can be reset individually.
    ///
    /// # Safety
    /// The device must be valid and the queue family must exist.
    pub unsafe fn new(device: &ash::Device, queue_family: u32) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let pool = unsafe { device.create_command_pool(&create_info, None)? };

        Ok(Self { pool })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Allocate `count` primary command buffers.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn allocate_primary(
        &self,
        device: &ash::Device,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        Ok(unsafe { device.allocate_command_buffers(&alloc_info)? })
    }

    /// Destroy the command pool and every buffer allocated from it.
    ///
    /// # Safety
    /// The device must be valid and the pool must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe { device.destroy_command_pool(self.pool, None) };
    }
}

/// Submit command buffers to a queue.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn submit_command_buffers(
    device: &ash::Device,
    queue: vk::Queue,
    command_buffers: &[vk::CommandBuffer],
    wait_semaphores: &[vk::Semaphore],
    wait_stages: &[vk::PipelineStageFlags],
    signal_semaphores: &[vk::Semaphore],
    fence: vk::Fence,
) -> Result<()> {
    let submit_info = vk::SubmitInfo::default()
        .command_buffers(command_buffers)
        .wait_semaphores(wait_semaphores)
        .wait_dst_stage_mask(wait_stages)
        .signal_semaphores(signal_semaphores);

    unsafe { device.queue_submit(queue, &[submit_info], fence)? };
    Ok(())
}

/// A reusable, synchronously executed command buffer for transfers and
/// layout transitions.
///
/// Every [`record`](Self::record) call ends with the buffer submitted and the
/// queue idle, whatever the recording closure returns.
pub struct TempCommands {
    command_buffer: vk::CommandBuffer,
    queue: vk::Queue,
}

impl TempCommands {
    /// Allocate the buffer from `pool`; work is submitted to `queue`.
    ///
    /// # Safety
    /// The device, pool and queue must be valid and belong together.
    pub unsafe fn new(device: &ash::Device, pool: &CommandPool, queue: vk::Queue) -> Result<Self> {
        let buffers = unsafe { pool.allocate_primary(device, 1)? };
        Ok(Self {
            command_buffer: buffers[0],
            queue,
        })
    }

    /// Record commands with `f`, then submit and wait for the queue to idle.
    ///
    /// If `f` fails, whatever it recorded is still submitted and waited on
    /// before its error is returned, so the buffer never stays in the
    /// recording state.
    ///
    /// # Safety
    /// The device must be the one the buffer was allocated from, and commands
    /// recorded by `f` must reference live resources.
    pub unsafe fn record<T, F>(&self, device: &ash::Device, f: F) -> Result<T>
    where
        F: FnOnce(vk::CommandBuffer) -> Result<T>,
    {
        let cmd = self.command_buffer;
        unsafe {
            device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device.begin_command_buffer(cmd, &begin_info)?;
        }

        let recorded = f(cmd);

        let submitted = unsafe { self.submit_and_wait(device) };
        match (recorded, submitted) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
        }
    }

    unsafe fn submit_and_wait(&self, device: &ash::Device) -> Result<()> {
        let cmd = self.command_buffer;
        unsafe {
            device.end_command_buffer(cmd)?;
            submit_command_buffers(device, self.queue, &[cmd], &[], &[], &[], vk::Fence::null())?;
            device.queue_wait_idle(self.queue)?;
        }
        Ok(())
    }

    /// The underlying command buffer.
    pub fn handle(&self) -> vk::CommandBuffer {
        self.command_buffer
    }
}
