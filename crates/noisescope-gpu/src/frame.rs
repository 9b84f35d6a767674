//! Frames in flight: slot rotation, acquisition, recording and presentation.
//!
//! Each frame slot owns its semaphores and fence ([`FrameSync`]); draw command
//! buffers belong to swapchain images. A frame goes through
//! [`FrameLoop::next_frame`], [`FrameLoop::begin_render_cmds`],
//! [`FrameLoop::end_render_cmds`] and [`FrameLoop::submit_render_cmds`] in
//! that order.

use crate::command::{submit_command_buffers, CommandPool};
use crate::error::{GpuError, Result};
use crate::render_pass::{Framebuffers, RenderPass};
use crate::swapchain::Swapchain;
use crate::sync::{wait_for_fence, FrameSync};
use ash::vk;

/// Round-robin index over `count` frame slots.
///
/// A new ring sits before slot 0, so the first [`next`](Self::next) returns 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRing {
    count: usize,
    current: Option<usize>,
}

impl FrameRing {
    /// A ring over `count` slots (at least one).
    pub const fn new(count: usize) -> Self {
        Self {
            count: if count == 0 { 1 } else { count },
            current: None,
        }
    }

    /// Advance to the next slot and return it.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> usize {
        let slot = match self.current {
            Some(current) => (current + 1) % self.count,
            None => 0,
        };
        self.current = Some(slot);
        slot
    }

    /// The slot returned by the last [`next`](Self::next), if any.
    pub const fn current(&self) -> Option<usize> {
        self.current
    }

    pub const fn count(&self) -> usize {
        self.count
    }
}

/// Per-frame synchronisation and the draw command buffers.
pub struct FrameLoop {
    ring: FrameRing,
    slots: Vec<FrameSync>,
    pool: CommandPool,
    command_buffers: Vec<vk::CommandBuffer>,
    image_fences: Vec<vk::Fence>,
    slot: usize,
    image_index: u32,
}

impl FrameLoop {
    /// Create `frames_in_flight` slots and one command buffer per swapchain
    /// image.
    ///
    /// # Safety
    /// The device must be valid and `queue_family` must be its graphics family.
    pub unsafe fn new(
        device: &ash::Device,
        queue_family: u32,
        frames_in_flight: usize,
        image_count: usize,
    ) -> Result<Self> {
        let ring = FrameRing::new(frames_in_flight);
        let slots = (0..ring.count())
            .map(|_| unsafe { FrameSync::new(device) })
            .collect::<Result<Vec<_>>>()?;

        let pool = unsafe { CommandPool::new(device, queue_family)? };
        let buffer_count = u32::try_from(image_count)
            .map_err(|_| GpuError::InvalidState(format!("{image_count} swapchain images")))?;
        let command_buffers = unsafe { pool.allocate_primary(device, buffer_count)? };

        tracing::info!(
            "Frame loop: {} frames in flight, {} command buffers",
            ring.count(),
            command_buffers.len()
        );

        Ok(Self {
            ring,
            slots,
            pool,
            command_buffers,
            image_fences: vec![vk::Fence::null(); image_count],
            slot: 0,
            image_index: 0,
        })
    }

    /// Wait for the next slot, then acquire a swapchain image for it.
    ///
    /// Returns the swapchain image index.
    ///
    /// # Safety
    /// The device, swapchain and loader must be valid.
    pub unsafe fn next_frame(
        &mut self,
        device: &ash::Device,
        swapchain: &Swapchain,
        swapchain_loader: &ash::khr::swapchain::Device,
    ) -> Result<u32> {
        self.slot = self.ring.next();
        let sync = &self.slots[self.slot];

        unsafe {
            sync.wait(device)?;
            sync.reset(device)?;
        }

        let image_index =
            unsafe { swapchain.acquire_next_image(swapchain_loader, sync.image_acquired, u64::MAX)? };

        // Another slot may still be drawing into this image.
        let index = image_index as usize;
        if let Some(&fence) = self.image_fences.get(index) {
            if fence != vk::Fence::null() && fence != sync.in_flight {
                unsafe { wait_for_fence(device, fence, u64::MAX)? };
            }
        }
        if let Some(entry) = self.image_fences.get_mut(index) {
            *entry = sync.in_flight;
        }

        self.image_index = image_index;
        Ok(image_index)
    }

    /// Slot of the current frame.
    pub const fn slot(&self) -> usize {
        self.slot
    }

    /// Swapchain image of the current frame.
    pub const fn image_index(&self) -> u32 {
        self.image_index
    }

    /// Command buffer of the current swapchain image.
    pub fn command_buffer(&self) -> Result<vk::CommandBuffer> {
        self.command_buffers
            .get(self.image_index as usize)
            .copied()
            .ok_or_else(|| {
                GpuError::InvalidState(format!(
                    "no command buffer for swapchain image {}",
                    self.image_index
                ))
            })
    }

    /// Reset and begin the current image's command buffer and start
    /// `render_pass` on its framebuffer.
    ///
    /// # Safety
    /// The device, render pass and framebuffers must be valid, and
    /// [`next_frame`](Self::next_frame) must have been called.
    pub unsafe fn begin_render_cmds(
        &self,
        device: &ash::Device,
        render_pass: &RenderPass,
        framebuffers: &Framebuffers,
        extent: vk::Extent2D,
    ) -> Result<vk::CommandBuffer> {
        let cmd = self.command_buffer()?;
        let framebuffer = framebuffers.get(self.image_index).ok_or_else(|| {
            GpuError::InvalidState(format!(
                "no framebuffer for swapchain image {}",
                self.image_index
            ))
        })?;

        unsafe {
            device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device.begin_command_buffer(cmd, &begin_info)?;

            let pass_info = render_pass.begin_info(framebuffer, extent);
            device.cmd_begin_render_pass(cmd, &pass_info, vk::SubpassContents::INLINE);
        }

        Ok(cmd)
    }

    /// End the render pass and the command buffer.
    ///
    /// # Safety
    /// [`begin_render_cmds`](Self::begin_render_cmds) must have been called.
    pub unsafe fn end_render_cmds(&self, device: &ash::Device) -> Result<()> {
        let cmd = self.command_buffer()?;
        unsafe {
            device.cmd_end_render_pass(cmd);
            device.end_command_buffer(cmd)?;
        }
        Ok(())
    }

    /// Submit the recorded commands and present the image.
    ///
    /// The submission waits for the image at colour-attachment output and
    /// signals the slot's fence; presentation waits for rendering to finish.
    ///
    /// # Safety
    /// All handles must be valid and the commands fully recorded.
    pub unsafe fn submit_render_cmds(
        &self,
        device: &ash::Device,
        graphics_queue: vk::Queue,
        present_queue: vk::Queue,
        swapchain: &Swapchain,
        swapchain_loader: &ash::khr::swapchain::Device,
    ) -> Result<()> {
        let cmd = self.command_buffer()?;
        let sync = &self.slots[self.slot];

        unsafe {
            submit_command_buffers(
                device,
                graphics_queue,
                &[cmd],
                &[sync.image_acquired],
                &[vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT],
                &[sync.render_finished],
                sync.in_flight,
            )?;

            swapchain.present(
                swapchain_loader,
                present_queue,
                self.image_index,
                &[sync.render_finished],
            )
        }
    }

    /// Destroy the slots and the command pool.
    ///
    /// # Safety
    /// The device must be idle.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            for sync in &self.slots {
                sync.destroy(device);
            }
            self.pool.destroy(device);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_starts_at_zero_and_wraps() {
        let mut ring = FrameRing::new(2);
        assert_eq!(ring.current(), None);
        assert_eq!(ring.next(), 0);
        assert_eq!(ring.next(), 1);
        assert_eq!(ring.next(), 0);
    }

    #[test]
    fn ring_returns_to_slot_zero_after_n_calls() {
        for n in 1..=5 {
            let mut ring = FrameRing::new(n);
            let first = ring.next();
            for _ in 0..n - 1 {
                ring.next();
            }
            assert_eq!(ring.next(), first);
        }
    }

    #[test]
    fn zero_slot_ring_behaves_as_one() {
        let mut ring = FrameRing::new(0);
        assert_eq!(ring.count(), 1);
        assert_eq!(ring.next(), 0);
        assert_eq!(ring.next(), 0);
    }
}
