//! Synchronization primitives and frame slots.

use crate::error::Result;
use ash::vk;

/// Create a semaphore.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    Ok(unsafe { device.create_semaphore(&create_info, None)? })
}

/// Create a fence, optionally already signalled.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };

    let create_info = vk::FenceCreateInfo::default().flags(flags);
    Ok(unsafe { device.create_fence(&create_info, None)? })
}

/// Wait for a fence to be signaled.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn wait_for_fence(
    device: &ash::Device,
    fence: vk::Fence,
    timeout_ns: u64,
) -> Result<()> {
    unsafe { device.wait_for_fences(&[fence], true, timeout_ns)? };
    Ok(())
}

/// Reset a fence to unsignaled state.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn reset_fence(device: &ash::Device, fence: vk::Fence) -> Result<()> {
    unsafe { device.reset_fences(&[fence])? };
    Ok(())
}

/// One frame slot: the semaphores and fence guarding a frame in flight.
///
/// The fence starts signalled so the first wait on a fresh slot returns
/// immediately.
pub struct FrameSync {
    /// Signalled when the acquired swapchain image is ready.
    pub image_acquired: vk::Semaphore,
    /// Signalled when the slot's rendering is complete.
    pub render_finished: vk::Semaphore,
    /// Signalled when the slot's submission has retired.
    pub in_flight: vk::Fence,
}

impl FrameSync {
    /// Create the slot's primitives.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device) -> Result<Self> {
        unsafe {
            Ok(Self {
                image_acquired: create_semaphore(device)?,
                render_finished: create_semaphore(device)?,
                in_flight: create_fence(device, true)?,
            })
        }
    }

    /// Block until the slot is no longer in flight.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn wait(&self, device: &ash::Device) -> Result<()> {
        unsafe { wait_for_fence(device, self.in_flight, u64::MAX) }
    }

    /// Mark the slot as about to be in flight again.
    ///
    /// # Safety
    /// The device must be valid and the fence signalled.
    pub unsafe fn reset(&self, device: &ash::Device) -> Result<()> {
        unsafe { reset_fence(device, self.in_flight) }
    }

    /// Destroy synchronization resources.
    ///
    /// # Safety
    /// The device must be valid and resources must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_semaphore(self.image_acquired, None);
            device.destroy_semaphore(self.render_finished, None);
            device.destroy_fence(self.in_flight, None);
        }
    }
}
