//! Raw buffer and image allocation through `gpu-allocator`.
//!
//! Everything the harness places in GPU memory goes through [`GpuAllocator`]:
//! the two backing buffers of the memory stacks and the display texture.

use crate::error::{GpuError, Result};
use ash::vk;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

/// GPU memory allocator wrapper.
pub struct GpuAllocator {
    allocator: Option<Allocator>,
    device: Arc<ash::Device>,
}

impl GpuAllocator {
    /// Create a new allocator.
    ///
    /// # Safety
    /// The instance, device, and physical device must be valid.
    pub unsafe fn new(
        instance: &ash::Instance,
        device: Arc<ash::Device>,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Self> {
        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: (*device).clone(),
            physical_device,
            debug_settings: gpu_allocator::AllocatorDebugSettings {
                log_memory_information: cfg!(debug_assertions),
                log_leaks_on_shutdown: true,
                ..Default::default()
            },
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| GpuError::AllocationFailed(e.to_string()))?;

        Ok(Self {
            allocator: Some(allocator),
            device,
        })
    }

    fn inner(&mut self) -> Result<&mut Allocator> {
        self.allocator
            .as_mut()
            .ok_or_else(|| GpuError::InvalidState("Allocator already shut down".to_string()))
    }

    /// Create a buffer and bind it to fresh memory in `location`.
    ///
    /// The allocation is dedicated so large stack buffers never share a
    /// memory block with anything else.
    pub fn create_buffer(
        &mut self,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        name: &str,
    ) -> Result<GpuBuffer> {
        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { self.device.create_buffer(&buffer_info, None)? };
        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };

        let allocation = match self.inner()?.allocate(&AllocationCreateDesc {
            name,
            requirements,
            location,
            linear: true,
            allocation_scheme: AllocationScheme::DedicatedBuffer(buffer),
        }) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_buffer(buffer, None) };
                return Err(GpuError::AllocationFailed(format!("{name}: {e}")));
            }
        };

        unsafe {
            self.device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())?;
        }

        tracing::debug!("Allocated buffer '{name}' ({size} bytes, {location:?})");

        Ok(GpuBuffer {
            buffer,
            allocation: Some(allocation),
            size,
        })
    }

    /// Free a buffer and its memory.
    pub fn free_buffer(&mut self, buffer: &mut GpuBuffer) -> Result<()> {
        if let Some(allocation) = buffer.allocation.take() {
            self.inner()?
                .free(allocation)
                .map_err(|e| GpuError::AllocationFailed(e.to_string()))?;
        }

        unsafe {
            self.device.destroy_buffer(buffer.buffer, None);
        }
        buffer.buffer = vk::Buffer::null();

        Ok(())
    }

    /// Create an image and bind it to fresh memory in `location`.
    pub fn create_image(
        &mut self,
        create_info: &vk::ImageCreateInfo,
        location: MemoryLocation,
        name: &str,
    ) -> Result<GpuImage> {
        let image = unsafe { self.device.create_image(create_info, None)? };
        let requirements = unsafe { self.device.get_image_memory_requirements(image) };

        let allocation = match self.inner()?.allocate(&AllocationCreateDesc {
            name,
            requirements,
            location,
            linear: false,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        }) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                return Err(GpuError::AllocationFailed(format!("{name}: {e}")));
            }
        };

        unsafe {
            self.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())?;
        }

        Ok(GpuImage {
            image,
            allocation: Some(allocation),
            format: create_info.format,
            extent: create_info.extent,
        })
    }

    /// Free an image and its memory.
    pub fn free_image(&mut self, image: &mut GpuImage) -> Result<()> {
        if let Some(allocation) = image.allocation.take() {
            self.inner()?
                .free(allocation)
                .map_err(|e| GpuError::AllocationFailed(e.to_string()))?;
        }

        unsafe {
            self.device.destroy_image(image.image, None);
        }
        image.image = vk::Image::null();

        Ok(())
    }

    /// Drop the inner allocator, releasing every memory block.
    ///
    /// Must run before the logical device is destroyed.
    pub fn shutdown(&mut self) {
        self.allocator.take();
    }
}

impl Drop for GpuAllocator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A buffer with its allocation.
pub struct GpuBuffer {
    pub buffer: vk::Buffer,
    pub allocation: Option<Allocation>,
    pub size: u64,
}

impl GpuBuffer {
    /// Host pointer to the start of the buffer, if the memory is mapped.
    pub fn mapped_ptr(&self) -> Option<*mut u8> {
        self.allocation
            .as_ref()
            .and_then(Allocation::mapped_ptr)
            .map(|p| p.as_ptr().cast::<u8>())
    }

    fn checked_range(&self, offset: u64, len: usize) -> Result<*mut u8> {
        let ptr = self
            .mapped_ptr()
            .ok_or_else(|| GpuError::InvalidState("Buffer is not host-mapped".to_string()))?;

        let end = offset
            .checked_add(len as u64)
            .ok_or_else(|| GpuError::InvalidState("Offset overflow".to_string()))?;
        if end > self.size {
            return Err(GpuError::InvalidState(format!(
                "range {offset}..{end} exceeds buffer size {}",
                self.size
            )));
        }

        Ok(ptr)
    }

    /// Copy bytes into the mapped buffer at `offset`.
    pub fn write_bytes(&self, offset: u64, data: &[u8]) -> Result<()> {
        let ptr = self.checked_range(offset, data.len())?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.add(offset as usize), data.len());
        }
        Ok(())
    }

    /// Copy bytes out of the mapped buffer at `offset`.
    pub fn read_bytes(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        let ptr = self.checked_range(offset, out.len())?;
        unsafe {
            std::ptr::copy_nonoverlapping(ptr.add(offset as usize), out.as_mut_ptr(), out.len());
        }
        Ok(())
    }
}

/// An image with its allocation.
pub struct GpuImage {
    pub image: vk::Image,
    pub allocation: Option<Allocation>,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
}
