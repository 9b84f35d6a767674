//! GPU context: instance, selected device, queues and allocator.

use crate::capabilities::GpuCapabilities;
use crate::error::{GpuError, Result};
use crate::instance::{
    create_instance, select_physical_device, take_validation_errors, DebugMessenger,
    PresentTarget, QueueFamilies, RequiredFeatures,
};
use crate::memory::GpuAllocator;
use crate::surface::SurfaceContext;
use ash::vk;
use parking_lot::Mutex;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

/// Main GPU context holding Vulkan resources.
pub struct GpuContext {
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    debug_messenger: Option<DebugMessenger>,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: Arc<ash::Device>,
    pub(crate) capabilities: GpuCapabilities,
    pub(crate) allocator: Mutex<GpuAllocator>,
    pub(crate) queue_families: QueueFamilies,
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) present_queue: vk::Queue,
}

impl GpuContext {
    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the Vulkan entry point.
    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get GPU capabilities.
    pub fn capabilities(&self) -> &GpuCapabilities {
        &self.capabilities
    }

    /// Get the graphics queue.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Get the present queue.
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    /// Get the graphics and present queue family indices.
    pub fn queue_families(&self) -> QueueFamilies {
        self.queue_families
    }

    /// Get access to the GPU allocator.
    pub fn allocator(&self) -> &Mutex<GpuAllocator> {
        &self.allocator
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }

    /// Fail if the validation layer reported errors since the last check.
    pub fn check_validation(&self) -> Result<()> {
        match take_validation_errors() {
            0 => Ok(()),
            count => Err(GpuError::Validation(count)),
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            // The allocator owns VkDeviceMemory and must go before the device.
            self.allocator.lock().shutdown();

            self.device.destroy_device(None);
            if let Some(messenger) = &self.debug_messenger {
                messenger.destroy();
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Builder for creating a GPU context.
pub struct GpuContextBuilder {
    app_name: String,
    enable_validation: bool,
    features: RequiredFeatures,
}

impl Default for GpuContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "noisescope".to_string(),
            enable_validation: cfg!(debug_assertions),
            features: RequiredFeatures::default(),
        }
    }
}

impl GpuContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Require optional device features.
    pub fn features(mut self, features: RequiredFeatures) -> Self {
        self.features = features;
        self
    }

    /// Build a context without a surface. The graphics queue also serves
    /// as the present queue.
    pub fn build(self) -> Result<GpuContext> {
        let entry = unsafe { ash::Entry::load()? };
        let (instance, validation) =
            unsafe { create_instance(&entry, &self.app_name, self.enable_validation)? };

        unsafe { self.finish(entry, instance, validation, None) }
    }

    /// Build a context able to present to `window`.
    ///
    /// The surface is created before device selection so that only devices
    /// with a present-capable queue family are considered.
    pub fn build_for_window<W>(self, window: &W) -> Result<(GpuContext, SurfaceContext)>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let entry = unsafe { ash::Entry::load()? };
        let (instance, validation) =
            unsafe { create_instance(&entry, &self.app_name, self.enable_validation)? };

        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;

        let surface = unsafe {
            ash_window::create_surface(
                &entry,
                &instance,
                display.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        let target = PresentTarget {
            loader: &surface_loader,
            surface,
        };
        let gpu = unsafe { self.finish(entry, instance, validation, Some(target))? };

        let swapchain_loader = ash::khr::swapchain::Device::new(gpu.instance(), gpu.device());
        let surface = SurfaceContext::new(surface, surface_loader, swapchain_loader);

        Ok((gpu, surface))
    }

    unsafe fn finish(
        self,
        entry: ash::Entry,
        instance: ash::Instance,
        validation: bool,
        target: Option<PresentTarget<'_>>,
    ) -> Result<GpuContext> {
        let debug_messenger = if validation {
            Some(unsafe { DebugMessenger::new(&entry, &instance)? })
        } else {
            None
        };

        let (physical_device, queue_families) =
            unsafe { select_physical_device(&instance, target, self.features)? };

        let capabilities = unsafe { GpuCapabilities::query(&instance, physical_device)? };
        tracing::info!("Selected GPU: {}", capabilities.summary());
        tracing::info!(
            "Queue families: graphics={}, present={}",
            queue_families.graphics,
            queue_families.present
        );

        let (device, graphics_queue, present_queue) =
            unsafe { create_device(&instance, physical_device, queue_families, self.features)? };
        let device = Arc::new(device);

        let allocator = unsafe { GpuAllocator::new(&instance, device.clone(), physical_device)? };

        Ok(GpuContext {
            entry,
            instance,
            debug_messenger,
            physical_device,
            device,
            capabilities,
            allocator: Mutex::new(allocator),
            queue_families,
            graphics_queue,
            present_queue,
        })
    }
}

/// Create the logical device and retrieve queues.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    families: QueueFamilies,
    features: RequiredFeatures,
) -> Result<(ash::Device, vk::Queue, vk::Queue)> {
    let mut unique_families = vec![families.graphics];
    if families.present != families.graphics {
        unique_families.push(families.present);
    }

    let queue_priority = 1.0_f32;
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(&queue_priority))
        })
        .collect();

    let extension_names = [ash::khr::swapchain::NAME.as_ptr()];
    let enabled_features = features.to_vk();

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&enabled_features);

    let device = unsafe { instance.create_device(physical_device, &device_create_info, None)? };

    let graphics_queue = unsafe { device.get_device_queue(families.graphics, 0) };
    let present_queue = unsafe { device.get_device_queue(families.present, 0) };

    Ok((device, graphics_queue, present_queue))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn headless_context_creation() {
        let gpu = GpuContextBuilder::new()
            .validation(false)
            .build()
            .expect("Failed to create GPU context");

        let families = gpu.queue_families();
        assert_eq!(families.graphics, families.present);
        assert!(!gpu.capabilities().device_name.is_empty());
        gpu.wait_idle().unwrap();
    }
}
