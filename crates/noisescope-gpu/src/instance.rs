//! Vulkan instance creation, debug messenger and physical device selection.

use crate::error::{GpuError, Result};
use ash::vk;
use std::ffi::{c_void, CStr, CString};
use std::sync::atomic::{AtomicU32, Ordering};

/// Number of error-severity messages reported by the validation layer.
static VALIDATION_ERRORS: AtomicU32 = AtomicU32::new(0);

/// Required instance extensions for presenting to a window.
pub fn required_instance_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::surface::NAME,
        #[cfg(target_os = "windows")]
        ash::khr::win32_surface::NAME,
        #[cfg(target_os = "linux")]
        ash::khr::xlib_surface::NAME,
        #[cfg(target_os = "linux")]
        ash::khr::wayland_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::ext::metal_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::khr::portability_enumeration::NAME,
    ]
}

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Create a Vulkan instance.
///
/// When `enable_validation` is set and the Khronos layer is installed, the
/// layer and `VK_EXT_debug_utils` are enabled.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn create_instance(
    entry: &ash::Entry,
    app_name: &str,
    enable_validation: bool,
) -> Result<(ash::Instance, bool)> {
    let app_name = CString::new(app_name)
        .map_err(|e| GpuError::InvalidState(format!("Invalid application name: {e}")))?;

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(c"noisescope")
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_2);

    let validation = enable_validation && unsafe { layer_available(entry, VALIDATION_LAYER)? };
    if enable_validation && !validation {
        tracing::warn!(
            "Validation layer {} not available",
            VALIDATION_LAYER.to_string_lossy()
        );
    }

    let mut extensions = required_instance_extensions();
    if validation {
        extensions.push(ash::ext::debug_utils::NAME);
    }
    let extension_names: Vec<*const i8> = extensions.iter().map(|ext| ext.as_ptr()).collect();

    let layer_names: Vec<*const i8> = if validation {
        vec![VALIDATION_LAYER.as_ptr()]
    } else {
        Vec::new()
    };

    #[cfg(target_os = "macos")]
    let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    #[cfg(not(target_os = "macos"))]
    let create_flags = vk::InstanceCreateFlags::empty();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .flags(create_flags);

    let instance = unsafe { entry.create_instance(&create_info, None)? };

    Ok((instance, validation))
}

unsafe fn layer_available(entry: &ash::Entry, layer: &CStr) -> Result<bool> {
    let available = unsafe { entry.enumerate_instance_layer_properties()? };
    Ok(available.iter().any(|props| {
        props
            .layer_name_as_c_str()
            .is_ok_and(|name| name == layer)
    }))
}

/// Debug messenger forwarding validation messages into `tracing`.
pub struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// Install the messenger on an instance created with validation enabled.
    ///
    /// # Safety
    /// The instance must have `VK_EXT_debug_utils` enabled.
    pub unsafe fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { loader.create_debug_utils_messenger(&create_info, None)? };

        Ok(Self { loader, messenger })
    }

    /// Destroy the messenger.
    ///
    /// # Safety
    /// Must be called before the instance is destroyed.
    pub unsafe fn destroy(&self) {
        unsafe {
            self.loader
                .destroy_debug_utils_messenger(self.messenger, None);
        }
    }
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    let message = if callback_data.is_null() {
        String::from("<no message>")
    } else {
        let data = unsafe { &*callback_data };
        if data.p_message.is_null() {
            String::from("<no message>")
        } else {
            unsafe { CStr::from_ptr(data.p_message) }
                .to_string_lossy()
                .into_owned()
        }
    };

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        VALIDATION_ERRORS.fetch_add(1, Ordering::Relaxed);
        tracing::error!(target: "vulkan", "{message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        tracing::warn!(target: "vulkan", "{message}");
    } else {
        tracing::info!(target: "vulkan", "{message}");
    }

    vk::FALSE
}

/// Take the number of validation errors reported since the last call.
pub fn take_validation_errors() -> u32 {
    VALIDATION_ERRORS.swap(0, Ordering::Relaxed)
}

/// Queue family indices for rendering and presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

/// A surface to test present support against during device selection.
#[derive(Clone, Copy)]
pub struct PresentTarget<'a> {
    pub loader: &'a ash::khr::surface::Instance,
    pub surface: vk::SurfaceKHR,
}

/// Find the graphics and present queue families of a device.
///
/// The last capable family wins for each role. Without a present target the
/// graphics family doubles as the present family.
///
/// # Safety
/// The instance and physical device must be valid.
pub unsafe fn find_queue_families(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    target: Option<PresentTarget<'_>>,
) -> Result<Option<QueueFamilies>> {
    let families =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

    let mut graphics = None;
    let mut present = None;

    for (index, family) in families.iter().enumerate() {
        let index = index as u32;

        if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            graphics = Some(index);
        }

        if let Some(target) = target {
            let supported = unsafe {
                target.loader.get_physical_device_surface_support(
                    physical_device,
                    index,
                    target.surface,
                )?
            };
            if supported {
                present = Some(index);
            }
        }
    }

    if target.is_none() {
        present = graphics;
    }

    Ok(graphics
        .zip(present)
        .map(|(graphics, present)| QueueFamilies { graphics, present }))
}

/// Optional device features the harness asks for.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredFeatures {
    pub geometry_shader: bool,
}

impl RequiredFeatures {
    fn satisfied_by(self, features: &vk::PhysicalDeviceFeatures) -> bool {
        !self.geometry_shader || features.geometry_shader == vk::TRUE
    }

    pub(crate) fn to_vk(self) -> vk::PhysicalDeviceFeatures {
        vk::PhysicalDeviceFeatures::default().geometry_shader(self.geometry_shader)
    }
}

/// Split devices into discrete and integrated candidates, discrete first.
pub fn order_candidates<T: Copy>(devices: &[(T, vk::PhysicalDeviceType)]) -> Vec<T> {
    let discrete = devices
        .iter()
        .filter(|(_, ty)| *ty == vk::PhysicalDeviceType::DISCRETE_GPU);
    let integrated = devices
        .iter()
        .filter(|(_, ty)| *ty == vk::PhysicalDeviceType::INTEGRATED_GPU);
    discrete.chain(integrated).map(|(device, _)| *device).collect()
}

/// Select the first suitable physical device, discrete GPUs before integrated.
///
/// A device is suitable when it exposes both queue families, the swapchain
/// extension and the requested features.
///
/// # Safety
/// The instance must be valid.
pub unsafe fn select_physical_device(
    instance: &ash::Instance,
    target: Option<PresentTarget<'_>>,
    features: RequiredFeatures,
) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    let typed: Vec<_> = devices
        .iter()
        .map(|&device| {
            let properties = unsafe { instance.get_physical_device_properties(device) };
            (device, properties.device_type)
        })
        .collect();

    for device in order_candidates(&typed) {
        let available = unsafe { instance.get_physical_device_features(device) };
        if !features.satisfied_by(&available) {
            continue;
        }

        if !unsafe { supports_swapchain(instance, device)? } {
            continue;
        }

        if let Some(families) = unsafe { find_queue_families(instance, device, target)? } {
            return Ok((device, families));
        }
    }

    Err(GpuError::NoSuitableDevice)
}

unsafe fn supports_swapchain(instance: &ash::Instance, device: vk::PhysicalDevice) -> Result<bool> {
    let extensions = unsafe { instance.enumerate_device_extension_properties(device)? };
    Ok(extensions.iter().any(|ext| {
        ext.extension_name_as_c_str()
            .is_ok_and(|name| name == ash::khr::swapchain::NAME)
    }))
}
