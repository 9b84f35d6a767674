//! GPU capability detection.

use crate::error::{GpuError, Result};
use ash::vk;
use std::ffi::CStr;

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// Depth formats in order of preference.
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 5] = [
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D32_SFLOAT,
    vk::Format::D24_UNORM_S8_UINT,
    vk::Format::D16_UNORM_S8_UINT,
    vk::Format::D16_UNORM,
];

/// Capability snapshot of the selected device.
#[derive(Debug, Clone)]
pub struct GpuCapabilities {
    /// GPU vendor
    pub vendor: GpuVendor,
    /// Device name
    pub device_name: String,
    /// Device type (discrete, integrated, ...)
    pub device_type: vk::PhysicalDeviceType,
    /// Vulkan API version
    pub api_version: u32,
    /// Memory types and heaps
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Minimum alignment for uniform buffer offsets
    pub min_uniform_buffer_offset_alignment: u64,
    /// Granularity of non-coherent mapped ranges
    pub non_coherent_atom_size: u64,
    /// Maximum push constant block size in bytes
    pub max_push_constants_size: u32,
    /// Best supported depth/stencil attachment format
    pub depth_format: vk::Format,
    /// Geometry shader support
    pub supports_geometry_shader: bool,
    /// Device-local memory in MB
    pub device_local_memory_mb: u64,
}

impl GpuCapabilities {
    /// Query capabilities from a physical device.
    ///
    /// # Safety
    /// The instance and physical device must be valid.
    pub unsafe fn query(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Self> {
        let properties = instance.get_physical_device_properties(physical_device);
        let memory_properties = instance.get_physical_device_memory_properties(physical_device);
        let features = instance.get_physical_device_features(physical_device);

        let device_name = CStr::from_ptr(properties.device_name.as_ptr())
            .to_string_lossy()
            .into_owned();

        let device_local_memory_mb: u64 = memory_properties
            .memory_heaps
            .iter()
            .take(memory_properties.memory_heap_count as usize)
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size / (1024 * 1024))
            .sum();

        let depth_format = select_depth_format(|format| {
            instance.get_physical_device_format_properties(physical_device, format)
        })?;

        Ok(Self {
            vendor: GpuVendor::from_vendor_id(properties.vendor_id),
            device_name,
            device_type: properties.device_type,
            api_version: properties.api_version,
            memory_properties,
            min_uniform_buffer_offset_alignment: properties
                .limits
                .min_uniform_buffer_offset_alignment,
            non_coherent_atom_size: properties.limits.non_coherent_atom_size,
            max_push_constants_size: properties.limits.max_push_constants_size,
            depth_format,
            supports_geometry_shader: features.geometry_shader == vk::TRUE,
            device_local_memory_mb,
        })
    }

    /// Find a memory type index allowed by `type_bits` with all of `flags`.
    pub fn find_memory_type(&self, type_bits: u32, flags: vk::MemoryPropertyFlags) -> Result<u32> {
        find_memory_type(&self.memory_properties, type_bits, flags)
    }

    /// Get a human-readable summary of capabilities.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}, {:?}) - Vulkan {}.{}.{} - {} MB VRAM - depth {:?}",
            self.device_name,
            self.vendor,
            self.device_type,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
            self.device_local_memory_mb,
            self.depth_format,
        )
    }
}

/// Pick the first depth format supporting optimal-tiling depth attachments.
pub fn select_depth_format(
    mut format_properties: impl FnMut(vk::Format) -> vk::FormatProperties,
) -> Result<vk::Format> {
    DEPTH_FORMAT_CANDIDATES
        .into_iter()
        .find(|&format| {
            format_properties(format)
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        })
        .ok_or(GpuError::NoDepthFormat)
}

/// Find a memory type index allowed by `type_bits` with all of `flags`.
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    flags: vk::MemoryPropertyFlags,
) -> Result<u32> {
    memory_properties
        .memory_types
        .iter()
        .take(memory_properties.memory_type_count as usize)
        .enumerate()
        .find(|(index, memory_type)| {
            type_bits & (1 << index) != 0 && memory_type.property_flags.contains(flags)
        })
        .map(|(index, _)| index as u32)
        .ok_or(GpuError::NoMemoryType { type_bits, flags })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (slot, &property_flags) in properties.memory_types.iter_mut().zip(flags) {
            slot.property_flags = property_flags;
        }
        properties
    }

    #[test]
    fn vendor_identification() {
        assert_eq!(GpuVendor::from_vendor_id(0x10DE), GpuVendor::Nvidia);
        assert_eq!(GpuVendor::from_vendor_id(0x1002), GpuVendor::Amd);
        assert_eq!(GpuVendor::from_vendor_id(0x8086), GpuVendor::Intel);
        assert_eq!(GpuVendor::from_vendor_id(0x1234), GpuVendor::Other(0x1234));
    }

    #[test]
    fn memory_type_respects_type_bits_and_flags() {
        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        let properties = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            host,
            host | vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ]);

        assert_eq!(find_memory_type(&properties, 0b111, host).unwrap(), 1);
        assert_eq!(find_memory_type(&properties, 0b100, host).unwrap(), 2);
        assert_eq!(
            find_memory_type(&properties, 0b111, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap(),
            0
        );
    }

    #[test]
    fn missing_memory_type_is_an_error() {
        let properties = memory_properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        let err = find_memory_type(&properties, 0b1, vk::MemoryPropertyFlags::HOST_VISIBLE)
            .unwrap_err();
        assert!(matches!(err, GpuError::NoMemoryType { type_bits: 1, .. }));
    }

    #[test]
    fn depth_format_follows_preference_order() {
        let supported = [vk::Format::D24_UNORM_S8_UINT, vk::Format::D16_UNORM];
        let format = select_depth_format(|format| vk::FormatProperties {
            optimal_tiling_features: if supported.contains(&format) {
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
            } else {
                vk::FormatFeatureFlags::empty()
            },
            ..Default::default()
        })
        .unwrap();
        assert_eq!(format, vk::Format::D24_UNORM_S8_UINT);
    }

    #[test]
    fn no_depth_format_is_an_error() {
        let result = select_depth_format(|_| vk::FormatProperties::default());
        assert!(matches!(result, Err(GpuError::NoDepthFormat)));
    }
}
