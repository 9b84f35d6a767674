//! Descriptor pools, set layouts and set updates.

use crate::error::{GpuError, Result};
use ash::vk;

/// Largest number of sets allocated for one layout.
pub const MAX_SET_HANDLES: usize = 4;

/// Descriptor types the harness binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    UniformBuffer,
    UniformBufferDynamic,
    StorageBuffer,
    CombinedImageSampler,
}

impl DescriptorKind {
    pub const fn vk_type(self) -> vk::DescriptorType {
        match self {
            Self::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
            Self::UniformBufferDynamic => vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
            Self::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
            Self::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        }
    }
}

/// One binding of a set layout. Its binding index is its position.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorBinding {
    pub kind: DescriptorKind,
    pub count: u32,
    pub stages: vk::ShaderStageFlags,
}

/// Layout bindings numbered by position.
pub fn layout_bindings(bindings: &[DescriptorBinding]) -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
    (0_u32..)
        .zip(bindings)
        .map(|(index, binding)| {
            vk::DescriptorSetLayoutBinding::default()
                .binding(index)
                .descriptor_type(binding.kind.vk_type())
                .descriptor_count(binding.count)
                .stage_flags(binding.stages)
        })
        .collect()
}

/// Pool capacities per descriptor type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorPoolSizes {
    pub uniform_buffers: u32,
    pub dynamic_uniform_buffers: u32,
    pub storage_buffers: u32,
    pub combined_image_samplers: u32,
    pub max_sets: u32,
}

impl Default for DescriptorPoolSizes {
    fn default() -> Self {
        Self {
            uniform_buffers: 8,
            dynamic_uniform_buffers: 8,
            storage_buffers: 8,
            combined_image_samplers: 8,
            max_sets: 64,
        }
    }
}

impl DescriptorPoolSizes {
    fn pool_sizes(&self) -> [vk::DescriptorPoolSize; 4] {
        [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: self.uniform_buffers,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                descriptor_count: self.dynamic_uniform_buffers,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_BUFFER,
                descriptor_count: self.storage_buffers,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: self.combined_image_samplers,
            },
        ]
    }
}

/// Descriptor pool for allocating descriptor sets.
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
}

impl DescriptorPool {
    /// Create a pool with room for `sizes`.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn create(device: &ash::Device, sizes: DescriptorPoolSizes) -> Result<Self> {
        let pool_sizes = sizes.pool_sizes();
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(sizes.max_sets)
            .pool_sizes(&pool_sizes);

        let pool = unsafe { device.create_descriptor_pool(&create_info, None)? };
        Ok(Self { pool })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }

    /// Destroy the pool and every set allocated from it.
    ///
    /// # Safety
    /// The device must be valid and the pool must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe { device.destroy_descriptor_pool(self.pool, None) };
    }
}

/// A set layout plus the sets allocated with it.
pub struct DescriptorSet {
    pub layout: vk::DescriptorSetLayout,
    pub handles: Vec<vk::DescriptorSet>,
    bindings: Vec<DescriptorBinding>,
}

impl DescriptorSet {
    /// Build a layout from `bindings` and allocate `count` sets of it.
    ///
    /// # Safety
    /// The device and pool must be valid.
    pub unsafe fn create(
        device: &ash::Device,
        pool: &DescriptorPool,
        bindings: &[DescriptorBinding],
        count: usize,
    ) -> Result<Self> {
        if count > MAX_SET_HANDLES {
            return Err(GpuError::CapacityExceeded {
                what: "descriptor set handles",
                capacity: MAX_SET_HANDLES,
            });
        }

        let layout_bindings = layout_bindings(bindings);
        let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&layout_bindings);
        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None)? };

        let layouts = vec![layout; count];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool.handle())
            .set_layouts(&layouts);

        let handles = match unsafe { device.allocate_descriptor_sets(&alloc_info) } {
            Ok(handles) => handles,
            Err(e) => {
                unsafe { device.destroy_descriptor_set_layout(layout, None) };
                return Err(e.into());
            }
        };

        Ok(Self {
            layout,
            handles,
            bindings: bindings.to_vec(),
        })
    }

    pub fn bindings(&self) -> &[DescriptorBinding] {
        &self.bindings
    }

    /// Destroy the layout. Sets are returned when the pool is destroyed.
    ///
    /// # Safety
    /// The device must be valid and the layout must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe { device.destroy_descriptor_set_layout(self.layout, None) };
    }
}

/// The resource written into one binding.
#[derive(Debug, Clone, Copy)]
pub enum DescriptorWrite {
    UniformBuffer(vk::DescriptorBufferInfo),
    UniformBufferDynamic(vk::DescriptorBufferInfo),
    StorageBuffer(vk::DescriptorBufferInfo),
    CombinedImageSampler(vk::DescriptorImageInfo),
}

impl DescriptorWrite {
    pub const fn kind(&self) -> DescriptorKind {
        match self {
            Self::UniformBuffer(_) => DescriptorKind::UniformBuffer,
            Self::UniformBufferDynamic(_) => DescriptorKind::UniformBufferDynamic,
            Self::StorageBuffer(_) => DescriptorKind::StorageBuffer,
            Self::CombinedImageSampler(_) => DescriptorKind::CombinedImageSampler,
        }
    }
}

/// Check `writes` against the layout bindings, by position.
pub fn check_writes(bindings: &[DescriptorBinding], writes: &[DescriptorWrite]) -> Result<()> {
    if writes.len() > bindings.len() {
        return Err(GpuError::InvalidState(format!(
            "{} descriptor writes for {} bindings",
            writes.len(),
            bindings.len()
        )));
    }

    for (index, (binding, write)) in bindings.iter().zip(writes).enumerate() {
        if binding.kind != write.kind() {
            return Err(GpuError::InvalidState(format!(
                "binding {index} is {:?} but was written as {:?}",
                binding.kind,
                write.kind()
            )));
        }
    }

    Ok(())
}

/// Write `writes[i]` into binding `i` of set `handle`.
///
/// # Safety
/// The device and every referenced buffer, view and sampler must be valid.
pub unsafe fn update_descriptor_set(
    device: &ash::Device,
    set: &DescriptorSet,
    handle: usize,
    writes: &[DescriptorWrite],
) -> Result<()> {
    let dst_set = *set.handles.get(handle).ok_or_else(|| {
        GpuError::InvalidState(format!(
            "descriptor set handle {handle} out of {}",
            set.handles.len()
        ))
    })?;
    check_writes(&set.bindings, writes)?;

    let vk_writes: Vec<vk::WriteDescriptorSet<'_>> = (0_u32..)
        .zip(writes)
        .map(|(binding, write)| {
            let base = vk::WriteDescriptorSet::default()
                .dst_set(dst_set)
                .dst_binding(binding)
                .descriptor_type(write.kind().vk_type());

            match write {
                DescriptorWrite::UniformBuffer(info)
                | DescriptorWrite::UniformBufferDynamic(info)
                | DescriptorWrite::StorageBuffer(info) => {
                    base.buffer_info(std::slice::from_ref(info))
                }
                DescriptorWrite::CombinedImageSampler(info) => {
                    base.image_info(std::slice::from_ref(info))
                }
            }
        })
        .collect();

    unsafe { device.update_descriptor_sets(&vk_writes, &[]) };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(kind: DescriptorKind) -> DescriptorBinding {
        DescriptorBinding {
            kind,
            count: 1,
            stages: vk::ShaderStageFlags::FRAGMENT,
        }
    }

    #[test]
    fn bindings_are_numbered_by_position() {
        let bindings = [
            binding(DescriptorKind::UniformBuffer),
            binding(DescriptorKind::CombinedImageSampler),
        ];
        let layout = layout_bindings(&bindings);

        assert_eq!(layout.len(), 2);
        assert_eq!(layout[0].binding, 0);
        assert_eq!(layout[1].binding, 1);
        assert_eq!(
            layout[1].descriptor_type,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER
        );
        assert_eq!(layout[1].stage_flags, vk::ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn kinds_map_to_vulkan_types() {
        assert_eq!(
            DescriptorKind::UniformBufferDynamic.vk_type(),
            vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
        );
        assert_eq!(
            DescriptorKind::StorageBuffer.vk_type(),
            vk::DescriptorType::STORAGE_BUFFER
        );
    }

    #[test]
    fn default_pool_sizes() {
        let sizes = DescriptorPoolSizes::default();
        assert_eq!(sizes.max_sets, 64);
        let pool_sizes = sizes.pool_sizes();
        assert!(pool_sizes.iter().all(|size| size.descriptor_count == 8));
    }

    #[test]
    fn every_descriptor_kind_has_pool_space() {
        let pool_sizes = DescriptorPoolSizes::default().pool_sizes();
        for kind in [
            DescriptorKind::UniformBuffer,
            DescriptorKind::UniformBufferDynamic,
            DescriptorKind::StorageBuffer,
            DescriptorKind::CombinedImageSampler,
        ] {
            let size = pool_sizes.iter().find(|size| size.ty == kind.vk_type());
            assert!(
                size.is_some_and(|size| size.descriptor_count > 0),
                "no pool space for {kind:?}"
            );
        }
    }

    #[test]
    fn mismatched_write_is_rejected() {
        let bindings = [binding(DescriptorKind::CombinedImageSampler)];

        let image = DescriptorWrite::CombinedImageSampler(vk::DescriptorImageInfo::default());
        assert!(check_writes(&bindings, &[image]).is_ok());

        let buffer = DescriptorWrite::UniformBuffer(vk::DescriptorBufferInfo::default());
        assert!(check_writes(&bindings, &[buffer]).is_err());
        assert!(check_writes(&bindings, &[image, image]).is_err());
    }
}
