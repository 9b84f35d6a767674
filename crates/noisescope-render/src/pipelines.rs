//! The harness pipelines and entity draw recording.

use ash::vk;
use glam::Mat4;
use noisescope_gpu::{
    create_pipeline, update_descriptor_set, DescriptorBinding, DescriptorKind, DescriptorPool,
    DescriptorPoolSizes, DescriptorSet, DescriptorWrite, GraphicsPipeline, PipelineInfo,
    RenderPass, ShaderModule, Texture, DEFAULT_COLOR_BLEND_ATTACHMENT,
};
use noisescope_shaders::{shader_dir, TEST_FRAG, TEST_VERT, TEXTURE_FRAG, TEXTURE_VERT};
use std::path::Path;

use crate::entity::{Entities, PipelineKind};
use crate::error::Result;
use crate::mesh::{bind_mesh_data, draw_mesh, MeshData};
use crate::vertex::Vertex;

/// Size of the model-view-projection push constant.
#[allow(clippy::cast_possible_truncation)]
pub const MVP_PUSH_SIZE: u32 = std::mem::size_of::<Mat4>() as u32;

/// Push constant range holding the MVP for the vertex stage.
pub fn mvp_push_range() -> vk::PushConstantRange {
    vk::PushConstantRange {
        stage_flags: vk::ShaderStageFlags::VERTEX,
        offset: 0,
        size: MVP_PUSH_SIZE,
    }
}

/// Set layout of the texture pipeline: one sampled image for the fragment
/// stage.
pub const TEXTURE_BINDINGS: [DescriptorBinding; 1] = [DescriptorBinding {
    kind: DescriptorKind::CombinedImageSampler,
    count: 1,
    stages: vk::ShaderStageFlags::FRAGMENT,
}];

/// Pipeline description shared by both harness pipelines. The test shaders
/// only read positions.
fn base_info(extent: vk::Extent2D, kind: PipelineKind) -> Result<PipelineInfo> {
    let mut info = PipelineInfo::new();
    info.vertex_bindings.push(Vertex::binding_description())?;
    info.vertex_attributes.push(Vertex::position_attribute())?;
    if kind == PipelineKind::Texture {
        info.vertex_attributes.push(Vertex::uv_attribute())?;
    }
    info.blend_attachments.push(DEFAULT_COLOR_BLEND_ATTACHMENT)?;
    info.push_constant_ranges.push(mvp_push_range())?;
    info.push_full_viewport(extent)?;
    Ok(info)
}

/// Load a vertex and fragment shader, build the pipeline, then drop the
/// modules.
unsafe fn build(
    device: &ash::Device,
    render_pass: &RenderPass,
    mut info: PipelineInfo,
    dir: &Path,
    vert: &str,
    frag: &str,
) -> Result<GraphicsPipeline> {
    let vert =
        unsafe { ShaderModule::load(device, &dir.join(vert), vk::ShaderStageFlags::VERTEX)? };
    let frag = match unsafe {
        ShaderModule::load(device, &dir.join(frag), vk::ShaderStageFlags::FRAGMENT)
    } {
        Ok(frag) => frag,
        Err(e) => {
            unsafe { vert.destroy(device) };
            return Err(e.into());
        }
    };

    let pipeline = info
        .push_shader(&vert)
        .and_then(|_| info.push_shader(&frag))
        .and_then(|_| unsafe { create_pipeline(device, render_pass.handle, 0, &info) });

    unsafe {
        vert.destroy(device);
        frag.destroy(device);
    }
    Ok(pipeline?)
}

/// Allocate the texture's descriptor set and point it at `texture`.
unsafe fn bind_texture(
    device: &ash::Device,
    pool: &DescriptorPool,
    texture: &Texture,
) -> Result<DescriptorSet> {
    let set = unsafe { DescriptorSet::create(device, pool, &TEXTURE_BINDINGS, 1)? };
    let written = unsafe {
        update_descriptor_set(
            device,
            &set,
            0,
            &[DescriptorWrite::CombinedImageSampler(texture.descriptor_info())],
        )
    };
    if let Err(e) = written {
        unsafe { set.destroy(device) };
        return Err(e.into());
    }
    Ok(set)
}

/// Build the test pipeline, then the texture pipeline using `texture_set`.
unsafe fn build_both(
    device: &ash::Device,
    render_pass: &RenderPass,
    extent: vk::Extent2D,
    texture_set: &DescriptorSet,
    dir: &Path,
) -> Result<(GraphicsPipeline, GraphicsPipeline)> {
    let test_info = base_info(extent, PipelineKind::Test)?;
    let test = unsafe { build(device, render_pass, test_info, dir, TEST_VERT, TEST_FRAG)? };

    let texture = base_info(extent, PipelineKind::Texture).and_then(|mut info| {
        info.set_layouts.push(texture_set.layout)?;
        unsafe { build(device, render_pass, info, dir, TEXTURE_VERT, TEXTURE_FRAG) }
    });
    match texture {
        Ok(texture) => Ok((test, texture)),
        Err(e) => {
            unsafe { test.destroy(device) };
            Err(e)
        }
    }
}

/// Flat and textured pipelines with the texture's descriptor set.
pub struct HarnessPipelines {
    descriptor_pool: DescriptorPool,
    texture_set: DescriptorSet,
    test: GraphicsPipeline,
    texture: GraphicsPipeline,
}

impl HarnessPipelines {
    /// Create both pipelines for subpass 0 of `render_pass`, binding
    /// `texture` to the textured one.
    ///
    /// # Safety
    /// The device, render pass and texture must be valid.
    pub unsafe fn new(
        device: &ash::Device,
        render_pass: &RenderPass,
        extent: vk::Extent2D,
        texture: &Texture,
    ) -> Result<Self> {
        unsafe { Self::from_dir(device, render_pass, extent, texture, &shader_dir()) }
    }

    /// Like [`new`](Self::new), loading SPIR-V from `dir`. Everything created
    /// before a failure is destroyed again.
    ///
    /// # Safety
    /// The device, render pass and texture must be valid.
    pub unsafe fn from_dir(
        device: &ash::Device,
        render_pass: &RenderPass,
        extent: vk::Extent2D,
        texture: &Texture,
        dir: &Path,
    ) -> Result<Self> {
        let descriptor_pool =
            unsafe { DescriptorPool::create(device, DescriptorPoolSizes::default())? };
        let texture_set = match unsafe { bind_texture(device, &descriptor_pool, texture) } {
            Ok(set) => set,
            Err(e) => {
                unsafe { descriptor_pool.destroy(device) };
                return Err(e);
            }
        };
        let (test, texture) =
            match unsafe { build_both(device, render_pass, extent, &texture_set, dir) } {
                Ok(pipelines) => pipelines,
                Err(e) => {
                    unsafe {
                        texture_set.destroy(device);
                        descriptor_pool.destroy(device);
                    }
                    return Err(e);
                }
            };

        tracing::info!("Created test and texture pipelines");

        Ok(Self {
            descriptor_pool,
            texture_set,
            test,
            texture,
        })
    }

    pub fn get(&self, kind: PipelineKind) -> &GraphicsPipeline {
        match kind {
            PipelineKind::Test => &self.test,
            PipelineKind::Texture => &self.texture,
        }
    }

    /// Record one draw per entity into `cmd`, which must be inside the
    /// render pass.
    ///
    /// # Safety
    /// The device and command buffer must be valid and recording.
    pub unsafe fn record_entities(
        &self,
        device: &ash::Device,
        cmd: vk::CommandBuffer,
        entities: &Entities,
        mesh_data: &MeshData,
    ) {
        unsafe { bind_mesh_data(device, cmd, mesh_data) };

        for entity in entities.iter() {
            let pipeline = self.get(entity.pipeline);
            let mvp = entity.mvp();

            unsafe {
                device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline);
                if entity.pipeline == PipelineKind::Texture {
                    device.cmd_bind_descriptor_sets(
                        cmd,
                        vk::PipelineBindPoint::GRAPHICS,
                        pipeline.layout,
                        0,
                        &self.texture_set.handles,
                        &[],
                    );
                }
                device.cmd_push_constants(
                    cmd,
                    pipeline.layout,
                    vk::ShaderStageFlags::VERTEX,
                    0,
                    bytemuck::bytes_of(&mvp),
                );
                draw_mesh(device, cmd, entity.mesh);
            }
        }
    }

    /// # Safety
    /// The device must be idle.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            self.test.destroy(device);
            self.texture.destroy(device);
            self.texture_set.destroy(device);
            self.descriptor_pool.destroy(device);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mvp_fills_a_64_byte_vertex_range() {
        let range = mvp_push_range();
        assert_eq!(range.size, 64);
        assert_eq!(range.offset, 0);
        assert_eq!(range.stage_flags, vk::ShaderStageFlags::VERTEX);
    }

    const EXTENT: vk::Extent2D = vk::Extent2D {
        width: 1600,
        height: 900,
    };

    #[test]
    fn texture_pipeline_reads_positions_and_uvs() {
        let info = base_info(EXTENT, PipelineKind::Texture).unwrap();

        assert_eq!(info.vertex_bindings.len(), 1);
        assert_eq!(info.vertex_attributes.len(), 2);
        assert_eq!(info.vertex_attributes[1].location, 1);
        assert_eq!(info.push_constant_ranges.len(), 1);
        assert_eq!(info.blend_attachments.len(), 1);
        assert!(info.set_layouts.is_empty());
    }

    #[test]
    fn test_pipeline_reads_positions_only() {
        let info = base_info(EXTENT, PipelineKind::Test).unwrap();

        assert_eq!(info.vertex_attributes.len(), 1);
        assert_eq!(info.vertex_attributes[0].location, 0);
        assert_eq!(info.scissors[0].extent.height, 900);
        assert_eq!(info.depth_stencil.depth_test_enable, vk::TRUE);
        assert_eq!(info.depth_stencil.depth_compare_op, vk::CompareOp::LESS_OR_EQUAL);
    }

    #[test]
    fn texture_binding_is_a_fragment_sampler() {
        assert_eq!(TEXTURE_BINDINGS[0].kind, DescriptorKind::CombinedImageSampler);
        assert_eq!(TEXTURE_BINDINGS[0].stages, vk::ShaderStageFlags::FRAGMENT);
    }

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn missing_shaders_fail_without_leaking() {
        use noisescope_gpu::{
            GpuContextBuilder, GraphicsMemory, MemoryConfig, RenderPassInfo, SubpassInfo,
        };

        let gpu = GpuContextBuilder::new().validation(true).build().unwrap();
        let mut memory = GraphicsMemory::new(&gpu, MemoryConfig::default()).unwrap();
        let mut texture = Texture::create(&gpu, &memory, 16, 9, "pipeline test").unwrap();
        let device = gpu.device();

        let mut pass_info = RenderPassInfo::new();
        pass_info
            .push_attachment(
                vk::AttachmentDescription::default()
                    .format(vk::Format::R8G8B8A8_UNORM)
                    .samples(vk::SampleCountFlags::TYPE_1)
                    .load_op(vk::AttachmentLoadOp::CLEAR)
                    .store_op(vk::AttachmentStoreOp::STORE)
                    .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
                vk::ClearValue::default(),
            )
            .unwrap();
        pass_info
            .push_subpass(
                SubpassInfo::new().color(0, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
            )
            .unwrap();
        let render_pass = unsafe { pass_info.create(device) }.unwrap();

        let missing = std::env::temp_dir().join("noisescope-no-shaders-here");
        let result = unsafe {
            HarnessPipelines::from_dir(device, &render_pass, EXTENT, &texture, &missing)
        };
        assert!(result.is_err());
        gpu.check_validation().unwrap();

        unsafe {
            render_pass.destroy(device);
            texture.destroy(&gpu).unwrap();
            memory.destroy(&gpu).unwrap();
        }
    }
}
