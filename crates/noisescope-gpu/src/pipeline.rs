//! Graphics pipeline construction and shader module loading.

use crate::bounded::BoundedVec;
use crate::error::{GpuError, Result};
use ash::vk;
use std::path::Path;

pub const MAX_SHADER_STAGES: usize = 8;
pub const MAX_BLEND_ATTACHMENTS: usize = 4;
pub const MAX_SET_LAYOUTS: usize = 16;
pub const MAX_PUSH_CONSTANT_RANGES: usize = 4;
pub const MAX_VERTEX_BINDINGS: usize = 4;
pub const MAX_VERTEX_ATTRIBUTES: usize = 4;
pub const MAX_VIEWPORTS: usize = 4;
pub const MAX_SCISSORS: usize = 4;
pub const MAX_DYNAMIC_STATES: usize = 4;

/// Blending off, all colour channels written.
pub const DEFAULT_COLOR_BLEND_ATTACHMENT: vk::PipelineColorBlendAttachmentState =
    vk::PipelineColorBlendAttachmentState {
        blend_enable: vk::FALSE,
        src_color_blend_factor: vk::BlendFactor::ONE,
        dst_color_blend_factor: vk::BlendFactor::ZERO,
        color_blend_op: vk::BlendOp::ADD,
        src_alpha_blend_factor: vk::BlendFactor::ONE,
        dst_alpha_blend_factor: vk::BlendFactor::ZERO,
        alpha_blend_op: vk::BlendOp::ADD,
        color_write_mask: vk::ColorComponentFlags::RGBA,
    };

/// A SPIR-V shader module for one pipeline stage.
pub struct ShaderModule {
    pub module: vk::ShaderModule,
    pub stage: vk::ShaderStageFlags,
}

impl ShaderModule {
    /// Load SPIR-V bytecode from `path` and create a module for `stage`.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn load(
        device: &ash::Device,
        path: &Path,
        stage: vk::ShaderStageFlags,
    ) -> Result<Self> {
        let code = noisescope_shaders::load_spirv(path).map_err(|e| GpuError::ShaderLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        unsafe { Self::from_code(device, &code, stage) }
            .map_err(|e| GpuError::ShaderLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
            .inspect(|_| tracing::debug!("Loaded shader module {}", path.display()))
    }

    /// Create a module from SPIR-V words already in memory.
    ///
    /// # Safety
    /// The device must be valid and `code` must be valid SPIR-V.
    pub unsafe fn from_code(
        device: &ash::Device,
        code: &[u32],
        stage: vk::ShaderStageFlags,
    ) -> Result<Self> {
        let create_info = vk::ShaderModuleCreateInfo::default().code(code);
        let module = unsafe { device.create_shader_module(&create_info, None)? };
        Ok(Self { module, stage })
    }

    /// Stage description with entry point `main`.
    pub fn stage_info(&self) -> vk::PipelineShaderStageCreateInfo<'static> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage)
            .module(self.module)
            .name(c"main")
    }

    /// # Safety
    /// The device must be valid. Pipelines created from the module stay valid.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe { device.destroy_shader_module(self.module, None) };
    }
}

/// Viewport and scissor covering all of `extent`.
#[allow(clippy::cast_precision_loss)]
pub fn full_extent(extent: vk::Extent2D) -> (vk::Viewport, vk::Rect2D) {
    let viewport = vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    };
    let scissor = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    };
    (viewport, scissor)
}

/// Everything needed to create a graphics pipeline.
///
/// List fields are bounded; pushing past a bound fails with
/// [`GpuError::CapacityExceeded`].
pub struct PipelineInfo {
    pub shader_stages: BoundedVec<vk::PipelineShaderStageCreateInfo<'static>, MAX_SHADER_STAGES>,
    pub blend_attachments: BoundedVec<vk::PipelineColorBlendAttachmentState, MAX_BLEND_ATTACHMENTS>,
    pub set_layouts: BoundedVec<vk::DescriptorSetLayout, MAX_SET_LAYOUTS>,
    pub push_constant_ranges: BoundedVec<vk::PushConstantRange, MAX_PUSH_CONSTANT_RANGES>,
    pub vertex_bindings: BoundedVec<vk::VertexInputBindingDescription, MAX_VERTEX_BINDINGS>,
    pub vertex_attributes: BoundedVec<vk::VertexInputAttributeDescription, MAX_VERTEX_ATTRIBUTES>,
    pub viewports: BoundedVec<vk::Viewport, MAX_VIEWPORTS>,
    pub scissors: BoundedVec<vk::Rect2D, MAX_SCISSORS>,
    pub dynamic_states: BoundedVec<vk::DynamicState, MAX_DYNAMIC_STATES>,
    pub input_assembly: vk::PipelineInputAssemblyStateCreateInfo<'static>,
    pub rasterization: vk::PipelineRasterizationStateCreateInfo<'static>,
    pub multisample: vk::PipelineMultisampleStateCreateInfo<'static>,
    pub depth_stencil: vk::PipelineDepthStencilStateCreateInfo<'static>,
    pub color_blend: vk::PipelineColorBlendStateCreateInfo<'static>,
}

impl Default for PipelineInfo {
    fn default() -> Self {
        Self {
            shader_stages: BoundedVec::new("pipeline shader stages"),
            blend_attachments: BoundedVec::new("pipeline blend attachments"),
            set_layouts: BoundedVec::new("pipeline descriptor set layouts"),
            push_constant_ranges: BoundedVec::new("pipeline push constant ranges"),
            vertex_bindings: BoundedVec::new("pipeline vertex bindings"),
            vertex_attributes: BoundedVec::new("pipeline vertex attributes"),
            viewports: BoundedVec::new("pipeline viewports"),
            scissors: BoundedVec::new("pipeline scissors"),
            dynamic_states: BoundedVec::new("pipeline dynamic states"),
            input_assembly: vk::PipelineInputAssemblyStateCreateInfo::default()
                .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
                .primitive_restart_enable(false),
            rasterization: vk::PipelineRasterizationStateCreateInfo::default()
                .polygon_mode(vk::PolygonMode::FILL)
                .cull_mode(vk::CullModeFlags::NONE)
                .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
                .line_width(1.0),
            multisample: vk::PipelineMultisampleStateCreateInfo::default()
                .rasterization_samples(vk::SampleCountFlags::TYPE_1)
                .min_sample_shading(1.0),
            depth_stencil: vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(true)
                .depth_write_enable(true)
                .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL)
                .max_depth_bounds(1.0),
            color_blend: vk::PipelineColorBlendStateCreateInfo::default()
                .logic_op_enable(false)
                .logic_op(vk::LogicOp::COPY),
        }
    }
}

impl PipelineInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a shader stage.
    pub fn push_shader(&mut self, shader: &ShaderModule) -> Result<u32> {
        self.shader_stages.push(shader.stage_info())
    }

    /// Add one viewport and scissor covering `extent`.
    pub fn push_full_viewport(&mut self, extent: vk::Extent2D) -> Result<()> {
        let (viewport, scissor) = full_extent(extent);
        self.viewports.push(viewport)?;
        self.scissors.push(scissor)?;
        Ok(())
    }
}

/// A graphics pipeline and its layout.
pub struct GraphicsPipeline {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// # Safety
    /// The device must be valid and the pipeline must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

/// Create a pipeline for `subpass` of `render_pass` from `info`.
///
/// # Safety
/// The device, render pass, shader modules and set layouts referenced by
/// `info` must be valid.
pub unsafe fn create_pipeline(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    subpass: u32,
    info: &PipelineInfo,
) -> Result<GraphicsPipeline> {
    let layout_info = vk::PipelineLayoutCreateInfo::default()
        .set_layouts(&info.set_layouts)
        .push_constant_ranges(&info.push_constant_ranges);

    let layout = unsafe { device.create_pipeline_layout(&layout_info, None) }
        .map_err(|e| GpuError::PipelineCreation(format!("layout: {e}")))?;

    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&info.vertex_bindings)
        .vertex_attribute_descriptions(&info.vertex_attributes);

    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewports(&info.viewports)
        .scissors(&info.scissors);

    let dynamic_state =
        vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&info.dynamic_states);

    let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
        .flags(info.color_blend.flags)
        .logic_op_enable(info.color_blend.logic_op_enable == vk::TRUE)
        .logic_op(info.color_blend.logic_op)
        .blend_constants(info.color_blend.blend_constants)
        .attachments(&info.blend_attachments);

    let create_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&info.shader_stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&info.input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&info.rasterization)
        .multisample_state(&info.multisample)
        .depth_stencil_state(&info.depth_stencil)
        .color_blend_state(&color_blend)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(subpass);

    let pipelines = unsafe {
        device.create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
    };

    match pipelines {
        Ok(pipelines) => Ok(GraphicsPipeline {
            pipeline: pipelines[0],
            layout,
        }),
        Err((_, e)) => {
            unsafe { device.destroy_pipeline_layout(layout, None) };
            Err(GpuError::PipelineCreation(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_blend_attachment_writes_rgba_without_blending() {
        assert_eq!(DEFAULT_COLOR_BLEND_ATTACHMENT.blend_enable, vk::FALSE);
        assert_eq!(
            DEFAULT_COLOR_BLEND_ATTACHMENT.color_write_mask,
            vk::ColorComponentFlags::RGBA
        );
    }

    #[test]
    fn default_info_tests_depth_and_draws_both_faces() {
        let info = PipelineInfo::new();
        assert_eq!(info.depth_stencil.depth_test_enable, vk::TRUE);
        assert_eq!(info.depth_stencil.depth_write_enable, vk::TRUE);
        assert_eq!(info.depth_stencil.depth_compare_op, vk::CompareOp::LESS_OR_EQUAL);
        assert_eq!(info.rasterization.cull_mode, vk::CullModeFlags::NONE);
        assert_eq!(
            info.input_assembly.topology,
            vk::PrimitiveTopology::TRIANGLE_LIST
        );
    }

    #[test]
    fn full_viewport_matches_extent() {
        let mut info = PipelineInfo::new();
        info.push_full_viewport(vk::Extent2D {
            width: 1600,
            height: 900,
        })
        .unwrap();

        assert_eq!(info.viewports[0].width, 1600.0);
        assert_eq!(info.viewports[0].height, 900.0);
        assert_eq!(info.scissors[0].extent.width, 1600);
    }

    #[test]
    fn vertex_attributes_are_bounded() {
        let mut info = PipelineInfo::new();
        for location in 0..MAX_VERTEX_ATTRIBUTES as u32 {
            info.vertex_attributes
                .push(vk::VertexInputAttributeDescription {
                    location,
                    ..Default::default()
                })
                .unwrap();
        }
        assert!(info
            .vertex_attributes
            .push(vk::VertexInputAttributeDescription::default())
            .is_err());
    }
}
