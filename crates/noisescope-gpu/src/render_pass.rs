//! Render pass and framebuffer construction.
//!
//! A [`RenderPassInfo`] collects attachments (each with its clear value),
//! subpasses and dependencies into bounded lists, then creates one immutable
//! [`RenderPass`] that remembers the clear values in attachment order.

use crate::bounded::BoundedVec;
use crate::error::Result;
use ash::vk;

pub const MAX_ATTACHMENTS: usize = 8;
pub const MAX_SUBPASSES: usize = 4;
pub const MAX_DEPENDENCIES: usize = 8;

/// Attachment references of one subpass, by attachment index.
#[derive(Debug, Clone, Default)]
pub struct SubpassInfo {
    input: Vec<vk::AttachmentReference>,
    color: Vec<vk::AttachmentReference>,
    preserve: Vec<u32>,
    depth: Option<vk::AttachmentReference>,
}

impl SubpassInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `attachment` as an input attachment in `layout`.
    pub fn input(mut self, attachment: u32, layout: vk::ImageLayout) -> Self {
        self.input.push(vk::AttachmentReference { attachment, layout });
        self
    }

    /// Write `attachment` as a colour attachment in `layout`.
    pub fn color(mut self, attachment: u32, layout: vk::ImageLayout) -> Self {
        self.color.push(vk::AttachmentReference { attachment, layout });
        self
    }

    /// Keep the contents of `attachment` through this subpass.
    pub fn preserve(mut self, attachment: u32) -> Self {
        self.preserve.push(attachment);
        self
    }

    /// Use `attachment` as the depth/stencil attachment.
    pub fn depth(mut self, attachment: u32, layout: vk::ImageLayout) -> Self {
        self.depth = Some(vk::AttachmentReference { attachment, layout });
        self
    }

    fn describe(&self) -> vk::SubpassDescription<'_> {
        let description = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .input_attachments(&self.input)
            .color_attachments(&self.color)
            .preserve_attachments(&self.preserve);

        match &self.depth {
            Some(depth) => description.depth_stencil_attachment(depth),
            None => description,
        }
    }
}

/// A colour attachment that is cleared on load and ends ready to present.
pub fn present_color_attachment(format: vk::Format) -> vk::AttachmentDescription {
    vk::AttachmentDescription::default()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
}

/// Make subpass 0's colour writes wait for the swapchain image to be acquired.
pub fn acquire_dependency() -> vk::SubpassDependency {
    vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
}

/// Accumulates the pieces of a render pass.
pub struct RenderPassInfo {
    attachments: BoundedVec<vk::AttachmentDescription, MAX_ATTACHMENTS>,
    clear_values: BoundedVec<vk::ClearValue, MAX_ATTACHMENTS>,
    subpasses: BoundedVec<SubpassInfo, MAX_SUBPASSES>,
    dependencies: BoundedVec<vk::SubpassDependency, MAX_DEPENDENCIES>,
}

impl Default for RenderPassInfo {
    fn default() -> Self {
        Self {
            attachments: BoundedVec::new("render pass attachments"),
            clear_values: BoundedVec::new("render pass clear values"),
            subpasses: BoundedVec::new("render pass subpasses"),
            dependencies: BoundedVec::new("render pass dependencies"),
        }
    }
}

impl RenderPassInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attachment and the value it is cleared to; returns its index.
    pub fn push_attachment(
        &mut self,
        description: vk::AttachmentDescription,
        clear: vk::ClearValue,
    ) -> Result<u32> {
        let index = self.attachments.push(description)?;
        self.clear_values.push(clear)?;
        Ok(index)
    }

    /// Add a subpass; returns its index.
    pub fn push_subpass(&mut self, subpass: SubpassInfo) -> Result<u32> {
        self.subpasses.push(subpass)
    }

    /// Add a subpass dependency; returns its index.
    pub fn push_dependency(&mut self, dependency: vk::SubpassDependency) -> Result<u32> {
        self.dependencies.push(dependency)
    }

    /// Clear values in attachment order.
    pub fn clear_values(&self) -> &[vk::ClearValue] {
        &self.clear_values
    }

    pub fn attachment_count(&self) -> usize {
        self.attachments.len()
    }

    pub fn subpass_count(&self) -> usize {
        self.subpasses.len()
    }

    /// Create the render pass.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn create(&self, device: &ash::Device) -> Result<RenderPass> {
        let subpasses: Vec<vk::SubpassDescription<'_>> =
            self.subpasses.iter().map(SubpassInfo::describe).collect();

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&self.attachments)
            .subpasses(&subpasses)
            .dependencies(&self.dependencies);

        let handle = unsafe { device.create_render_pass(&create_info, None)? };

        tracing::debug!(
            "Created render pass: {} attachments, {} subpasses, {} dependencies",
            self.attachments.len(),
            subpasses.len(),
            self.dependencies.len()
        );

        Ok(RenderPass {
            handle,
            clear_values: self.clear_values.to_vec(),
        })
    }
}

/// An immutable render pass and the clear values of its attachments.
pub struct RenderPass {
    pub handle: vk::RenderPass,
    clear_values: Vec<vk::ClearValue>,
}

impl RenderPass {
    pub fn clear_values(&self) -> &[vk::ClearValue] {
        &self.clear_values
    }

    /// Begin info covering the whole `extent` of `framebuffer`.
    pub fn begin_info(
        &self,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
    ) -> vk::RenderPassBeginInfo<'_> {
        vk::RenderPassBeginInfo::default()
            .render_pass(self.handle)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&self.clear_values)
    }

    /// # Safety
    /// The device must be valid and the render pass must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe { device.destroy_render_pass(self.handle, None) };
    }
}

/// One framebuffer per swapchain image view.
pub struct Framebuffers {
    framebuffers: Vec<vk::Framebuffer>,
}

impl Framebuffers {
    /// # Safety
    /// The device, render pass and views must be valid.
    pub unsafe fn new(
        device: &ash::Device,
        render_pass: &RenderPass,
        views: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let framebuffers = views
            .iter()
            .map(|view| {
                let attachments = std::slice::from_ref(view);
                let create_info = vk::FramebufferCreateInfo::default()
                    .render_pass(render_pass.handle)
                    .attachments(attachments)
                    .width(extent.width)
                    .height(extent.height)
                    .layers(1);

                unsafe { device.create_framebuffer(&create_info, None) }
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { framebuffers })
    }

    /// Framebuffer for swapchain image `index`.
    pub fn get(&self, index: u32) -> Option<vk::Framebuffer> {
        self.framebuffers.get(index as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }

    /// # Safety
    /// The device must be valid and no framebuffer may be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        for &framebuffer in &self.framebuffers {
            unsafe { device.destroy_framebuffer(framebuffer, None) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GpuError;

    fn clear_color(rgba: [f32; 4]) -> vk::ClearValue {
        vk::ClearValue {
            color: vk::ClearColorValue { float32: rgba },
        }
    }

    #[test]
    fn single_attachment_gives_one_clear_value() {
        let mut info = RenderPassInfo::new();
        let color = [0.1, 0.2, 0.3, 1.0];

        let index = info
            .push_attachment(
                present_color_attachment(vk::Format::B8G8R8A8_UNORM),
                clear_color(color),
            )
            .unwrap();
        assert_eq!(index, 0);

        let subpass = SubpassInfo::new().color(index, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(info.push_subpass(subpass).unwrap(), 0);
        info.push_dependency(acquire_dependency()).unwrap();

        assert_eq!(info.clear_values().len(), 1);
        let stored = unsafe { info.clear_values()[0].color.float32 };
        assert_eq!(stored, color);
    }

    #[test]
    fn attachments_are_indexed_in_insertion_order() {
        let mut info = RenderPassInfo::new();
        for i in 0..3 {
            let index = info
                .push_attachment(
                    present_color_attachment(vk::Format::R8G8B8A8_UNORM),
                    clear_color([i as f32; 4]),
                )
                .unwrap();
            assert_eq!(index, i);
        }

        let second = unsafe { info.clear_values()[1].color.float32 };
        assert_eq!(second, [1.0; 4]);
    }

    #[test]
    fn subpass_capacity_is_bounded() {
        let mut info = RenderPassInfo::new();
        for _ in 0..MAX_SUBPASSES {
            info.push_subpass(SubpassInfo::new()).unwrap();
        }

        let err = info.push_subpass(SubpassInfo::new()).unwrap_err();
        assert!(matches!(
            err,
            GpuError::CapacityExceeded {
                capacity: MAX_SUBPASSES,
                ..
            }
        ));
        assert_eq!(info.subpass_count(), MAX_SUBPASSES);
    }

    #[test]
    fn subpass_description_points_at_references() {
        let subpass = SubpassInfo::new()
            .color(0, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .input(1, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .preserve(2);

        let description = subpass.describe();
        assert_eq!(description.color_attachment_count, 1);
        assert_eq!(description.input_attachment_count, 1);
        assert_eq!(description.preserve_attachment_count, 1);
        assert!(description.p_depth_stencil_attachment.is_null());
    }
}
