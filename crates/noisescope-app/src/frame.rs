//! Per-frame context for rendering.

use ash::vk;

/// The frame being recorded.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// Command buffer of the acquired image, inside the render pass.
    pub command_buffer: vk::CommandBuffer,
    pub image_index: u32,
    /// Frame-in-flight slot.
    pub slot: usize,
    /// Seconds since the previous frame.
    pub dt: f32,
    pub frame_number: u64,
}
