//! Vulkan layer of the noisescope harness.
//!
//! This crate provides:
//! - Instance, device selection and capability snapshot
//! - Stack allocation of GPU buffers via gpu-allocator
//! - Staging uploads to device-local buffers and images
//! - Render pass, pipeline and descriptor builders
//! - Frames-in-flight synchronisation and presentation

pub mod bounded;
pub mod capabilities;
pub mod command;
pub mod context;
pub mod descriptors;
pub mod error;
pub mod frame;
pub mod instance;
pub mod memory;
pub mod pipeline;
pub mod render_pass;
pub mod stack;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod transfer;

pub use ash;
pub use bounded::BoundedVec;
pub use capabilities::{GpuCapabilities, GpuVendor};
pub use command::{CommandPool, TempCommands};
pub use context::{GpuContext, GpuContextBuilder};
pub use descriptors::{
    update_descriptor_set, DescriptorBinding, DescriptorKind, DescriptorPool,
    DescriptorPoolSizes, DescriptorSet, DescriptorWrite,
};
pub use error::{validate, GpuError, Result};
pub use frame::{FrameLoop, FrameRing};
pub use instance::{QueueFamilies, RequiredFeatures};
pub use memory::{GpuAllocator, GpuBuffer, GpuImage};
pub use pipeline::{
    create_pipeline, GraphicsPipeline, PipelineInfo, ShaderModule, DEFAULT_COLOR_BLEND_ATTACHMENT,
};
pub use render_pass::{Framebuffers, RenderPass, RenderPassInfo, SubpassInfo};
pub use stack::{GpuArray, MemoryRegion, MemoryStack, StackDesc, Visibility};
pub use surface::{SurfaceCapabilities, SurfaceContext};
pub use swapchain::Swapchain;
pub use sync::FrameSync;
pub use texture::Texture;
pub use transfer::{GraphicsMemory, MemoryConfig};
