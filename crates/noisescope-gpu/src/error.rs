//! GPU error types.

use ash::vk;
use std::path::PathBuf;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// Vulkan loader could not be opened
    #[error("Failed to load Vulkan: {0}")]
    Loading(#[from] ash::LoadingError),

    /// No suitable GPU found
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// None of the candidate depth formats is supported
    #[error("No supported depth format")]
    NoDepthFormat,

    /// No memory type satisfies the request
    #[error("No memory type matches type bits {type_bits:#b} with flags {flags:?}")]
    NoMemoryType {
        type_bits: u32,
        flags: vk::MemoryPropertyFlags,
    },

    /// Memory allocation failed
    #[error("Memory allocation failed: {0}")]
    AllocationFailed(String),

    /// Bump allocation past the end of a memory stack
    #[error(
        "allocating {size} bytes aligned by {align} to offset {offset} on stack (size={capacity}) \
         would overflow by {overflow} bytes"
    )]
    StackOverflow {
        size: u64,
        align: u64,
        offset: u64,
        capacity: u64,
        overflow: u64,
    },

    /// Push past the capacity of a typed GPU array
    #[error(
        "pushing {pushed} elements to array (count={count}, capacity={capacity}) \
         would overflow by {overflow}"
    )]
    ArrayOverflow {
        pushed: u32,
        count: u32,
        capacity: u32,
        overflow: u32,
    },

    /// A fixed-capacity builder list is full
    #[error("{what} is full (capacity {capacity})")]
    CapacityExceeded { what: &'static str, capacity: usize },

    /// Shader bytecode could not be loaded
    #[error("failed to load bytecode from {}: {reason}", path.display())]
    ShaderLoad { path: PathBuf, reason: String },

    /// Surface creation failed
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Pipeline creation failed
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The validation layer reported errors
    #[error("validation layer reported {0} error(s)")]
    Validation(u32),
}

/// Result type for GPU operations.
pub type Result<T> = std::result::Result<T, GpuError>;

/// Check a raw Vulkan status code.
///
/// Success is a no-op. Non-error statuses are logged and accepted; every
/// error code is returned as [`GpuError::Vulkan`].
pub fn validate(result: vk::Result) -> Result<()> {
    match result {
        vk::Result::SUCCESS => Ok(()),
        vk::Result::NOT_READY
        | vk::Result::TIMEOUT
        | vk::Result::EVENT_SET
        | vk::Result::EVENT_RESET
        | vk::Result::INCOMPLETE
        | vk::Result::SUBOPTIMAL_KHR => {
            tracing::warn!("Vulkan returned non-error status {result:?}");
            Ok(())
        }
        error => Err(GpuError::Vulkan(error)),
    }
}
