//! Render error types.

use noisescope_gpu::GpuError;
use thiserror::Error;

/// Errors from meshes, entities and harness pipelines.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error("already at max entity count of {limit}")]
    EntityLimit { limit: usize },

    #[error("mesh {what} capacity {capacity} exceeded by push of {pushed}")]
    MeshCapacity {
        what: &'static str,
        capacity: usize,
        pushed: usize,
    },

    #[error("mesh has not been uploaded")]
    MeshNotUploaded,

    #[error("mesh was already uploaded")]
    MeshAlreadyUploaded,
}

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;
