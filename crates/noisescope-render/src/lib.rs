//! Scene layer of the noisescope harness.
//!
//! Meshes are uploaded once into shared device arrays, entities place them
//! in the world, and [`HarnessPipelines`] records one draw per entity. The
//! [`Display`] is a CPU pixel buffer copied into a texture every frame.

pub mod display;
pub mod entity;
pub mod error;
pub mod mesh;
pub mod pipelines;
pub mod vertex;
pub mod view;

pub use display::{Display, CLEAR_COLOR};
pub use entity::{Entities, Entity, EntityId, PipelineKind, MAX_ENTITIES};
pub use error::{RenderError, Result};
pub use mesh::{shapes, DrawRange, Mesh, MeshData, MeshInfo};
pub use pipelines::HarnessPipelines;
pub use vertex::Vertex;
pub use view::{Transform, View};
