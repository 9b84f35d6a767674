//! Host-side meshes and the shared device arrays they are uploaded into.
//!
//! Every mesh lives in one pair of device-local arrays ([`MeshData`]). A mesh
//! is filled on the host, uploaded once, and afterwards drawn by the offsets
//! its data landed at.

use ash::vk;
use noisescope_gpu::{GpuArray, GraphicsMemory, MemoryConfig};

use crate::error::{RenderError, Result};
use crate::vertex::Vertex;

/// Alignment of the shared vertex and index arrays.
pub const MESH_DATA_ALIGN: u64 = 16;

/// Capacity limits of one mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshInfo {
    pub max_vertex_count: usize,
    pub max_index_count: usize,
}

impl Default for MeshInfo {
    fn default() -> Self {
        Self {
            max_vertex_count: 16,
            max_index_count: 64,
        }
    }
}

/// Where an uploaded mesh sits in [`MeshData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRange {
    pub index_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
}

/// Device-local vertex and index arrays shared by all meshes.
pub struct MeshData {
    pub vertices: GpuArray<Vertex>,
    pub indices: GpuArray<u32>,
}

impl MeshData {
    /// Reserve the arrays on the device stack.
    pub fn create(memory: &mut GraphicsMemory) -> Result<Self> {
        let MemoryConfig {
            mesh_vertex_capacity,
            mesh_index_capacity,
            ..
        } = *memory.config();

        Ok(Self {
            vertices: memory.create_device_array(mesh_vertex_capacity, MESH_DATA_ALIGN)?,
            indices: memory.create_device_array(mesh_index_capacity, MESH_DATA_ALIGN)?,
        })
    }
}

/// Vertices and indices of one shape.
#[derive(Debug, Clone)]
pub struct Mesh {
    info: MeshInfo,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    uploaded: Option<DrawRange>,
}

impl Mesh {
    pub fn new(info: MeshInfo) -> Self {
        Self {
            info,
            vertices: Vec::with_capacity(info.max_vertex_count),
            indices: Vec::with_capacity(info.max_index_count),
            uploaded: None,
        }
    }

    /// Append vertices. Nothing is added if they do not all fit.
    pub fn push_vertices(&mut self, vertices: &[Vertex]) -> Result<()> {
        if self.vertices.len() + vertices.len() > self.info.max_vertex_count {
            return Err(RenderError::MeshCapacity {
                what: "vertex",
                capacity: self.info.max_vertex_count,
                pushed: vertices.len(),
            });
        }
        self.vertices.extend_from_slice(vertices);
        Ok(())
    }

    pub fn push_vertex(&mut self, vertex: Vertex) -> Result<()> {
        self.push_vertices(std::slice::from_ref(&vertex))
    }

    /// Append indices. Nothing is added if they do not all fit.
    pub fn push_indices(&mut self, indices: &[u32]) -> Result<()> {
        if self.indices.len() + indices.len() > self.info.max_index_count {
            return Err(RenderError::MeshCapacity {
                what: "index",
                capacity: self.info.max_index_count,
                pushed: indices.len(),
            });
        }
        self.indices.extend_from_slice(indices);
        Ok(())
    }

    pub fn push_index(&mut self, index: u32) -> Result<()> {
        self.push_indices(&[index])
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Copy the mesh into `data`. A mesh can only be uploaded once.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn upload(&mut self, memory: &mut GraphicsMemory, data: &mut MeshData) -> Result<DrawRange> {
        if self.uploaded.is_some() {
            return Err(RenderError::MeshAlreadyUploaded);
        }
        self.check_fits(data.vertices.remaining(), data.indices.remaining())?;

        let vertex_offset = memory.push(&mut data.vertices, &self.vertices)?;
        let first_index = memory.push(&mut data.indices, &self.indices)?;

        let range = DrawRange {
            index_count: self.indices.len() as u32,
            first_index,
            vertex_offset: vertex_offset as i32,
        };
        tracing::debug!(
            "Uploaded mesh: {} vertices at {vertex_offset}, {} indices at {first_index}",
            self.vertices.len(),
            self.indices.len()
        );

        self.uploaded = Some(range);
        Ok(range)
    }

    /// Fail unless both the vertices and the indices fit in the space left.
    fn check_fits(&self, vertices_left: u32, indices_left: u32) -> Result<()> {
        for (what, left, pushed) in [
            ("vertex data", vertices_left, self.vertices.len()),
            ("index data", indices_left, self.indices.len()),
        ] {
            if pushed > left as usize {
                return Err(RenderError::MeshCapacity {
                    what,
                    capacity: left as usize,
                    pushed,
                });
            }
        }
        Ok(())
    }

    /// Offsets of the uploaded data.
    pub fn draw_range(&self) -> Result<DrawRange> {
        self.uploaded.ok_or(RenderError::MeshNotUploaded)
    }
}

/// Bind the shared vertex and index arrays.
///
/// # Safety
/// `cmd` must be recording and `data` must be alive until it completes.
pub unsafe fn bind_mesh_data(device: &ash::Device, cmd: vk::CommandBuffer, data: &MeshData) {
    let vertices = data.vertices.region();
    let indices = data.indices.region();
    unsafe {
        device.cmd_bind_vertex_buffers(cmd, 0, &[vertices.buffer], &[vertices.offset]);
        device.cmd_bind_index_buffer(cmd, indices.buffer, indices.offset, vk::IndexType::UINT32);
    }
}

/// Draw one uploaded mesh from the bound mesh data.
///
/// # Safety
/// `cmd` must be recording inside a render pass with a pipeline bound.
pub unsafe fn draw_mesh(device: &ash::Device, cmd: vk::CommandBuffer, range: DrawRange) {
    unsafe {
        device.cmd_draw_indexed(
            cmd,
            range.index_count,
            1,
            range.first_index,
            range.vertex_offset,
            0,
        );
    }
}

/// The built-in shapes.
pub mod shapes {
    use super::{Mesh, MeshInfo, Result, Vertex};

    /// Unit triangle in the XY plane.
    pub fn triangle() -> Result<Mesh> {
        let mut mesh = Mesh::new(MeshInfo::default());
        mesh.push_vertices(&[
            Vertex::new([-0.5, 0.5, 0.0], [0.0, 0.0]),
            Vertex::new([0.0, -0.5, 0.0], [0.5, 1.0]),
            Vertex::new([0.5, 0.5, 0.0], [1.0, 1.0]),
        ])?;
        mesh.push_indices(&[0, 1, 2])?;
        Ok(mesh)
    }

    /// Unit quad in the XY plane, UVs covering the whole texture.
    pub fn quad() -> Result<Mesh> {
        let mut mesh = Mesh::new(MeshInfo::default());
        mesh.push_vertices(&[
            Vertex::new([-0.5, 0.5, 0.0], [0.0, 0.0]),
            Vertex::new([-0.5, -0.5, 0.0], [0.0, 1.0]),
            Vertex::new([0.5, -0.5, 0.0], [1.0, 1.0]),
            Vertex::new([0.5, 0.5, 0.0], [1.0, 0.0]),
        ])?;
        mesh.push_indices(&[0, 1, 2, 0, 2, 3])?;
        Ok(mesh)
    }

    /// Flat hexagon fanned from its first corner.
    pub fn hexagon() -> Result<Mesh> {
        let mut mesh = Mesh::new(MeshInfo::default());
        mesh.push_vertices(&[
            Vertex::new([-0.25, -0.5, 0.0], [0.0, 0.0]),
            Vertex::new([0.25, -0.5, 0.0], [0.0, 0.0]),
            Vertex::new([0.5, 0.0, 0.0], [0.0, 0.0]),
            Vertex::new([0.25, 0.5, 0.0], [0.0, 0.0]),
            Vertex::new([-0.25, 0.5, 0.0], [0.0, 0.0]),
            Vertex::new([-0.5, 0.0, 0.0], [0.0, 0.0]),
        ])?;
        mesh.push_indices(&[0, 1, 2, 0, 2, 3, 0, 3, 4, 0, 4, 5])?;
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertices(count: usize) -> Vec<Vertex> {
        vec![Vertex::default(); count]
    }

    #[test]
    fn overfilling_vertices_fails_without_partial_push() {
        let mut mesh = Mesh::new(MeshInfo {
            max_vertex_count: 16,
            max_index_count: 64,
        });
        mesh.push_vertices(&vertices(4)).unwrap();
        mesh.push_indices(&[0, 1, 2, 0, 2, 3]).unwrap();

        let err = mesh.push_vertices(&vertices(13)).unwrap_err();
        assert!(matches!(
            err,
            RenderError::MeshCapacity {
                what: "vertex",
                capacity: 16,
                pushed: 13
            }
        ));
        assert_eq!(mesh.vertices().len(), 4);
        assert_eq!(mesh.indices().len(), 6);

        mesh.push_vertices(&vertices(12)).unwrap();
        assert!(mesh.push_vertex(Vertex::default()).is_err());
    }

    #[test]
    fn index_capacity_is_enforced() {
        let mut mesh = Mesh::new(MeshInfo {
            max_vertex_count: 4,
            max_index_count: 3,
        });
        mesh.push_indices(&[0, 1]).unwrap();
        assert!(mesh.push_indices(&[2, 3]).is_err());
        mesh.push_index(2).unwrap();
        assert_eq!(mesh.indices(), [0, 1, 2]);
    }

    #[test]
    fn upload_space_is_checked_for_indices_too() {
        let mut mesh = Mesh::new(MeshInfo::default());
        mesh.push_vertices(&vertices(4)).unwrap();
        mesh.push_indices(&[0, 1, 2, 0, 2, 3, 0, 1, 2, 0, 2, 3]).unwrap();

        mesh.check_fits(4, 12).unwrap();
        assert!(matches!(
            mesh.check_fits(16, 6).unwrap_err(),
            RenderError::MeshCapacity {
                what: "index data",
                capacity: 6,
                pushed: 12
            }
        ));
        assert!(matches!(
            mesh.check_fits(3, 64).unwrap_err(),
            RenderError::MeshCapacity {
                what: "vertex data",
                ..
            }
        ));
    }

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn failed_upload_reserves_nothing() {
        use noisescope_gpu::GpuContextBuilder;

        let gpu = GpuContextBuilder::new().validation(false).build().unwrap();
        let mut memory = GraphicsMemory::new(
            &gpu,
            MemoryConfig {
                host_stack_size: 4 * 1024 * 1024,
                device_stack_size: 4 * 1024 * 1024,
                staging_size: 1024 * 1024,
                mesh_vertex_capacity: 16,
                mesh_index_capacity: 6,
            },
        )
        .unwrap();
        let mut data = MeshData::create(&mut memory).unwrap();

        let mut mesh = shapes::hexagon().unwrap();
        assert!(mesh.upload(&mut memory, &mut data).is_err());
        assert_eq!(data.vertices.count(), 0);
        assert_eq!(data.indices.count(), 0);
        assert!(mesh.draw_range().is_err());

        let mut quad = shapes::quad().unwrap();
        let range = quad.upload(&mut memory, &mut data).unwrap();
        assert_eq!(range.first_index, 0);
        assert_eq!(range.vertex_offset, 0);

        unsafe { memory.destroy(&gpu).unwrap() };
    }

    #[test]
    fn draw_range_requires_upload() {
        let mesh = shapes::triangle().unwrap();
        assert!(matches!(mesh.draw_range(), Err(RenderError::MeshNotUploaded)));
    }

    #[test]
    fn builtin_shapes_index_their_vertices() {
        for mesh in [shapes::triangle(), shapes::quad(), shapes::hexagon()] {
            let mesh = mesh.unwrap();
            assert_eq!(mesh.indices().len() % 3, 0);
            let count = mesh.vertices().len() as u32;
            assert!(mesh.indices().iter().all(|&i| i < count));
        }
        assert_eq!(shapes::hexagon().unwrap().indices().len(), 12);
    }
}
