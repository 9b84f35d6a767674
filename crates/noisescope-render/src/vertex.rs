//! Vertex layout shared by every harness mesh.

use ash::vk;
use glam::{Vec2, Vec3};

/// Position and texture coordinate.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    pub const fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position: Vec3::from_array(position),
            uv: Vec2::from_array(uv),
        }
    }

    /// Size of one vertex in bytes.
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;

    /// Per-vertex binding 0.
    pub const fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: Self::STRIDE,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Location 0: position.
    pub const fn position_attribute() -> vk::VertexInputAttributeDescription {
        vk::VertexInputAttributeDescription {
            location: 0,
            binding: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: 0,
        }
    }

    /// Location 1: texture coordinate.
    pub const fn uv_attribute() -> vk::VertexInputAttributeDescription {
        vk::VertexInputAttributeDescription {
            location: 1,
            binding: 0,
            format: vk::Format::R32G32_SFLOAT,
            offset: std::mem::size_of::<Vec3>() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_tightly_packed() {
        assert_eq!(Vertex::STRIDE, 20);
        assert_eq!(Vertex::binding_description().stride, 20);
        assert_eq!(Vertex::position_attribute().offset, 0);
        assert_eq!(Vertex::uv_attribute().offset, 12);
        assert_eq!(Vertex::uv_attribute().format, vk::Format::R32G32_SFLOAT);
    }

    #[test]
    fn casts_to_bytes() {
        let vertex = Vertex::new([1.0, 2.0, 3.0], [0.5, 0.25]);
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&vertex));
        assert_eq!(floats, [1.0, 2.0, 3.0, 0.5, 0.25]);
    }
}
