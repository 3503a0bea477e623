//! # Vertex Data Structures
//!
//! GPU vertex format shared by loaded models and procedural geometry.

/// A mesh vertex with position, texture coordinates and normal.
///
/// The `#[repr(C)]` layout is what the vertex buffer layouts below describe.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3D {
    /// Object-space position [x, y, z]
    pub position: [f32; 3],
    /// Texture coordinates [u, v]
    pub tex_coords: [f32; 2],
    /// Normal vector [nx, ny, nz]
    pub normal: [f32; 3],
}

const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2, 2 => Float32x3];

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![0 => Float32x3];

impl Vertex3D {
    /// Full layout:
    /// - location 0: position (Float32x3)
    /// - location 1: tex_coords (Float32x2)
    /// - location 2: normal (Float32x3)
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex3D>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }

    /// Same buffer, position only. Used by the depth and light-marker passes.
    pub fn position_only_desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex3D>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &POSITION_ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_struct() {
        let layout = Vertex3D::desc();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(layout.attributes[2].offset, 20);
        assert_eq!(
            Vertex3D::position_only_desc().array_stride,
            layout.array_stride
        );
    }
}
