//! Meshes and models
//!
//! A [`Mesh`] owns its vertex and index buffers and references its texture
//! maps. A [`Model`] owns one or more meshes and a world transform that is
//! applied identically to all of them.

use cgmath::{Deg, InnerSpace, Matrix, Matrix4, SquareMatrix, Vector3, Zero};
use wgpu::{util::DeviceExt, Device};

use crate::{
    gfx::{
        camera::camera_utils::convert_matrix4_to_array,
        geometry::GeometryData,
        resources::material::{MaterialBindings, MeshTextures},
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
    },
};

use super::vertex::Vertex3D;

/// Per-model uniform. Must match `Model` in the WGSL shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub tint: [f32; 4],
}

impl ModelUniform {
    pub fn new(world: Matrix4<f32>, tint: [f32; 3]) -> Self {
        let normal = world
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(Matrix4::identity);
        Self {
            model: convert_matrix4_to_array(world),
            normal: convert_matrix4_to_array(normal),
            tint: [tint[0], tint[1], tint[2], 1.0],
        }
    }
}

/// Layout of the per-model bind group, shared by the depth and main passes.
pub struct ModelBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
}

impl ModelBindings {
    pub fn new(device: &Device) -> Self {
        Self {
            bind_group_layout: BindGroupLayoutBuilder::new()
                .next_binding_rendering(binding_types::uniform())
                .create(device, "Model Bind Group Layout"),
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    fn create_bind_group(&self, device: &Device, buffer: &wgpu::Buffer, label: &str) -> wgpu::BindGroup {
        BindGroupBuilder::new(&self.bind_group_layout)
            .buffer(buffer)
            .create(device, label)
    }
}

struct MeshGpu {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    material: wgpu::BindGroup,
}

pub struct Mesh {
    vertices: Vec<Vertex3D>,
    indices: Vec<u32>,
    textures: MeshTextures,
    gpu: Option<MeshGpu>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex3D>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            textures: MeshTextures::default(),
            gpu: None,
        }
    }

    pub fn from_geometry(data: &GeometryData) -> Self {
        Self::new(data.to_vertices(), data.indices.clone())
    }

    pub fn with_textures(mut self, textures: MeshTextures) -> Self {
        self.textures = textures;
        self
    }

    pub fn textures(&self) -> &MeshTextures {
        &self.textures
    }

    pub fn vertices(&self) -> &[Vertex3D] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.is_some()
    }

    /// Creates the vertex/index buffers and the material bind group.
    pub fn upload(&mut self, device: &Device, materials: &MaterialBindings, label: &str) {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let material = materials.create_bind_group(device, &self.textures, &format!("{label} Material"));

        log::trace!(
            "Uploaded mesh '{label}': {} vertices, {} indices, {} textures",
            self.vertices.len(),
            self.indices.len(),
            self.textures.count()
        );

        self.gpu = Some(MeshGpu {
            vertex_buffer,
            index_buffer,
            material,
        });
    }
}

/// Averaged per-vertex normals for meshes that ship without any.
pub fn calculate_smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut sums = vec![Vector3::zero(); positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        let (v0, v1, v2) = (
            Vector3::from(positions[a]),
            Vector3::from(positions[b]),
            Vector3::from(positions[c]),
        );
        let face_normal = (v1 - v0).cross(v2 - v0);
        for index in [a, b, c] {
            sums[index] += face_normal;
        }
    }

    sums.into_iter()
        .map(|sum| {
            if sum.magnitude2() > 0.0 {
                sum.normalize().into()
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect()
}

/// World placement of a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub rotation_axis: Vector3<f32>,
    pub rotation_angle: Deg<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            rotation_axis: Vector3::unit_y(),
            rotation_angle: Deg(0.0),
        }
    }
}

impl Transform {
    /// Translation, then scale, then rotation: `T * S * R`.
    pub fn matrix(&self) -> Matrix4<f32> {
        let rotation = if self.rotation_axis.magnitude2() > 0.0 && self.rotation_angle.0 != 0.0 {
            Matrix4::from_axis_angle(self.rotation_axis.normalize(), self.rotation_angle)
        } else {
            Matrix4::identity()
        };
        Matrix4::from_translation(self.position)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
            * rotation
    }
}

pub struct Model {
    name: String,
    meshes: Vec<Mesh>,
    transform: Transform,
    tint: [f32; 3],
    flip_uvs: bool,
    bind_group: Option<wgpu::BindGroup>,
}

impl Model {
    pub fn new(name: impl Into<String>, meshes: Vec<Mesh>) -> Self {
        Self {
            name: name.into(),
            meshes,
            transform: Transform::default(),
            tint: [1.0, 1.0, 1.0],
            flip_uvs: false,
            bind_group: None,
        }
    }

    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.position = Vector3::new(x, y, z);
        self
    }

    pub fn with_scale(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.scale = Vector3::new(x, y, z);
        self
    }

    pub fn with_rotation(mut self, axis: Vector3<f32>, angle: Deg<f32>) -> Self {
        self.transform.rotation_axis = axis;
        self.transform.rotation_angle = angle;
        self
    }

    /// Flat colour used by unlit passes (light markers).
    pub fn with_tint(mut self, tint: [f32; 3]) -> Self {
        self.tint = tint;
        self
    }

    pub(crate) fn with_flipped_uvs(mut self, flip_uvs: bool) -> Self {
        self.flip_uvs = flip_uvs;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn flip_uvs(&self) -> bool {
        self.flip_uvs
    }

    pub fn world_matrix(&self) -> Matrix4<f32> {
        self.transform.matrix()
    }

    pub fn uniform(&self) -> ModelUniform {
        ModelUniform::new(self.world_matrix(), self.tint)
    }

    /// Uploads every mesh and the model uniform.
    pub fn upload(&mut self, device: &Device, model_bindings: &ModelBindings, materials: &MaterialBindings) {
        for (index, mesh) in self.meshes.iter_mut().enumerate() {
            mesh.upload(device, materials, &format!("{}[{index}]", self.name));
        }

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Model Uniform", self.name)),
            contents: bytemuck::bytes_of(&self.uniform()),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        self.bind_group = Some(model_bindings.create_bind_group(device, &buffer, &format!("{} Model", self.name)));

        log::debug!("Uploaded model '{}' ({} meshes)", self.name, self.meshes.len());
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}

/// Draw helpers on render passes. Models or meshes that were never uploaded
/// are skipped.
pub trait DrawModel {
    /// Geometry only, no material.
    fn draw_mesh(&mut self, mesh: &Mesh);
    fn draw_mesh_textured(&mut self, mesh: &Mesh, material_group: u32);
    fn draw_model(&mut self, model: &Model, model_group: u32);
    fn draw_model_textured(&mut self, model: &Model, model_group: u32, material_group: u32);
}

impl DrawModel for wgpu::RenderPass<'_> {
    fn draw_mesh(&mut self, mesh: &Mesh) {
        let Some(gpu) = &mesh.gpu else { return };
        self.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
        self.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.index_count(), 0, 0..1);
    }

    fn draw_mesh_textured(&mut self, mesh: &Mesh, material_group: u32) {
        let Some(gpu) = &mesh.gpu else { return };
        self.set_bind_group(material_group, &gpu.material, &[]);
        self.draw_mesh(mesh);
    }

    fn draw_model(&mut self, model: &Model, model_group: u32) {
        let Some(bind_group) = model.bind_group() else { return };
        self.set_bind_group(model_group, bind_group, &[]);
        for mesh in &model.meshes {
            self.draw_mesh(mesh);
        }
    }

    fn draw_model_textured(&mut self, model: &Model, model_group: u32, material_group: u32) {
        let Some(bind_group) = model.bind_group() else { return };
        self.set_bind_group(model_group, bind_group, &[]);
        for mesh in &model.meshes {
            self.draw_mesh_textured(mesh, material_group);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Point3, Transform as _, Vector4};

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_world_matrix_is_translate_scale_rotate() {
        let model = Model::new("box", Vec::new())
            .with_position(1.0, 2.0, 3.0)
            .with_scale(2.0, 2.0, 2.0)
            .with_rotation(Vector3::unit_y(), Deg(90.0));

        // Rotation applies first: +X turns to -Z, then scales, then moves.
        let p = model.world_matrix().transform_point(Point3::new(1.0, 0.0, 0.0));
        assert!(approx_eq(p.x, 1.0));
        assert!(approx_eq(p.y, 2.0));
        assert!(approx_eq(p.z, 1.0));
    }

    #[test]
    fn test_zero_axis_means_no_rotation() {
        let transform = Transform {
            rotation_axis: Vector3::zero(),
            rotation_angle: Deg(45.0),
            ..Default::default()
        };
        assert_eq!(transform.matrix(), Matrix4::identity());
    }

    #[test]
    fn test_normal_matrix_undoes_nonuniform_scale() {
        let uniform = ModelUniform::new(Matrix4::from_nonuniform_scale(30.0, 0.01, 30.0), [1.0; 3]);
        let normal = Matrix4::from(uniform.normal) * Vector4::new(0.0, 1.0, 0.0, 0.0);
        assert!(approx_eq(normal.y, 100.0));
        assert_eq!(uniform.tint, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_smooth_normals_of_flat_quad() {
        let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 0.0, 0.0]];
        let normals = calculate_smooth_normals(&positions, &[0, 1, 2, 2, 3, 0]);
        for normal in normals {
            assert!(approx_eq(normal[1], 1.0));
        }
    }

    #[test]
    fn test_unreferenced_vertex_gets_up_normal() {
        let normals = calculate_smooth_normals(&[[0.0; 3]; 4], &[]);
        assert!(normals.iter().all(|n| *n == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_mesh_from_geometry() {
        let mesh = Mesh::from_geometry(&crate::gfx::geometry::generate_cube());
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.index_count(), 36);
        assert!(!mesh.is_uploaded());
    }
}
