//! Omnidirectional shadow depth pass.
//!
//! For every light the scene is rendered six times, once per cube face, into
//! the light's depth cubemap through the shared [`ShadowFramebuffer`]. The
//! light-space matrices of all lights are uploaded in a single buffer write
//! per frame; dynamic offsets select the light and the face for each pass.
//! The fragment stage stores `distance(fragment, light) / far` as depth, which
//! the shaded program compares against when testing for occlusion.

use cgmath::Matrix4;
use wgpu::{CommandEncoder, Device, Queue};

use crate::{
    config::{RenderConfig, LIGHT_COUNT},
    error::ShaderError,
    gfx::{
        camera::camera_utils::convert_matrix4_to_array,
        lighting::{cube_projection, CubemapFace, DepthCubemap, PointLight},
        scene::{ModelBindings, Scene},
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::DynamicUniformBuffer,
    },
};

use super::{
    program::{DepthConfig, PipelineConfig, Program, VertexInput},
    shader::{ShaderModule, ShaderSource},
    shadow_framebuffer::ShadowFramebuffer,
};

/// Bind group index of the per-model uniform in the depth program.
const MODEL_GROUP: u32 = 1;

/// Light-space data of one light. Must match `ShadowLight` in `depth.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowLightUniform {
    pub face_matrices: [[[f32; 4]; 4]; 6],
    /// xyz: light position, w: far plane.
    pub light_position: [f32; 4],
}

impl ShadowLightUniform {
    pub fn new(light: &PointLight, projection: &Matrix4<f32>, far: f32) -> Self {
        let position = light.position();
        Self {
            face_matrices: light.light_space_matrices(projection).map(convert_matrix4_to_array),
            light_position: [position.x, position.y, position.z, far],
        }
    }
}

/// Face selector. Must match `Face` in `depth.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FaceUniform {
    pub index: u32,
    _pad: [u32; 3],
}

impl FaceUniform {
    pub fn new(face: CubemapFace) -> Self {
        Self {
            index: face.index() as u32,
            _pad: [0; 3],
        }
    }
}

pub struct ShadowPass {
    projection: Matrix4<f32>,
    far: f32,
    lights: DynamicUniformBuffer<ShadowLightUniform>,
    faces: DynamicUniformBuffer<FaceUniform>,
    _bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
    program: Program,
    framebuffer: ShadowFramebuffer,
}

impl ShadowPass {
    pub fn new(
        device: &Device,
        queue: &Queue,
        model_bindings: &ModelBindings,
        shader: &ShaderSource,
        config: &RenderConfig,
    ) -> Result<Self, ShaderError> {
        let lights = DynamicUniformBuffer::<ShadowLightUniform>::new(device, LIGHT_COUNT);
        let faces = DynamicUniformBuffer::<FaceUniform>::new(device, CubemapFace::ALL.len());
        faces.write_all(queue, &CubemapFace::ALL.map(FaceUniform::new));

        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform_dynamic(
                DynamicUniformBuffer::<ShadowLightUniform>::element_size(),
            ))
            .next_binding_vertex(binding_types::uniform_dynamic(
                DynamicUniformBuffer::<FaceUniform>::element_size(),
            ))
            .create(device, "Shadow Bind Group Layout");

        let bind_group = BindGroupBuilder::new(&bind_group_layout)
            .resource(lights.binding_resource())
            .resource(faces.binding_resource())
            .create(device, "Shadow Bind Group");

        let module = ShaderModule::load(device, shader)?;
        let program = Program::link(
            device,
            module.vertex_fragment()?,
            &PipelineConfig::new("Shadow Depth Program")
                .with_bind_group_layouts(vec![
                    bind_group_layout.layout.clone(),
                    model_bindings.bind_group_layout().clone(),
                ])
                .with_vertex_input(VertexInput::MeshPositions)
                // Faces are rendered Y-flipped, which reverses the winding.
                .with_cull_mode(None)
                .with_depth(DepthConfig::less(DepthCubemap::FORMAT)),
        )?;

        // The projection never changes, so it is built once here.
        let projection = cube_projection(config.shadow_znear, config.shadow_zfar);

        Ok(Self {
            projection,
            far: config.shadow_zfar,
            lights,
            faces,
            _bind_group_layout: bind_group_layout,
            bind_group,
            program,
            framebuffer: ShadowFramebuffer::new(config.shadow_resolution),
        })
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn framebuffer(&self) -> &ShadowFramebuffer {
        &self.framebuffer
    }

    pub fn light_uniforms(&self, lights: &[PointLight]) -> Vec<ShadowLightUniform> {
        lights
            .iter()
            .map(|light| ShadowLightUniform::new(light, &self.projection, self.far))
            .collect()
    }

    /// Uploads the matrices of every light, then encodes six depth passes
    /// per light. The framebuffer is left unbound afterwards.
    pub fn encode(&mut self, queue: &Queue, encoder: &mut CommandEncoder, lights: &[PointLight], scene: &Scene) {
        self.lights.write_all(queue, &self.light_uniforms(lights));

        for (index, light) in lights.iter().enumerate() {
            self.framebuffer.bind_light(index, light);
            let resolution = light.depth_cubemap().resolution() as f32;

            for face in CubemapFace::ALL {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Shadow Depth Pass"),
                    color_attachments: &[],
                    depth_stencil_attachment: self.framebuffer.depth_attachment(face),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });

                pass.set_viewport(0.0, 0.0, resolution, resolution, 0.0, 1.0);
                pass.set_pipeline(self.program.pipeline());
                pass.set_bind_group(
                    0,
                    &self.bind_group,
                    &[self.lights.offset(index), self.faces.offset(face.index())],
                );
                scene.draw_geometry(&mut pass, MODEL_GROUP);
            }
        }

        self.framebuffer.unbind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<ShadowLightUniform>(), 400);
        assert_eq!(std::mem::size_of::<FaceUniform>(), 16);
    }

    #[test]
    fn test_face_uniform_indices() {
        let indices: Vec<u32> = CubemapFace::ALL.map(FaceUniform::new).iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }
}
