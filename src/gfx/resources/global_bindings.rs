//! Global uniform bindings for camera, lights and shadow maps
//!
//! Group 0 of every main-pass pipeline. It carries the per-frame camera data,
//! the point-light block and one depth cubemap per light, each on its own
//! binding so the shaded program can sample all of them in one draw.

use cgmath::{Matrix3, Matrix4, Point3};

use crate::{
    config::LIGHT_COUNT,
    gfx::{
        camera::camera_utils::convert_matrix4_to_array,
        lighting::{LightUniformSlots, LightsBlock, PointLight},
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Per-frame camera data. Must match `Globals` in the WGSL shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniform {
    pub view_proj: [[f32; 4]; 4],
    /// Projection times the rotation-only part of the view matrix.
    pub skybox_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// Surface width, surface height, crosshair radius, unused.
    pub viewport: [f32; 4],
}

impl GlobalUniform {
    pub fn new(
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        camera_position: Point3<f32>,
        viewport: (u32, u32),
        pointer_radius: f32,
    ) -> Self {
        Self {
            view_proj: convert_matrix4_to_array(projection * view),
            skybox_view_proj: convert_matrix4_to_array(projection * rotation_only(view)),
            camera_position: [camera_position.x, camera_position.y, camera_position.z, 1.0],
            viewport: [viewport.0 as f32, viewport.1 as f32, pointer_radius, 0.0],
        }
    }
}

/// Drops the translation column of a view matrix.
pub fn rotation_only(view: Matrix4<f32>) -> Matrix4<f32> {
    let upper = Matrix3::from_cols(view.x.truncate(), view.y.truncate(), view.z.truncate());
    Matrix4::from(upper)
}

pub type GlobalUBO = UniformBuffer<GlobalUniform>;

/// Owns the group 0 layout, its buffers and its bind group.
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
    globals: GlobalUBO,
    lights: wgpu::Buffer,
    slots: LightUniformSlots,
    _shadow_sampler: wgpu::Sampler,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device, lights: &[PointLight; LIGHT_COUNT]) -> Self {
        let mut layout_builder = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .next_binding_fragment(binding_types::uniform());
        for _ in 0..LIGHT_COUNT {
            layout_builder = layout_builder.next_binding_fragment(binding_types::texture_depth_cube());
        }
        let bind_group_layout = layout_builder
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::NonFiltering))
            .create(device, "Globals Bind Group Layout");

        let globals = GlobalUBO::new(device);
        let lights_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Lights Uniform Buffer"),
            size: std::mem::size_of::<LightsBlock>() as u64,
            usage: wgpu::BufferUsages::UNIFORM
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Cubemap Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let mut group_builder = BindGroupBuilder::new(&bind_group_layout)
            .resource(globals.binding_resource())
            .buffer(&lights_buffer);
        for light in lights {
            group_builder = group_builder.texture(light.depth_cubemap().cube_view());
        }
        let bind_group = group_builder
            .sampler(&shadow_sampler)
            .create(device, "Globals Bind Group");

        Self {
            bind_group_layout,
            bind_group,
            globals,
            lights: lights_buffer,
            slots: LightUniformSlots::new(),
            _shadow_sampler: shadow_sampler,
        }
    }

    pub fn update_globals(&mut self, queue: &wgpu::Queue, content: GlobalUniform) {
        self.globals.update_content(queue, content);
    }

    /// Uploads every light field through the precomputed slot table.
    pub fn upload_lights(&self, queue: &wgpu::Queue, lights: &[PointLight], shadow_far: f32) {
        self.slots.upload(queue, &self.lights, lights, shadow_far);
    }

    pub fn slots(&self) -> &LightUniformSlots {
        &self.slots
    }

    /// The [`LightsBlock`] buffer bound at binding 1. Copyable, so its
    /// contents can be read back.
    pub fn lights_buffer(&self) -> &wgpu::Buffer {
        &self.lights
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
