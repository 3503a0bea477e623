//! The main colour pass.
//!
//! Draw order inside the pass is fixed: UI overlay, light markers, shaded
//! objects, skybox. The overlay writes depth 0 so it is never covered by the
//! geometry drawn after it, and the skybox fills only what is left at the far
//! plane.

use std::path::Path;

use cgmath::Deg;
use wgpu::{CompareFunction, Device, Face, SurfaceConfiguration};

use crate::{
    config::{RenderConfig, LIGHT_MARKER_SCALE},
    error::{with_validation, Result, ShaderError},
    gfx::{
        camera::camera_utils::Projection,
        geometry::generate_cube,
        lighting::PointLight,
        resources::{
            global_bindings::GlobalBindings, material::MaterialBindings,
            texture_resource::TextureResource,
        },
        scene::{DrawModel, Mesh, Model, ModelBindings, Scene},
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
    },
};

use super::{
    program::{polygon_mode, DepthConfig, PipelineConfig, Program, VertexInput},
    shader::{
        EmbeddedShader, ShaderModule, ShaderSource, LIGHT_MARKER_SHADER, SCENE_SHADER,
        SKYBOX_SHADER, UI_SHADER,
    },
};

const GLOBALS_GROUP: u32 = 0;
const MATERIAL_GROUP: u32 = 1;
const SCENE_MODEL_GROUP: u32 = 2;
const MARKER_MODEL_GROUP: u32 = 1;

fn link(
    device: &Device,
    shader: EmbeddedShader,
    shader_dir: Option<&Path>,
    config: PipelineConfig,
) -> Result<Program, ShaderError> {
    let module = ShaderModule::load(device, &ShaderSource::resolve(shader, shader_dir))?;
    Program::link(device, module.vertex_fragment()?, &config)
}

/// Builds the unlit marker cube for a light.
pub fn light_marker(index: usize, light: &PointLight) -> Model {
    let position = light.position();
    Model::new(
        format!("Light Marker {index}"),
        vec![Mesh::from_geometry(&generate_cube())],
    )
    .with_position(position.x, position.y, position.z)
    .with_scale(LIGHT_MARKER_SCALE, LIGHT_MARKER_SCALE, LIGHT_MARKER_SCALE)
    .with_tint(light.color().into())
}

struct Skybox {
    program: Program,
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: Option<wgpu::BindGroup>,
    cube: Mesh,
}

pub struct MainPass {
    sample_count: u32,
    clear_color: wgpu::Color,
    projection: Projection,
    ui_program: Program,
    marker_program: Program,
    scene_program: Program,
    skybox: Skybox,
    markers: Vec<Model>,
    depth_target: TextureResource,
    msaa_target: Option<TextureResource>,
}

impl MainPass {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &Device,
        surface_config: &SurfaceConfiguration,
        config: &RenderConfig,
        shader_dir: Option<&Path>,
        globals: &GlobalBindings,
        materials: &MaterialBindings,
        model_bindings: &ModelBindings,
        lights: &[PointLight],
    ) -> Result<Self> {
        let sample_count = config.msaa_samples.max(1);
        let format = surface_config.format;
        let geometry_mode = polygon_mode(config.wireframe, device.features());
        let globals_layout = globals.bind_group_layout().clone();
        let model_layout = model_bindings.bind_group_layout().clone();

        let ui_program = link(
            device,
            UI_SHADER,
            shader_dir,
            PipelineConfig::new("UI Program")
                .with_bind_group_layouts(vec![globals_layout.clone()])
                .with_vertex_input(VertexInput::None)
                .with_cull_mode(None)
                .with_depth(DepthConfig {
                    format: TextureResource::DEPTH_FORMAT,
                    write: true,
                    compare: CompareFunction::Always,
                })
                .with_sample_count(sample_count)
                .with_color_target(format),
        )?;

        let marker_program = link(
            device,
            LIGHT_MARKER_SHADER,
            shader_dir,
            PipelineConfig::new("Light Marker Program")
                .with_bind_group_layouts(vec![globals_layout.clone(), model_layout.clone()])
                .with_vertex_input(VertexInput::MeshPositions)
                .with_cull_mode(Some(Face::Back))
                .with_polygon_mode(geometry_mode)
                .with_depth(DepthConfig::less(TextureResource::DEPTH_FORMAT))
                .with_sample_count(sample_count)
                .with_color_target(format),
        )?;

        let scene_program = link(
            device,
            SCENE_SHADER,
            shader_dir,
            PipelineConfig::new("Scene Program")
                .with_bind_group_layouts(vec![
                    globals_layout.clone(),
                    materials.bind_group_layout().clone(),
                    model_layout,
                ])
                .with_vertex_input(VertexInput::Mesh)
                .with_cull_mode(Some(Face::Back))
                .with_polygon_mode(geometry_mode)
                .with_depth(DepthConfig::less(TextureResource::DEPTH_FORMAT))
                .with_sample_count(sample_count)
                .with_color_target(format),
        )?;

        let skybox_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_cube())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Skybox Bind Group Layout");
        let skybox_program = link(
            device,
            SKYBOX_SHADER,
            shader_dir,
            PipelineConfig::new("Skybox Program")
                .with_bind_group_layouts(vec![globals_layout, skybox_layout.layout.clone()])
                .with_vertex_input(VertexInput::MeshPositions)
                .with_cull_mode(None)
                .with_depth(DepthConfig {
                    format: TextureResource::DEPTH_FORMAT,
                    write: false,
                    compare: CompareFunction::LessEqual,
                })
                .with_sample_count(sample_count)
                .with_color_target(format),
        )?;
        let mut skybox_cube = Mesh::from_geometry(&generate_cube());
        skybox_cube.upload(device, materials, "Skybox");

        let mut markers: Vec<Model> = lights
            .iter()
            .enumerate()
            .map(|(index, light)| light_marker(index, light))
            .collect();
        for marker in &mut markers {
            marker.upload(device, model_bindings, materials);
        }

        let (depth_target, msaa_target) = create_targets(device, surface_config, sample_count)?;

        Ok(Self {
            sample_count,
            clear_color: config.clear_color,
            projection: Projection::new(
                surface_config.width,
                surface_config.height,
                Deg(config.fov_degrees),
                config.znear,
                config.zfar,
            ),
            ui_program,
            marker_program,
            scene_program,
            skybox: Skybox {
                program: skybox_program,
                bind_group_layout: skybox_layout,
                bind_group: None,
                cube: skybox_cube,
            },
            markers,
            depth_target,
            msaa_target,
        })
    }

    /// Recreates the size-dependent targets and the projection matrix. The
    /// old targets are kept if the new ones cannot be created.
    pub fn resize(&mut self, device: &Device, surface_config: &SurfaceConfiguration) -> Result<()> {
        let (depth_target, msaa_target) = create_targets(device, surface_config, self.sample_count)?;
        self.projection.resize(surface_config.width, surface_config.height);
        self.depth_target = depth_target;
        self.msaa_target = msaa_target;
        Ok(())
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Binds the scene's skybox cubemap, or clears it when there is none.
    pub fn attach_skybox(&mut self, device: &Device, skybox: Option<&TextureResource>) {
        self.skybox.bind_group = skybox.map(|texture| {
            BindGroupBuilder::new(&self.skybox.bind_group_layout)
                .texture(&texture.view)
                .sampler(&texture.sampler)
                .create(device, "Skybox Bind Group")
        });
    }

    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        globals: &GlobalBindings,
        scene: &Scene,
    ) {
        let (view, resolve_target) = match &self.msaa_target {
            Some(msaa) => (&msaa.view, Some(surface_view)),
            None => (surface_view, None),
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Main Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_target.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        // The viewport covers the whole surface again after the shadow pass.
        pass.set_viewport(
            0.0,
            0.0,
            self.depth_target.width() as f32,
            self.depth_target.height() as f32,
            0.0,
            1.0,
        );

        pass.set_pipeline(self.ui_program.pipeline());
        pass.set_bind_group(GLOBALS_GROUP, globals.bind_group(), &[]);
        pass.draw(0..3, 0..1);

        pass.set_pipeline(self.marker_program.pipeline());
        pass.set_bind_group(GLOBALS_GROUP, globals.bind_group(), &[]);
        for marker in &self.markers {
            pass.draw_model(marker, MARKER_MODEL_GROUP);
        }

        pass.set_pipeline(self.scene_program.pipeline());
        pass.set_bind_group(GLOBALS_GROUP, globals.bind_group(), &[]);
        scene.draw(&mut pass, SCENE_MODEL_GROUP, MATERIAL_GROUP);

        if let Some(bind_group) = &self.skybox.bind_group {
            pass.set_pipeline(self.skybox.program.pipeline());
            pass.set_bind_group(GLOBALS_GROUP, globals.bind_group(), &[]);
            pass.set_bind_group(1, bind_group, &[]);
            pass.draw_mesh(&self.skybox.cube);
        }
    }
}

fn create_targets(
    device: &Device,
    surface_config: &SurfaceConfiguration,
    sample_count: u32,
) -> Result<(TextureResource, Option<TextureResource>)> {
    let context = format!(
        "creating {}x{} main pass targets",
        surface_config.width, surface_config.height
    );
    with_validation(device, &context, || {
        let depth = TextureResource::create_depth_texture(
            device,
            surface_config.width,
            surface_config.height,
            sample_count,
            "Main Depth Target",
        );
        let msaa = (sample_count > 1)
            .then(|| TextureResource::create_msaa_target(device, surface_config, sample_count));
        (depth, msaa)
    })
}
