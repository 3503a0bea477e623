//! wgpu rendering engine
//!
//! Owns the surface, device and queue together with every long-lived GPU
//! resource of the frame: the point lights and their depth cubemaps, the
//! shared bind group layouts, and the shadow and main passes. A frame is the
//! shadow pass for every light followed by the main pass, recorded into one
//! command encoder so the main pass always samples this frame's cubemaps.

use std::{path::Path, sync::Arc};

use wgpu::TextureFormat;
use winit::window::Window;

use crate::{
    config::{RenderConfig, LIGHT_COUNT, POINTER_RADIUS},
    error::{with_validation, RenderError, Result, UncapturedErrors},
    gfx::{
        camera::FpsCamera,
        lighting::{default_light_setup, PointLight},
        resources::{
            global_bindings::{GlobalBindings, GlobalUniform},
            material::MaterialBindings,
        },
        scene::{ModelBindings, Scene},
    },
};

use super::{
    main_pass::MainPass,
    shader::{ShaderSource, DEPTH_SHADER},
    shadow_pass::ShadowPass,
};

/// Outcome of [`RenderEngine::render_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// The surface was unavailable this frame (lost, outdated, timed out or
    /// zero-sized). Nothing was drawn.
    Skipped,
}

/// Requests a device with the limits the renderer needs, enabling whichever
/// of `wanted` the adapter supports.
pub async fn request_device(
    adapter: &wgpu::Adapter,
    wanted: wgpu::Features,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    let features = wanted & adapter.features();
    if features != wanted {
        log::warn!("Adapter lacks optional features {:?}", wanted - features);
    }
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("WGPU Device"),
            required_features: features,
            required_limits: wgpu::Limits {
                max_texture_dimension_2d: 4096,
                ..wgpu::Limits::downlevel_defaults()
            }
            .using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::Off,
        })
        .await?;
    Ok((device, queue))
}

/// Allocates the fixed set of point lights, one depth cubemap each.
pub fn create_lights(device: &wgpu::Device, shadow_resolution: u32) -> [PointLight; LIGHT_COUNT] {
    let setup = default_light_setup();
    std::array::from_fn(|index| {
        let (position, color) = setup[index];
        PointLight::new(
            device,
            position,
            color,
            shadow_resolution,
            &format!("Point Light {index} Shadow Cubemap"),
        )
    })
}

pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    render_config: RenderConfig,
    lights: [PointLight; LIGHT_COUNT],
    global_bindings: GlobalBindings,
    material_bindings: MaterialBindings,
    model_bindings: ModelBindings,
    shadow_pass: ShadowPass,
    main_pass: MainPass,
    gpu_errors: UncapturedErrors,
}

impl RenderEngine {
    /// Creates the surface, device and every frame resource. Any failure is
    /// returned before a frame is drawn; resources created up to that point
    /// are released when their owners drop.
    pub async fn new(
        window: Arc<Window>,
        render_config: RenderConfig,
        shader_dir: Option<&Path>,
    ) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| RenderError::Adapter(err.to_string()))?;
        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = request_device(&adapter, render_config.wanted_features()).await?;
        let gpu_errors = UncapturedErrors::install(&device);

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(TextureFormat::is_srgb)
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| RenderError::Adapter("surface reports no formats".into()))?;
        let alpha_mode = surface_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: present_mode(render_config.vsync),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::debug!("Configured surface {}x{} ({format:?})", config.width, config.height);

        let lights = with_validation(&device, "allocating shadow cubemaps", || {
            create_lights(&device, render_config.shadow_resolution)
        })?;
        log::debug!("Created {LIGHT_COUNT} point lights");

        let global_bindings = GlobalBindings::new(&device, &lights);
        let material_bindings = MaterialBindings::new(&device, &queue);
        let model_bindings = ModelBindings::new(&device);

        let shadow_pass = ShadowPass::new(
            &device,
            &queue,
            &model_bindings,
            &ShaderSource::resolve(DEPTH_SHADER, shader_dir),
            &render_config,
        )?;
        let main_pass = MainPass::new(
            &device,
            &config,
            &render_config,
            shader_dir,
            &global_bindings,
            &material_bindings,
            &model_bindings,
            &lights,
        )?;
        log::info!("Renderer initialized");

        Ok(Self {
            surface,
            device: Arc::new(device),
            queue: Arc::new(queue),
            config,
            render_config,
            lights,
            global_bindings,
            material_bindings,
            model_bindings,
            shadow_pass,
            main_pass,
            gpu_errors,
        })
    }

    /// Uploads every model of `scene` and binds its skybox.
    pub fn prepare_scene(&mut self, scene: &mut Scene) -> Result<()> {
        scene.upload(&self.device, &self.model_bindings, &self.material_bindings);
        self.main_pass.attach_skybox(&self.device, scene.skybox());
        self.gpu_errors.check("uploading the scene")
    }

    /// Renders one frame: the shadow pass for every light, then the main
    /// pass, then `overlay` (if any) on top of the resolved image.
    pub fn render_frame<F>(&mut self, camera: &FpsCamera, scene: &Scene, overlay: Option<F>) -> Result<FrameStatus>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(FrameStatus::Skipped);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(RenderError::Gpu {
                    context: "acquiring the next frame".into(),
                    message: wgpu::SurfaceError::OutOfMemory.to_string(),
                });
            }
            Err(err) => {
                log::warn!("Skipping frame: {err}");
                return Ok(FrameStatus::Skipped);
            }
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.global_bindings.update_globals(
            &self.queue,
            GlobalUniform::new(
                camera.view_matrix(),
                self.main_pass.projection().matrix(),
                camera.position(),
                (self.config.width, self.config.height),
                POINTER_RADIUS,
            ),
        );
        self.global_bindings
            .upload_lights(&self.queue, &self.lights, self.render_config.shadow_zfar);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.shadow_pass
            .encode(&self.queue, &mut encoder, &self.lights, scene);
        self.main_pass
            .encode(&mut encoder, &surface_view, &self.global_bindings, scene);

        if let Some(overlay) = overlay {
            overlay(&self.device, &self.queue, &mut encoder, &surface_view);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        self.gpu_errors.check("rendering a frame")?;
        Ok(FrameStatus::Presented)
    }

    /// Reconfigures the surface and rebuilds the size-dependent targets and
    /// the projection. Zero sizes (minimised windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.main_pass.resize(&self.device, &self.config)?;
        log::debug!("Resized surface to {width}x{height}");
        self.gpu_errors.check("resizing the surface")
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    pub fn shadow_pass(&self) -> &ShadowPass {
        &self.shadow_pass
    }
}

impl Drop for RenderEngine {
    fn drop(&mut self) {
        // Let in-flight work finish before the resources it uses go away.
        if let Err(err) = self.device.poll(wgpu::PollType::Wait) {
            log::warn!("Device poll during shutdown failed: {err}");
        }
        log::info!("Renderer released");
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_mode_follows_vsync() {
        assert_eq!(present_mode(true), wgpu::PresentMode::AutoVsync);
        assert_eq!(present_mode(false), wgpu::PresentMode::AutoNoVsync);
    }
}
