//! Shadow pass against a real device. Every test returns early when the
//! machine has no usable adapter.

use gloam::{
    config::{RenderConfig, LIGHT_COUNT},
    error::capture_validation,
    gfx::{
        geometry::generate_cube,
        lighting::{CubemapFace, DepthCubemap, PointLight},
        rendering::{create_lights, shader::DEPTH_SHADER, ShaderSource, ShadowPass},
        resources::MaterialBindings,
        scene::{Mesh, Model, ModelBindings, Scene},
    },
};

mod common;

const RESOLUTION: u32 = 64;

struct Fixture {
    device: wgpu::Device,
    queue: wgpu::Queue,
    lights: [PointLight; LIGHT_COUNT],
    model_bindings: ModelBindings,
    pass: ShadowPass,
}

fn fixture() -> Option<Fixture> {
    let (device, queue) = common::device()?;
    let config = RenderConfig::default().with_shadow_resolution(RESOLUTION);
    let lights = create_lights(&device, RESOLUTION);
    let model_bindings = ModelBindings::new(&device);
    let pass = ShadowPass::new(
        &device,
        &queue,
        &model_bindings,
        &ShaderSource::resolve(DEPTH_SHADER, None),
        &config,
    )
    .expect("depth program links");
    Some(Fixture {
        device,
        queue,
        lights,
        model_bindings,
        pass,
    })
}

/// Runs the shadow pass once and returns the validation error it raised, if any.
fn run_pass(fixture: &mut Fixture, scene: &Scene) -> Option<wgpu::Error> {
    let device = &fixture.device;
    let queue = &fixture.queue;
    let lights = &fixture.lights;
    let pass = &mut fixture.pass;
    let ((), error) = capture_validation(device, || {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Shadow Test Encoder"),
        });
        pass.encode(queue, &mut encoder, lights, scene);
        queue.submit(std::iter::once(encoder.finish()));
    });
    error
}

/// Reads all six faces of a depth cubemap, face by face.
fn read_cube(device: &wgpu::Device, queue: &wgpu::Queue, cube: &DepthCubemap) -> Vec<Vec<f32>> {
    let bytes_per_row = RESOLUTION * 4;
    let face_size = (bytes_per_row * RESOLUTION) as u64;
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Cubemap Readback"),
        size: face_size * 6,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: cube.texture(),
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::DepthOnly,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(RESOLUTION),
            },
        },
        wgpu::Extent3d {
            width: RESOLUTION,
            height: RESOLUTION,
            depth_or_array_layers: 6,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let values: Vec<f32> = common::map_read(device, &buffer)
        .chunks_exact(4)
        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    values
        .chunks((RESOLUTION * RESOLUTION) as usize)
        .map(<[f32]>::to_vec)
        .collect()
}

#[test]
fn test_empty_scene_leaves_cubemaps_at_far_plane() {
    let Some(mut fixture) = fixture() else {
        return;
    };

    let error = run_pass(&mut fixture, &Scene::new());
    assert!(error.is_none(), "shadow pass raised {error:?}");
    assert_eq!(fixture.pass.framebuffer().attached(), None);

    for (index, light) in fixture.lights.iter().enumerate() {
        let faces = read_cube(&fixture.device, &fixture.queue, light.depth_cubemap());
        assert_eq!(faces.len(), 6);
        for (face, values) in faces.iter().enumerate() {
            assert!(
                values.iter().all(|&depth| depth == 1.0),
                "light {index} face {face} holds non-clear depth"
            );
        }
    }
}

#[test]
fn test_floor_shows_up_below_the_first_light() {
    let Some(mut fixture) = fixture() else {
        return;
    };

    let materials = MaterialBindings::new(&fixture.device, &fixture.queue);
    let mut scene = Scene::new();
    scene.add_model(
        Model::new("floor", vec![Mesh::from_geometry(&generate_cube())]).with_scale(30.0, 0.01, 30.0),
    );
    scene.upload(&fixture.device, &fixture.model_bindings, &materials);

    let error = run_pass(&mut fixture, &scene);
    assert!(error.is_none(), "shadow pass raised {error:?}");

    // The first light hangs 2 units above the floor.
    let faces = read_cube(&fixture.device, &fixture.queue, fixture.lights[0].depth_cubemap());
    let below = &faces[CubemapFace::NegativeY.index()];
    let nearest = below.iter().copied().fold(f32::INFINITY, f32::min);
    let expected = 2.0 / RenderConfig::default().shadow_zfar;
    assert!(nearest < 1.0);
    assert!((nearest - expected).abs() < 0.01, "nearest depth {nearest}, expected {expected}");
}

#[test]
fn test_repeated_frames_stay_valid() {
    let Some(mut fixture) = fixture() else {
        return;
    };

    let scene = Scene::new();
    for _ in 0..3 {
        let error = run_pass(&mut fixture, &scene);
        assert!(error.is_none(), "shadow pass raised {error:?}");
    }
    assert_eq!(fixture.pass.light_uniforms(&fixture.lights).len(), LIGHT_COUNT);
}
