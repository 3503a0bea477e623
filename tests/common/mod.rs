//! Device setup and readback helpers shared by the GPU tests.

#![allow(dead_code)]

use gloam::gfx::rendering::request_device;

/// A device on whatever adapter is available, or `None` (with a note on
/// stderr) when the machine has none.
pub fn device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = match pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::LowPower,
        compatible_surface: None,
        force_fallback_adapter: false,
    })) {
        Ok(adapter) => adapter,
        Err(err) => {
            eprintln!("skipping: no adapter ({err})");
            return None;
        }
    };
    match pollster::block_on(request_device(&adapter, wgpu::Features::empty())) {
        Ok(pair) => Some(pair),
        Err(err) => {
            eprintln!("skipping: no device ({err})");
            None
        }
    }
}

/// Maps `buffer` and returns a copy of its contents.
pub fn map_read(device: &wgpu::Device, buffer: &wgpu::Buffer) -> Vec<u8> {
    let slice = buffer.slice(..);
    slice.map_async(wgpu::MapMode::Read, |result| {
        result.expect("readback buffer maps");
    });
    device.poll(wgpu::PollType::Wait).expect("device poll");

    let bytes = slice.get_mapped_range().to_vec();
    buffer.unmap();
    bytes
}

/// Copies the first `size` bytes of `source` into a mappable buffer and
/// reads them.
pub fn read_buffer(device: &wgpu::Device, queue: &wgpu::Queue, source: &wgpu::Buffer, size: u64) -> Vec<u8> {
    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Buffer Readback"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Buffer Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(source, 0, &readback, 0, size);
    queue.submit(std::iter::once(encoder.finish()));
    map_read(device, &readback)
}

/// Reads a square RGBA8 colour texture, row by row. `size * 4` must be a
/// multiple of the copy row alignment.
pub fn read_rgba(device: &wgpu::Device, queue: &wgpu::Queue, texture: &wgpu::Texture, size: u32) -> Vec<[u8; 4]> {
    let bytes_per_row = size * 4;
    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Colour Readback"),
        size: (bytes_per_row * size) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Colour Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &readback,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(size),
            },
        },
        wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    map_read(device, &readback)
        .chunks_exact(4)
        .map(|texel| [texel[0], texel[1], texel[2], texel[3]])
        .collect()
}
