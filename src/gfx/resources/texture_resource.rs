//! Texture resource management for wgpu
//!
//! Creates GPU textures, views and samplers for image files, skybox cubemaps,
//! solid fallback colours and the main pass render targets.

use std::path::{Path, PathBuf};

use image::{imageops::FilterType, RgbaImage};

use crate::error::{capture_validation, AssetError};

/// File stems of the six skybox faces, in cube layer order (+X, -X, +Y, -Y, +Z, -Z).
pub const CUBEMAP_FACE_NAMES: [&str; 6] = ["right", "left", "top", "bottom", "front", "back"];

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// How an image file is turned into a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureOptions {
    /// Repeat outside 0..1 instead of clamping.
    pub repeat: bool,
    /// Generate a full mip chain on the CPU.
    pub mipmaps: bool,
    /// Colour data (sRGB) rather than linear data such as normal maps.
    pub srgb: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            repeat: true,
            mipmaps: true,
            srgb: true,
        }
    }
}

impl TextureOptions {
    pub fn linear() -> Self {
        Self {
            srgb: false,
            ..Default::default()
        }
    }

    fn format(&self) -> wgpu::TextureFormat {
        if self.srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        }
    }

    fn address_mode(&self) -> wgpu::AddressMode {
        if self.repeat {
            wgpu::AddressMode::Repeat
        } else {
            wgpu::AddressMode::ClampToEdge
        }
    }
}

/// GPU texture resource containing texture, view, and sampler
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    width: u32,
    height: u32,
    source: Option<PathBuf>,
}

impl TextureResource {
    /// Depth format of the main pass.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Loads an image file into a 2D texture.
    pub fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        options: TextureOptions,
    ) -> Result<Self, AssetError> {
        let image = decode_image(path)?;
        let label = path.display().to_string();
        let mut texture = Self::from_image(device, queue, &image, &label, options)?;
        texture.source = Some(path.to_path_buf());
        log::trace!(
            "Loaded texture '{label}' ({}x{}, {} mips)",
            texture.width,
            texture.height,
            texture.texture.mip_level_count()
        );
        Ok(texture)
    }

    /// Uploads `image` with its mip chain. Images larger than the device
    /// allows, and anything else the device rejects, come back as
    /// [`AssetError::Texture`] named after `label`.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        label: &str,
        options: TextureOptions,
    ) -> Result<Self, AssetError> {
        let texture_error = |message: String| AssetError::Texture {
            path: PathBuf::from(label),
            message,
        };
        let (width, height) = image.dimensions();
        check_size(width, height, device.limits().max_texture_dimension_2d).map_err(texture_error)?;

        match capture_validation(device, || Self::upload(device, queue, image, label, options)) {
            (_, Some(err)) => Err(texture_error(err.to_string())),
            (texture, None) => Ok(texture),
        }
    }

    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        label: &str,
        options: TextureOptions,
    ) -> Self {
        let levels = if options.mipmaps {
            mip_chain(image)
        } else {
            vec![image.clone()]
        };
        let (width, height) = image.dimensions();

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: options.format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, pixels) in levels.iter().enumerate() {
            write_layer(queue, &texture, pixels, level as u32, 0);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: options.address_mode(),
            address_mode_v: options.address_mode(),
            address_mode_w: options.address_mode(),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
            source: None,
        }
    }

    /// 1x1 texture of a single colour, used when a mesh lacks a map.
    pub fn solid_color(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        label: &str,
        srgb: bool,
    ) -> Self {
        let image = RgbaImage::from_pixel(1, 1, image::Rgba(rgba));
        let options = TextureOptions {
            repeat: true,
            mipmaps: false,
            srgb,
        };
        Self::upload(device, queue, &image, label, options)
    }

    /// Loads the six faces of a skybox from `dir` into a cube texture.
    pub fn load_cubemap(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        dir: &Path,
    ) -> Result<Self, AssetError> {
        let faces = cubemap_face_paths(dir)?
            .iter()
            .map(|path| {
                decode_image(path).map_err(|err| AssetError::Cubemap {
                    dir: dir.to_path_buf(),
                    message: err.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cubemap_error = |message: String| AssetError::Cubemap {
            dir: dir.to_path_buf(),
            message,
        };
        let (width, height) = faces[0].dimensions();
        if width != height || faces.iter().any(|face| face.dimensions() != (width, height)) {
            return Err(cubemap_error("faces must be square and share one size".to_string()));
        }
        check_size(width, height, device.limits().max_texture_dimension_2d).map_err(cubemap_error)?;

        let label = dir.display().to_string();
        let ((texture, view), error) = capture_validation(device, || {
            Self::upload_cube(device, queue, &faces, &label)
        });
        if let Some(err) = error {
            return Err(cubemap_error(err.to_string()));
        }
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Skybox Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        log::debug!("Loaded skybox cubemap '{label}' ({width}x{height})");

        Ok(Self {
            texture,
            view,
            sampler,
            width,
            height,
            source: Some(dir.to_path_buf()),
        })
    }

    fn upload_cube(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[RgbaImage],
        label: &str,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let (width, height) = faces[0].dimensions();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in faces.iter().enumerate() {
            write_layer(queue, &texture, face, 0, layer as u32);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label} (cube)")),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        (texture, view)
    }

    /// Depth buffer for the main pass, matching the surface size and sample count.
    pub fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        sample_count: u32,
        label: &str,
    ) -> Self {
        Self::create_render_target(
            device,
            width,
            height,
            sample_count,
            Self::DEPTH_FORMAT,
            label,
        )
    }

    /// Multisampled colour target resolved into the swapchain image.
    pub fn create_msaa_target(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        sample_count: u32,
    ) -> Self {
        Self::create_render_target(
            device,
            config.width,
            config.height,
            sample_count,
            config.format,
            "MSAA Colour Target",
        )
    }

    fn create_render_target(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        sample_count: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor::default());

        Self {
            texture,
            view,
            sampler,
            width,
            height,
            source: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// File or folder the texture was loaded from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl Drop for TextureResource {
    fn drop(&mut self) {
        if let Some(source) = &self.source {
            log::trace!("Released texture '{}'", source.display());
        }
    }
}

fn write_layer(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    pixels: &RgbaImage,
    mip_level: u32,
    layer: u32,
) {
    let (width, height) = pixels.dimensions();
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
            aspect: wgpu::TextureAspect::All,
        },
        pixels.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

/// Rejects empty images and images wider or taller than `limit` texels
/// before they reach the device.
pub fn check_size(width: u32, height: u32, limit: u32) -> Result<(), String> {
    if width == 0 || height == 0 {
        return Err("image is empty".to_string());
    }
    if width > limit || height > limit {
        return Err(format!(
            "{width}x{height} exceeds the device limit of {limit} texels per side"
        ));
    }
    Ok(())
}

/// Decodes an image file into RGBA8.
pub fn decode_image(path: &Path) -> Result<RgbaImage, AssetError> {
    image::open(path)
        .map(|image| image.to_rgba8())
        .map_err(|err| AssetError::Texture {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}

/// Number of mip levels down to 1x1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// The image followed by successively halved copies down to 1x1.
pub fn mip_chain(image: &RgbaImage) -> Vec<RgbaImage> {
    let (width, height) = image.dimensions();
    let count = mip_level_count(width, height);
    let mut levels = Vec::with_capacity(count as usize);
    levels.push(image.clone());
    for level in 1..count {
        let w = (width >> level).max(1);
        let h = (height >> level).max(1);
        let next = image::imageops::resize(&levels[level as usize - 1], w, h, FilterType::Triangle);
        levels.push(next);
    }
    levels
}

/// Paths of the six skybox faces inside `dir`, in layer order. Each face may
/// use any supported image extension.
pub fn cubemap_face_paths(dir: &Path) -> Result<[PathBuf; 6], AssetError> {
    let mut paths: [PathBuf; 6] = Default::default();
    for (slot, name) in paths.iter_mut().zip(CUBEMAP_FACE_NAMES) {
        *slot = IMAGE_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{name}.{ext}")))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| AssetError::Cubemap {
                dir: dir.to_path_buf(),
                message: format!("missing face '{name}'"),
            })?;
    }
    Ok(paths)
}
