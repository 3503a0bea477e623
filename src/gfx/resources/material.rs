//! Mesh surface textures
//!
//! A material may name four kinds of texture map, but only the diffuse and
//! specular maps are sampled when shading. Those two are uploaded and shared
//! through `Arc`s with the other meshes of a model. Maps a mesh lacks are
//! replaced with 1x1 default textures so every draw binds the same layout.

use std::sync::Arc;

use wgpu::Device;

use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
};

use super::texture_resource::{TextureOptions, TextureResource};

/// Semantic type of a texture map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    Specular,
    Normal,
    Height,
}

impl TextureKind {
    /// Colour maps are sampled as sRGB, data maps as linear values.
    pub fn options(self) -> TextureOptions {
        match self {
            TextureKind::Diffuse => TextureOptions::default(),
            TextureKind::Specular | TextureKind::Normal | TextureKind::Height => {
                TextureOptions::linear()
            }
        }
    }

    /// Whether the shaded program binds maps of this kind.
    pub fn is_sampled(self) -> bool {
        matches!(self, TextureKind::Diffuse | TextureKind::Specular)
    }
}

/// Sampled texture maps of one mesh.
#[derive(Clone, Default)]
pub struct MeshTextures {
    pub diffuse: Option<Arc<TextureResource>>,
    pub specular: Option<Arc<TextureResource>>,
}

impl MeshTextures {
    /// Stores a sampled map. Other kinds have no slot and are dropped.
    pub fn set(&mut self, kind: TextureKind, texture: Arc<TextureResource>) {
        match kind {
            TextureKind::Diffuse => self.diffuse = Some(texture),
            TextureKind::Specular => self.specular = Some(texture),
            TextureKind::Normal | TextureKind::Height => {
                log::debug!("Ignoring {kind:?} map: not sampled");
            }
        }
    }

    pub fn get(&self, kind: TextureKind) -> Option<&Arc<TextureResource>> {
        match kind {
            TextureKind::Diffuse => self.diffuse.as_ref(),
            TextureKind::Specular => self.specular.as_ref(),
            TextureKind::Normal | TextureKind::Height => None,
        }
    }

    pub fn count(&self) -> usize {
        [&self.diffuse, &self.specular]
            .iter()
            .filter(|t| t.is_some())
            .count()
    }
}

/// Shared 1x1 fallbacks: white diffuse, black specular.
pub struct DefaultTextures {
    pub diffuse: Arc<TextureResource>,
    pub specular: Arc<TextureResource>,
}

impl DefaultTextures {
    pub fn new(device: &Device, queue: &wgpu::Queue) -> Self {
        Self {
            diffuse: Arc::new(TextureResource::solid_color(
                device,
                queue,
                [255, 255, 255, 255],
                "Default Diffuse",
                true,
            )),
            specular: Arc::new(TextureResource::solid_color(
                device,
                queue,
                [0, 0, 0, 255],
                "Default Specular",
                false,
            )),
        }
    }
}

/// Material bind group layout (group 1 of the shaded program).
pub struct MaterialBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    defaults: DefaultTextures,
}

impl MaterialBindings {
    pub fn new(device: &Device, queue: &wgpu::Queue) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Material Bind Group Layout");

        MaterialBindings {
            bind_group_layout,
            defaults: DefaultTextures::new(device, queue),
        }
    }

    /// Binds a mesh's diffuse and specular maps, falling back to the defaults.
    pub fn create_bind_group(&self, device: &Device, textures: &MeshTextures, label: &str) -> wgpu::BindGroup {
        let diffuse = textures.diffuse.as_ref().unwrap_or(&self.defaults.diffuse);
        let specular = textures.specular.as_ref().unwrap_or(&self.defaults.specular);

        BindGroupBuilder::new(&self.bind_group_layout)
            .texture(&diffuse.view)
            .texture(&specular.view)
            .sampler(&diffuse.sampler)
            .create(device, label)
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }
}
