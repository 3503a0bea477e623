use std::path::Path;

use wgpu::Device;

use crate::{
    error::AssetError,
    gfx::resources::{material::MaterialBindings, texture_resource::TextureResource},
};

use super::model::{DrawModel, Model, ModelBindings};

/// All drawable models plus an optional skybox cubemap.
#[derive(Default)]
pub struct Scene {
    models: Vec<Model>,
    skybox: Option<TextureResource>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_model(&mut self, model: Model) -> &mut Model {
        self.models.push(model);
        let last = self.models.len() - 1;
        &mut self.models[last]
    }

    pub fn load_skybox(&mut self, device: &Device, queue: &wgpu::Queue, dir: &Path) -> Result<(), AssetError> {
        self.skybox = Some(TextureResource::load_cubemap(device, queue, dir)?);
        log::info!("Loaded skybox from '{}'", dir.display());
        Ok(())
    }

    pub fn skybox(&self) -> Option<&TextureResource> {
        self.skybox.as_ref()
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Uploads every model that is not on the GPU yet.
    pub fn upload(&mut self, device: &Device, model_bindings: &ModelBindings, materials: &MaterialBindings) {
        for model in self.models.iter_mut().filter(|m| m.bind_group().is_none()) {
            model.upload(device, model_bindings, materials);
        }
    }

    /// Draws every model with its materials.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, model_group: u32, material_group: u32) {
        for model in &self.models {
            pass.draw_model_textured(model, model_group, material_group);
        }
    }

    /// Draws every model's geometry without binding materials.
    pub fn draw_geometry(&self, pass: &mut wgpu::RenderPass<'_>, model_group: u32) {
        for model in &self.models {
            pass.draw_model(model, model_group);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{geometry::generate_cube, scene::model::Mesh};

    #[test]
    fn test_empty_scene() {
        let scene = Scene::new();
        assert!(scene.is_empty());
        assert!(scene.skybox().is_none());
    }

    #[test]
    fn test_add_model_returns_stored_model() {
        let mut scene = Scene::new();
        let cube = Model::new("crate", vec![Mesh::from_geometry(&generate_cube())])
            .with_position(0.0, 0.5, -3.0);
        let stored = scene.add_model(cube);
        assert_eq!(stored.name(), "crate");
        assert_eq!(stored.meshes().len(), 1);
        assert_eq!(scene.models().len(), 1);
    }
}
