//! # Scene Management Module
//!
//! Models, meshes and the scene that owns them.
//!
//! - [`Scene`] - models plus an optional skybox, drawn in one call
//! - [`Model`] - one or more meshes sharing a world transform
//! - [`Mesh`] - vertex/index buffers and shared texture references
//! - [`Vertex3D`] - position, texture coordinates and normal
//!
//! Models come either from procedural geometry ([`Mesh::from_geometry`]) or
//! from OBJ files through [`loader::load_model`].

pub mod loader;
pub mod model;
pub mod scene;
pub mod vertex;

pub use loader::{load_model, read_obj, MeshData};
pub use model::{DrawModel, Mesh, Model, ModelBindings, ModelUniform, Transform};
pub use scene::Scene;
pub use vertex::Vertex3D;
