//! GPU resource management
//!
//! Handles textures, buffers, and bind groups for rendering.

pub mod global_bindings;
pub mod material;
pub mod texture_cache;
pub mod texture_resource;

pub use global_bindings::{GlobalBindings, GlobalUniform};
pub use material::{DefaultTextures, MaterialBindings, MeshTextures, TextureKind};
pub use texture_cache::TextureCache;
pub use texture_resource::{TextureOptions, TextureResource};
