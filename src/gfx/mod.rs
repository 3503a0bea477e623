//! # Graphics Module
//!
//! Everything between the camera and the presented frame.
//!
//! ## Architecture Overview
//!
//! - **Camera** ([`camera`]) - first-person camera with ground-plane movement
//! - **Lighting** ([`lighting`]) - point lights, their depth cubemaps and face matrices
//! - **Rendering** ([`rendering`]) - shader programs, the shadow pass and the main pass
//! - **Scene** ([`scene`]) - models, meshes, OBJ loading and the skybox
//! - **Resources** ([`resources`]) - textures, materials and shared bind groups
//! - **Geometry** ([`geometry`]) - procedural primitives
//!
//! A frame is recorded by [`RenderEngine::render_frame`]: the shadow pass
//! fills every light's cubemap, then the main pass draws the UI, the light
//! markers, the lit scene and the skybox.

pub mod camera;
pub mod geometry;
pub mod lighting;
pub mod rendering;
pub mod resources;
pub mod scene;

pub use camera::FpsCamera;
pub use lighting::PointLight;
pub use rendering::RenderEngine;
pub use scene::Scene;
