// src/lib.rs
//! Gloam
//!
//! A first-person renderer on wgpu and winit with omnidirectional shadows
//! from a fixed set of point lights.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod lifecycle;
pub mod timing;
pub mod ui;
pub mod wgpu_utils;

pub use app::GameApp;
pub use error::{AssetError, RenderError, ShaderError};
