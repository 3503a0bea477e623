//! # User Interface Module
//!
//! Dear ImGui debug overlay. The [`UiManager`] owns the imgui context and its
//! winit/wgpu glue; [`panel::debug_panel`] draws camera and frame statistics
//! while the game is paused.

pub mod manager;
pub mod panel;

pub use manager::UiManager;
pub use panel::{debug_panel, DebugStats};
