pub mod camera_controller;
pub mod camera_utils;
pub mod fps_camera;

// Re-export main types
pub use camera_controller::{Action, CameraController, KeyBindings, KeyboardState};
pub use camera_utils::Projection;
pub use fps_camera::FpsCamera;
