//! Startup configuration
//!
//! Compile-time constants for camera physics, projection and lighting, plus the
//! [`AppConfig`] and [`RenderConfig`] structs whose defaults mirror them. Nothing
//! here can be changed once the application is running.

use std::path::PathBuf;

/// Height of the eye above the ground plane.
pub const EYE_Y: f32 = 1.8;
/// Downward acceleration applied while airborne.
pub const GRAVITY: f32 = 20.0;
/// Upward velocity given by a jump.
pub const JUMP_SPEED: f32 = 7.5;
/// Ground movement speed in units per second.
pub const SPEED: f32 = 7.5;
/// Forward speed multiplier while sprinting.
pub const SPRINT_BOOST: f32 = 1.75;
/// Degrees of rotation per pixel of mouse motion.
pub const SENSITIVITY: f32 = 0.13;
/// Maximum falling speed.
pub const TERMINAL_VELOCITY: f32 = 50.0;
/// Pitch limit in degrees, both up and down.
pub const PITCH_LIMIT: f32 = 89.0;

/// Vertical field of view of the player camera, in degrees.
pub const FOV: f32 = 70.0;
pub const ZNEAR: f32 = 0.1;
pub const ZFAR: f32 = 32.0;

/// Edge length of one shadow cubemap face in texels.
pub const SHADOWMAP_RES: u32 = 1024;
pub const SHADOWMAP_ZNEAR: f32 = 0.1;
pub const SHADOWMAP_ZFAR: f32 = 32.0;

/// Number of point lights. Shaders declare the same count.
pub const LIGHT_COUNT: usize = 4;

pub const LIGHT_AMBIENT: f32 = 0.03;
pub const LIGHT_DIFFUSE: f32 = 0.4;
pub const LIGHT_SPECULAR: f32 = 1.0;
pub const LIGHT_LINEAR: f32 = 0.09;
pub const LIGHT_QUADRATIC: f32 = 0.032;
pub const MATERIAL_SHININESS: f32 = 64.0;
/// Scale applied to the unit cube drawn at each light position.
pub const LIGHT_MARKER_SCALE: f32 = 0.2;
/// Radius of the crosshair dot in pixels.
pub const POINTER_RADIUS: f32 = 2.0;

pub const WINDOW_WIDTH: u32 = 1280;
pub const WINDOW_HEIGHT: u32 = 720;
pub const MSAA_SAMPLES: u32 = 4;
/// Frames closer together than this are skipped.
pub const MIN_FRAME_MS: u64 = 2;

/// Settings that shape the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub fov_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub shadow_resolution: u32,
    pub shadow_znear: f32,
    pub shadow_zfar: f32,
    pub msaa_samples: u32,
    pub vsync: bool,
    /// Draw the scene and light markers as wireframes. Needs line polygon
    /// mode on the adapter; falls back to filled polygons without it.
    pub wireframe: bool,
    pub clear_color: wgpu::Color,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fov_degrees: FOV,
            znear: ZNEAR,
            zfar: ZFAR,
            shadow_resolution: SHADOWMAP_RES,
            shadow_znear: SHADOWMAP_ZNEAR,
            shadow_zfar: SHADOWMAP_ZFAR,
            msaa_samples: MSAA_SAMPLES,
            vsync: false,
            wireframe: false,
            clear_color: wgpu::Color::BLACK,
        }
    }
}

impl RenderConfig {
    pub fn with_fov(mut self, degrees: f32) -> Self {
        self.fov_degrees = degrees;
        self
    }

    pub fn with_shadow_resolution(mut self, resolution: u32) -> Self {
        self.shadow_resolution = resolution;
        self
    }

    /// Sets the multisample count; values other than 1 and 4 fall back to 1.
    pub fn with_msaa(mut self, samples: u32) -> Self {
        self.msaa_samples = if samples == 4 { 4 } else { 1 };
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    /// Optional device features this configuration asks for.
    pub fn wanted_features(&self) -> wgpu::Features {
        if self.wireframe {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            wgpu::Features::empty()
        }
    }
}

/// Settings for the window and the frame loop.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub print_fps: bool,
    /// Root directory that models, textures and shaders are resolved against.
    pub asset_root: PathBuf,
    /// Load WGSL from `asset_root/shaders` instead of the embedded copies.
    pub shaders_from_disk: bool,
    pub min_frame_ms: u64,
    pub render: RenderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "gloam".to_string(),
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
            fullscreen: false,
            print_fps: false,
            asset_root: PathBuf::from("assets"),
            shaders_from_disk: false,
            min_frame_ms: MIN_FRAME_MS,
            render: RenderConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default configuration overlaid with `GLOAM_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup("GLOAM_FULLSCREEN") {
            self.fullscreen = parse_flag(&value);
        }
        if let Some(value) = lookup("GLOAM_VSYNC") {
            self.render.vsync = parse_flag(&value);
        }
        if let Some(value) = lookup("GLOAM_WIREFRAME") {
            self.render.wireframe = parse_flag(&value);
        }
        if let Some(value) = lookup("GLOAM_PRINT_FPS") {
            self.print_fps = parse_flag(&value);
        }
        if let Some(value) = lookup("GLOAM_MSAA") {
            match value.trim().parse::<u32>() {
                Ok(samples) => self.render = self.render.with_msaa(samples),
                Err(_) => log::warn!("Ignoring GLOAM_MSAA={value:?}: not a number"),
            }
        }
        if let Some(value) = lookup("GLOAM_ASSETS") {
            self.asset_root = PathBuf::from(value);
            self.shaders_from_disk = true;
        }
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = fullscreen;
        self
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    pub fn with_render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    pub fn shader_dir(&self) -> PathBuf {
        self.asset_root.join("shaders")
    }

    pub fn model_dir(&self) -> PathBuf {
        self.asset_root.join("models")
    }

    pub fn texture_dir(&self) -> PathBuf {
        self.asset_root.join("textures")
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_constants() {
        let config = AppConfig::default();
        assert_eq!(config.width, 1280);
        assert_eq!(config.height, 720);
        assert_eq!(config.render.shadow_resolution, SHADOWMAP_RES);
        assert_eq!(config.render.msaa_samples, 4);
        assert_eq!(config.render.zfar, 32.0);
        assert!(!config.shaders_from_disk);
        assert!(!config.render.wireframe);
    }

    #[test]
    fn test_env_overlay() {
        let config = AppConfig::default().overlay(env(&[
            ("GLOAM_FULLSCREEN", "true"),
            ("GLOAM_VSYNC", "1"),
            ("GLOAM_MSAA", "1"),
            ("GLOAM_WIREFRAME", "on"),
            ("GLOAM_ASSETS", "/tmp/assets"),
        ]));
        assert!(config.fullscreen);
        assert!(config.render.vsync);
        assert!(config.render.wireframe);
        assert_eq!(config.render.msaa_samples, 1);
        assert_eq!(config.shader_dir(), PathBuf::from("/tmp/assets/shaders"));
        assert!(config.shaders_from_disk);
    }

    #[test]
    fn test_bad_msaa_is_ignored() {
        let config = AppConfig::default().overlay(env(&[("GLOAM_MSAA", "lots")]));
        assert_eq!(config.render.msaa_samples, MSAA_SAMPLES);
    }

    #[test]
    fn test_unsupported_msaa_falls_back_to_one() {
        assert_eq!(RenderConfig::default().with_msaa(8).msaa_samples, 1);
        assert_eq!(RenderConfig::default().with_msaa(4).msaa_samples, 4);
    }

    #[test]
    fn test_wireframe_asks_for_line_mode() {
        assert_eq!(RenderConfig::default().wanted_features(), wgpu::Features::empty());
        assert_eq!(
            RenderConfig::default().with_wireframe(true).wanted_features(),
            wgpu::Features::POLYGON_MODE_LINE
        );
    }
}
