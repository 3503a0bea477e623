//! Core rendering functionality
//!
//! Shader loading, program linking, the shadow and main passes, and the
//! engine that records them into one frame.

pub mod main_pass;
pub mod program;
pub mod render_engine;
pub mod shader;
pub mod shadow_framebuffer;
pub mod shadow_pass;

pub use main_pass::MainPass;
pub use program::{DepthConfig, PipelineConfig, Program, VertexInput};
pub use render_engine::{create_lights, request_device, FrameStatus, RenderEngine};
pub use shader::{Shader, ShaderModule, ShaderSource, ShaderStage};
pub use shadow_framebuffer::ShadowFramebuffer;
pub use shadow_pass::{FaceUniform, ShadowLightUniform, ShadowPass};
