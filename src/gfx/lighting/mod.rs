pub mod light_uniforms;
pub mod point_light;

pub use light_uniforms::{GpuPointLight, LightField, LightUniformSlots, LightValue, LightsBlock};
pub use point_light::{
    cube_face_views, cube_projection, default_light_setup, light_space_matrices, CubemapFace,
    DepthCubemap, PointLight,
};
