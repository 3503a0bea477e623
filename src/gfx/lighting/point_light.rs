//! Point lights and their omnidirectional depth cubemaps.
//!
//! Each light owns exactly one depth cubemap, allocated when the light is
//! created and released when it is dropped. The six light-space matrices are
//! built with the usual GL cube-face conventions (looking down each axis with
//! `(0,-1,0)` as up, except ±Y which use `(0,0,±1)`). wgpu stores framebuffer
//! rows top-down, so [`cube_projection`] flips Y to keep the rendered faces in
//! the orientation cube sampling expects.

use cgmath::{Deg, Matrix4, Point3, Vector3};

use crate::gfx::camera::camera_utils;

/// One face of a cubemap, in texture layer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubemapFace {
    PositiveX = 0,
    NegativeX = 1,
    PositiveY = 2,
    NegativeY = 3,
    PositiveZ = 4,
    NegativeZ = 5,
}

impl CubemapFace {
    pub const ALL: [CubemapFace; 6] = [
        CubemapFace::PositiveX,
        CubemapFace::NegativeX,
        CubemapFace::PositiveY,
        CubemapFace::NegativeY,
        CubemapFace::PositiveZ,
        CubemapFace::NegativeZ,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Axis the face looks along.
    pub fn direction(self) -> Vector3<f32> {
        match self {
            CubemapFace::PositiveX => Vector3::unit_x(),
            CubemapFace::NegativeX => -Vector3::unit_x(),
            CubemapFace::PositiveY => Vector3::unit_y(),
            CubemapFace::NegativeY => -Vector3::unit_y(),
            CubemapFace::PositiveZ => Vector3::unit_z(),
            CubemapFace::NegativeZ => -Vector3::unit_z(),
        }
    }

    /// Up vector for the face. Never parallel to [`CubemapFace::direction`].
    pub fn up(self) -> Vector3<f32> {
        match self {
            CubemapFace::PositiveY => Vector3::unit_z(),
            CubemapFace::NegativeY => -Vector3::unit_z(),
            _ => -Vector3::unit_y(),
        }
    }
}

/// Shared projection for every face of every light: 90° FOV, square aspect.
pub fn cube_projection(znear: f32, zfar: f32) -> Matrix4<f32> {
    Matrix4::from_nonuniform_scale(1.0, -1.0, 1.0)
        * camera_utils::perspective(Deg(90.0), 1.0, znear, zfar)
}

/// View matrices looking out of `position` through each cube face.
pub fn cube_face_views(position: Point3<f32>) -> [Matrix4<f32>; 6] {
    CubemapFace::ALL.map(|face| Matrix4::look_at_rh(position, position + face.direction(), face.up()))
}

/// Light-space (projection * view) matrices for the six faces.
pub fn light_space_matrices(
    position: Point3<f32>,
    projection: &Matrix4<f32>,
) -> [Matrix4<f32>; 6] {
    cube_face_views(position).map(|view| *projection * view)
}

/// GPU depth cubemap: one `Depth32Float` texture with six layers.
pub struct DepthCubemap {
    texture: wgpu::Texture,
    cube_view: wgpu::TextureView,
    face_views: [wgpu::TextureView; 6],
    resolution: u32,
}

impl DepthCubemap {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn new(device: &wgpu::Device, resolution: u32, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let cube_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label} (cube)")),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            array_layer_count: Some(6),
            ..Default::default()
        });

        let face_views = CubemapFace::ALL.map(|face| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some(&format!("{label} (face {})", face.index())),
                dimension: Some(wgpu::TextureViewDimension::D2),
                base_array_layer: face.index() as u32,
                array_layer_count: Some(1),
                ..Default::default()
            })
        });

        log::trace!("Created depth cubemap '{label}' with resolution {resolution}");

        Self {
            texture,
            cube_view,
            face_views,
            resolution,
        }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn cube_view(&self) -> &wgpu::TextureView {
        &self.cube_view
    }

    pub fn face_views(&self) -> &[wgpu::TextureView; 6] {
        &self.face_views
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }
}

impl Drop for DepthCubemap {
    fn drop(&mut self) {
        log::trace!("Released depth cubemap ({0}x{0})", self.resolution);
    }
}

/// A point light. Position and colour are fixed after creation.
pub struct PointLight {
    position: Point3<f32>,
    color: Vector3<f32>,
    depth_cubemap: DepthCubemap,
}

impl PointLight {
    pub fn new(
        device: &wgpu::Device,
        position: Point3<f32>,
        color: Vector3<f32>,
        shadow_resolution: u32,
        label: &str,
    ) -> Self {
        let depth_cubemap = DepthCubemap::new(device, shadow_resolution, label);
        log::trace!("Initialized point light '{label}' at {position:?}");
        Self {
            position,
            color,
            depth_cubemap,
        }
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn color(&self) -> Vector3<f32> {
        self.color
    }

    pub fn depth_cubemap(&self) -> &DepthCubemap {
        &self.depth_cubemap
    }

    pub fn light_space_matrices(&self, projection: &Matrix4<f32>) -> [Matrix4<f32>; 6] {
        light_space_matrices(self.position, projection)
    }
}

/// Positions and colours of the default four-light setup.
pub fn default_light_setup() -> [(Point3<f32>, Vector3<f32>); 4] {
    [
        (Point3::new(0.0, 2.0, 2.0), Vector3::new(1.0, 1.0, 1.0)),
        (Point3::new(2.3, 3.3, -4.0), Vector3::new(1.0, 0.0, 0.0)),
        (Point3::new(-4.0, 2.0, -12.0), Vector3::new(0.0, 1.0, 0.0)),
        (Point3::new(3.3, 4.0, -1.5), Vector3::new(0.0, 0.0, 1.0)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector4};

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_six_views_map_light_to_origin() {
        for (position, _) in default_light_setup() {
            let views = cube_face_views(position);
            assert_eq!(views.len(), 6);
            for view in views {
                let p = view * position.to_homogeneous();
                assert!(approx_eq(p.x, 0.0) && approx_eq(p.y, 0.0) && approx_eq(p.z, 0.0));
                assert!(approx_eq(p.w, 1.0));
            }
        }
    }

    #[test]
    fn test_each_face_looks_down_its_axis() {
        let position = Point3::new(1.0, 2.0, 3.0);
        let views = cube_face_views(position);
        for face in CubemapFace::ALL {
            // A point one unit along the face axis sits straight ahead (-Z in view space).
            let ahead = (position + face.direction()).to_homogeneous();
            let p = views[face.index()] * ahead;
            assert!(approx_eq(p.x, 0.0));
            assert!(approx_eq(p.y, 0.0));
            assert!(approx_eq(p.z, -1.0));
        }
    }

    #[test]
    fn test_up_vectors_never_degenerate() {
        for face in CubemapFace::ALL {
            assert!(face.direction().cross(face.up()).magnitude() > 0.5);
        }
        assert_eq!(CubemapFace::PositiveY.up(), Vector3::unit_z());
        assert_eq!(CubemapFace::NegativeY.up(), -Vector3::unit_z());
        assert_eq!(CubemapFace::PositiveX.up(), -Vector3::unit_y());
        assert_eq!(CubemapFace::NegativeZ.up(), -Vector3::unit_y());
    }

    #[test]
    fn test_light_space_matrices_project_into_clip_volume() {
        let projection = cube_projection(0.1, 32.0);
        let position = Point3::new(0.0, 2.0, 2.0);
        let matrices = light_space_matrices(position, &projection);
        assert_eq!(matrices.len(), 6);

        for face in CubemapFace::ALL {
            let target = position + face.direction() * 5.0;
            let clip = matrices[face.index()] * target.to_homogeneous();
            let ndc = Vector4::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w, 1.0);
            assert!(approx_eq(ndc.x, 0.0) && approx_eq(ndc.y, 0.0));
            assert!(ndc.z > 0.0 && ndc.z < 1.0);
        }
    }

    #[test]
    fn test_projection_flips_y_for_top_down_rows() {
        let projection = cube_projection(0.1, 32.0);
        let above = projection * Vector4::new(0.0, 1.0, -2.0, 1.0);
        assert!(above.y / above.w < 0.0);
    }

    #[test]
    fn test_face_order_matches_layers() {
        let indices: Vec<usize> = CubemapFace::ALL.iter().map(|f| f.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }
}
