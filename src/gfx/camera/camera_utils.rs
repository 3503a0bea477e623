use cgmath::{Deg, Matrix4};

/// Maps OpenGL clip space depth (-1..1) onto wgpu's (0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Perspective projection with wgpu depth conventions.
pub fn perspective(fovy: Deg<f32>, aspect: f32, znear: f32, zfar: f32) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * cgmath::perspective(fovy, aspect, znear, zfar)
}

/// Cached perspective projection.
///
/// The matrix only changes when the surface is resized, so it is computed on
/// construction and on [`Projection::resize`], never per frame.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    fovy: Deg<f32>,
    aspect: f32,
    znear: f32,
    zfar: f32,
    matrix: Matrix4<f32>,
}

impl Projection {
    pub fn new(width: u32, height: u32, fovy: Deg<f32>, znear: f32, zfar: f32) -> Self {
        let aspect = aspect_ratio(width, height);
        Self {
            fovy,
            aspect,
            znear,
            zfar,
            matrix: perspective(fovy, aspect, znear, zfar),
        }
    }

    /// Recomputes the matrix for a new surface size. Zero-sized surfaces
    /// (minimised windows) keep the previous matrix.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = aspect_ratio(width, height);
        self.matrix = perspective(self.fovy, self.aspect, self.znear, self.zfar);
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        self.matrix
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix4.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector4;

    #[test]
    fn test_near_and_far_map_to_wgpu_depth_range() {
        let proj = perspective(Deg(90.0), 1.0, 0.1, 32.0);
        let near = proj * Vector4::new(0.0, 0.0, -0.1, 1.0);
        let far = proj * Vector4::new(0.0, 0.0, -32.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_resize_recomputes_only_on_valid_size() {
        let mut projection = Projection::new(1280, 720, Deg(70.0), 0.1, 32.0);
        let before = projection.matrix();

        projection.resize(0, 720);
        assert_eq!(projection.matrix(), before);

        projection.resize(720, 720);
        assert!((projection.aspect() - 1.0).abs() < f32::EPSILON);
        assert_ne!(projection.matrix(), before);
    }

    #[test]
    fn test_matrix_conversion_is_column_major() {
        let m = Matrix4::from_translation(cgmath::Vector3::new(1.0, 2.0, 3.0));
        let array = convert_matrix4_to_array(m);
        assert_eq!(array[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
