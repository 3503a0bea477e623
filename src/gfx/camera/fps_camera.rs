//! First-person camera with ground-plane movement, gravity and jumping.
//!
//! Each active frame calls [`FpsCamera::translate`], then [`FpsCamera::rotate`]
//! for every mouse motion event, then [`FpsCamera::finalize`]. Orientation is
//! stored as yaw/pitch in degrees; yaw 0 looks down -Z and grows to the right.
//! `direction` points from the target back to the eye, so "forward" is
//! `-direction_2d`.

use cgmath::{InnerSpace, Matrix4, Point3, Vector3, Zero};

use crate::config;

use super::camera_controller::{Action, KeyboardState};

#[derive(Debug, Clone, Copy)]
pub struct FpsCamera {
    position: Point3<f32>,
    target: Point3<f32>,
    up: Vector3<f32>,
    direction: Vector3<f32>,
    direction_2d: Vector3<f32>,
    right_2d: Vector3<f32>,
    yaw: f32,
    pitch: f32,
    vertical_velocity: f32,
    on_ground: bool,

    pub speed: f32,
    pub sprint_boost: f32,
    pub sensitivity: f32,
    pub jump_speed: f32,
    pub gravity: f32,
    pub eye_height: f32,
    pub terminal_velocity: f32,
}

impl FpsCamera {
    /// Creates a camera at `position` looking towards `target`.
    pub fn new(position: Point3<f32>, target: Point3<f32>) -> Self {
        let look = target - position;
        let look = if look.magnitude2() > f32::EPSILON {
            look.normalize()
        } else {
            -Vector3::unit_z()
        };
        let yaw = look.x.atan2(-look.z).to_degrees();
        let pitch = look
            .y
            .asin()
            .to_degrees()
            .clamp(-config::PITCH_LIMIT, config::PITCH_LIMIT);

        let mut camera = Self {
            position,
            target,
            up: Vector3::unit_y(),
            direction: Vector3::zero(),
            direction_2d: Vector3::zero(),
            right_2d: Vector3::zero(),
            yaw,
            pitch,
            vertical_velocity: 0.0,
            on_ground: position.y <= config::EYE_Y,
            speed: config::SPEED,
            sprint_boost: config::SPRINT_BOOST,
            sensitivity: config::SENSITIVITY,
            jump_speed: config::JUMP_SPEED,
            gravity: config::GRAVITY,
            eye_height: config::EYE_Y,
            terminal_velocity: config::TERMINAL_VELOCITY,
        };
        camera.target = camera.position + front(camera.yaw, camera.pitch);
        camera.finalize();
        camera
    }

    /// Camera at the default spawn point, facing +X.
    pub fn spawn() -> Self {
        Self::new(
            Point3::new(-2.0, config::EYE_Y, 2.0),
            Point3::new(-1.0, config::EYE_Y, 2.0),
        )
    }

    /// Moves the camera along the ground-plane basis and integrates vertical
    /// motion. The look target moves with the eye.
    pub fn translate(&mut self, keys: &KeyboardState, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        let step = self.speed * dt;
        let mut delta = Vector3::zero();
        if keys.is_down(Action::Forward) {
            let boost = if keys.is_down(Action::Sprint) {
                self.sprint_boost
            } else {
                1.0
            };
            delta -= self.direction_2d * step * boost;
        }
        if keys.is_down(Action::Backward) {
            delta += self.direction_2d * step;
        }
        if keys.is_down(Action::Left) {
            delta -= self.right_2d * step;
        }
        if keys.is_down(Action::Right) {
            delta += self.right_2d * step;
        }

        if keys.is_down(Action::Jump) && self.on_ground {
            self.vertical_velocity = self.jump_speed;
            self.on_ground = false;
        }

        if !self.on_ground {
            delta.y += self.vertical_velocity * dt;
            self.vertical_velocity =
                (self.vertical_velocity - self.gravity * dt).max(-self.terminal_velocity);
        }

        self.position += delta;
        self.target += delta;

        // Flat ground placeholder: the eye never sinks below eye height.
        if self.position.y <= self.eye_height {
            let correction = self.eye_height - self.position.y;
            self.position.y = self.eye_height;
            self.target.y += correction;
            self.vertical_velocity = 0.0;
            self.on_ground = true;
        }
    }

    /// Applies a mouse delta in pixels. Pitch is clamped to ±89°, yaw wraps.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.yaw = (self.yaw + dx * self.sensitivity) % 360.0;
        self.pitch = (self.pitch - dy * self.sensitivity)
            .clamp(-config::PITCH_LIMIT, config::PITCH_LIMIT);
        self.target = self.position + front(self.yaw, self.pitch);
    }

    /// Re-derives the direction vectors from position and target.
    pub fn finalize(&mut self) {
        let back = self.position - self.target;
        if back.magnitude2() > f32::EPSILON {
            self.direction = back.normalize();
        }

        let flat = Vector3::new(self.direction.x, 0.0, self.direction.z);
        if flat.magnitude2() > f32::EPSILON {
            self.direction_2d = flat.normalize();
        }
        self.right_2d = self.up.cross(self.direction_2d).normalize();
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    pub fn direction_2d(&self) -> Vector3<f32> {
        self.direction_2d
    }

    pub fn right_2d(&self) -> Vector3<f32> {
        self.right_2d
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    pub fn on_ground(&self) -> bool {
        self.on_ground
    }
}

/// Unit look vector for the given yaw and pitch in degrees.
fn front(yaw: f32, pitch: f32) -> Vector3<f32> {
    let (yaw, pitch) = (yaw.to_radians(), pitch.to_radians());
    Vector3::new(
        yaw.sin() * pitch.cos(),
        pitch.sin(),
        -yaw.cos() * pitch.cos(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::KeyCode;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn camera_at_origin() -> FpsCamera {
        FpsCamera::new(
            Point3::new(0.0, config::EYE_Y, 0.0),
            Point3::new(0.0, config::EYE_Y, -1.0),
        )
    }

    // Small deterministic generator so the property loops need no extra crate.
    struct Lcg(u64);

    impl Lcg {
        fn next_f32(&mut self, range: f32) -> f32 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((self.0 >> 33) as f32 / (1u64 << 31) as f32 * 2.0 - 1.0) * range
        }

        fn next_bool(&mut self) -> bool {
            self.next_f32(1.0) > 0.0
        }
    }

    #[test]
    fn test_spawn_faces_positive_x() {
        let camera = FpsCamera::spawn();
        assert!(approx_eq(camera.yaw(), 90.0));
        assert!(approx_eq(camera.pitch(), 0.0));
        assert!(camera.on_ground());
        assert!(approx_eq(camera.direction_2d().x, -1.0));
    }

    #[test]
    fn test_forward_moves_along_negative_z() {
        let mut camera = camera_at_origin();
        camera.speed = 10.0;
        assert!(approx_eq(camera.yaw(), 0.0));

        let mut keys = KeyboardState::default();
        keys.press(KeyCode::KeyH);
        camera.translate(&keys, 0.1);
        camera.finalize();

        let p = camera.position();
        assert!(approx_eq(p.x, 0.0));
        assert!(approx_eq(p.y, config::EYE_Y));
        assert!(approx_eq(p.z, -1.0));
    }

    #[test]
    fn test_sprint_only_boosts_forward() {
        let mut keys = KeyboardState::default();
        keys.press(KeyCode::KeyG);
        keys.press(KeyCode::KeyB);

        let mut camera = camera_at_origin();
        camera.translate(&keys, 0.1);
        assert!(approx_eq(camera.position().z, config::SPEED * 0.1));

        keys.release(KeyCode::KeyB);
        keys.press(KeyCode::KeyH);
        let mut camera = camera_at_origin();
        camera.translate(&keys, 0.1);
        assert!(approx_eq(
            camera.position().z,
            -config::SPEED * config::SPRINT_BOOST * 0.1
        ));
    }

    #[test]
    fn test_strafe_uses_right_vector() {
        let mut keys = KeyboardState::default();
        keys.press(KeyCode::KeyN);
        let mut camera = camera_at_origin();
        camera.translate(&keys, 0.1);
        assert!(approx_eq(camera.position().x, config::SPEED * 0.1));
        assert!(approx_eq(camera.position().z, 0.0));
    }

    #[test]
    fn test_looking_up_does_not_fly() {
        let mut camera = camera_at_origin();
        camera.rotate(0.0, -10_000.0);
        camera.finalize();
        assert!(approx_eq(camera.pitch(), config::PITCH_LIMIT));

        let mut keys = KeyboardState::default();
        keys.press(KeyCode::KeyH);
        camera.translate(&keys, 0.1);
        assert!(approx_eq(camera.position().y, config::EYE_Y));
        assert!(approx_eq(camera.position().z, -config::SPEED * 0.1));
    }

    #[test]
    fn test_jump_takes_one_euler_step() {
        let mut camera = camera_at_origin();
        camera.jump_speed = 7.5;
        camera.gravity = 20.0;

        let mut keys = KeyboardState::default();
        keys.press(KeyCode::Space);
        camera.translate(&keys, 0.1);

        assert!(approx_eq(camera.vertical_velocity(), 5.5));
        assert!(approx_eq(camera.position().y - config::EYE_Y, 0.75));
        assert!(!camera.on_ground());
    }

    #[test]
    fn test_jump_lands_back_on_ground() {
        let mut camera = camera_at_origin();
        let mut keys = KeyboardState::default();
        keys.press(KeyCode::Space);
        camera.translate(&keys, 0.016);
        keys.release(KeyCode::Space);

        for _ in 0..200 {
            camera.translate(&keys, 0.016);
        }
        assert!(camera.on_ground());
        assert_eq!(camera.vertical_velocity(), 0.0);
        assert!(approx_eq(camera.position().y, config::EYE_Y));
    }

    #[test]
    fn test_fall_speed_is_capped() {
        let mut camera = FpsCamera::new(
            Point3::new(0.0, 1000.0, 0.0),
            Point3::new(0.0, 1000.0, -1.0),
        );
        assert!(!camera.on_ground());
        let keys = KeyboardState::default();
        for _ in 0..100 {
            camera.translate(&keys, 0.1);
        }
        assert!(camera.vertical_velocity() >= -config::TERMINAL_VELOCITY);
    }

    #[test]
    fn test_grounding_invariant_holds() {
        let mut rng = Lcg(7);
        let mut camera = camera_at_origin();
        let mut keys = KeyboardState::default();
        let toggles = [KeyCode::Space, KeyCode::KeyH, KeyCode::KeyV, KeyCode::KeyG];

        for _ in 0..5_000 {
            for key in toggles {
                if rng.next_bool() {
                    keys.press(key);
                } else {
                    keys.release(key);
                }
            }
            camera.translate(&keys, rng.next_f32(0.05).abs());
            camera.finalize();

            if camera.position().y <= camera.eye_height {
                assert!(camera.on_ground());
                assert_eq!(camera.vertical_velocity(), 0.0);
            }
        }
    }

    #[test]
    fn test_pitch_always_clamped() {
        let mut rng = Lcg(42);
        let mut camera = camera_at_origin();
        for _ in 0..10_000 {
            camera.rotate(rng.next_f32(5_000.0), rng.next_f32(5_000.0));
            assert!(camera.pitch() >= -config::PITCH_LIMIT);
            assert!(camera.pitch() <= config::PITCH_LIMIT);
        }
    }

    #[test]
    fn test_yaw_stays_within_one_turn() {
        let mut camera = camera_at_origin();
        for _ in 0..100_000 {
            camera.rotate(997.0, 0.0);
            assert!(camera.yaw().abs() < 360.0);
        }
    }

    #[test]
    fn test_zero_delta_is_noop() {
        let mut camera = camera_at_origin();
        let before = (camera.yaw(), camera.pitch(), camera.target());
        camera.rotate(0.0, 0.0);
        assert_eq!(before, (camera.yaw(), camera.pitch(), camera.target()));
    }

    #[test]
    fn test_finalize_derives_vectors_from_target() {
        let mut camera = camera_at_origin();
        camera.rotate(90.0 / config::SENSITIVITY, 0.0);
        camera.finalize();

        // Facing +X: direction points back towards -X, right is +Z.
        assert!(approx_eq(camera.direction().x, -1.0));
        assert!(approx_eq(camera.right_2d().z, 1.0));
        assert_eq!(camera.up(), Vector3::unit_y());
    }
}
