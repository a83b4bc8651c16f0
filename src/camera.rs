use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::CameraSettings;
use crate::input::{InputState, KeyCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    Perspective,
    Orthographic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraMode {
    /// Looks at the origin from a point on a sphere, steered with the arrow keys.
    Orbit,
    /// Flies freely with WASD and mouse look.
    Free,
}

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

/// Orbit/free camera driven by keyboard, mouse and scroll input.
#[derive(Debug, Clone)]
pub struct Camera {
    settings: CameraSettings,
    mode: CameraMode,
    projection: Projection,
    position: Vec3,
    front: Vec3,
    up: Vec3,
    yaw: f32,
    pitch: f32,
    theta: f32,
    phi: f32,
    fov: f32,
}

impl Camera {
    pub fn new(settings: CameraSettings) -> Self {
        let mut camera = Self {
            mode: settings.mode,
            projection: settings.projection,
            position: settings.position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            yaw: -90.0,
            pitch: 0.0,
            theta: settings.theta.rem_euclid(360.0),
            phi: settings.phi.rem_euclid(360.0),
            fov: settings.fov,
            settings,
        };
        camera.update_front();
        camera
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn theta(&self) -> f32 {
        self.theta
    }

    pub fn phi(&self) -> f32 {
        self.phi
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            CameraMode::Orbit => CameraMode::Free,
            CameraMode::Free => CameraMode::Orbit,
        };
    }

    /// Applies one frame of input. `dt` is in seconds.
    pub fn apply_input(&mut self, input: &InputState, dt: f32) {
        if input.was_pressed(KeyCode::letter('P')) {
            self.set_projection(Projection::Perspective);
        }
        if input.was_pressed(KeyCode::letter('O')) {
            self.set_projection(Projection::Orthographic);
        }
        if input.was_pressed(KeyCode::letter('M')) {
            self.toggle_mode();
        }

        let turn = self.settings.orbit_speed * dt;
        let axis = |positive: KeyCode, negative: KeyCode| {
            input.is_key_down(positive) as i32 as f32 - input.is_key_down(negative) as i32 as f32
        };
        self.rotate_orbit(
            axis(KeyCode::DOWN, KeyCode::UP) * turn,
            axis(KeyCode::LEFT, KeyCode::RIGHT) * turn,
        );

        let step = self.settings.move_speed * dt;
        let forward = axis(KeyCode::letter('W'), KeyCode::letter('S'));
        let strafe = axis(KeyCode::letter('D'), KeyCode::letter('A'));
        self.translate(forward * step, strafe * step);

        let motion = input.mouse_delta();
        if motion != Vec2::ZERO {
            self.look(motion);
        }
        let scroll = input.scroll();
        if scroll != 0.0 {
            self.zoom(scroll);
        }
    }

    /// Moves the orbit point by the given angles in degrees, wrapping to `[0, 360)`.
    pub fn rotate_orbit(&mut self, delta_theta: f32, delta_phi: f32) {
        self.theta = (self.theta + delta_theta).rem_euclid(360.0);
        self.phi = (self.phi + delta_phi).rem_euclid(360.0);
    }

    /// Moves the free camera along its front and right vectors.
    pub fn translate(&mut self, forward: f32, right: f32) {
        let right_axis = self.front.cross(self.up).normalize_or_zero();
        self.position += self.front * forward + right_axis * right;
    }

    /// Turns the free camera by a pointer motion in pixels (y down).
    pub fn look(&mut self, motion: Vec2) {
        let sensitivity = self.settings.mouse_sensitivity;
        self.yaw += motion.x * sensitivity;
        self.pitch = (self.pitch - motion.y * sensitivity).clamp(-89.0, 89.0);
        self.update_front();
    }

    /// Narrows the field of view by `lines` scroll steps.
    pub fn zoom(&mut self, lines: f32) {
        self.fov = (self.fov - lines).clamp(self.settings.min_fov, self.settings.max_fov);
    }

    fn update_front(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
    }

    /// Distance that sizes the orthographic volume and the orbit sphere.
    fn extent(&self) -> f32 {
        match self.mode {
            CameraMode::Orbit => self.settings.orbit_distance,
            CameraMode::Free => self.position.length(),
        }
    }

    /// World position of the eye.
    pub fn eye(&self) -> Vec3 {
        match self.mode {
            CameraMode::Free => self.position,
            CameraMode::Orbit => {
                let (theta, phi) = (self.theta.to_radians(), self.phi.to_radians());
                self.settings.orbit_distance
                    * Vec3::new(theta.sin() * phi.sin(), theta.cos(), theta.sin() * phi.cos())
            }
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        match self.mode {
            CameraMode::Free => {
                Mat4::look_at_rh(self.position, self.position + self.front, self.up)
            }
            CameraMode::Orbit => {
                let up = if self.theta >= 180.0 { Vec3::NEG_Y } else { Vec3::Y };
                Mat4::look_at_rh(self.eye(), Vec3::ZERO, up)
            }
        }
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let aspect = aspect.max(0.01);
        match self.projection {
            Projection::Perspective => Mat4::perspective_rh(
                self.fov.to_radians(),
                aspect,
                self.settings.near,
                self.settings.far,
            ),
            Projection::Orthographic => {
                let len = self.extent().max(0.01);
                let depth = self.settings.ortho_depth;
                Mat4::orthographic_rh(-len * aspect, len * aspect, -len, len, -depth, depth)
            }
        }
    }

    pub fn params(&self, aspect: f32) -> CameraParams {
        CameraParams {
            view_proj: self.projection_matrix(aspect) * self.view_matrix(),
            position: self.eye(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn orbit_camera() -> Camera {
        Camera::new(CameraSettings {
            mode: CameraMode::Orbit,
            theta: 90.0,
            phi: 0.0,
            ..CameraSettings::default()
        })
    }

    #[test]
    fn orbit_eye_sits_on_sphere() {
        let camera = orbit_camera();
        assert!(camera.eye().abs_diff_eq(Vec3::new(0.0, 0.0, 20.0), EPS));

        let mut camera = camera;
        camera.rotate_orbit(0.0, 90.0);
        assert!(camera.eye().abs_diff_eq(Vec3::new(20.0, 0.0, 0.0), 1e-3));
    }

    #[test]
    fn view_moves_eye_to_origin() {
        for camera in [orbit_camera(), Camera::new(CameraSettings::default())] {
            let eye = camera.eye();
            let mapped = camera.view_matrix().transform_point3(eye);
            assert!(mapped.abs_diff_eq(Vec3::ZERO, 1e-3), "{mapped:?}");
        }
    }

    #[test]
    fn orbit_angles_wrap() {
        let mut camera = orbit_camera();
        let mut input = InputState::new();
        input.set_key_down(KeyCode::UP);
        camera.rotate_orbit(-92.0, 0.0);
        assert!((camera.theta() - 358.0).abs() < EPS);

        camera.apply_input(&input, 0.05);
        assert!((camera.theta() - 353.0).abs() < EPS);

        camera.rotate_orbit(10.0, -5.0);
        assert!((camera.theta() - 3.0).abs() < EPS);
        assert!((camera.phi() - 355.0).abs() < EPS);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::new(CameraSettings::default());
        camera.look(Vec2::new(0.0, -100_000.0));
        assert_eq!(camera.pitch(), 89.0);
        camera.look(Vec2::new(0.0, 100_000.0));
        assert_eq!(camera.pitch(), -89.0);
        assert!((camera.front().length() - 1.0).abs() < EPS);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = Camera::new(CameraSettings::default());
        camera.zoom(100.0);
        assert_eq!(camera.fov(), 1.0);
        camera.zoom(-100.0);
        assert_eq!(camera.fov(), 45.0);
    }

    #[test]
    fn wide_start_fov_snaps_into_range_on_first_scroll() {
        let mut camera = Camera::new(CameraSettings {
            fov: 89.0,
            ..CameraSettings::default()
        });
        camera.zoom(1.0);
        assert_eq!(camera.fov(), 45.0);
    }

    #[test]
    fn free_camera_walks_along_front() {
        let mut camera = Camera::new(CameraSettings::default());
        let mut input = InputState::new();
        input.set_key_down(KeyCode::letter('W'));
        camera.apply_input(&input, 1.0);
        assert!(camera.eye().abs_diff_eq(Vec3::new(0.0, 0.0, 15.0), EPS));

        input.set_key_up(KeyCode::letter('W'));
        input.set_key_down(KeyCode::letter('D'));
        camera.apply_input(&input, 1.0);
        assert!(camera.eye().abs_diff_eq(Vec3::new(5.0, 0.0, 15.0), EPS));
    }

    #[test]
    fn keys_toggle_mode_and_projection() {
        let mut camera = Camera::new(CameraSettings::default());
        let mut input = InputState::new();
        input.set_key_down(KeyCode::letter('O'));
        input.set_key_down(KeyCode::letter('M'));
        camera.apply_input(&input, 0.0);
        assert_eq!(camera.projection(), Projection::Orthographic);
        assert_eq!(camera.mode(), CameraMode::Orbit);

        // held keys do not toggle again
        input.end_frame();
        camera.apply_input(&input, 0.0);
        assert_eq!(camera.mode(), CameraMode::Orbit);

        input.set_key_down(KeyCode::letter('P'));
        camera.apply_input(&input, 0.0);
        assert_eq!(camera.projection(), Projection::Perspective);
    }

    #[test]
    fn orthographic_volume_scales_with_distance() {
        let mut camera = orbit_camera();
        camera.set_projection(Projection::Orthographic);
        let projection = camera.projection_matrix(2.0);
        let edge = projection.project_point3(Vec3::new(40.0, 20.0, 0.0));
        assert!((edge.x - 1.0).abs() < EPS);
        assert!((edge.y - 1.0).abs() < EPS);
    }
}
