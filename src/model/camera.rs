use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

pub struct Camera {
    pub eye: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            eye: Vec3::new(0.0, 2.0, -10.0),
            yaw: 0.0,
            pitch: 0.0,
            up: Vec3::Y,
            fov_y: 60f32.to_radians(),
            aspect: width as f32 / height.max(1) as f32,
            z_near: 0.1,
            z_far: 1000.0,
        }
    }

    /// Camera parked `start_distance` behind `subject` (facing along
    /// `subject_forward`) at absolute height `start_height`.
    pub fn behind(config: &CameraConfig, subject: Vec3, subject_forward: Vec3, width: u32, height: u32) -> Self {
        let mut camera = Self::new(width, height);
        camera.fov_y = config.fov_deg.to_radians();
        let back = subject - subject_forward * config.start_distance;
        camera.eye = Vec3::new(back.x, config.start_height, back.z);
        camera.set_look_at(subject);
        camera
    }

    pub fn forward(&self) -> Vec3 {
        let cy = self.yaw;
        let cp = self.pitch.clamp(-1.5533, 1.5533); // Slightly less than π/2 to avoid gimbal lock
        Vec3::new(cy.cos() * cp.cos(), cp.sin(), cy.sin() * cp.cos()).normalize()
    }

    /// Horizontal right-hand axis of the view.
    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize_or_zero()
    }

    pub fn target(&self) -> Vec3 { self.eye + self.forward() }

    pub fn set_aspect(&mut self, width: u32, height: u32) { self.aspect = width as f32 / height.max(1) as f32; }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target(), self.up);
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far);
        proj * view
    }

    pub fn set_look_at(&mut self, target: Vec3) {
        let Some(dir) = (target - self.eye).try_normalize() else {
            return;
        };
        self.yaw = dir.z.atan2(dir.x);
        self.pitch = dir.y.asin().clamp(-1.4, 1.4);
    }

    /// Slide sideways along [`right`](Self::right). Negative moves left.
    pub fn strafe(&mut self, amount: f32) {
        self.eye += self.right() * amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_at_points_forward_at_target() {
        let mut cam = Camera::new(800, 600);
        cam.eye = Vec3::new(3.0, 4.0, -2.0);
        let target = Vec3::new(-1.0, 1.0, 5.0);
        cam.set_look_at(target);
        let want = (target - cam.eye).normalize();
        assert!(cam.forward().abs_diff_eq(want, 1e-4));
    }

    #[test]
    fn right_is_horizontal_and_perpendicular() {
        let mut cam = Camera::new(800, 600);
        cam.set_look_at(Vec3::new(2.0, -1.0, 7.0));
        let r = cam.right();
        assert!(r.y.abs() < 1e-5);
        assert!(r.dot(cam.forward()).abs() < 1e-5);
        // looking down +Z with Y up, right is -X
        let mut cam = Camera::new(800, 600);
        cam.eye = Vec3::ZERO;
        cam.set_look_at(Vec3::Z);
        assert!(cam.right().abs_diff_eq(Vec3::NEG_X, 1e-5));
    }

    #[test]
    fn strafe_keeps_height() {
        let mut cam = Camera::new(800, 600);
        cam.set_look_at(Vec3::new(0.0, 0.0, 0.0));
        let before = cam.eye;
        cam.strafe(-2.0);
        assert!((cam.eye.y - before.y).abs() < 1e-5);
        assert!((cam.eye.distance(before) - 2.0).abs() < 1e-4);
    }

    #[test]
    fn starts_behind_subject() {
        let config = CameraConfig::default();
        let cam = Camera::behind(&config, Vec3::new(0.0, 0.5, 0.0), Vec3::Z, 800, 600);
        assert!(cam.eye.abs_diff_eq(Vec3::new(0.0, 2.0, -10.0), 1e-5));
        assert!(cam.forward().z > 0.9);
    }

    #[test]
    fn look_at_self_is_ignored() {
        let mut cam = Camera::new(800, 600);
        cam.yaw = 0.7;
        cam.set_look_at(cam.eye);
        assert_eq!(cam.yaw, 0.7);
    }
}
