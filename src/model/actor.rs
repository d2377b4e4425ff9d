use glam::{Mat4, Quat, Vec3};

use crate::utils::{create_box_mesh, Mesh};

/// Which clip the roamer's body is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    /// Bind pose, nothing played yet.
    Idle,
    Looping(&'static str),
    Posed { clip: &'static str, frame: u32 },
}

pub const RUN_CLIP: &str = "run";
pub const WALK_CLIP: &str = "walk";
/// Frame of the walk clip shown while standing.
pub const STAND_FRAME: u32 = 5;

/// Unit forward vector for a heading in degrees. Heading 0 faces +Z and
/// positive headings turn left (counter-clockwise seen from above).
pub fn heading_forward(heading_deg: f32) -> Vec3 {
    let h = heading_deg.to_radians();
    Vec3::new(h.sin(), 0.0, h.cos())
}

/// Heading in degrees that faces from `from` towards `to` on the XZ plane.
pub fn heading_towards(from: Vec3, to: Vec3) -> f32 {
    let d = to - from;
    if d.x.abs() < f32::EPSILON && d.z.abs() < f32::EPSILON {
        return 0.0;
    }
    d.x.atan2(d.z).to_degrees()
}

/// The player-controlled character.
#[derive(Debug, Clone)]
pub struct Roamer {
    pub pos: Vec3,
    pub heading_deg: f32,
    pub scale: f32,
    pub animation: AnimationState,
}

impl Roamer {
    pub fn new(pos: Vec3, scale: f32) -> Self {
        Self {
            pos,
            heading_deg: 0.0,
            scale,
            animation: AnimationState::Idle,
        }
    }

    pub fn forward(&self) -> Vec3 {
        heading_forward(self.heading_deg)
    }

    pub fn behind(&self) -> Vec3 {
        -self.forward()
    }

    pub fn loop_clip(&mut self, clip: &'static str) {
        self.animation = AnimationState::Looping(clip);
    }

    pub fn stop_and_pose(&mut self, clip: &'static str, frame: u32) {
        self.animation = AnimationState::Posed { clip, frame };
    }

    pub fn is_running(&self) -> bool {
        self.animation == AnimationState::Looping(RUN_CLIP)
    }

    fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.heading_deg.to_radians()),
            self.pos,
        )
    }

    /// Body plus a nose block on the facing side, in model units (about six
    /// units tall before scaling).
    pub fn mesh(&self) -> Mesh {
        let mut mesh = create_box_mesh(Vec3::new(-1.0, 0.0, -0.6), Vec3::new(1.0, 4.5, 0.6), [0.25, 0.35, 0.75, 1.0]);
        mesh.append(&create_box_mesh(Vec3::new(-0.8, 4.5, -0.8), Vec3::new(0.8, 6.0, 0.8), [0.9, 0.75, 0.6, 1.0]));
        mesh.append(&create_box_mesh(Vec3::new(-0.2, 5.0, 0.8), Vec3::new(0.2, 5.4, 1.3), [0.9, 0.6, 0.5, 1.0]));
        // legs swing apart while running
        let stride = if self.is_running() { 0.6 } else { 0.0 };
        mesh.append(&create_box_mesh(Vec3::new(-0.9, -0.0, -0.4 + stride), Vec3::new(-0.1, 0.3, 0.4 + stride), [0.2, 0.2, 0.25, 1.0]));
        mesh.append(&create_box_mesh(Vec3::new(0.1, -0.0, -0.4 - stride), Vec3::new(0.9, 0.3, 0.4 - stride), [0.2, 0.2, 0.25, 1.0]));
        mesh.transform(&self.model_matrix());
        mesh
    }
}

/// Decorative follower. Bunnies never collide and never leave the line.
#[derive(Debug, Clone)]
pub struct Bunny {
    pub pos: Vec3,
    pub heading_deg: f32,
    pub scale: f32,
}

impl Bunny {
    pub fn new(scale: f32) -> Self {
        Self {
            pos: Vec3::ZERO,
            heading_deg: 0.0,
            scale,
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.heading_deg = heading_towards(self.pos, target);
    }

    pub fn mesh(&self) -> Mesh {
        let white = [0.95, 0.95, 0.92, 1.0];
        let mut mesh = create_box_mesh(Vec3::new(-0.8, 0.0, -1.0), Vec3::new(0.8, 1.4, 1.0), white);
        mesh.append(&create_box_mesh(Vec3::new(-0.6, 1.0, 0.6), Vec3::new(0.6, 2.0, 1.6), white));
        mesh.append(&create_box_mesh(Vec3::new(-0.5, 2.0, 0.9), Vec3::new(-0.2, 3.2, 1.1), [1.0, 0.8, 0.85, 1.0]));
        mesh.append(&create_box_mesh(Vec3::new(0.2, 2.0, 0.9), Vec3::new(0.5, 3.2, 1.1), [1.0, 0.8, 0.85, 1.0]));
        mesh.transform(&Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.heading_deg.to_radians()),
            self.pos,
        ));
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_zero_faces_positive_z() {
        assert!(heading_forward(0.0).abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn positive_heading_turns_left() {
        // left of +Z with +Y up is +X
        let left = Vec3::Y.cross(Vec3::Z);
        assert!(heading_forward(90.0).abs_diff_eq(left, 1e-6));
    }

    #[test]
    fn heading_towards_inverts_forward() {
        for h in [-170.0f32, -45.0, 0.0, 30.0, 135.0] {
            let from = Vec3::new(1.0, 2.0, 3.0);
            let to = from + heading_forward(h) * 4.0;
            assert!((heading_towards(from, to) - h).abs() < 1e-3, "{h}");
        }
    }

    #[test]
    fn rotation_matches_heading_forward() {
        let q = Quat::from_rotation_y(37f32.to_radians());
        assert!((q * Vec3::Z).abs_diff_eq(heading_forward(37.0), 1e-5));
    }

    #[test]
    fn bunny_faces_target() {
        let mut bunny = Bunny::new(0.3);
        bunny.pos = Vec3::new(0.0, 0.0, -2.0);
        bunny.look_at(Vec3::ZERO);
        assert!(heading_forward(bunny.heading_deg).abs_diff_eq(Vec3::Z, 1e-5));
    }

    #[test]
    fn roamer_mesh_sits_on_position() {
        let roamer = Roamer::new(Vec3::new(3.0, 1.0, -2.0), 0.3);
        let mesh = roamer.mesh();
        let min_y = mesh.vertices.iter().map(|v| v.pos[1]).fold(f32::INFINITY, f32::min);
        assert!((min_y - 1.0).abs() < 1e-5);
    }
}
