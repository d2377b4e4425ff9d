use glam::Vec3;

use crate::config::CameraConfig;
use crate::model::collision::resolve_ground;
use crate::model::{Action, ActionState, Camera, CollisionWorld, GroundHit, Roamer, GROUND_MASK};

/// Third-person follow camera: free to strafe around the roamer, held
/// within a distance band and above the ground.
pub struct CameraController {
    pub config: CameraConfig,
    pub strafe_speed: f32,
}

impl CameraController {
    pub fn new(config: CameraConfig, strafe_speed: f32) -> Self {
        Self { config, strafe_speed }
    }

    pub fn look_at_roamer(&self, camera: &mut Camera, roamer: &Roamer) {
        camera.set_look_at(roamer.pos);
    }

    /// Slide along the camera's own right axis for held camera keys.
    pub fn strafe(&self, camera: &mut Camera, actions: &ActionState, dt: f32) {
        if actions.is_pressed(Action::CamLeft) {
            camera.strafe(-self.strafe_speed * dt);
        }
        if actions.is_pressed(Action::CamRight) {
            camera.strafe(self.strafe_speed * dt);
        }
    }

    /// Pull in or push out horizontally so the camera sits between
    /// `min_distance` and `max_distance` from the roamer. Returns the
    /// resulting distance.
    pub fn clamp_distance(&self, camera: &mut Camera, roamer: &Roamer) -> f32 {
        let mut camvec = roamer.pos - camera.eye;
        camvec.y = 0.0;
        let dist = camvec.length();
        let dir = camvec.normalize_or_zero();
        if dist > self.config.max_distance {
            camera.eye += dir * (dist - self.config.max_distance);
            return self.config.max_distance;
        }
        if dist < self.config.min_distance {
            camera.eye -= dir * (self.config.min_distance - dist);
            return self.config.min_distance;
        }
        dist
    }

    /// Keep the camera `terrain_clearance` over terrain below it, and never
    /// lower than `height_above_roamer` over the roamer.
    pub fn follow_ground(&self, camera: &mut Camera, roamer: &Roamer, world: &CollisionWorld) -> GroundHit {
        let hit = resolve_ground(world.ground_ray(camera.eye, GROUND_MASK));
        if let GroundHit::Terrain(h) = hit {
            camera.eye.y = h + self.config.terrain_clearance;
        }
        let floor = roamer.pos.y + self.config.height_above_roamer;
        if camera.eye.y < floor {
            camera.eye.y = floor;
        }
        hit
    }

    /// Aim a little above the roamer's feet.
    pub fn look_at_floater(&self, camera: &mut Camera, roamer: &Roamer) {
        let floater = roamer.pos + Vec3::Y * self.config.floater_height;
        camera.set_look_at(floater);
    }
}
