use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{BunnyConfig, MotionConfig};
use crate::controller::audio::{SoundBank, SoundCue};
use crate::model::actor::{RUN_CLIP, STAND_FRAME, WALK_CLIP};
use crate::model::collision::resolve_ground;
use crate::model::{Action, ActionState, Bunny, CollisionWorld, GroundHit, Roamer, GROUND_MASK};

/// Moves the roamer around and keeps the bunny line behind it.
pub struct CharacterController {
    motion: MotionConfig,
    bunny_config: BunnyConfig,
    rng: ChaCha8Rng,
    is_moving: bool,
}

impl CharacterController {
    pub fn new(motion: MotionConfig, bunny_config: BunnyConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(bunny_config.seed);
        Self {
            motion,
            bunny_config,
            rng,
            is_moving: false,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    /// Turn and run for held keys. The bunnies are re-lined after every step
    /// taken. Returns whether the roamer changed pose.
    pub fn steer(&mut self, roamer: &mut Roamer, bunnies: &mut [Bunny], actions: &ActionState, dt: f32) -> bool {
        let turn = self.motion.turn_rate_deg * dt;
        let run = self.motion.run_speed * dt;
        let mut stepped = false;

        if actions.is_pressed(Action::TurnLeft) {
            roamer.heading_deg += turn;
            self.position_bunnies(roamer, bunnies);
            stepped = true;
        }
        if actions.is_pressed(Action::TurnRight) {
            roamer.heading_deg -= turn;
            self.position_bunnies(roamer, bunnies);
            stepped = true;
        }
        if actions.is_pressed(Action::Forward) {
            roamer.pos += roamer.forward() * run;
            self.position_bunnies(roamer, bunnies);
            stepped = true;
        }
        if actions.is_pressed(Action::Backward) {
            roamer.pos += roamer.behind() * run;
            self.position_bunnies(roamer, bunnies);
            stepped = true;
        }
        stepped
    }

    /// Line bunny `i` (from 1) up `spacing * i` behind the roamer, floating a
    /// random bit above it and facing it.
    pub fn position_bunnies(&mut self, roamer: &Roamer, bunnies: &mut [Bunny]) {
        let behind = roamer.behind();
        tracing::debug!(x = roamer.pos.x, z = roamer.pos.z, heading = roamer.heading_deg, "roamer at");
        for (i, bunny) in bunnies.iter_mut().enumerate() {
            let offset = behind * self.bunny_config.spacing * (i + 1) as f32;
            let jitter = if self.bunny_config.jitter > 0.0 {
                self.rng.gen::<f32>() * self.bunny_config.jitter
            } else {
                0.0
            };
            bunny.pos = Vec3::new(
                roamer.pos.x + offset.x,
                roamer.pos.y + self.bunny_config.lift + jitter,
                roamer.pos.z + offset.z,
            );
            bunny.look_at(roamer.pos);
            tracing::debug!(index = i + 1, x = bunny.pos.x, z = bunny.pos.z, "bunny at");
        }
    }

    pub fn spawn_bunny(&mut self, roamer: &Roamer, bunnies: &mut Vec<Bunny>, sounds: &mut SoundBank) {
        sounds.play_if_idle(SoundCue::Spawn);
        bunnies.push(Bunny::new(self.bunny_config.scale));
        tracing::info!(count = bunnies.len(), "bunny spawned");
        self.position_bunnies(roamer, bunnies);
    }

    /// Start or stop the run clip and footsteps on movement edges.
    pub fn update_animation(&mut self, roamer: &mut Roamer, actions: &ActionState, sounds: &mut SoundBank) {
        if actions.any_locomotion() {
            if !self.is_moving {
                roamer.loop_clip(RUN_CLIP);
                self.is_moving = true;
                sounds.play_if_idle(SoundCue::Run);
            }
        } else if self.is_moving {
            roamer.stop_and_pose(WALK_CLIP, STAND_FRAME);
            self.is_moving = false;
            sounds.stop(SoundCue::Run);
        }
    }

    /// Snap the roamer to terrain under it, or put it back at `start_pos`
    /// when the ground ray finds something else on top.
    pub fn resolve_ground(
        &self,
        roamer: &mut Roamer,
        start_pos: Vec3,
        world: &CollisionWorld,
        sounds: &mut SoundBank,
    ) -> GroundHit {
        let hit = resolve_ground(world.ground_ray(roamer.pos, GROUND_MASK));
        match &hit {
            GroundHit::Terrain(h) => roamer.pos.y = *h,
            other => {
                roamer.pos = start_pos;
                if sounds.play_if_idle(SoundCue::Bump) {
                    tracing::info!(hit = ?other, "bumped");
                }
            }
        }
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::actor::heading_forward;
    use crate::model::{Environment, Heightmap, Obstacle};

    fn controller() -> CharacterController {
        CharacterController::new(MotionConfig::default(), BunnyConfig::default())
    }

    fn held(actions: &[Action]) -> ActionState {
        let mut state = ActionState::new();
        for a in actions {
            state.set(*a, true);
        }
        state
    }

    #[test]
    fn turning_uses_turn_rate() {
        let mut ctl = controller();
        let mut roamer = Roamer::new(Vec3::ZERO, 0.3);
        ctl.steer(&mut roamer, &mut [], &held(&[Action::TurnLeft]), 0.1);
        assert!((roamer.heading_deg - 30.0).abs() < 1e-4);
        ctl.steer(&mut roamer, &mut [], &held(&[Action::TurnRight]), 0.05);
        assert!((roamer.heading_deg - 15.0).abs() < 1e-4);
    }

    #[test]
    fn running_follows_heading() {
        let mut ctl = controller();
        let mut roamer = Roamer::new(Vec3::ZERO, 0.3);
        roamer.heading_deg = 90.0;
        ctl.steer(&mut roamer, &mut [], &held(&[Action::Forward]), 0.1);
        assert!(roamer.pos.abs_diff_eq(heading_forward(90.0) * 1.5, 1e-4));
        ctl.steer(&mut roamer, &mut [], &held(&[Action::Backward]), 0.1);
        assert!(roamer.pos.abs_diff_eq(Vec3::ZERO, 1e-4));
    }

    #[test]
    fn idle_keys_do_nothing() {
        let mut ctl = controller();
        let mut roamer = Roamer::new(Vec3::ONE, 0.3);
        assert!(!ctl.steer(&mut roamer, &mut [], &held(&[Action::CamLeft]), 0.1));
        assert_eq!(roamer.pos, Vec3::ONE);
    }

    #[test]
    fn bunnies_line_up_behind() {
        let mut ctl = controller();
        let roamer = Roamer::new(Vec3::new(1.0, 2.0, 3.0), 0.3);
        let mut bunnies = vec![Bunny::new(0.3), Bunny::new(0.3), Bunny::new(0.3)];
        ctl.position_bunnies(&roamer, &mut bunnies);
        for (i, b) in bunnies.iter().enumerate() {
            let want = roamer.pos + roamer.behind() * 2.0 * (i + 1) as f32;
            assert!((b.pos.x - want.x).abs() < 1e-5);
            assert!((b.pos.z - want.z).abs() < 1e-5);
            assert!((2.5..3.5).contains(&b.pos.y), "{}", b.pos.y);
            assert!(heading_forward(b.heading_deg).abs_diff_eq(roamer.forward(), 1e-4));
        }
    }

    #[test]
    fn spawning_appends_and_chimes() {
        let mut ctl = controller();
        let mut sounds = SoundBank::default();
        let roamer = Roamer::new(Vec3::ZERO, 0.3);
        let mut bunnies = Vec::new();
        ctl.spawn_bunny(&roamer, &mut bunnies, &mut sounds);
        ctl.spawn_bunny(&roamer, &mut bunnies, &mut sounds);
        assert_eq!(bunnies.len(), 2);
        assert!(sounds.is_playing(SoundCue::Spawn));
        assert!((bunnies[1].pos.z + 4.0).abs() < 1e-5);
    }

    #[test]
    fn animation_switches_on_edges_only() {
        let mut ctl = controller();
        let mut sounds = SoundBank::default();
        let mut roamer = Roamer::new(Vec3::ZERO, 0.3);
        ctl.update_animation(&mut roamer, &ActionState::new(), &mut sounds);
        assert_eq!(roamer.animation, crate::model::AnimationState::Idle);

        ctl.update_animation(&mut roamer, &held(&[Action::TurnRight]), &mut sounds);
        assert!(roamer.is_running());
        assert!(sounds.is_playing(SoundCue::Run));

        ctl.update_animation(&mut roamer, &ActionState::new(), &mut sounds);
        assert_eq!(
            roamer.animation,
            crate::model::AnimationState::Posed { clip: "walk", frame: 5 }
        );
        assert!(!sounds.is_playing(SoundCue::Run));
        assert!(!ctl.is_moving());
    }

    #[test]
    fn obstacle_reverts_and_bumps() {
        let env = Environment::from_parts(
            Heightmap::flat(9, 8.0, 0.0),
            vec![Obstacle::rock(Vec3::new(0.0, 0.0, 3.0), 1.0, 1.0)],
        );
        let ctl = controller();
        let mut sounds = SoundBank::default();
        let start = Vec3::new(0.3, 0.0, 1.0);
        let mut roamer = Roamer::new(Vec3::new(0.3, 0.0, 2.5), 0.3);
        let hit = ctl.resolve_ground(&mut roamer, start, env.collision(), &mut sounds);
        assert_eq!(hit, GroundHit::Obstructed("rock".into()));
        assert_eq!(roamer.pos, start);
        assert!(sounds.is_playing(SoundCue::Bump));
    }

    #[test]
    fn terrain_sets_height() {
        let env = Environment::from_parts(Heightmap::flat(9, 8.0, 1.25), Vec::new());
        let ctl = controller();
        let mut sounds = SoundBank::default();
        let mut roamer = Roamer::new(Vec3::new(0.3, 7.0, 0.9), 0.3);
        ctl.resolve_ground(&mut roamer, Vec3::ZERO, env.collision(), &mut sounds);
        assert!((roamer.pos.y - 1.25).abs() < 1e-4);
        assert!(!sounds.is_playing(SoundCue::Bump));
    }

    #[test]
    fn off_map_reverts() {
        let env = Environment::from_parts(Heightmap::flat(9, 8.0, 0.0), Vec::new());
        let ctl = controller();
        let mut sounds = SoundBank::default();
        let mut roamer = Roamer::new(Vec3::new(20.0, 0.0, 0.3), 0.3);
        let hit = ctl.resolve_ground(&mut roamer, Vec3::new(7.0, 0.0, 0.3), env.collision(), &mut sounds);
        assert_eq!(hit, GroundHit::Missed);
        assert_eq!(roamer.pos.x, 7.0);
    }
}
