use crate::config::RoamConfig;
use crate::controller::audio::SoundBank;
use crate::controller::camera_controller::CameraController;
use crate::controller::character_controller::CharacterController;
use crate::controller::input::{ButtonEvent, InputEvent, InputProcessor};
use crate::model::{Action, ActionState, Bunny, Camera, Environment, GroundHit, KeyMap, Roamer};

/// Longest step a single frame may simulate, in seconds.
pub const MAX_FRAME_DT: f32 = 0.1;

/// What happened during one update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub moved: bool,
    pub bumped: bool,
    pub spawned: bool,
    pub quit: bool,
    pub roamer_ground: Option<GroundHit>,
}

/// All per-frame game state and the update that drives it.
pub struct FrameLoopContext {
    pub environment: Environment,
    pub roamer: Roamer,
    pub bunnies: Vec<Bunny>,
    pub camera: Camera,
    pub actions: ActionState,
    pub input: InputProcessor,
    pub sounds: SoundBank,
    character: CharacterController,
    camera_controller: CameraController,
}

impl FrameLoopContext {
    pub fn new(config: &RoamConfig, width: u32, height: u32) -> Self {
        let environment = Environment::generate(&config.world);
        Self::with_environment(config, environment, width, height)
    }

    pub fn with_environment(config: &RoamConfig, environment: Environment, width: u32, height: u32) -> Self {
        let roamer = Roamer::new(environment.start_point(), config.motion.roamer_scale);
        let camera = Camera::behind(&config.camera, roamer.pos, roamer.forward(), width, height);
        let keymap = KeyMap::from_sections().with_overrides(&config.bindings);
        tracing::info!(keys = keymap.len(), start = ?roamer.pos, "frame loop ready");
        Self {
            environment,
            roamer,
            bunnies: Vec::new(),
            camera,
            actions: ActionState::new(),
            input: InputProcessor::new(keymap),
            sounds: SoundBank::default(),
            character: CharacterController::new(config.motion.clone(), config.bunnies.clone()),
            camera_controller: CameraController::new(config.camera.clone(), config.motion.camera_strafe_speed),
        }
    }

    pub fn handle_input(&mut self, event: &InputEvent) -> Option<ButtonEvent> {
        self.input.process_event(event, &mut self.actions)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }

    pub fn is_moving(&self) -> bool {
        self.character.is_moving()
    }

    /// Advance the simulation by `dt` seconds (clamped to `[0, MAX_FRAME_DT]`).
    pub fn update(&mut self, dt: f32) -> FrameReport {
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_FRAME_DT) } else { 0.0 };
        let mut report = FrameReport::default();

        if self.actions.take(Action::Ignore) {
            tracing::info!("Ignoring key...");
        }

        let cam = &self.camera_controller;
        cam.look_at_roamer(&mut self.camera, &self.roamer);
        cam.strafe(&mut self.camera, &self.actions, dt);

        let start_pos = self.roamer.pos;
        report.moved = self.character.steer(&mut self.roamer, &mut self.bunnies, &self.actions, dt);

        if self.actions.take(Action::MakeBunny) {
            self.character.spawn_bunny(&self.roamer, &mut self.bunnies, &mut self.sounds);
            report.spawned = true;
        }

        if self.actions.take(Action::DoSomething) {
            tracing::info!("Something!");
        }

        self.character.update_animation(&mut self.roamer, &self.actions, &mut self.sounds);

        cam.clamp_distance(&mut self.camera, &self.roamer);

        let ground = self.character.resolve_ground(
            &mut self.roamer,
            start_pos,
            self.environment.collision(),
            &mut self.sounds,
        );
        report.bumped = !matches!(ground, GroundHit::Terrain(_));
        report.roamer_ground = Some(ground);

        cam.follow_ground(&mut self.camera, &self.roamer, self.environment.collision());
        cam.look_at_floater(&mut self.camera, &self.roamer);

        self.sounds.advance(dt);
        report.quit = self.input.quit_requested();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Heightmap, Obstacle};
    use glam::Vec3;

    fn flat_context() -> FrameLoopContext {
        let env = Environment::from_parts(Heightmap::flat(33, 32.0, 0.0), Vec::new());
        FrameLoopContext::with_environment(&RoamConfig::default(), env, 800, 600)
    }

    fn press(ctx: &mut FrameLoopContext, key: &str) {
        ctx.handle_input(&InputEvent::KeyDown(key.to_string()));
    }

    fn release(ctx: &mut FrameLoopContext, key: &str) {
        ctx.handle_input(&InputEvent::KeyUp(key.to_string()));
    }

    #[test]
    fn camera_starts_behind_and_settles_in_band() {
        let mut ctx = flat_context();
        ctx.update(1.0 / 60.0);
        let d = Vec3::new(ctx.camera.eye.x, 0.0, ctx.camera.eye.z).length();
        assert!((5.0..=10.0 + 1e-4).contains(&d), "{d}");
        assert!(ctx.camera.eye.y >= ctx.roamer.pos.y + 2.0 - 1e-4);
    }

    #[test]
    fn dt_is_clamped() {
        let mut ctx = flat_context();
        press(&mut ctx, "w");
        ctx.update(5.0);
        assert!((ctx.roamer.pos.length() - 1.5).abs() < 1e-3);
        ctx.update(-1.0);
        assert!((ctx.roamer.pos.length() - 1.5).abs() < 1e-3);
    }

    #[test]
    fn spawn_fires_once_per_press() {
        let mut ctx = flat_context();
        press(&mut ctx, "insert");
        assert!(ctx.update(0.016).spawned);
        assert!(!ctx.update(0.016).spawned);
        release(&mut ctx, "insert");
        press(&mut ctx, "rshift");
        press(&mut ctx, "insert");
        ctx.update(0.016);
        assert_eq!(ctx.bunnies.len(), 2);
    }

    #[test]
    fn obstacle_blocks_the_roamer() {
        let env = Environment::from_parts(
            Heightmap::flat(33, 32.0, 0.0),
            vec![Obstacle::rock(Vec3::new(0.3, 0.0, 2.5), 1.0, 1.0)],
        );
        let mut ctx = FrameLoopContext::with_environment(&RoamConfig::default(), env, 800, 600);
        press(&mut ctx, "arrow_up");
        let mut bumped = false;
        for _ in 0..30 {
            bumped |= ctx.update(0.05).bumped;
        }
        assert!(bumped);
        // never made it onto the rock
        assert!(ctx.roamer.pos.z < 1.5 + 1e-3, "{}", ctx.roamer.pos.z);
    }

    #[test]
    fn shift_escape_reports_quit() {
        let mut ctx = flat_context();
        press(&mut ctx, "lshift");
        press(&mut ctx, "escape");
        assert!(ctx.update(0.016).quit);
    }
}
