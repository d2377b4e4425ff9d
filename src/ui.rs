use egui::{Align2, Color32, Context, RichText};

use crate::controller::FrameLoopContext;

pub const TITLE: &str = "Keyboard Roaming";

/// On-screen help, top to bottom.
pub const INSTRUCTIONS: [&str; 7] = [
    "[Shift+ESC]: Quit",
    "[Left Arrow]: Rotate Ralph Left",
    "[Right Arrow]: Rotate Ralph Right",
    "[Up Arrow]: Run Ralph Forward",
    "[Down Arrow]: Run Ralph Backward",
    "[A]: Rotate Camera Left",
    "[S]: Rotate Camera Right",
];

/// Key that shows or hides the debug window.
pub const DEBUG_TOGGLE_KEY: &str = "tab";

#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub show_debug: bool,
    pub wireframe_available: bool,
    pub wireframe: bool,
}

impl UiState {
    pub fn new(wireframe_available: bool) -> Self {
        Self {
            show_debug: false,
            wireframe_available,
            wireframe: false,
        }
    }

    /// Returns true when `key` was the debug toggle.
    pub fn handle_key(&mut self, key: &str) -> bool {
        if key == DEBUG_TOGGLE_KEY {
            self.show_debug = !self.show_debug;
            return true;
        }
        false
    }
}

/// Lay out the overlay for one frame.
pub fn build_ui(ctx: &Context, state: &mut UiState, frame: &FrameLoopContext, dt: f32) {
    draw_instructions(ctx);
    draw_title(ctx);
    if state.show_debug {
        draw_debug_window(ctx, state, frame, dt);
    }
}

fn shadowed(text: &str, size: f32) -> RichText {
    RichText::new(text).size(size).color(Color32::WHITE).background_color(Color32::from_black_alpha(128))
}

fn draw_instructions(ctx: &Context) {
    egui::Area::new(egui::Id::new("instructions"))
        .anchor(Align2::LEFT_TOP, [8.0, 8.0])
        .interactable(false)
        .show(ctx, |ui| {
            ui.spacing_mut().item_spacing.y = 2.0;
            for line in INSTRUCTIONS {
                ui.label(shadowed(line, 14.0));
            }
        });
}

fn draw_title(ctx: &Context) {
    egui::Area::new(egui::Id::new("title"))
        .anchor(Align2::RIGHT_BOTTOM, [-8.0, -8.0])
        .interactable(false)
        .show(ctx, |ui| {
            ui.label(shadowed(TITLE, 18.0));
        });
}

fn draw_debug_window(ctx: &Context, state: &mut UiState, frame: &FrameLoopContext, dt: f32) {
    let pos = frame.roamer.pos;
    let eye = frame.camera.eye;
    egui::Window::new("Debug")
        .default_pos([8.0, 180.0])
        .show(ctx, |ui| {
            ui.label(RichText::new(format!("FPS: {:.0}", if dt > 0.0 { 1.0 / dt } else { 0.0 })).small());
            ui.label(RichText::new(format!("Pos: x: {:.1} y: {:.1} z: {:.1}", pos.x, pos.y, pos.z)).small());
            ui.label(RichText::new(format!("Heading: {:.0}", frame.roamer.heading_deg.rem_euclid(360.0))).small());
            ui.label(RichText::new(format!("Camera: x: {:.1} y: {:.1} z: {:.1}", eye.x, eye.y, eye.z)).small());
            ui.label(RichText::new(format!("Bunnies: {}", frame.bunnies.len())).small());
            ui.label(RichText::new(format!("Animation: {:?}", frame.roamer.animation)).small());
            let held: Vec<&str> = frame.actions.pressed().map(|a| a.name()).collect();
            ui.label(RichText::new(format!("Held: {}", held.join(" "))).small());
            ui.separator();
            ui.add_enabled(state.wireframe_available, egui::Checkbox::new(&mut state.wireframe, "Wireframe"));
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_toggles_debug() {
        let mut state = UiState::new(false);
        assert!(state.handle_key("tab"));
        assert!(state.show_debug);
        assert!(!state.handle_key("a"));
        assert!(state.handle_key("tab"));
        assert!(!state.show_debug);
    }

    #[test]
    fn overlay_builds_headless() {
        use crate::config::RoamConfig;
        use crate::model::{Environment, Heightmap};
        let env = Environment::from_parts(Heightmap::flat(5, 4.0, 0.0), Vec::new());
        let frame = FrameLoopContext::with_environment(&RoamConfig::default(), env, 640, 480);
        let ctx = Context::default();
        let mut state = UiState::new(true);
        state.show_debug = true;
        // first pass only measures new areas
        let _ = ctx.run(egui::RawInput::default(), |ctx| build_ui(ctx, &mut state, &frame, 1.0 / 60.0));
        let output = ctx.run(egui::RawInput::default(), |ctx| build_ui(ctx, &mut state, &frame, 1.0 / 60.0));
        assert!(!output.shapes.is_empty());
    }
}
