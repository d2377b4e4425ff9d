// CONTROLLER: Input, game logic, and update loop
pub mod audio;
pub mod camera_controller;
pub mod character_controller;
pub mod frame_loop;
pub mod input;

pub use audio::{output_bank, SoundBank, SoundCue, SoundSink};
pub use camera_controller::CameraController;
pub use character_controller::CharacterController;
pub use frame_loop::{FrameLoopContext, FrameReport, MAX_FRAME_DT};
pub use input::{ButtonEvent, InputEvent, InputProcessor};
