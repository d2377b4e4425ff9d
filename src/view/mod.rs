// VIEW: Rendering and graphics
pub mod gpu_init;
pub mod render;

pub use gpu_init::{GpuContext, SurfaceRecovery};
pub use render::{CameraUniform, LightingUniform, RenderState, UiFrame};
