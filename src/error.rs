use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoamError {
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,

    #[cfg(all(feature = "audio", not(target_arch = "wasm32")))]
    #[error("failed to open audio output: {0}")]
    AudioStream(#[from] rodio::StreamError),

    #[cfg(all(feature = "audio", not(target_arch = "wasm32")))]
    #[error("failed to start audio sink: {0}")]
    AudioPlay(#[from] rodio::PlayError),

    #[cfg(all(feature = "audio", not(target_arch = "wasm32")))]
    #[error("failed to decode sound: {0}")]
    AudioDecode(#[from] rodio::decoder::DecoderError),

    #[error("failed to read sound {path}: {source}")]
    SoundIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(not(target_arch = "wasm32"))]
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[cfg(not(target_arch = "wasm32"))]
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

pub type Result<T, E = RoamError> = std::result::Result<T, E>;
