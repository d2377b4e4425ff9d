//! Runtime tunables. Every field has a default, so a config file only needs
//! the values it changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoamError};
use crate::model::Action;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "KEYROAM_CONFIG";
/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "keyroam.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoamConfig {
    pub window: WindowConfig,
    pub motion: MotionConfig,
    pub camera: CameraConfig,
    pub world: WorldConfig,
    pub bunnies: BunnyConfig,
    pub audio: AudioConfig,
    /// Extra key bindings layered over the keyboard sections.
    pub bindings: BTreeMap<String, Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Keyboard Roaming".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Roamer ground speed in world units per second.
    pub run_speed: f32,
    /// Roamer turn rate in degrees per second.
    pub turn_rate_deg: f32,
    /// Camera sideways speed in world units per second.
    pub camera_strafe_speed: f32,
    /// Roamer render scale.
    pub roamer_scale: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            // 50 model units per second at 0.3 scale
            run_speed: 15.0,
            turn_rate_deg: 300.0,
            camera_strafe_speed: 20.0,
            roamer_scale: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub min_distance: f32,
    pub max_distance: f32,
    /// Height kept above terrain under the camera.
    pub terrain_clearance: f32,
    /// Lowest height relative to the roamer.
    pub height_above_roamer: f32,
    /// Height of the look-at point above the roamer.
    pub floater_height: f32,
    /// Distance behind the roamer at start.
    pub start_distance: f32,
    /// Absolute height at start.
    pub start_height: f32,
    pub fov_deg: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_distance: 5.0,
            max_distance: 10.0,
            terrain_clearance: 1.0,
            height_above_roamer: 2.0,
            floater_height: 2.0,
            start_distance: 10.0,
            start_height: 2.0,
            fov_deg: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u64,
    /// Heightmap vertices per side.
    pub grid_size: usize,
    /// Half extent of the map in world units.
    pub extent: f32,
    pub height_scale: f32,
    pub noise_frequency: f32,
    pub rock_count: usize,
    pub tree_count: usize,
    /// Obstacle-free radius around the start point.
    pub clearing_radius: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            grid_size: 129,
            extent: 64.0,
            height_scale: 3.0,
            noise_frequency: 0.04,
            rock_count: 40,
            tree_count: 60,
            clearing_radius: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BunnyConfig {
    /// Gap between bunnies in the line behind the roamer.
    pub spacing: f32,
    /// Minimum height above the roamer.
    pub lift: f32,
    /// Random extra height in `[0, jitter)`.
    pub jitter: f32,
    pub scale: f32,
    pub seed: u64,
}

impl Default for BunnyConfig {
    fn default() -> Self {
        Self {
            spacing: 2.0,
            lift: 0.5,
            jitter: 1.0,
            scale: 0.3,
            seed: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    /// Directory whose `run.wav`, `bump.wav` and `spawn.wav` replace the
    /// bundled clips.
    pub sound_dir: Option<PathBuf>,
    /// Output gain in `[0, 1]`.
    pub volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound_dir: None,
            volume: 0.6,
        }
    }
}

impl RoamConfig {
    pub fn from_json(text: &str, path: &Path) -> Result<Self> {
        let config: RoamConfig = serde_json::from_str(text).map_err(|source| RoamError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| RoamError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, path)
    }

    /// Explicit path, then `KEYROAM_CONFIG`, then `keyroam.json` if present,
    /// then defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(|| {
                let p = PathBuf::from(DEFAULT_CONFIG_FILE);
                p.is_file().then_some(p)
            });
        match path {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading config");
                Self::from_file(&path)
            }
            None => {
                tracing::info!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| -> Result<()> { Err(RoamError::InvalidConfig(msg.to_string())) };
        if self.camera.min_distance > self.camera.max_distance {
            return invalid("camera.min_distance exceeds camera.max_distance");
        }
        if self.camera.min_distance < 0.0 {
            return invalid("camera.min_distance must not be negative");
        }
        if self.motion.run_speed <= 0.0 || self.motion.turn_rate_deg <= 0.0 || self.motion.camera_strafe_speed <= 0.0 {
            return invalid("motion speeds must be positive");
        }
        if self.world.grid_size < 2 {
            return invalid("world.grid_size must be at least 2");
        }
        if self.world.extent <= 0.0 {
            return invalid("world.extent must be positive");
        }
        if !(0.0..=1.0).contains(&self.audio.volume) {
            return invalid("audio.volume must be within [0, 1]");
        }
        if self.window.width == 0 || self.window.height == 0 {
            return invalid("window size must be non-zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        RoamConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let text = r#"{ "camera": { "max_distance": 14.0 }, "bindings": { "space": "do-something" } }"#;
        let config = RoamConfig::from_json(text, Path::new("inline.json")).unwrap();
        assert_eq!(config.camera.max_distance, 14.0);
        assert_eq!(config.camera.min_distance, 5.0);
        assert_eq!(config.motion.turn_rate_deg, 300.0);
        assert_eq!(config.bindings.get("space"), Some(&Action::DoSomething));
    }

    #[test]
    fn audio_section_parses_and_volume_is_checked() {
        let text = r#"{ "audio": { "sound_dir": "my_sounds", "volume": 0.25 } }"#;
        let config = RoamConfig::from_json(text, Path::new("inline.json")).unwrap();
        assert!(config.audio.enabled);
        assert_eq!(config.audio.sound_dir, Some(PathBuf::from("my_sounds")));
        assert_eq!(config.audio.volume, 0.25);

        let loud = r#"{ "audio": { "volume": 1.5 } }"#;
        let err = RoamConfig::from_json(loud, Path::new("loud.json")).unwrap_err();
        assert!(matches!(err, RoamError::InvalidConfig(_)));
    }

    #[test]
    fn inverted_distances_rejected() {
        let text = r#"{ "camera": { "min_distance": 12.0, "max_distance": 10.0 } }"#;
        let err = RoamConfig::from_json(text, Path::new("bad.json")).unwrap_err();
        assert!(matches!(err, RoamError::InvalidConfig(_)));
    }

    #[test]
    fn unknown_action_is_a_parse_error() {
        let text = r#"{ "bindings": { "space": "fly" } }"#;
        let err = RoamConfig::from_json(text, Path::new("bad.json")).unwrap_err();
        assert!(matches!(err, RoamError::ConfigParse { .. }));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = RoamConfig::from_file(Path::new("/nonexistent/keyroam.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/keyroam.json"));
    }
}
