//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Erosion simulation settings.
    pub simulation: SimulationConfig,
    /// Ocean tile LOD settings.
    pub lod: LodConfig,
    /// Input settings.
    pub input: InputConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    /// Window title.
    pub title: String,
}

/// Erosion simulation configuration.
///
/// Buffer resolutions are fixed for the lifetime of the session; only the
/// display resolution follows the window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Side length of the square terrain/flux buffers in texels.
    pub resolution: u32,
    /// Shadow refinement iterations per frame (2-4 recommended).
    pub shadow_iterations: u32,
    /// Rainfall added per frame while the rain input is held.
    pub rain_rate: f32,
    /// Fraction of standing water evaporated per frame.
    pub evaporation: f32,
    /// Generation seed. `None` picks a random island each run.
    pub seed: Option<f32>,
    /// Frames between height-bound stability checks (0 disables).
    pub stability_check_interval: u32,
    /// Maximum |height| considered sane by the stability check.
    pub max_height: f32,
}

/// Ocean tile LOD configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Base subdivide range for depth 0; halves per depth level.
    pub range0: f32,
    /// Maximum quadtree depth regardless of camera proximity.
    pub max_depth: u8,
    /// Hysteresis margin between the subdivide and merge thresholds.
    pub hysteresis: f32,
    /// Root grid half-extent: the root layer is a (2*area)^2 grid of tiles.
    pub area: u32,
    /// World-space side length of a depth-0 tile.
    pub tile_size: f32,
}

/// Input configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Pointer drag to pan multiplier.
    pub pan_sensitivity: f32,
    /// Keyboard pan speed in world units per second at zoom 1.
    pub key_pan_speed: f32,
    /// Minimum zoom factor.
    pub zoom_min: f32,
    /// Maximum zoom factor.
    pub zoom_max: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log a frame-time summary every N frames (0 disables).
    pub frame_time_log_interval: u32,
    /// Render ocean tiles as wireframe.
    pub wireframe: bool,
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            vsync: true,
            title: "Islet".to_string(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            resolution: 1080,
            shadow_iterations: 2,
            rain_rate: 0.012,
            evaporation: 0.015,
            seed: None,
            stability_check_interval: 300,
            max_height: 4.0,
        }
    }
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            range0: 900.0,
            max_depth: 5,
            hysteresis: 0.1,
            area: 2,
            tile_size: 200.0,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            pan_sensitivity: 1.0,
            key_pan_speed: 120.0,
            zoom_min: 0.05,
            zoom_max: 20.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            frame_time_log_interval: 600,
            wireframe: false,
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(!ron_str.is_empty());
        assert!(ron_str.contains("width: 1280"));
        assert!(ron_str.contains("resolution: 1080"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_field_uses_default() {
        // Config missing the `lod` section entirely
        let ron_str = "(window: (), simulation: (), input: (), debug: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.lod, LodConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let ron_str = "(future_setting: true)";
        let result: Result<Config, _> = ron::from_str(ron_str);
        assert!(result.is_ok());
    }

    #[test]
    fn test_shadow_buffer_is_half_resolution_by_convention() {
        // The simulation derives the shadow buffer from resolution / 2; make
        // sure the default resolution divides evenly.
        let config = SimulationConfig::default();
        assert_eq!(config.resolution % 2, 0);
    }

    #[test]
    fn test_zoom_bounds_are_ordered() {
        let input = InputConfig::default();
        assert!(input.zoom_min > 0.0);
        assert!(input.zoom_min < input.zoom_max);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.window.width = 1920;
        config.simulation.resolution = 512;
        config.lod.max_depth = 3;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.simulation.shadow_iterations = 4;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().simulation.shadow_iterations, 4);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }
}
