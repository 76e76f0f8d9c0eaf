//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Rendering settings.
    pub render: RenderConfig,
    /// Scene assembly settings.
    pub scene: SceneConfig,
    /// Per-tick animation deltas and tick source.
    pub animation: AnimationConfig,
    /// Light intensities.
    pub lighting: LightingConfig,
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
    /// Start in fullscreen mode.
    pub fullscreen: bool,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    /// Window title.
    pub title: String,
}

/// Rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Surface clear color (linear RGBA). Transparent black by default.
    pub clear_color: [f64; 4],
    /// Glow-layer bloom settings.
    pub bloom: BloomSettings,
    /// Directional shadow settings.
    pub shadow: ShadowSettings,
}

/// Bloom filter parameters applied to the glow layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BloomSettings {
    /// Luminance threshold; 0 makes every glow pixel bloom.
    pub threshold: f32,
    /// Additive strength of the blurred result.
    pub strength: f32,
    /// Blur spread, 0..=1.
    pub radius: f32,
    /// Number of downsample/upsample mip levels.
    pub iterations: u32,
}

/// Shadow map settings for the sun light.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShadowSettings {
    /// Render the shadow pass at all.
    pub enabled: bool,
    /// Width and height of the square shadow map in texels.
    pub map_size: u32,
    /// Distance padded around the earth on each side of the shadow frustum.
    pub frustum_margin: f32,
}

/// Scene assembly configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Directory the texture file names are resolved against.
    pub asset_dir: PathBuf,
    /// Vertical field of view in degrees.
    pub camera_fov_degrees: f32,
    /// Camera near plane.
    pub camera_near: f32,
    /// Camera far plane.
    pub camera_far: f32,
    /// Camera position relative to the camera pivot.
    pub camera_position: [f32; 3],
}

/// How animation ticks are produced by the host loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TickSource {
    /// One tick per redraw, matching the display refresh.
    PerRedraw,
    /// Fixed-rate ticks accumulated from wall-clock frame time.
    Fixed { hz: u32 },
}

/// Highest accepted fixed tick rate.
pub const MAX_FIXED_HZ: u32 = 1000;

/// Per-tick animation deltas in radians.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    pub cloud_yaw: f32,
    pub moon_pivot_yaw: f32,
    /// Pitch the moon pivot is pinned to every tick.
    pub moon_pivot_pitch: f32,
    pub camera_pivot_yaw: f32,
    pub galaxy_yaw: f32,
    pub tick_source: TickSource,
}

/// Light configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient_intensity: f32,
    pub sun_intensity: f32,
    pub point_intensity: f32,
    /// Light the scene with the point light too. Off by default: the
    /// point light is built but left out of the scene.
    pub attach_point_light: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fullscreen: false,
            vsync: true,
            title: "Solar System".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 0.0],
            bloom: BloomSettings::default(),
            shadow: ShadowSettings::default(),
        }
    }
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            strength: 4.0,
            radius: 1.0,
            iterations: 5,
        }
    }
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            map_size: 2048,
            frustum_margin: 4.0,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("assets").join("texture"),
            camera_fov_degrees: 60.0,
            camera_near: 0.1,
            camera_far: 1000.0,
            camera_position: [8.0, 0.0, 4.0],
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            cloud_yaw: -0.0002,
            moon_pivot_yaw: -0.005,
            moon_pivot_pitch: 0.5,
            camera_pivot_yaw: 0.001,
            galaxy_yaw: 0.0002,
            tick_source: TickSource::PerRedraw,
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_intensity: 0.2,
            sun_intensity: 2.0,
            point_intensity: 1.0,
            attach_point_light: false,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info,wgpu=warn,naga=warn".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).map_err(ConfigError::read(&config_path))?;
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
        std::fs::create_dir_all(config_dir).map_err(ConfigError::write(config_dir))?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        std::fs::write(&config_path, serialized).map_err(ConfigError::write(&config_path))
    }

    /// Re-read `config.ron`; returns `Some(new_config)` only if it differs.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents =
            std::fs::read_to_string(&config_path).map_err(ConfigError::read(&config_path))?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
