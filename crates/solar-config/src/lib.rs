//! Runtime settings for the solar system viewer.
//!
//! Settings persist to disk as RON and can be overridden from the command
//! line via clap.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    AnimationConfig, BloomSettings, Config, DebugConfig, LightingConfig, RenderConfig,
    MAX_FIXED_HZ, SceneConfig, ShadowSettings, TickSource, WindowConfig,
};
pub use error::ConfigError;
