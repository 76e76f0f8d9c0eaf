//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, MAX_FIXED_HZ, TickSource};

/// Solar system viewer command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "solar-system", about = "Animated solar system scene")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Window title.
    #[arg(long)]
    pub title: Option<String>,

    /// Start in fullscreen.
    #[arg(long)]
    pub fullscreen: Option<bool>,

    /// Directory holding the scene textures.
    #[arg(long)]
    pub assets: Option<PathBuf>,

    /// Drive the animation at a fixed tick rate instead of once per redraw.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_FIXED_HZ as i64))]
    pub fixed_hz: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config_dir: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(ref title) = args.title {
            self.window.title = title.clone();
        }
        if let Some(fs) = args.fullscreen {
            self.window.fullscreen = fs;
        }
        if let Some(ref dir) = args.assets {
            self.scene.asset_dir = dir.clone();
        }
        if let Some(hz) = args.fixed_hz {
            self.animation.tick_source = TickSource::Fixed { hz };
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
