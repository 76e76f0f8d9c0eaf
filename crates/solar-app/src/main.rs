//! Solar system viewer binary.
//!
//! Resolves platform directories, loads `config.ron` (creating it on first
//! run), applies command-line overrides, starts logging and opens the window.
//!
//! Run with: `cargo run -p solar-app -- --assets assets/texture`

use std::process::ExitCode;

use clap::Parser;
use solar_app::platform::PlatformDirs;
use solar_config::{CliArgs, Config};
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let dirs = match PlatformDirs::resolve() {
        Ok(dirs) => dirs,
        Err(e) => {
            eprintln!("Failed to resolve platform directories: {e}");
            return ExitCode::FAILURE;
        }
    };
    let dirs = match &args.config_dir {
        Some(dir) => dirs.with_config_dir(dir),
        None => dirs,
    };
    let dirs_result = dirs.create_dirs();

    // Logging reads its filter from the config, so a load failure can only
    // be reported once the subscriber is up.
    let loaded = Config::load_or_create(&dirs.config_dir);
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    config.apply_cli_overrides(&args);

    solar_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));

    if let Err(e) = dirs_result {
        warn!("Could not create platform directories: {e}");
    }
    if let Err(e) = &loaded {
        warn!("Using default config: {e}");
    }

    info!("Solar System viewer");
    info!(config_dir = %dirs.config_dir.display(), "Platform directories resolved");
    info!(
        "Window: {}x{} | Title: {} | Assets: {}",
        config.window.width,
        config.window.height,
        config.window.title,
        config.scene.asset_dir.display()
    );
    info!("Tick source: {:?}", config.animation.tick_source);

    match solar_app::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Event loop failed: {e}");
            ExitCode::FAILURE
        }
    }
}
