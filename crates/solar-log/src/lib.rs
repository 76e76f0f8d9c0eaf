//! Structured logging for the solar system viewer.
//!
//! Console output with uptime timestamps, plus a JSON file in debug builds.
//! `log` records emitted by the library crates are bridged into the same
//! subscriber.

use std::path::{Path, PathBuf};

use solar_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_FILTER: &str = "info,wgpu=warn,naga=warn";

/// Name of the JSON log file written in debug builds.
pub const LOG_FILE_NAME: &str = "solar.log";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.debug.log_level`, which wins over
/// [`DEFAULT_FILTER`]. When `debug_build` is set and `log_dir` is writable a
/// JSON file layer is added at `log_dir/solar.log`.
///
/// ```no_run
/// use solar_config::Config;
/// use solar_log::init_logging;
///
/// let config = Config::default();
/// init_logging(None, false, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(path) = log_file_path(log_dir)
        && let Ok(log_file) = std::fs::File::create(&path)
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        tracing::debug!(path = %path.display(), "file logging enabled");
        return;
    }

    subscriber.init();
}

/// Filter directives taken from config, falling back to [`DEFAULT_FILTER`].
pub fn filter_directives(config: Option<&Config>) -> String {
    config
        .map(|c| c.debug.log_level.trim())
        .filter(|level| !level.is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

/// Create an `EnvFilter` with the default filter string.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

fn log_file_path(log_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = log_dir?;
    std::fs::create_dir_all(dir).ok()?;
    Some(dir.join(LOG_FILE_NAME))
}
