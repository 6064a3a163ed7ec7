//! Bootstrap configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Command-line and environment overrides for individual values are applied by
//! the binary (clap handles both); this module locates and parses the TOML file
//! and supplies the compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "LYRIC_PLAYER_CONFIG";

/// Application directory name used under the platform config/data folders
pub const APP_DIR_NAME: &str = "lyric-player";

/// Bootstrap configuration loaded from TOML
///
/// Cannot change while the service is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Path to the SQLite song database (defaults under the platform data folder)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Progress ticker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Milliseconds between ticks
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Progress added per tick at speed 1.0
    #[serde(default = "default_step_size")]
    pub step_size: f64,

    /// Lifetime of the terminal record left behind when a song finishes.
    /// `None` keeps it until replaced or deleted.
    #[serde(default)]
    pub finished_session_ttl_secs: Option<u64>,
}

fn default_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_step_size() -> f64 {
    0.1
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            database_path: None,
            logging: LoggingConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            step_size: default_step_size(),
            finished_session_ttl_secs: None,
        }
    }
}

impl TomlConfig {
    /// Database path, falling back to the platform data folder
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| default_data_folder().join("songs.db"))
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.playback.tick_interval_ms == 0 {
            return Err(Error::Config(
                "playback.tick_interval_ms must be greater than 0".to_string(),
            ));
        }

        let step = self.playback.step_size;
        if !step.is_finite() || step <= 0.0 {
            return Err(Error::Config(format!(
                "playback.step_size must be a positive number, got {}",
                step
            )));
        }

        if self.bind_address.trim().is_empty() {
            return Err(Error::Config("bind_address must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Locate the config file
///
/// Returns the CLI path or the `LYRIC_PLAYER_CONFIG` path as given (even if it
/// does not exist, so the caller can report it), otherwise the first existing
/// platform default.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_locations()
        .into_iter()
        .find(|candidate| candidate.exists())
}

/// Platform config file candidates, most specific first
fn default_config_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join(APP_DIR_NAME).join("config.toml"));
    }

    if cfg!(target_os = "linux") {
        locations.push(PathBuf::from("/etc").join(APP_DIR_NAME).join("config.toml"));
    }

    locations
}

/// Get OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./lyric_player_data"))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Load configuration with graceful degradation
///
/// A missing file only produces a warning and compiled defaults; a file that
/// exists but does not parse or validate is an error.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = resolve_config_path(cli_arg) else {
        debug!("No config file found, using compiled defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using compiled defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    debug!("Loading config from {}", path.display());
    load_toml_config(&path)
}
