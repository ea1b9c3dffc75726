//! Engine configuration
//!
//! Stored as RON. Every field has a default, so a config file only needs the
//! values it changes.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::automap::AutomapConfig;
use crate::rasterizer::{HEIGHT, WIDTH};
use crate::video::DEFAULT_LINE_CAPACITY;

/// Error type for config loading
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(ron::error::SpannedError),
    Serialize(ron::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(e: ron::error::SpannedError) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<ron::Error> for ConfigError {
    fn from(e: ron::Error) -> Self {
        ConfigError::Serialize(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Serialize(e) => write!(f, "Serialize error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window_width: i32,
    pub window_height: i32,
    /// Software view resolution
    pub world_width: usize,
    pub world_height: usize,
    /// Overlay atlas page size, in pixels per side
    pub atlas_size: i32,
    /// Text lines kept in the console scrollback
    pub console_lines: usize,
    pub automap: AutomapConfig,
    pub screenshot_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_width: WIDTH as i32 * 3,
            window_height: HEIGHT as i32 * 3,
            world_width: WIDTH,
            world_height: HEIGHT,
            atlas_size: 2048,
            console_lines: DEFAULT_LINE_CAPACITY,
            automap: AutomapConfig::default(),
            screenshot_dir: PathBuf::from("screenshots"),
        }
    }
}

/// Load a config from a RON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    load_config_from_str(&contents)
}

/// Load a config from a RON string
pub fn load_config_from_str(s: &str) -> Result<EngineConfig, ConfigError> {
    Ok(ron::from_str(s)?)
}

/// Save a config to a RON file
pub fn save_config<P: AsRef<Path>>(config: &EngineConfig, path: P) -> Result<(), ConfigError> {
    let pretty = ron::ser::PrettyConfig::new()
        .depth_limit(4)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(config, pretty)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Load `path`, falling back to defaults if it is missing or broken
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> EngineConfig {
    let path = path.as_ref();
    if !path.exists() {
        return EngineConfig::default();
    }
    match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}: {}, using defaults", path.display(), e);
            EngineConfig::default()
        }
    }
}
