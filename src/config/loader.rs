//! Configuration file loading
//!
//! Finds and parses the TOML configuration file, falling back to built-in
//! defaults when none exists.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::Config;
use crate::error::{Error, Result};

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the first existing search path, or defaults.
    ///
    /// Search order: `$REPLBRIDGE_CONFIG`, the user config directory
    /// (`replbridge/config.toml`), then `./replbridge.toml`.
    pub fn load() -> Result<Config> {
        for path in Self::search_paths() {
            if path.is_file() {
                info!(path = %path.display(), "loading configuration");
                return Self::load_from_file(&path);
            }
        }
        debug!("no configuration file found; using defaults");
        Ok(Config::default())
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| Error::ConfigParseFailed {
            format: "TOML".to_string(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Candidate configuration file locations, most specific first.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(explicit) = env::var_os("REPLBRIDGE_CONFIG") {
            paths.push(PathBuf::from(explicit));
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("replbridge").join("config.toml"));
        }
        paths.push(PathBuf::from("replbridge.toml"));

        paths
    }
}
