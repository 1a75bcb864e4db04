// src/config.rs

//! Configuration loading utilities.
//!
//! Convenience functions around [`Config`] for the command line front end:
//! load with validation and fallback, and write a starter file.

use std::fs;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "data/config.toml";

/// Load and validate configuration from a TOML file.
///
/// A missing, unreadable or invalid file falls back to defaults with a
/// warning, so a lookup always has something to run with.
pub fn load_config(path: &Path) -> Config {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Config::default();
    }

    let config = Config::load_or_default(path);
    match config.validate() {
        Ok(()) => config,
        Err(e) => {
            log::warn!("Invalid config in {}: {e}", path.display());
            log::warn!("Using default configuration.");
            Config::default()
        }
    }
}

/// Load configuration strictly: any read, parse or validation error is
/// returned instead of replaced by defaults.
pub fn load_config_strict(path: &Path) -> Result<Config> {
    let config = Config::load(path)
        .map_err(|e| AppError::config(format!("{}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// Write `config` as TOML, creating parent directories. Refuses to
/// overwrite an existing file unless `force` is set.
pub fn write_config(path: &Path, config: &Config, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(AppError::config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(path, toml::to_string_pretty(config)?)?;
    Ok(())
}
