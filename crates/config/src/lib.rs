//! Bot configuration: a YAML document with the main section and a `napcat`
//! gateway sub-section. Every account id is a string; numeric values in
//! the file are accepted and normalized on load.

pub mod error;
pub mod schema;
pub mod token;

pub use {
    error::{Error, Result},
    schema::{BotConfig, NapcatConfig, PluginConfig},
    token::{generate_strong_token, is_strong_token},
};

use std::path::Path;

use tracing::debug;

/// Load a config file. A missing file and a malformed file are distinct
/// errors so the launcher can report them differently.
pub fn load_config(path: &Path) -> Result<BotConfig> {
    if !path.exists() {
        return Err(Error::MissingFile {
            path: path.display().to_string(),
        });
    }
    let raw = std::fs::read_to_string(path)?;
    let config: BotConfig = serde_yaml::from_str(&raw).map_err(|source| Error::Parse {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Serialize and write the config.
pub fn save_config(config: &BotConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let raw = serde_yaml::to_string(config).map_err(|source| Error::Parse {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(path, raw)?;
    debug!(path = %path.display(), "config saved");
    Ok(())
}
