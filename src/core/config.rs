// src/core/config.rs

use crate::constants::PROFILE_CONFIG_FILENAME;
use crate::models::ProfileConfig;
use std::{fs, path::Path};
use thiserror::Error;

/// Errors raised while loading or creating `config.toml`.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A filesystem I/O error occurred.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML for a profile config.
    #[error("Failed to parse '{path}': {source}")]
    TomlParse {
        /// The offending file.
        path: String,
        /// The parse error.
        #[source]
        source: toml::de::Error,
    },
    /// The default config could not be serialized.
    #[error("Failed to serialize to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Loads `<home>/config.toml`, writing one with the defaults if it does not exist.
pub fn load_profile_config(home: &Path) -> Result<ProfileConfig, ConfigError> {
    let config_path = home.join(PROFILE_CONFIG_FILENAME);
    if !config_path.exists() {
        let default_config = ProfileConfig::default();
        let toml_string = toml::to_string_pretty(&default_config)?;
        fs::create_dir_all(home)?;
        fs::write(&config_path, toml_string)?;
        log::info!("Wrote default profile config '{}'", config_path.display());
        Ok(default_config)
    } else {
        let content = fs::read_to_string(&config_path)?;
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path.display().to_string(),
            source,
        })
    }
}
