//! This module provides functionality for loading and handling the application's configuration.
//!
//! It defines the `PartsScoutConfig` struct, which holds the configuration parameters,
//! and a `load_config` function to load the configuration from a file.
//!
//! # Examples
//!
//! Loading the configuration from a file:
//!
//! ```no_run
//! use parts_scout::config::{PartsScoutConfig, load_config};
//!
//! let config_file_path = "/path/to/config.yaml";
//! let config: PartsScoutConfig = load_config(config_file_path).unwrap();
//! println!("{:?}", config);
//! ```

use serde::{Deserialize, Serialize};
use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::*;

/// File name of the token store inside the config directory.
pub const TOKEN_FILE_NAME: &str = "tokens.json";

/// Represents the application's configuration.
///
/// Every field has a default, so a config file only needs to name what it
/// changes. `pscout init` writes the defaults out in full.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct PartsScoutConfig {
    /// Base URL of the backend API, including the `/api` prefix.
    pub api_base: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Where the access/refresh tokens are kept. Defaults to
    /// `tokens.json` in the config directory.
    pub token_file: Option<PathBuf>,

    /// How many conversations `pscout history` fetches.
    pub history_page_size: u32,
}

impl Default for PartsScoutConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000/api".to_string(),
            request_timeout_secs: 10,
            token_file: None,
            history_page_size: 20,
        }
    }
}

impl PartsScoutConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve the token file, falling back to the config directory.
    pub fn token_path(&self) -> Result<PathBuf, Box<dyn Error>> {
        match &self.token_file {
            Some(path) => Ok(path.clone()),
            None => Ok(crate::config_dir()?.join(TOKEN_FILE_NAME)),
        }
    }

    /// Write this configuration as YAML, creating parent directories.
    pub fn save(&self, file: &Path) -> Result<(), Box<dyn Error>> {
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(file, serde_yaml::to_string(self)?)?;
        info!("Wrote config to {}", file.display());
        Ok(())
    }
}

/// Loads the application's configuration from a YAML file.
///
/// # Returns
///
/// - `Ok(PartsScoutConfig)`: The loaded configuration.
/// - `Err(Box<dyn Error>)`: An error occurred while reading the file or parsing the YAML.
pub fn load_config(file: &str) -> Result<PartsScoutConfig, Box<dyn Error>> {
    debug!("Loading config from {:?}", file);
    let content = fs::read_to_string(file)?;
    let config: PartsScoutConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}
