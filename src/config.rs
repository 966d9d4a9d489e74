use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::defaults::DEFAULT_BASE_URL;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
}

/// Remote backend credentials and endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Project API key sent as X-Api-Key on every backend call
    pub key: String,
    /// Base URL shared by the sense and caption services
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SOUNDSCOPE_API_KEY → api.key
    /// - SOUNDSCOPE_BASE_URL → api.base_url
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("SOUNDSCOPE_API_KEY")
            && !key.is_empty()
        {
            self.api.key = key;
        }

        if let Ok(base_url) = std::env::var("SOUNDSCOPE_BASE_URL")
            && !base_url.is_empty()
        {
            self.api.base_url = base_url;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/soundscope/config.toml on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("soundscope").join("config.toml"))
    }
}
