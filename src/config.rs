//! Configuration loading and management
//!
//! Handles parsing of `.rtsync.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Config file name looked up in the working directory.
pub const CONFIG_FILENAME: &str = ".rtsync.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service connection
    #[serde(default)]
    pub server: ServerConfig,

    /// Link mutation behavior
    #[serde(default)]
    pub links: LinksConfig,

    /// Local mirror file
    #[serde(default)]
    pub mirror: MirrorConfig,

    /// Field vocabulary additions
    #[serde(default)]
    pub fields: FieldsConfig,
}

/// Remote service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base url; `REST/1.0` is appended per request
    #[serde(default)]
    pub url: String,

    /// Login name, if the service requires one
    #[serde(default)]
    pub user: Option<String>,

    /// Environment variable holding the password
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_password_env() -> String {
    "RTSYNC_PASSWORD".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: None,
            password_env: default_password_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    /// Permit linking a ticket to itself
    #[serde(default)]
    pub allow_self_link: bool,

    /// Mirror link changes into the local file after remote writes succeed
    #[serde(default = "default_true")]
    pub update_mirror: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            allow_self_link: false,
            update_mirror: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Mirror file, relative to the working directory
    #[serde(default = "default_mirror_path")]
    pub path: PathBuf,

    /// Property that stores the remote ticket id
    #[serde(default = "default_id_property")]
    pub id_property: String,
}

fn default_mirror_path() -> PathBuf {
    PathBuf::from(".rtsync").join("mirror.json")
}

fn default_id_property() -> String {
    "RT_ID".to_string()
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            path: default_mirror_path(),
            id_property: default_id_property(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldsConfig {
    /// Extra field names copied into snapshots, e.g. `CF.{Severity}`
    #[serde(default)]
    pub extra: Vec<String>,
}

impl Config {
    /// Load configuration from a `.rtsync.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILENAME);
        if config_path.exists() {
            match Self::load(&config_path) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                    Self::default()
                }
            }
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Mirror file path resolved against `base` when relative.
    pub fn mirror_path(&self, base: &Path) -> PathBuf {
        if self.mirror.path.is_absolute() {
            self.mirror.path.clone()
        } else {
            base.join(&self.mirror.path)
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.server.url.trim();
        if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "server.url must start with http:// or https:// (got '{url}')"
            )));
        }
        if self.server.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "server.timeout_secs must be > 0".to_string(),
            ));
        }
        if self.mirror.id_property.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "mirror.id_property cannot be empty".to_string(),
            ));
        }
        if self.fields.extra.iter().any(|name| name.trim().is_empty()) {
            return Err(Error::InvalidConfig(
                "fields.extra cannot contain empty names".to_string(),
            ));
        }
        Ok(())
    }
}
