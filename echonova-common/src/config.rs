//! Configuration loading
//!
//! Resolution priority (highest first):
//! 1. Command-line arguments (applied by the binary)
//! 2. `ECHONOVA_*` environment variables
//! 3. TOML config file
//! 4. Compiled defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Secret used when none is configured; only suitable for development
pub const DEV_TOKEN_SECRET: &str = "echonova-development-secret-change-me";

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub ml: MlConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_data_folder().join("echonova.db"),
        }
    }
}

/// Bearer token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expiration_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: DEV_TOKEN_SECRET.to_string(),
            issuer: "echonova".to_string(),
            audience: "echonova-clients".to_string(),
            expiration_minutes: 60,
        }
    }
}

/// External ML service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MlConfig {
    /// Base URL of the facial emotion service
    pub facial_api_base_url: String,
    /// Base URL of the music recommendation service
    pub music_rec_api_base_url: String,
    pub timeout_secs: u64,
}

impl Default for MlConfig {
    fn default() -> Self {
        Self {
            facial_api_base_url: "http://localhost:8000".to_string(),
            music_rec_api_base_url: "http://localhost:8001".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub from_address: String,
    pub from_name: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_address: "no-reply@echonova.local".to_string(),
            from_name: "Echonova".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist. Without one, the default config file
    /// locations are tried and silently skipped when absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(Error::Config(format!("Config file not found: {}", p.display())));
                }
                Some(p.to_path_buf())
            }
            None => default_config_file(),
        };

        let mut config = match file {
            Some(p) => {
                info!("Loading configuration from {}", p.display());
                Self::from_toml_file(&p)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file; missing sections take defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
    }

    /// Apply `ECHONOVA_*` overrides using the given variable lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ECHONOVA_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = lookup("ECHONOVA_DB_PATH") {
            self.database.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ECHONOVA_TOKEN_SECRET") {
            self.auth.secret = v;
        }
        if let Some(v) = lookup("ECHONOVA_FACIAL_API_URL") {
            self.ml.facial_api_base_url = v;
        }
        if let Some(v) = lookup("ECHONOVA_MUSIC_REC_API_URL") {
            self.ml.music_rec_api_base_url = v;
        }
        if let Some(v) = lookup("ECHONOVA_TOKEN_EXPIRATION_MINUTES") {
            match v.parse() {
                Ok(minutes) => self.auth.expiration_minutes = minutes,
                Err(_) => warn!("Ignoring non-numeric ECHONOVA_TOKEN_EXPIRATION_MINUTES={}", v),
            }
        }
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.auth.secret.trim().is_empty() {
            return Err(Error::Config("auth.secret must not be empty".to_string()));
        }
        if self.auth.expiration_minutes <= 0 {
            return Err(Error::Config(
                "auth.expiration_minutes must be positive".to_string(),
            ));
        }
        if self.auth.secret == DEV_TOKEN_SECRET {
            warn!("Using the development token secret; set auth.secret or ECHONOVA_TOKEN_SECRET");
        }
        Ok(())
    }
}

/// First existing default config file, if any
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("echonova").join("config.toml"));
    let system_config = PathBuf::from("/etc/echonova/config.toml");

    user_config
        .into_iter()
        .chain(std::iter::once(system_config))
        .find(|p| p.exists())
}

/// OS-dependent default data folder
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("echonova"))
        .unwrap_or_else(|| PathBuf::from("./echonova_data"))
}
