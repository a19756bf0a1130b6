//! # configs
//!
//! Layered configuration for corkboard. Values come from, in increasing
//! precedence: `config/default.toml`, an optional profile file named by
//! `CORKBOARD_PROFILE` (`config/{profile}.toml`), and `CORKBOARD__`-prefixed
//! environment variables (`CORKBOARD__SERVER__PORT=9000`).

use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Emit logs as JSON lines instead of the human format.
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 8080,
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the board/section/post tree.
    pub data_dir: PathBuf,
    /// Per-user documents, kept outside the content tree.
    pub users_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: PathBuf::from("data/boards"),
            users_dir: PathBuf::from("data/users"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for the session cookie. Required; there is no usable
    /// default for key material.
    pub session_secret: SecretString,
    /// Usernames that resolve to the top permission level everywhere.
    #[serde(default)]
    pub super_admins: Vec<String>,
}

impl AppConfig {
    /// Loads the layered configuration. Missing files are fine; missing
    /// required values are not.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Ok(profile) = std::env::var("CORKBOARD_PROFILE") {
            tracing::debug!(profile, "loading configuration profile");
            builder = builder
                .add_source(config::File::with_name(&format!("config/{profile}")).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("CORKBOARD").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
