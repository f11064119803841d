//! # rb-config
//!
//! Process configuration. Sources are layered, later ones winning:
//!
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. the file named by `RB_CONFIG` (optional)
//! 4. environment variables `RB__SECTION__KEY`, e.g. `RB__SERVER__PORT=8080`
//!
//! A `.env` file is read into the environment first.

use chrono::FixedOffset;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use rb_core::settings::{BoardDirectory, BoardSettings};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub time: TimeConfig,
    pub boards: BoardDirectory,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            identity: IdentityConfig::default(),
            time: TimeConfig::default(),
            boards: default_boards(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:rusty_bbs.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Mixed into every poster ID.
    pub id_salt: SecretString,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            id_salt: SecretString::from(""),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Offset of the service timezone. 9 is JST.
    pub utc_offset_hours: i32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 9,
        }
    }
}

impl TimeConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "time.utc_offset_hours out of range: {}",
                self.utc_offset_hours
            ))
        })
    }
}

fn default_boards() -> BoardDirectory {
    [
        ("news4vip", "VIP＠スタブ"),
        ("poverty", "嫌儲＠スタブ"),
    ]
    .into_iter()
    .map(|(name, title)| {
        let settings = BoardSettings {
            title: title.to_string(),
            ..BoardSettings::default()
        };
        (name.to_string(), settings)
    })
    .collect()
}

impl AppConfig {
    /// Loads the layered configuration of the running process.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }

        let mut builder =
            Config::builder().add_source(File::with_name("config/default").required(false));
        if let Ok(path) = std::env::var("RB_CONFIG") {
            info!(%path, "loading config file");
            builder = builder.add_source(File::with_name(&path));
        }
        builder = builder.add_source(
            Environment::with_prefix("RB")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );
        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.identity.id_salt.expose_secret().is_empty() {
            return Err(ConfigError::Invalid(
                "identity.id_salt must be set (RB__IDENTITY__ID_SALT)".to_string(),
            ));
        }
        if self.boards.is_empty() {
            return Err(ConfigError::Invalid("no boards configured".to_string()));
        }
        self.time.offset()?;
        Ok(())
    }
}
