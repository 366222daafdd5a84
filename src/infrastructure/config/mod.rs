// ============================================================
// APPLICATION CONFIGURATION
// ============================================================
// Layered: defaults → onboarding.toml → ONBOARDING_* environment

use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::domain::error::{AppError, Result};
use crate::domain::import_config::ImportConfig;

pub const CONFIG_FILE: &str = "onboarding.toml";
pub const ENV_PREFIX: &str = "ONBOARDING_";
pub const KEYRING_SERVICE: &str = "onboarding";
pub const MESSAGING_SECRET: &str = "messaging";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HttpConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    /// Open import sessions kept in memory (default: 64)
    #[validate(range(min = 1, max = 10_000))]
    pub max_sessions: usize,
    /// Untouched sessions are dropped after this long (default: 1h)
    #[validate(range(min = 1))]
    pub session_idle_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            max_sessions: 64,
            session_idle_secs: 3600,
        }
    }
}

impl HttpConfig {
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    #[validate(length(min = 1))]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://onboarding.db".to_string(),
        }
    }
}

/// Best-effort copy of every upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("uploads"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MessagingConfig {
    /// Invite delivery endpoint; invites are only logged when unset
    #[validate(url)]
    pub endpoint: Option<String>,
    /// Bearer token; falls back to the OS keyring when unset
    pub api_token: Option<String>,
    #[validate(length(min = 1))]
    pub sender: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_token: None,
            sender: "onboarding".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate(nested)]
    pub http: HttpConfig,
    #[validate(nested)]
    pub database: DatabaseConfig,
    pub archive: ArchiveConfig,
    #[validate(nested)]
    pub messaging: MessagingConfig,
    #[validate(nested)]
    pub import: ImportConfig,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            database: DatabaseConfig::default(),
            archive: ArchiveConfig::default(),
            messaging: MessagingConfig::default(),
            import: ImportConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `.env`, then merge the config file and environment over defaults.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env");
        }
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load configuration: {}", e)))?;

        config
            .validate()
            .map_err(|e| AppError::ConfigError(format!("Invalid configuration: {}", e)))?;

        Ok(config)
    }
}

/// Secret lookup backed by the OS keyring.
pub struct ConfigService {
    service: String,
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE)
    }
}

impl ConfigService {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    /// `Ok(None)` when no secret is stored under `key`.
    pub fn get_secret(&self, key: &str) -> Result<Option<String>> {
        let entry = Entry::new(&self.service, key)
            .map_err(|e| AppError::ConfigError(format!("Failed to open keyring entry: {}", e)))?;

        match entry.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AppError::ConfigError(format!(
                "Failed to read keyring entry '{}': {}",
                key, e
            ))),
        }
    }

    pub fn set_secret(&self, key: &str, secret: &str) -> Result<()> {
        let entry = Entry::new(&self.service, key)
            .map_err(|e| AppError::ConfigError(format!("Failed to open keyring entry: {}", e)))?;

        entry
            .set_password(secret)
            .map_err(|e| AppError::ConfigError(format!("Failed to store keyring entry: {}", e)))
    }

    /// Configured token first, keyring second.
    pub fn messaging_token(&self, messaging: &MessagingConfig) -> Result<Option<String>> {
        match messaging.api_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(Some(token.to_string())),
            _ => self.get_secret(MESSAGING_SECRET),
        }
    }
}
