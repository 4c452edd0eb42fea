//! # th-config
//!
//! Layered configuration loading for Trust Hub using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`THUB_*` prefix, `__` as separator)
//! 2. Project-level `.trust-hub/config.toml`
//! 3. User-level `~/.config/trust-hub/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `THUB_DATABASE__PATH` -> `database.path` and
//! `THUB_GENERAL__DISPLAY_USER` -> `general.display_user`.
//!
//! # Usage
//!
//! ```no_run
//! use th_config::TrustHubConfig;
//!
//! let config = TrustHubConfig::load_with_dotenv().expect("config");
//! println!("database: {}", config.database.path);
//! ```

mod database;
mod error;
mod general;

pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use general::{GeneralConfig, OutputFormatSetting};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project-local directory holding config and the default database.
pub const PROJECT_DIR: &str = ".trust-hub";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrustHubConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl TrustHubConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration after reading `.env` from the current directory.
    ///
    /// A missing `.env` is fine; a malformed one is an error.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(error) if error.not_found() => {}
            Err(error) => return Err(ConfigError::Dotenv(error)),
        }
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or add providers on top.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = Self::project_config_path(Path::new("."));
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("THUB_").split("__"))
    }

    /// Reject values that would break the service at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::NotConfigured {
                section: "database".to_string(),
            });
        }
        if self.general.display_user.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "general.display_user".to_string(),
                reason: "must not be blank".to_string(),
            });
        }
        if self.general.default_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "general.default_limit".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Path to the project-local config file under `root`.
    #[must_use]
    pub fn project_config_path(root: &Path) -> PathBuf {
        root.join(PROJECT_DIR).join("config.toml")
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("trust-hub").join("config.toml"))
    }
}
