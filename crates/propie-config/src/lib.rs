//! # propie-config
//!
//! Layered configuration loading for the PropIE engine using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`PROPIE_*` prefix, `__` as separator)
//! 2. Project-level `.propie/config.toml`
//! 3. User-level `~/.config/propie/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `PROPIE_RETRY__MAX_ATTEMPTS` -> `retry.max_attempts`,
//! `PROPIE_SWEEP__INTERVAL_SECS` -> `sweep.interval_secs`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use propie_config::PropieConfig;
//!
//! let config = PropieConfig::load_with_dotenv().expect("config");
//! config.validate().expect("valid config");
//! println!("sweep every {}s", config.sweep.interval_secs);
//! ```

mod engine;
mod error;
mod retry;
mod sweep;
mod timeouts;

pub use engine::EngineConfig;
pub use error::ConfigError;
pub use retry::RetryConfig;
pub use sweep::SweepConfig;
pub use timeouts::TimeoutConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PropieConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl PropieConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if a source fails to parse or a value
    /// has the wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Load defaults, then `path`, then environment variables. The standard
    /// user and project files are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::FileNotFound` if `path` does not exist, or
    /// `ConfigError::Figment` on a parse failure.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("PROPIE_").split("__"))
            .extract()
            .map_err(ConfigError::from)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path().filter(|p| p.exists()) {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(".propie/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("PROPIE_").split("__"))
    }

    /// Reject values that would stall the engine.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::must_be_positive("retry.max_attempts"));
        }
        if self.timeouts.persistence_ms == 0 {
            return Err(ConfigError::must_be_positive("timeouts.persistence_ms"));
        }
        if self.timeouts.notification_ms == 0 {
            return Err(ConfigError::must_be_positive("timeouts.notification_ms"));
        }
        if self.sweep.enabled && self.sweep.interval_secs == 0 {
            return Err(ConfigError::must_be_positive("sweep.interval_secs"));
        }
        if self.engine.dedup_window == 0 {
            return Err(ConfigError::must_be_positive("engine.dedup_window"));
        }
        if self.engine.coordination_window_days == 0 {
            return Err(ConfigError::must_be_positive(
                "engine.coordination_window_days",
            ));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_delay_ms".to_string(),
                reason: format!(
                    "must be at least retry.base_delay_ms ({})",
                    self.retry.base_delay_ms
                ),
            });
        }
        Ok(())
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("propie").join("config.toml"))
    }

    /// Load `.env` from the workspace root, walking up from
    /// `CARGO_MANIFEST_DIR` when set. Silently does nothing if none is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}
