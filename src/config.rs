//! Configuration for the device identity service.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `srams.toml` file (or an explicitly given file)
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `SRAMS_STORAGE_DIR` - Directory holding `device.cert` and `device.fp`
//! - `SRAMS_CERT_SECRET` - Seed the certificate HMAC key is derived from
//! - `SRAMS_LOG_LEVEL` - Log level (trace, debug, info, warn, error)

use config::Config;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::errors::{IdentityError, IdentityResult};
use crate::signing::DEFAULT_SECRET_SEED;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeviceIdentityConfig {
    /// Certificate storage configuration
    pub storage: StorageConfig,
    /// Certificate signing configuration
    pub signing: SigningConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where the certificate files live.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage directory. Empty means `~/.srams`.
    pub dir: String,
}

impl StorageConfig {
    /// The configured directory, if one was set.
    pub fn dir(&self) -> Option<PathBuf> {
        let dir = self.dir.trim();
        if dir.is_empty() {
            None
        } else {
            Some(PathBuf::from(dir))
        }
    }
}

/// Certificate signing configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Seed hashed into the HMAC key. Deployments should provision their own;
    /// the default matches certificates issued by existing launchers.
    pub secret_seed: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            secret_seed: DEFAULT_SECRET_SEED.to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn config_err(e: config::ConfigError) -> IdentityError {
    IdentityError::Config(e.to_string())
}

impl DeviceIdentityConfig {
    /// Load configuration from `srams.toml` (optional) and the environment.
    pub fn load() -> IdentityResult<Self> {
        Self::load_from(None)
    }

    /// Load configuration, reading `file` instead of `srams.toml` when given.
    ///
    /// An explicitly given file must exist.
    pub fn load_from(file: Option<&Path>) -> IdentityResult<Self> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("srams").required(false),
        };

        let settings = Config::builder()
            .set_default("storage.dir", "")
            .map_err(config_err)?
            .set_default("signing.secret_seed", DEFAULT_SECRET_SEED)
            .map_err(config_err)?
            .set_default("logging.level", "info")
            .map_err(config_err)?
            .add_source(file_source)
            .set_override_option("storage.dir", env::var("SRAMS_STORAGE_DIR").ok())
            .map_err(config_err)?
            .set_override_option("signing.secret_seed", env::var("SRAMS_CERT_SECRET").ok())
            .map_err(config_err)?
            .set_override_option("logging.level", env::var("SRAMS_LOG_LEVEL").ok())
            .map_err(config_err)?
            .build()
            .map_err(|e| IdentityError::Config(format!("failed to build config: {e}")))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| IdentityError::Config(format!("failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> IdentityResult<()> {
        if self.signing.secret_seed.is_empty() {
            return Err(IdentityError::Config(
                "signing.secret_seed cannot be empty".to_string(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(IdentityError::Config(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        Ok(())
    }

    /// Parsed log level filter for the logger.
    pub fn log_level(&self) -> log::LevelFilter {
        self.logging
            .level
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    }
}
