//! # Application Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ORDERDESK_DB_PATH=/srv/orderdesk.db                                │
//! │     ORDERDESK_TAX_RATE_BPS=1700                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/orderdesk/orderdesk.toml (Linux)                         │
//! │     ~/Library/Application Support/com.orderdesk.orderdesk/... (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/srv/orderdesk/orderdesk.db"
//! max_connections = 5
//!
//! [pricing]
//! tax_rate_bps = 1800
//!
//! [invoicing]
//! enabled = true
//! endpoint = "https://relay.example.com/invoices"
//! api_token = "..."
//! company_id = "acme"
//! payment_type = "bank_transfer"
//! timeout_secs = 15
//! ```

use std::path::{Path, PathBuf};

use orderdesk_core::validation::validate_tax_rate_bps;
use orderdesk_core::TaxRate;
use orderdesk_db::DbConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::invoicing::InvoicingConfig;

const CONFIG_FILE_NAME: &str = "orderdesk.toml";
const DATABASE_FILE_NAME: &str = "orderdesk.db";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_tax_rate_bps() -> u32 {
    orderdesk_core::DEFAULT_TAX_RATE_BPS
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricingSettings {
    /// VAT used to derive tax-exclusive prices from tax-inclusive ones.
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            tax_rate_bps: default_tax_rate_bps(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub invoicing: InvoicingConfig,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else the platform config directory)
    /// 3. `ORDERDESK_*` environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parses one TOML file without environment overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Applies overrides from `lookup`, normally the process environment.
    ///
    /// ## Variables
    /// - `ORDERDESK_DB_PATH`, `ORDERDESK_DB_MAX_CONNECTIONS`
    /// - `ORDERDESK_TAX_RATE_BPS`
    /// - `ORDERDESK_INVOICING_ENABLED`, `ORDERDESK_INVOICING_ENDPOINT`,
    ///   `ORDERDESK_INVOICING_TOKEN`, `ORDERDESK_INVOICING_COMPANY_ID`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("ORDERDESK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("ORDERDESK_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("ORDERDESK_DB_MAX_CONNECTIONS", &max)?;
        }

        if let Some(bps) = lookup("ORDERDESK_TAX_RATE_BPS") {
            self.pricing.tax_rate_bps = parse_env("ORDERDESK_TAX_RATE_BPS", &bps)?;
        }

        if let Some(enabled) = lookup("ORDERDESK_INVOICING_ENABLED") {
            self.invoicing.enabled = parse_env("ORDERDESK_INVOICING_ENABLED", &enabled)?;
        }

        if let Some(endpoint) = lookup("ORDERDESK_INVOICING_ENDPOINT") {
            self.invoicing.endpoint = Some(endpoint);
        }

        if let Some(token) = lookup("ORDERDESK_INVOICING_TOKEN") {
            self.invoicing.api_token = Some(token);
        }

        if let Some(company_id) = lookup("ORDERDESK_INVOICING_COMPANY_ID") {
            self.invoicing.company_id = Some(company_id);
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        validate_tax_rate_bps(self.pricing.tax_rate_bps)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.invoicing.enabled {
            match self.invoicing.endpoint.as_deref() {
                Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
                Some(url) => {
                    return Err(ConfigError::Invalid(format!(
                        "invoicing.endpoint must start with http:// or https://, got: {url}"
                    )))
                }
                None => {
                    return Err(ConfigError::Invalid(
                        "invoicing.endpoint is required when invoicing is enabled".into(),
                    ))
                }
            }

            if self.invoicing.api_token.as_deref().map_or(true, |t| t.trim().is_empty()) {
                return Err(ConfigError::Invalid(
                    "invoicing.api_token is required when invoicing is enabled".into(),
                ));
            }

            if self.invoicing.timeout_secs == 0 {
                return Err(ConfigError::Invalid(
                    "invoicing.timeout_secs must be greater than 0".into(),
                ));
            }
        }

        Ok(())
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.pricing.tax_rate_bps)
    }

    /// Configured database file, or the platform default.
    pub fn database_path(&self) -> PathBuf {
        self.database.path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "orderdesk", "orderdesk")
                .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME))
        })
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path()).max_connections(self.database.max_connections)
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "orderdesk", "orderdesk")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
