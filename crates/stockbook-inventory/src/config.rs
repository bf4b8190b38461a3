//! # Inventory Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKBOOK_DATA_DIR=/srv/till                                       │
//! │     STOCKBOOK_TAX_RATE=8.25        (percent)                           │
//! │     STOCKBOOK_PAGE_SIZE=20                                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or                                                │
//! │     ~/.config/stockbook/stockbook.toml (Linux)                         │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     7% tax, 10 entries per ledger page, platform data dir              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [storage]
//! data_dir = "/path/to/data"
//! ephemeral = false
//!
//! [sales]
//! tax_rate_bps = 700
//!
//! [ledger]
//! page_size = 10
//!
//! [reports]
//! low_stock_threshold = 10
//! low_stock_limit = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use stockbook_core::validation::validate_tax_rate_bps;
use stockbook_core::{TaxRate, DEFAULT_TAX_RATE_BPS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

/// Where the mirror keeps its documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Mirror directory. Falls back to the platform data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Keep the mirror in memory only; nothing survives the process.
    #[serde(default)]
    pub ephemeral: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesSettings {
    /// Tax rate in basis points (700 = 7%).
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,
}

fn default_tax_rate_bps() -> u32 {
    DEFAULT_TAX_RATE_BPS
}

impl Default for SalesSettings {
    fn default() -> Self {
        SalesSettings {
            tax_rate_bps: default_tax_rate_bps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    10
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            page_size: default_page_size(),
        }
    }
}

/// Low-stock report parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    /// INVENTORY products strictly below this are reported.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,

    #[serde(default = "default_low_stock_limit")]
    pub low_stock_limit: usize,
}

fn default_low_stock_threshold() -> i64 {
    10
}

fn default_low_stock_limit() -> usize {
    5
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            low_stock_threshold: default_low_stock_threshold(),
            low_stock_limit: default_low_stock_limit(),
        }
    }
}

// =============================================================================
// Stockbook Config
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockbookConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub sales: SalesSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,

    #[serde(default)]
    pub reports: ReportSettings,
}

impl StockbookConfig {
    /// Defaults with an in-memory mirror. Handy for tests and dry runs.
    pub fn ephemeral() -> Self {
        let mut config = Self::default();
        config.storage.ephemeral = true;
        config
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else the platform config dir)
    /// 3. `STOCKBOOK_*` environment variables
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    /// [`StockbookConfig::load`] with overrides read through `lookup`
    /// instead of the process environment.
    pub fn load_with<F>(config_path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let path = config_path
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path).map_err(|source| {
                    ConfigError::Read {
                        path: path.clone(),
                        source,
                    }
                })?;
                config = Self::from_toml(&contents)?;
            } else if config_path.is_some() {
                return Err(ConfigError::Read {
                    path,
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(lookup);
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document; missing sections take their defaults.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_tax_rate_bps(self.sales.tax_rate_bps)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.ledger.page_size == 0 {
            return Err(ConfigError::Invalid(
                "page_size must be greater than 0".into(),
            ));
        }

        if self.reports.low_stock_limit == 0 {
            return Err(ConfigError::Invalid(
                "low_stock_limit must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `STOCKBOOK_*` overrides read through `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("STOCKBOOK_DATA_DIR") {
            debug!(data_dir = %dir, "Overriding data dir from environment");
            self.storage.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(rate) = lookup("STOCKBOOK_TAX_RATE") {
            match rate.trim().parse::<f64>() {
                Ok(pct) if pct.is_finite() && pct >= 0.0 => {
                    let bps = TaxRate::from_percentage(pct).bps();
                    debug!(bps, "Overriding tax rate from environment");
                    self.sales.tax_rate_bps = bps;
                }
                _ => warn!(value = %rate, "Ignoring invalid STOCKBOOK_TAX_RATE"),
            }
        }

        if let Some(size) = lookup("STOCKBOOK_PAGE_SIZE") {
            match size.trim().parse::<usize>() {
                Ok(n) => self.ledger.page_size = n,
                Err(_) => warn!(value = %size, "Ignoring invalid STOCKBOOK_PAGE_SIZE"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stockbook", "stockbook")
            .map(|dirs| dirs.config_dir().join("stockbook.toml"))
    }

    /// The mirror directory: configured, else the platform data dir.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.storage.data_dir.clone().or_else(|| {
            directories::ProjectDirs::from("com", "stockbook", "stockbook")
                .map(|dirs| dirs.data_dir().to_path_buf())
        })
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.sales.tax_rate_bps)
    }
}
