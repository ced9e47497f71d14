//! Application settings read from a TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) is a valid
//! configuration. Command-line flags override what is loaded here.
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection_string = "quotes.db"
//!
//! [logging]
//! level = "info"
//! file = "quote-wizard.log"
//!
//! [session]
//! dir = ".quote-sessions"
//! autosave_debounce_ms = 500
//!
//! [pricing]
//! scenario = "high_tariff"
//!
//! [cache]
//! ttl_secs = 300
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use quote_core::db::DbConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_FILE: &str = "quote-wizard.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: "quotes.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Bare level or full `EnvFilter` directive. `RUST_LOG` wins when set.
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub dir: PathBuf,
    pub autosave_debounce_ms: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".quote-sessions"),
            autosave_debounce_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSection {
    /// Named pricing scenario; the database default is used when unset.
    pub scenario: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub logging: LoggingSection,
    pub session: SessionSection,
    pub pricing: PricingSection,
    pub cache: CacheSection,
}

impl AppConfig {
    pub fn from_toml_str(
        text: &str,
        path: &Path,
    ) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text, path)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Loads `path` when given. Otherwise loads [`DEFAULT_CONFIG_FILE`] from the
    /// working directory if it exists, or falls back to the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            return Self::load(default_path);
        }
        debug!("no config file, using defaults");
        Ok(Self::default())
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            backend: self.database.backend.clone(),
            connection_string: self.database.connection_string.clone(),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.session.autosave_debounce_ms)
    }
}
