//! Application configuration.
//!
//! Loaded once at startup and passed down explicitly. A `.json` file is
//! parsed with serde_json (so a bare `{"alphavantage_api_key": "..."}`
//! works); anything else is TOML:
//!
//! ```toml
//! alphavantage_api_key = "demo"
//!
//! [paths]
//! docs_dir = "docs"
//! data_dir = "data"
//! log_file = "log.txt"
//!
//! [symbols]
//! list_key = "tickers"
//! item_key = "ticker"
//!
//! [throttle]
//! alphavantage_delay_secs = 15
//! yahoo_delay_secs = 0
//!
//! [alphavantage]
//! interval = "1min"
//! outputsize = "full"
//!
//! [yahoo]
//! lookback_days = 7
//! ```

use quotelab_core::data::{find_document, list_documents, SymbolList, SymbolListError};
use quotelab_core::domain::{AvInterval, OutputSize, Provider};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides the configured Alpha Vantage key.
pub const API_KEY_ENV: &str = "QUOTELAB_ALPHAVANTAGE_API_KEY";

/// Errors raised before any download starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("no Alpha Vantage API key: set alphavantage_api_key in the config or QUOTELAB_ALPHAVANTAGE_API_KEY")]
    MissingApiKey,

    #[error("symbol document '{name}' not found in {dir} (available: {})", .available.join(", "))]
    SymbolDocumentNotFound {
        name: String,
        dir: PathBuf,
        available: Vec<String>,
    },

    #[error("failed to list symbol documents in {dir}: {source}")]
    DocsDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("symbol document {path}: {source}")]
    Symbols {
        path: PathBuf,
        #[source]
        source: SymbolListError,
    },

    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alphavantage_api_key: Option<String>,
    pub paths: PathsConfig,
    pub symbols: SymbolsConfig,
    pub throttle: ThrottleConfig,
    pub alphavantage: AlphaVantageConfig,
    pub yahoo: YahooConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub docs_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("docs"),
            data_dir: PathBuf::from("data"),
            log_file: PathBuf::from("log.txt"),
        }
    }
}

/// Keys used to pull tickers out of a symbol document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SymbolsConfig {
    pub list_key: String,
    pub item_key: String,
}

impl Default for SymbolsConfig {
    fn default() -> Self {
        Self {
            list_key: "tickers".into(),
            item_key: "ticker".into(),
        }
    }
}

/// Longest pause allowed between two symbols (one hour).
pub const MAX_DELAY_SECS: u64 = 3600;

/// Longest Yahoo lookback accepted, about a century of daily bars.
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

/// Pause after each symbol, per provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Free-tier Alpha Vantage allows roughly four calls a minute.
    pub alphavantage_delay_secs: u64,
    pub yahoo_delay_secs: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            alphavantage_delay_secs: 15,
            yahoo_delay_secs: 0,
        }
    }
}

impl ThrottleConfig {
    pub fn delay_for(&self, provider: Provider) -> Duration {
        match provider {
            Provider::AlphaVantage => Duration::from_secs(self.alphavantage_delay_secs),
            Provider::YahooFinance => Duration::from_secs(self.yahoo_delay_secs),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlphaVantageConfig {
    pub interval: AvInterval,
    pub outputsize: OutputSize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct YahooConfig {
    /// Days before today covered by a bulk Yahoo run.
    pub lookback_days: i64,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self { lookback_days: 7 }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            alphavantage_api_key: None,
            paths: PathsConfig::default(),
            symbols: SymbolsConfig::default(),
            throttle: ThrottleConfig::default(),
            alphavantage: AlphaVantageConfig::default(),
            yahoo: YahooConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, choosing the format by extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_err = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };
        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Like [`AppConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.alphavantage_api_key = Some(key);
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_LOOKBACK_DAYS).contains(&self.yahoo.lookback_days) {
            return Err(ConfigError::Invalid(format!(
                "yahoo.lookback_days must be between 1 and {MAX_LOOKBACK_DAYS}, got {}",
                self.yahoo.lookback_days
            )));
        }
        for (name, secs) in [
            ("alphavantage_delay_secs", self.throttle.alphavantage_delay_secs),
            ("yahoo_delay_secs", self.throttle.yahoo_delay_secs),
        ] {
            if secs > MAX_DELAY_SECS {
                return Err(ConfigError::Invalid(format!(
                    "throttle.{name} must be at most {MAX_DELAY_SECS}, got {secs}"
                )));
            }
        }
        if self.symbols.list_key.is_empty() || self.symbols.item_key.is_empty() {
            return Err(ConfigError::Invalid(
                "symbols.list_key and symbols.item_key must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.alphavantage_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Names of the symbol documents under the docs directory.
    pub fn available_documents(&self) -> Result<Vec<String>, ConfigError> {
        list_documents(&self.paths.docs_dir).map_err(|source| ConfigError::DocsDir {
            dir: self.paths.docs_dir.clone(),
            source,
        })
    }

    /// Load the symbol document called `name` from the docs directory.
    pub fn load_symbols(&self, name: &str) -> Result<SymbolList, ConfigError> {
        let dir = &self.paths.docs_dir;
        let path = find_document(dir, name)
            .map_err(|source| ConfigError::DocsDir {
                dir: dir.clone(),
                source,
            })?
            .ok_or_else(|| ConfigError::SymbolDocumentNotFound {
                name: name.to_string(),
                dir: dir.clone(),
                available: list_documents(dir).unwrap_or_default(),
            })?;

        SymbolList::from_file(&path, &self.symbols.list_key, &self.symbols.item_key)
            .map_err(|source| ConfigError::Symbols { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.paths.docs_dir, PathBuf::from("docs"));
        assert_eq!(config.paths.log_file, PathBuf::from("log.txt"));
        assert_eq!(config.symbols.list_key, "tickers");
        assert_eq!(config.throttle.delay_for(Provider::AlphaVantage), Duration::from_secs(15));
        assert_eq!(config.throttle.delay_for(Provider::YahooFinance), Duration::ZERO);
        assert_eq!(config.alphavantage.interval, AvInterval::OneMinute);
        assert_eq!(config.alphavantage.outputsize, OutputSize::Full);
        assert_eq!(config.yahoo.lookback_days, 7);
    }

    #[test]
    fn bare_json_key_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"alphavantage_api_key": "ABC123"}"#).unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.require_api_key().unwrap(), "ABC123");
        assert_eq!(config.paths, PathsConfig::default());
    }

    #[test]
    fn toml_sections_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotelab.toml");
        std::fs::write(
            &path,
            r#"
[throttle]
alphavantage_delay_secs = 20

[alphavantage]
interval = "5min"
outputsize = "compact"
"#,
        )
        .unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.throttle.alphavantage_delay_secs, 20);
        assert_eq!(config.throttle.yahoo_delay_secs, 0);
        assert_eq!(config.alphavantage.interval, AvInterval::FiveMinutes);
        assert_eq!(config.alphavantage.outputsize, OutputSize::Compact);
    }

    #[test]
    fn unknown_interval_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotelab.toml");
        std::fs::write(&path, "[alphavantage]\ninterval = \"2min\"\n").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn env_key_wins_and_blank_key_is_missing() {
        let config = AppConfig {
            alphavantage_api_key: Some("   ".into()),
            ..AppConfig::default()
        };
        assert!(matches!(config.require_api_key(), Err(ConfigError::MissingApiKey)));

        let config = config.with_overrides_from(|key| {
            (key == API_KEY_ENV).then(|| "FROMENV".to_string())
        });
        assert_eq!(config.require_api_key().unwrap(), "FROMENV");
    }

    #[test]
    fn zero_lookback_rejected() {
        let mut config = AppConfig::default();
        config.yahoo.lookback_days = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn huge_lookback_is_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotelab.toml");
        std::fs::write(&path, "[yahoo]\nlookback_days = 100000000000\n").unwrap();
        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");

        let mut config = AppConfig::default();
        config.yahoo.lookback_days = MAX_LOOKBACK_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn huge_delay_is_rejected() {
        let mut config = AppConfig::default();
        config.throttle.alphavantage_delay_secs = u64::MAX;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.throttle.alphavantage_delay_secs = MAX_DELAY_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_symbol_document_lists_alternatives() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("nasdaq.json"), r#"{"tickers": []}"#).unwrap();
        let mut config = AppConfig::default();
        config.paths.docs_dir = dir.path().to_path_buf();

        let err = config.load_symbols("dax").unwrap_err();
        match err {
            ConfigError::SymbolDocumentNotFound { available, .. } => {
                assert_eq!(available, vec!["nasdaq".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(config.load_symbols("nasdaq").unwrap().is_empty());
    }
}
