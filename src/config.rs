//! Configuration loading
//!
//! Settings come from a TOML file. Lookup order: an explicit path (the
//! `--config` flag), then `$STOCKFOLIO_CONFIG`, then
//! `<config_home>/stockfolio/config.toml`. A missing default file simply
//! yields the defaults.

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::db::normalize_symbol;
use crate::ledger::LedgerOptions;

pub const CONFIG_ENV: &str = "STOCKFOLIO_CONFIG";
pub const DB_ENV: &str = "STOCKFOLIO_DB";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database_path: Option<PathBuf>,
    pub pricing: PricingConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Yahoo,
    /// Manual prices only, no network access
    Offline,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricingConfig {
    pub provider: ProviderKind,
    /// Per-quote timeout; a timed out lookup counts as unresolved
    pub timeout_secs: u64,
    pub max_concurrent: usize,
    pub cache_ttl_secs: u64,
    /// Appended to tickers before querying the provider (e.g. ".SA")
    pub symbol_suffix: String,
    /// Fixed prices that take precedence over the provider
    pub manual: BTreeMap<String, Decimal>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Yahoo,
            timeout_secs: 10,
            max_concurrent: 5,
            cache_ttl_secs: 300,
            symbol_suffix: String::new(),
            manual: BTreeMap::new(),
        }
    }
}

impl PricingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Manual prices keyed by normalized symbol
    pub fn manual_prices(&self) -> Result<HashMap<String, Decimal>> {
        let mut prices = HashMap::with_capacity(self.manual.len());
        for (symbol, price) in &self.manual {
            let symbol = normalize_symbol(symbol);
            if symbol.is_empty() {
                bail!("Manual price configured for an empty symbol");
            }
            if *price < Decimal::ZERO {
                bail!("Manual price for {} must not be negative (got {})", symbol, price);
            }
            prices.insert(symbol, *price);
        }
        Ok(prices)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    pub currency_symbol: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "$".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Invalid configuration file")?;
        if config.pricing.timeout_secs == 0 {
            bail!("pricing.timeout_secs must be greater than zero");
        }
        if config.pricing.max_concurrent == 0 {
            bail!("pricing.max_concurrent must be greater than zero");
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file {:?}", path))?;
        Self::from_toml_str(&content).context(format!("Failed to load config from {:?}", path))
    }

    /// Load configuration, honoring an explicit path first.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Self::from_file(Path::new(&path));
            }
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Database path: `--db` flag, then `$STOCKFOLIO_DB`, then the config
    /// file. `None` means the default location.
    pub fn resolve_db_path(&self, flag: Option<PathBuf>) -> Option<PathBuf> {
        flag.or_else(|| {
            std::env::var_os(DB_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
        .or_else(|| self.database_path.clone())
    }

    pub fn ledger_options(&self) -> LedgerOptions {
        LedgerOptions {
            quote_timeout: self.pricing.timeout(),
            max_concurrent_quotes: self.pricing.max_concurrent,
        }
    }
}

/// `<config_home>/stockfolio/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("stockfolio").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.pricing.provider, ProviderKind::Yahoo);
        assert_eq!(config.pricing.timeout_secs, 10);
        assert_eq!(config.pricing.max_concurrent, 5);
        assert_eq!(config.pricing.cache_ttl_secs, 300);
        assert_eq!(config.display.currency_symbol, "$");
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            database_path = "/tmp/folio.db"

            [pricing]
            provider = "offline"
            timeout_secs = 3
            symbol_suffix = ".SA"

            [pricing.manual]
            aapl = "180.00"
            MSFT = 301.5

            [display]
            currency_symbol = "R$"
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/folio.db")));
        assert_eq!(config.pricing.provider, ProviderKind::Offline);
        assert_eq!(config.pricing.timeout(), Duration::from_secs(3));
        assert_eq!(config.pricing.max_concurrent, 5);
        assert_eq!(config.pricing.symbol_suffix, ".SA");
        assert_eq!(config.display.currency_symbol, "R$");

        let manual = config.pricing.manual_prices().unwrap();
        assert_eq!(manual.get("AAPL"), Some(&dec!(180.00)));
        assert_eq!(manual.get("MSFT"), Some(&dec!(301.5)));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Config::from_toml_str("[pricing]\nprovder = \"yahoo\"\n").is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(Config::from_toml_str("[pricing]\ntimeout_secs = 0\n").is_err());
    }

    #[test]
    fn test_negative_manual_price_is_rejected() {
        let config = Config::from_toml_str("[pricing.manual]\nAAPL = \"-1\"\n").unwrap();
        assert!(config.pricing.manual_prices().is_err());
    }

    #[test]
    fn test_flag_beats_config_database_path() {
        let config = Config {
            database_path: Some(PathBuf::from("/from/config.db")),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_db_path(Some(PathBuf::from("/from/flag.db"))),
            Some(PathBuf::from("/from/flag.db"))
        );
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pricing]\nmax_concurrent = 2\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.pricing.max_concurrent, 2);
        assert_eq!(config.ledger_options().max_concurrent_quotes, 2);
    }

    #[test]
    fn test_load_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
