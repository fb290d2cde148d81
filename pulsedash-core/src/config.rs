//! Dashboard configuration: a TOML file with per-source sections.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! The default location is `<config dir>/pulsedash/config.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    Mode, RequestParameters, WeatherMetric, MAX_DAYS, MAX_VOLATILITY, MIN_DAYS,
};

/// Longest accepted refresh interval: one day.
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Period of the automatic refresh timer.
    pub refresh_interval_secs: u64,
    pub default_mode: Mode,
    pub default_days: u32,
    pub http: HttpConfig,
    pub breaker: BreakerConfig,
    pub crypto: CryptoConfig,
    pub weather: WeatherConfig,
    pub stock: StockConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    pub base_url: String,
    pub vs_currency: String,
    pub coins: Vec<String>,
    /// Upper bound on concurrent per-coin requests.
    pub max_parallel: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub forecast_url: String,
    pub geocoding_url: String,
    pub default_location: String,
    /// Coordinates used when geocoding finds nothing.
    pub fallback_latitude: f64,
    pub fallback_longitude: f64,
    pub metric: WeatherMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockConfig {
    pub symbols: Vec<String>,
    pub base_prices: BTreeMap<String, f64>,
    pub default_base_price: f64,
    pub points: u32,
    pub volatility: f64,
    pub seed: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 5 * 60,
            default_mode: Mode::Crypto,
            default_days: 7,
            http: HttpConfig::default(),
            breaker: BreakerConfig::default(),
            crypto: CryptoConfig::default(),
            weather: WeatherConfig::default(),
            stock: StockConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: concat!("pulsedash/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_secs: 30 * 60,
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".into(),
            vs_currency: "usd".into(),
            coins: vec!["bitcoin".into(), "ethereum".into(), "cardano".into()],
            max_parallel: 3,
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            forecast_url: "https://api.open-meteo.com/v1/forecast".into(),
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".into(),
            default_location: "New York".into(),
            fallback_latitude: 40.7128,
            fallback_longitude: -74.0060,
            metric: WeatherMetric::Temperature,
        }
    }
}

impl Default for StockConfig {
    fn default() -> Self {
        let base_prices = [("AAPL", 180.0), ("GOOGL", 140.0), ("MSFT", 380.0)]
            .into_iter()
            .map(|(s, p)| (s.to_string(), p))
            .collect();
        Self {
            symbols: vec!["AAPL".into(), "GOOGL".into(), "MSFT".into()],
            base_prices,
            default_base_price: 100.0,
            points: 30,
            volatility: 5.0,
            seed: 42,
        }
    }
}

impl DashboardConfig {
    /// `<config dir>/pulsedash/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("pulsedash").join("config.toml"))
    }

    /// Load from an explicit path (must exist) or from the default path
    /// (falls back to defaults when absent).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_REFRESH_INTERVAL_SECS).contains(&self.refresh_interval_secs) {
            return Err(ConfigError::Invalid(format!(
                "refresh_interval_secs must be in 1..={MAX_REFRESH_INTERVAL_SECS}, got {}",
                self.refresh_interval_secs
            )));
        }
        if !(1..=120).contains(&self.http.timeout_secs) {
            return Err(ConfigError::Invalid(format!(
                "http.timeout_secs must be in 1..=120, got {}",
                self.http.timeout_secs
            )));
        }
        if !(MIN_DAYS..=MAX_DAYS).contains(&self.default_days) {
            return Err(ConfigError::Invalid(format!(
                "default_days must be in {MIN_DAYS}..={MAX_DAYS}, got {}",
                self.default_days
            )));
        }
        if !(0.0..=MAX_VOLATILITY).contains(&self.stock.volatility) {
            return Err(ConfigError::Invalid(format!(
                "stock.volatility must be in 0..={MAX_VOLATILITY}, got {}",
                self.stock.volatility
            )));
        }
        if !self.stock.default_base_price.is_finite() || self.stock.default_base_price <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "stock.default_base_price must be positive, got {}",
                self.stock.default_base_price
            )));
        }
        if let Some((sym, price)) = self
            .stock
            .base_prices
            .iter()
            .find(|(_, p)| !p.is_finite() || **p <= 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "stock.base_prices.{sym} must be positive, got {price}"
            )));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Initial request parameters derived from the config.
    pub fn initial_parameters(&self) -> RequestParameters {
        RequestParameters {
            mode: self.default_mode,
            coins: self.crypto.coins.clone(),
            location: self.weather.default_location.clone(),
            tickers: self.stock.symbols.clone(),
            days: self.default_days,
            points: self.stock.points,
            volatility: self.stock.volatility,
            seed: self.stock.seed,
            weather_metric: self.weather.metric,
        }
    }
}
