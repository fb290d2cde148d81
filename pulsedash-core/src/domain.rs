//! Domain types: data points, series, datasets and request parameters.
//!
//! A `Dataset` is produced fresh by a source adapter on every refresh cycle
//! and is never merged with a previous one. Series enforce strictly
//! increasing timestamps at construction, so everything downstream of the
//! adapter boundary can assume ordered, finite data.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::FetchError;

/// Smallest and largest accepted look-back window, in days.
pub const MIN_DAYS: u32 = 1;
pub const MAX_DAYS: u32 = 30;

/// Longest forecast Open-Meteo serves; weather requests are capped to it.
pub const MAX_FORECAST_DAYS: u32 = 16;

/// Bounds for the number of generated mock points.
pub const MIN_POINTS: u32 = 2;
pub const MAX_POINTS: u32 = 1000;

/// Largest accepted step bound for the stock random walk.
pub const MAX_VOLATILITY: f64 = 1_000.0;

/// Which family of data the dashboard shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Crypto,
    Weather,
    #[serde(alias = "stocks")]
    Stock,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Crypto, Mode::Weather, Mode::Stock];

    pub fn label(self) -> &'static str {
        match self {
            Mode::Crypto => "Crypto",
            Mode::Weather => "Weather",
            Mode::Stock => "Stocks",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Mode::Crypto => "crypto",
            Mode::Weather => "weather",
            Mode::Stock => "stock",
        }
    }

    pub fn next(self) -> Mode {
        match self {
            Mode::Crypto => Mode::Weather,
            Mode::Weather => Mode::Stock,
            Mode::Stock => Mode::Crypto,
        }
    }

    pub fn prev(self) -> Mode {
        match self {
            Mode::Crypto => Mode::Stock,
            Mode::Weather => Mode::Crypto,
            Mode::Stock => Mode::Weather,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crypto" => Ok(Mode::Crypto),
            "weather" => Ok(Mode::Weather),
            "stock" | "stocks" => Ok(Mode::Stock),
            other => Err(format!("unknown mode '{other}' (expected crypto, weather or stock)")),
        }
    }
}

/// Hourly forecast metric reported by the weather source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherMetric {
    #[default]
    Temperature,
    Humidity,
    Precipitation,
}

impl WeatherMetric {
    pub const ALL: [WeatherMetric; 3] = [
        WeatherMetric::Temperature,
        WeatherMetric::Humidity,
        WeatherMetric::Precipitation,
    ];

    /// Entity id used for this metric's series in a weather dataset.
    pub fn key(self) -> &'static str {
        match self {
            WeatherMetric::Temperature => "temperature",
            WeatherMetric::Humidity => "humidity",
            WeatherMetric::Precipitation => "precipitation",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WeatherMetric::Temperature => "Temperature",
            WeatherMetric::Humidity => "Humidity",
            WeatherMetric::Precipitation => "Precipitation",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            WeatherMetric::Temperature => "°C",
            WeatherMetric::Humidity => "%",
            WeatherMetric::Precipitation => "mm",
        }
    }

    pub fn next(self) -> WeatherMetric {
        match self {
            WeatherMetric::Temperature => WeatherMetric::Humidity,
            WeatherMetric::Humidity => WeatherMetric::Precipitation,
            WeatherMetric::Precipitation => WeatherMetric::Temperature,
        }
    }
}

/// A single observation. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl DataPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value,
            label: None,
        }
    }
}

/// Violations of the series invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("series '{entity}': timestamp at index {index} is not after its predecessor")]
    NotIncreasing { entity: String, index: usize },

    #[error("series '{entity}': non-finite value at index {index}")]
    NonFinite { entity: String, index: usize },
}

/// Time-ordered values for one entity (a coin, a city metric, a ticker).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    entity: String,
    name: String,
    unit: String,
    points: Vec<DataPoint>,
}

impl Series {
    /// Build a series from points that must already be strictly increasing
    /// in time and finite.
    pub fn new(
        entity: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        points: Vec<DataPoint>,
    ) -> Result<Self, SeriesError> {
        let entity = entity.into();
        for (i, p) in points.iter().enumerate() {
            if !p.value.is_finite() {
                return Err(SeriesError::NonFinite { entity, index: i });
            }
            if i > 0 && p.timestamp <= points[i - 1].timestamp {
                return Err(SeriesError::NotIncreasing { entity, index: i });
            }
        }
        Ok(Self {
            entity,
            name: name.into(),
            unit: unit.into(),
            points,
        })
    }

    /// Build a series from raw provider output: sort by timestamp, keep the
    /// first point of any duplicated timestamp, drop non-finite values.
    pub fn canonicalize(
        entity: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        mut points: Vec<DataPoint>,
    ) -> Self {
        points.retain(|p| p.value.is_finite());
        points.sort_by_key(|p| p.timestamp);
        points.dedup_by(|later, earlier| later.timestamp == earlier.timestamp);
        Self {
            entity: entity.into(),
            name: name.into(),
            unit: unit.into(),
            points,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn first(&self) -> Option<&DataPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&DataPoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// An entity the adapter could not produce data for, kept so the UI can say why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntity {
    pub entity: String,
    pub reason: String,
}

/// All series produced by one refresh cycle, keyed by entity id.
///
/// Insertion order is preserved (the first series is the chart's primary
/// line); inserting an existing entity replaces it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    mode: Mode,
    series: Vec<Series>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<SkippedEntity>,
}

impl Dataset {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            series: Vec::new(),
            location: None,
            skipped: Vec::new(),
        }
    }

    pub fn insert(&mut self, series: Series) {
        match self.series.iter_mut().find(|s| s.entity == series.entity) {
            Some(existing) => *existing = series,
            None => self.series.push(series),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn skip(&mut self, entity: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedEntity {
            entity: entity.into(),
            reason: reason.into(),
        });
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn skipped(&self) -> &[SkippedEntity] {
        &self.skipped
    }

    pub fn get(&self, entity: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.entity == entity)
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn entity_ids(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.entity.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Total number of points across all series.
    pub fn point_count(&self) -> usize {
        self.series.iter().map(Series::len).sum()
    }
}

/// User-chosen request: mode, per-mode entity selection and numeric controls.
///
/// Owned by the UI layer and passed by value into the adapter on every
/// trigger. Each mode keeps its own selection so switching back and forth
/// does not lose it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestParameters {
    pub mode: Mode,
    /// CoinGecko coin ids, e.g. `bitcoin`.
    pub coins: Vec<String>,
    /// City name or a `lat,lon` pair.
    pub location: String,
    /// Ticker symbols for the mock stock generator.
    pub tickers: Vec<String>,
    /// Look-back (crypto) or forecast (weather) window.
    pub days: u32,
    /// Number of generated stock points.
    pub points: u32,
    /// Maximum absolute step of the stock random walk.
    pub volatility: f64,
    /// Seed for the stock random walk.
    pub seed: u64,
    /// Metric listed first (and charted) in weather mode.
    pub weather_metric: WeatherMetric,
}

impl Default for RequestParameters {
    fn default() -> Self {
        Self {
            mode: Mode::Crypto,
            coins: vec!["bitcoin".into(), "ethereum".into(), "cardano".into()],
            location: "New York".into(),
            tickers: vec!["AAPL".into(), "GOOGL".into(), "MSFT".into()],
            days: 7,
            points: 30,
            volatility: 5.0,
            seed: 42,
            weather_metric: WeatherMetric::Temperature,
        }
    }
}

impl RequestParameters {
    /// Entity selection for the active mode.
    pub fn entities(&self) -> Vec<String> {
        match self.mode {
            Mode::Crypto => self.coins.clone(),
            Mode::Weather => vec![self.location.clone()],
            Mode::Stock => self.tickers.clone(),
        }
    }

    /// Replace the active mode's selection from a comma-separated list.
    ///
    /// Coin ids are lower-cased, tickers upper-cased, the weather location
    /// is taken verbatim. Empty input leaves the selection unchanged and
    /// returns false.
    pub fn set_entities(&mut self, input: &str) -> bool {
        let items: Vec<String> = input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if items.is_empty() {
            return false;
        }
        match self.mode {
            Mode::Crypto => {
                self.coins = items.into_iter().map(|s| s.to_ascii_lowercase()).collect();
            }
            Mode::Weather => self.location = input.trim().to_string(),
            Mode::Stock => {
                self.tickers = items.into_iter().map(|s| s.to_ascii_uppercase()).collect();
            }
        }
        true
    }

    /// One-line description for status messages and logs.
    pub fn describe(&self) -> String {
        match self.mode {
            Mode::Crypto => format!("crypto {} ({}d)", self.coins.join(","), self.days),
            Mode::Weather => format!(
                "weather {} ({}d, {})",
                self.location,
                self.days,
                self.weather_metric.key()
            ),
            Mode::Stock => format!(
                "stock {} ({} pts, vol {:.1}, seed {})",
                self.tickers.join(","),
                self.points,
                self.volatility,
                self.seed
            ),
        }
    }

    /// Check the parameters before any adapter runs.
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.entities().iter().all(|e| e.trim().is_empty()) {
            return Err(FetchError::InvalidParameters(format!(
                "no {} selected",
                match self.mode {
                    Mode::Crypto => "coins",
                    Mode::Weather => "location",
                    Mode::Stock => "tickers",
                }
            )));
        }
        match self.mode {
            Mode::Crypto | Mode::Weather => {
                if !(MIN_DAYS..=MAX_DAYS).contains(&self.days) {
                    return Err(FetchError::InvalidParameters(format!(
                        "days must be in {MIN_DAYS}..={MAX_DAYS}, got {}",
                        self.days
                    )));
                }
            }
            Mode::Stock => {
                if !(MIN_POINTS..=MAX_POINTS).contains(&self.points) {
                    return Err(FetchError::InvalidParameters(format!(
                        "points must be in {MIN_POINTS}..={MAX_POINTS}, got {}",
                        self.points
                    )));
                }
                if !(0.0..=MAX_VOLATILITY).contains(&self.volatility) {
                    return Err(FetchError::InvalidParameters(format!(
                        "volatility must be in 0..={MAX_VOLATILITY}, got {}",
                        self.volatility
                    )));
                }
            }
        }
        Ok(())
    }
}
