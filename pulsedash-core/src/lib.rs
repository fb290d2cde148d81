//! PulseDash Core: data sources, summary statistics and the refresh cycle.
//!
//! This crate contains everything below the terminal UI:
//! - Domain types (data points, series, datasets, request parameters)
//! - Source adapters for CoinGecko, Open-Meteo and a seeded mock stock feed
//! - Pure summary statistics over a dataset
//! - The refresh scheduler with generation-tagged, last-request-wins snapshots
//! - TOML configuration and the provider circuit breaker

pub mod circuit_breaker;
pub mod config;
pub mod domain;
pub mod error;
pub mod refresh;
pub mod rng;
pub mod sources;
pub mod stats;

pub use config::{ConfigError, DashboardConfig};
pub use domain::{DataPoint, Dataset, Mode, RequestParameters, Series, WeatherMetric};
pub use error::{ErrorKind, FetchError};
pub use refresh::{GenerationGate, Outcome, RefreshState, Scheduler, Snapshot, Ticket, Trigger};
pub use sources::{SourceAdapter, SourceSet};
pub use stats::{SeriesStats, SummaryStats};
