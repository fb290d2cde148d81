//! Source adapters and the per-mode dispatch set.
//!
//! `SourceAdapter` abstracts over where a dataset comes from (CoinGecko,
//! Open-Meteo, the mock stock generator) so the refresh path never needs to
//! know, and tests can substitute their own adapters.

pub mod crypto;
pub mod http;
pub mod stock;
pub mod weather;

use std::time::Instant;

use tracing::{info, warn};

pub use crypto::CoinGeckoSource;
pub use stock::MockStockSource;
pub use weather::OpenMeteoSource;

use crate::config::DashboardConfig;
use crate::domain::{Dataset, Mode, RequestParameters};
use crate::error::FetchError;

/// Contract for a data source.
///
/// `fetch` must return within the HTTP timeout and never panic: every fault
/// becomes a `FetchError`.
pub trait SourceAdapter: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Mode this adapter serves.
    fn mode(&self) -> Mode;

    /// Produce a fresh dataset for the given parameters.
    fn fetch(&self, params: &RequestParameters) -> Result<Dataset, FetchError>;

    /// False while the provider is known to refuse requests.
    fn is_available(&self) -> bool {
        true
    }
}

/// One adapter per mode.
pub struct SourceSet {
    crypto: Box<dyn SourceAdapter>,
    weather: Box<dyn SourceAdapter>,
    stock: Box<dyn SourceAdapter>,
}

impl SourceSet {
    pub fn new(
        crypto: Box<dyn SourceAdapter>,
        weather: Box<dyn SourceAdapter>,
        stock: Box<dyn SourceAdapter>,
    ) -> Self {
        Self {
            crypto,
            weather,
            stock,
        }
    }

    /// The production adapters, wired from config.
    pub fn from_config(config: &DashboardConfig) -> Result<Self, FetchError> {
        Ok(Self::new(
            Box::new(CoinGeckoSource::new(&config.crypto, &config.http, &config.breaker)?),
            Box::new(OpenMeteoSource::new(&config.weather, &config.http, &config.breaker)?),
            Box::new(MockStockSource::new(&config.stock)),
        ))
    }

    pub fn adapter(&self, mode: Mode) -> &dyn SourceAdapter {
        match mode {
            Mode::Crypto => self.crypto.as_ref(),
            Mode::Weather => self.weather.as_ref(),
            Mode::Stock => self.stock.as_ref(),
        }
    }

    /// Validate the parameters and run the adapter for their mode.
    ///
    /// A dataset without a single point is reported as `EmptyResult`.
    pub fn fetch(&self, params: &RequestParameters) -> Result<Dataset, FetchError> {
        params.validate()?;
        let adapter = self.adapter(params.mode);
        info!(source = adapter.name(), request = %params.describe(), "fetch started");
        let started = Instant::now();

        let result = adapter.fetch(params).and_then(|dataset| {
            if dataset.point_count() == 0 {
                Err(FetchError::EmptyResult {
                    entity: params.entities().join(","),
                })
            } else {
                Ok(dataset)
            }
        });

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(ds) => info!(
                source = adapter.name(),
                series = ds.len(),
                points = ds.point_count(),
                elapsed_ms,
                "fetch completed"
            ),
            Err(e) => warn!(
                source = adapter.name(),
                kind = e.kind().label(),
                error = %e,
                elapsed_ms,
                "fetch failed"
            ),
        }
        result
    }
}
