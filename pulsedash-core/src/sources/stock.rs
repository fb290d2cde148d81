//! Seeded mock stock source.
//!
//! No network access. Each ticker gets a bounded random walk from its base
//! price, driven by an RNG derived from `(seed, ticker)`, one point per day
//! ending at the anchor date.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate, Utc};
use rand::Rng;
use tracing::debug;

use super::SourceAdapter;
use crate::config::StockConfig;
use crate::domain::{DataPoint, Dataset, Mode, RequestParameters, Series};
use crate::error::FetchError;
use crate::rng::SeedHierarchy;

/// Prices never fall below this fraction of the base price.
pub const PRICE_FLOOR_FRACTION: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct MockStockSource {
    base_prices: BTreeMap<String, f64>,
    default_base_price: f64,
    /// Last generated date; today (UTC) when unset.
    anchor: Option<NaiveDate>,
}

impl MockStockSource {
    pub fn new(config: &StockConfig) -> Self {
        Self {
            base_prices: config
                .base_prices
                .iter()
                .map(|(k, v)| (k.to_ascii_uppercase(), *v))
                .collect(),
            default_base_price: config.default_base_price,
            anchor: None,
        }
    }

    /// Pin the last generated date, making timestamps reproducible too.
    pub fn with_anchor(mut self, anchor: NaiveDate) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn base_price(&self, ticker: &str) -> f64 {
        self.base_prices
            .get(&ticker.to_ascii_uppercase())
            .copied()
            .unwrap_or(self.default_base_price)
    }

    fn generate(&self, ticker: &str, params: &RequestParameters, anchor: NaiveDate) -> Series {
        let mut rng = SeedHierarchy::new(params.seed).rng_for(ticker);
        let values = random_walk(self.base_price(ticker), params.points as usize, params.volatility, &mut rng);
        let n = values.len() as u64;
        let points = values
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| {
                let date = anchor.checked_sub_days(Days::new(n - 1 - i as u64))?;
                Some(DataPoint::new(date.and_hms_opt(0, 0, 0)?.and_utc(), v))
            })
            .collect();
        Series::canonicalize(ticker, ticker, "USD", points)
    }
}

impl SourceAdapter for MockStockSource {
    fn name(&self) -> &str {
        "mock-stock"
    }

    fn mode(&self) -> Mode {
        Mode::Stock
    }

    fn fetch(&self, params: &RequestParameters) -> Result<Dataset, FetchError> {
        let anchor = self.anchor.unwrap_or_else(|| Utc::now().date_naive());
        let mut dataset = Dataset::new(Mode::Stock);
        for ticker in &params.tickers {
            let series = self.generate(ticker, params, anchor);
            debug!(ticker = %ticker, points = series.len(), "mock series generated");
            dataset.insert(series);
        }
        Ok(dataset)
    }
}

/// Bounded random walk: `points` values starting at `base`, each step drawn
/// uniformly from `[-volatility, +volatility]`, floored at 1% of `base`.
pub fn random_walk<R: Rng>(base: f64, points: usize, volatility: f64, rng: &mut R) -> Vec<f64> {
    let floor = base * PRICE_FLOOR_FRACTION;
    let mut values = Vec::with_capacity(points);
    let mut price = base;
    for i in 0..points {
        if i > 0 {
            let step = if volatility > 0.0 {
                rng.gen_range(-volatility..=volatility)
            } else {
                0.0
            };
            price = (price + step).max(floor);
        }
        values.push(price);
    }
    values
}
