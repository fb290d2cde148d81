//! CoinGecko market-chart source.
//!
//! One request per coin against `/coins/{id}/market_chart`. Coins are fetched
//! concurrently on a small private rayon pool; a coin that fails is recorded
//! as skipped and the rest of the dataset is kept.

use chrono::DateTime;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{info, warn};

use super::http::{decode_json, HttpClient};
use super::SourceAdapter;
use crate::config::{BreakerConfig, CryptoConfig, HttpConfig};
use crate::domain::{DataPoint, Dataset, Mode, RequestParameters, Series};
use crate::error::FetchError;

/// `market_chart` payload. Only `prices` is used; `market_caps` and
/// `total_volumes` are ignored.
#[derive(Debug, Deserialize)]
pub struct MarketChartResponse {
    pub prices: Vec<(f64, Option<f64>)>,
}

pub struct CoinGeckoSource {
    http: HttpClient,
    base_url: String,
    vs_currency: String,
    pool: rayon::ThreadPool,
}

impl CoinGeckoSource {
    pub fn new(
        config: &CryptoConfig,
        http: &HttpConfig,
        breaker: &BreakerConfig,
    ) -> Result<Self, FetchError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_parallel.max(1))
            .thread_name(|i| format!("coingecko-{i}"))
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build fetch pool: {e}")))?;
        Ok(Self {
            http: HttpClient::with_breaker_config(http, breaker)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            vs_currency: config.vs_currency.to_ascii_lowercase(),
            pool,
        })
    }

    fn chart_url(&self, coin: &str) -> String {
        format!("{}/coins/{coin}/market_chart", self.base_url)
    }

    fn fetch_coin(&self, coin: &str, days: u32) -> Result<Series, FetchError> {
        let url = self.chart_url(coin);
        let query = [
            ("vs_currency", self.vs_currency.clone()),
            ("days", days.to_string()),
        ];
        let body = self.http.get_text(&url, &query)?;
        parse_market_chart(coin, &self.vs_currency, &body)
    }
}

impl SourceAdapter for CoinGeckoSource {
    fn name(&self) -> &str {
        "coingecko"
    }

    fn mode(&self) -> Mode {
        Mode::Crypto
    }

    fn fetch(&self, params: &RequestParameters) -> Result<Dataset, FetchError> {
        let days = params.days;
        let results: Vec<(&str, Result<Series, FetchError>)> = self.pool.install(|| {
            params
                .coins
                .par_iter()
                .map(|coin| (coin.as_str(), self.fetch_coin(coin, days)))
                .collect()
        });

        let dataset = collect_coins(results)?;
        info!(
            coins = dataset.len(),
            skipped = dataset.skipped().len(),
            "crypto dataset built"
        );
        Ok(dataset)
    }

    fn is_available(&self) -> bool {
        self.http.breaker().is_allowed()
    }
}

/// Fold per-coin results, in request order, into one dataset.
///
/// Failed coins are recorded as skipped. Only when no coin produced a series
/// is the first failure returned; with no failures at all the empty dataset
/// is passed on for the caller to judge.
pub fn collect_coins<'a, I>(results: I) -> Result<Dataset, FetchError>
where
    I: IntoIterator<Item = (&'a str, Result<Series, FetchError>)>,
{
    let mut dataset = Dataset::new(Mode::Crypto);
    let mut first_error = None;
    for (coin, result) in results {
        match result {
            Ok(series) => dataset.insert(series),
            Err(e) => {
                warn!(coin, error = %e, "coin skipped");
                dataset.skip(coin, e.to_string());
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) if dataset.is_empty() => Err(e),
        _ => Ok(dataset),
    }
}

/// Decode a `market_chart` body into a series for `coin`.
///
/// Rows with a null price are dropped. Display name is the capitalized coin
/// id and the unit is the upper-cased quote currency.
pub fn parse_market_chart(coin: &str, vs_currency: &str, body: &str) -> Result<Series, FetchError> {
    let resp: MarketChartResponse = decode_json(body, &format!("market_chart for {coin}"))?;
    if resp.prices.is_empty() {
        return Err(FetchError::EmptyResult {
            entity: coin.to_string(),
        });
    }

    let mut points = Vec::with_capacity(resp.prices.len());
    for (ms, price) in resp.prices {
        let Some(price) = price else { continue };
        let ts = DateTime::from_timestamp_millis(ms as i64)
            .ok_or_else(|| FetchError::Schema(format!("invalid timestamp {ms} for {coin}")))?;
        points.push(DataPoint::new(ts, price));
    }

    let series = Series::canonicalize(
        coin,
        display_name(coin),
        vs_currency.to_ascii_uppercase(),
        points,
    );
    if series.is_empty() {
        return Err(FetchError::EmptyResult {
            entity: coin.to_string(),
        });
    }
    Ok(series)
}

/// `bitcoin` → `Bitcoin`, `usd-coin` → `Usd-coin`.
fn display_name(coin: &str) -> String {
    let mut chars = coin.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
