//! End-to-end refresh cycles without the network.
//!
//! Tests:
//! 1. A CoinGecko payload flows through parsing, the scheduler and the stats
//! 2. Mock stocks with a fixed seed are reproducible across runs
//! 3. Overlapping parameter changes resolve to the newest request
//! 4. A failing source leaves the previous snapshot in place
//! 5. Partial crypto success keeps the coins that worked

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use pulsedash_core::config::StockConfig;
use pulsedash_core::domain::{Dataset, Mode, RequestParameters, Series};
use pulsedash_core::error::{ErrorKind, FetchError};
use pulsedash_core::refresh::{Outcome, RefreshState, Scheduler, Trigger};
use pulsedash_core::sources::crypto::{collect_coins, parse_market_chart};
use pulsedash_core::sources::{MockStockSource, SourceAdapter, SourceSet};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

const BITCOIN_CHART: &str = r#"{
    "prices": [[1704067200000, 100.0], [1704070800000, 110.0]],
    "market_caps": [[1704067200000, 1.0], [1704070800000, 1.0]],
    "total_volumes": [[1704067200000, 1.0], [1704070800000, 1.0]]
}"#;

/// Crypto source backed by canned bodies instead of HTTP.
struct CannedCrypto {
    bodies: Vec<(&'static str, Result<&'static str, FetchError>)>,
    calls: AtomicUsize,
}

impl CannedCrypto {
    fn new(bodies: Vec<(&'static str, Result<&'static str, FetchError>)>) -> Self {
        Self {
            bodies,
            calls: AtomicUsize::new(0),
        }
    }
}

impl SourceAdapter for CannedCrypto {
    fn name(&self) -> &str {
        "canned-crypto"
    }

    fn mode(&self) -> Mode {
        Mode::Crypto
    }

    fn fetch(&self, params: &RequestParameters) -> Result<Dataset, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let results: Vec<(&str, Result<Series, FetchError>)> = params
            .coins
            .iter()
            .map(|coin| {
                let body = self
                    .bodies
                    .iter()
                    .find(|(id, _)| id == coin)
                    .map(|(_, b)| b.clone())
                    .unwrap_or(Err(FetchError::HttpStatus {
                        status: 404,
                        url: coin.clone(),
                    }));
                (coin.as_str(), body.and_then(|b| parse_market_chart(coin, "usd", b)))
            })
            .collect();
        collect_coins(results)
    }
}

/// Weather source whose next answer is set by the test.
struct Scripted {
    next: Mutex<Result<(), FetchError>>,
}

impl SourceAdapter for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn mode(&self) -> Mode {
        Mode::Weather
    }

    fn fetch(&self, _: &RequestParameters) -> Result<Dataset, FetchError> {
        self.next.lock().unwrap().clone().map(|()| Dataset::new(Mode::Weather))
    }
}

fn stock_source() -> MockStockSource {
    MockStockSource::new(&StockConfig::default()).with_anchor(NaiveDate::from_ymd_opt(2024, 6, 28).unwrap())
}

fn sources(crypto: CannedCrypto) -> SourceSet {
    SourceSet::new(
        Box::new(crypto),
        Box::new(Scripted {
            next: Mutex::new(Ok(())),
        }),
        Box::new(stock_source()),
    )
}

fn run_ticket(scheduler: &mut Scheduler, sources: &SourceSet, ticket: pulsedash_core::Ticket) -> Outcome {
    let result = sources.fetch(&ticket.params);
    scheduler.complete(ticket.generation, result, Instant::now(), Utc::now())
}

// ──────────────────────────────────────────────
// 1. Crypto end to end
// ──────────────────────────────────────────────

#[test]
fn bitcoin_two_points_to_stats() {
    let sources = sources(CannedCrypto::new(vec![("bitcoin", Ok(BITCOIN_CHART))]));
    let params = RequestParameters {
        coins: vec!["bitcoin".into()],
        ..RequestParameters::default()
    };
    let mut scheduler = Scheduler::new(params, Duration::from_secs(300));
    let ticket = scheduler.start(Instant::now());
    assert_eq!(run_ticket(&mut scheduler, &sources, ticket), Outcome::Applied);
    assert_eq!(scheduler.state(), RefreshState::Rendered);

    let snap = scheduler.snapshot().unwrap();
    let btc = snap.stats.get("bitcoin").unwrap();
    assert_eq!(btc.latest, Some(110.0));
    assert_eq!(btc.first, Some(100.0));
    assert!((btc.pct_change.unwrap() - 10.0).abs() < 1e-12);
    assert_eq!(btc.mean, Some(105.0));
    assert_eq!(btc.min, Some(100.0));
    assert_eq!(btc.max, Some(110.0));
    assert_eq!(btc.unit, "USD");
    assert!(snap.stats.aggregate.is_none());
}

// ──────────────────────────────────────────────
// 2. Stock determinism
// ──────────────────────────────────────────────

#[test]
fn stock_seed_42_five_points_is_reproducible() {
    let params = RequestParameters {
        mode: Mode::Stock,
        tickers: vec!["AAPL".into()],
        seed: 42,
        points: 5,
        ..RequestParameters::default()
    };
    let source = stock_source();
    let a = source.fetch(&params).unwrap();
    let b = stock_source().fetch(&params).unwrap();
    assert_eq!(a, b);

    let values = a.get("AAPL").unwrap().values();
    assert_eq!(values.len(), 5);
    assert_eq!(values[0], 180.0);
    assert!(values.windows(2).all(|w| (w[1] - w[0]).abs() <= params.volatility));

    let other_seed = RequestParameters { seed: 43, ..params };
    assert_ne!(source.fetch(&other_seed).unwrap().get("AAPL").unwrap().values(), values);
}

// ──────────────────────────────────────────────
// 3. Last request wins
// ──────────────────────────────────────────────

#[test]
fn two_changes_before_completion_apply_only_the_latest() {
    let sources = sources(CannedCrypto::new(vec![("bitcoin", Ok(BITCOIN_CHART))]));
    let now = Instant::now();
    let mut scheduler = Scheduler::new(RequestParameters::default(), Duration::from_secs(300));
    let initial = scheduler.start(now);

    let mut stocks = scheduler.params().clone();
    stocks.mode = Mode::Stock;
    let to_stocks = scheduler.set_parameters(stocks.clone(), now).unwrap();
    let mut reseeded = stocks;
    reseeded.seed = 7;
    let to_reseeded = scheduler.set_parameters(reseeded, now).unwrap();

    // Results arrive newest first, then the superseded ones.
    assert_eq!(run_ticket(&mut scheduler, &sources, to_reseeded.clone()), Outcome::Applied);
    assert_eq!(run_ticket(&mut scheduler, &sources, to_stocks), Outcome::Stale);
    assert_eq!(run_ticket(&mut scheduler, &sources, initial), Outcome::Stale);

    let snap = scheduler.snapshot().unwrap();
    assert_eq!(snap.generation, to_reseeded.generation);
    assert_eq!(snap.params.seed, 7);
    assert_eq!(snap.dataset.mode(), Mode::Stock);
}

// ──────────────────────────────────────────────
// 4. Failure keeps the snapshot
// ──────────────────────────────────────────────

#[test]
fn failed_refresh_keeps_previous_snapshot_and_reports() {
    let crypto = CannedCrypto::new(vec![("bitcoin", Ok(BITCOIN_CHART))]);
    let sources = sources(crypto);
    let params = RequestParameters {
        coins: vec!["bitcoin".into()],
        ..RequestParameters::default()
    };
    let now = Instant::now();
    let mut scheduler = Scheduler::new(params.clone(), Duration::from_secs(300));
    let t = scheduler.start(now);
    run_ticket(&mut scheduler, &sources, t);
    let before = scheduler.snapshot().unwrap();

    let broken = RequestParameters {
        coins: vec!["not-a-coin".into()],
        ..params
    };
    let t = scheduler.set_parameters(broken, now).unwrap();
    assert_eq!(run_ticket(&mut scheduler, &sources, t), Outcome::Failed);

    assert!(Arc::ptr_eq(&before, &scheduler.snapshot().unwrap()));
    let err = scheduler.last_error().unwrap();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(matches!(err, FetchError::HttpStatus { status: 404, .. }));

    // Next timer tick retries with the same (broken) parameters.
    let retry = scheduler.poll_timer(now + Duration::from_secs(300)).unwrap();
    assert_eq!(retry.trigger, Trigger::Timer);
}

#[test]
fn empty_weather_dataset_is_reported_as_empty_result() {
    let sources = sources(CannedCrypto::new(vec![]));
    let params = RequestParameters {
        mode: Mode::Weather,
        ..RequestParameters::default()
    };
    let mut scheduler = Scheduler::new(params, Duration::from_secs(300));
    let t = scheduler.start(Instant::now());
    assert_eq!(run_ticket(&mut scheduler, &sources, t), Outcome::Failed);
    assert_eq!(scheduler.last_error().unwrap().kind(), ErrorKind::EmptyResult);
}

// ──────────────────────────────────────────────
// 5. Partial crypto success
// ──────────────────────────────────────────────

#[test]
fn failing_coin_is_skipped_not_fatal() {
    let sources = sources(CannedCrypto::new(vec![
        ("bitcoin", Ok(BITCOIN_CHART)),
        ("ethereum", Err(FetchError::RateLimited { retry_after_secs: 60 })),
        ("cardano", Ok(r#"{"prices": []}"#)),
    ]));
    let ds = sources.fetch(&RequestParameters::default()).unwrap();
    assert_eq!(ds.entity_ids(), vec!["bitcoin"]);
    let skipped: Vec<&str> = ds.skipped().iter().map(|s| s.entity.as_str()).collect();
    assert_eq!(skipped, vec!["ethereum", "cardano"]);
}
