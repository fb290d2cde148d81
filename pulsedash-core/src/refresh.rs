//! Refresh scheduler: generation-tagged fetches and snapshot swaps.
//!
//! The scheduler is a plain state machine driven by the UI thread; it never
//! performs I/O itself. It hands out `Ticket`s describing what to fetch and
//! later receives the result via `complete`.
//!
//! ```text
//! Idle ──start/params──▶ Fetching ──ok──▶ Rendered ──timer──▶ Fetching
//!                            │
//!                            └──err──▶ Idle (previous snapshot kept)
//! ```
//!
//! Every ticket carries a generation number. Changing parameters always
//! issues a new generation, so a result for an older generation is
//! discarded (last-request-wins). A timer tick or manual refresh while a
//! fetch is in flight is coalesced into that fetch (single-flight).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{Dataset, RequestParameters};
use crate::error::FetchError;
use crate::stats::SummaryStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Fetching { generation: u64 },
    Rendered,
}

/// Why a fetch was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Initial,
    ParametersChanged,
    Timer,
    Manual,
}

impl Trigger {
    pub fn label(self) -> &'static str {
        match self {
            Trigger::Initial => "initial",
            Trigger::ParametersChanged => "parameters",
            Trigger::Timer => "timer",
            Trigger::Manual => "manual",
        }
    }
}

/// A fetch the caller must run and report back via `Scheduler::complete`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub generation: u64,
    pub params: RequestParameters,
    pub trigger: Trigger,
}

/// Dataset + stats from one successful fetch, swapped in as a unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub generation: u64,
    pub params: RequestParameters,
    pub dataset: Dataset,
    pub stats: SummaryStats,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(
        generation: u64,
        params: RequestParameters,
        dataset: Dataset,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let stats = SummaryStats::compute(&dataset);
        Self {
            generation,
            params,
            dataset,
            stats,
            fetched_at,
        }
    }
}

/// Result of handing a fetch result to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// New snapshot installed.
    Applied,
    /// Error recorded; previous snapshot kept.
    Failed,
    /// Result belonged to a superseded generation and was dropped.
    Stale,
}

/// Latest issued generation, shared with the worker thread so it can drop
/// queued tickets that are already superseded.
#[derive(Debug, Clone, Default)]
pub struct GenerationGate(Arc<AtomicU64>);

impl GenerationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    fn advance_to(&self, generation: u64) {
        self.0.store(generation, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct Scheduler {
    params: RequestParameters,
    interval: Duration,
    state: RefreshState,
    generation: u64,
    next_tick: Option<Instant>,
    snapshot: Option<Arc<Snapshot>>,
    last_error: Option<FetchError>,
    gate: GenerationGate,
}

impl Scheduler {
    pub fn new(params: RequestParameters, interval: Duration) -> Self {
        Self {
            params,
            interval,
            state: RefreshState::Idle,
            generation: 0,
            next_tick: None,
            snapshot: None,
            last_error: None,
            gate: GenerationGate::new(),
        }
    }

    /// Initial load.
    pub fn start(&mut self, now: Instant) -> Ticket {
        self.issue(Trigger::Initial, now)
    }

    /// Replace the parameters. Returns a ticket unless they are unchanged;
    /// any in-flight fetch becomes stale.
    pub fn set_parameters(&mut self, params: RequestParameters, now: Instant) -> Option<Ticket> {
        if params == self.params {
            return None;
        }
        self.params = params;
        Some(self.issue(Trigger::ParametersChanged, now))
    }

    /// Refresh with the current parameters. Coalesced (returns `None`) while
    /// a fetch is already in flight, since that fetch uses the same
    /// parameters.
    pub fn request_refresh(&mut self, trigger: Trigger, now: Instant) -> Option<Ticket> {
        if let RefreshState::Fetching { generation } = self.state {
            debug!(generation, trigger = trigger.label(), "refresh coalesced into in-flight fetch");
            return None;
        }
        Some(self.issue(trigger, now))
    }

    /// Fire the periodic timer if it is due. The timer is armed by each
    /// completion, so it never fires while a fetch is in flight.
    pub fn poll_timer(&mut self, now: Instant) -> Option<Ticket> {
        match self.next_tick {
            Some(due) if now >= due => self.request_refresh(Trigger::Timer, now),
            _ => None,
        }
    }

    /// Hand back the result for `generation`.
    pub fn complete(
        &mut self,
        generation: u64,
        result: Result<Dataset, FetchError>,
        now: Instant,
        fetched_at: DateTime<Utc>,
    ) -> Outcome {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                "stale result discarded"
            );
            return Outcome::Stale;
        }

        // Unarmed if the interval cannot be represented from `now`.
        self.next_tick = now.checked_add(self.interval);
        match result {
            Ok(dataset) => {
                info!(
                    generation,
                    series = dataset.len(),
                    points = dataset.point_count(),
                    "snapshot applied"
                );
                self.snapshot = Some(Arc::new(Snapshot::new(
                    generation,
                    self.params.clone(),
                    dataset,
                    fetched_at,
                )));
                self.last_error = None;
                self.state = RefreshState::Rendered;
                Outcome::Applied
            }
            Err(e) => {
                warn!(generation, error = %e, "refresh failed, keeping previous snapshot");
                self.last_error = Some(e);
                self.state = RefreshState::Idle;
                Outcome::Failed
            }
        }
    }

    fn issue(&mut self, trigger: Trigger, now: Instant) -> Ticket {
        self.generation += 1;
        self.gate.advance_to(self.generation);
        self.state = RefreshState::Fetching {
            generation: self.generation,
        };
        self.next_tick = None;
        debug!(
            generation = self.generation,
            trigger = trigger.label(),
            at = ?now,
            "fetch issued"
        );
        Ticket {
            generation: self.generation,
            params: self.params.clone(),
            trigger,
        }
    }

    pub fn params(&self) -> &RequestParameters {
        &self.params
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self.state, RefreshState::Fetching { .. })
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.clone()
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Time left until the timer fires; `None` while unarmed.
    pub fn time_until_refresh(&self, now: Instant) -> Option<Duration> {
        self.next_tick.map(|due| due.saturating_duration_since(now))
    }

    pub fn gate(&self) -> GenerationGate {
        self.gate.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataPoint, Mode, Series};
    use chrono::TimeZone;

    fn dataset(value: f64) -> Dataset {
        let mut ds = Dataset::new(Mode::Crypto);
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        ds.insert(Series::canonicalize("bitcoin", "Bitcoin", "USD", vec![DataPoint::new(ts, value)]));
        ds
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(RequestParameters::default(), Duration::from_secs(300))
    }

    #[test]
    fn start_issues_generation_one() {
        let mut s = scheduler();
        let now = Instant::now();
        let t = s.start(now);
        assert_eq!(t.generation, 1);
        assert_eq!(t.trigger, Trigger::Initial);
        assert_eq!(s.state(), RefreshState::Fetching { generation: 1 });
        assert!(s.gate().is_current(1));
    }

    #[test]
    fn unchanged_parameters_issue_nothing() {
        let mut s = scheduler();
        let now = Instant::now();
        s.start(now);
        assert!(s.set_parameters(RequestParameters::default(), now).is_none());
        assert_eq!(s.generation(), 1);
    }

    #[test]
    fn refresh_while_fetching_is_coalesced() {
        let mut s = scheduler();
        let now = Instant::now();
        s.start(now);
        assert!(s.request_refresh(Trigger::Manual, now).is_none());
        s.complete(1, Ok(dataset(1.0)), now, Utc::now());
        let t = s.request_refresh(Trigger::Manual, now).unwrap();
        assert_eq!(t.generation, 2);
    }

    #[test]
    fn only_latest_generation_applies() {
        let mut s = scheduler();
        let now = Instant::now();
        let first = s.start(now);
        let mut p = RequestParameters::default();
        p.days = 14;
        let second = s.set_parameters(p.clone(), now).unwrap();
        p.days = 30;
        let third = s.set_parameters(p, now).unwrap();
        assert!(!s.gate().is_current(second.generation));

        // Completion order is arbitrary; only `third` may land.
        assert_eq!(s.complete(second.generation, Ok(dataset(2.0)), now, Utc::now()), Outcome::Stale);
        assert_eq!(s.complete(third.generation, Ok(dataset(3.0)), now, Utc::now()), Outcome::Applied);
        assert_eq!(s.complete(first.generation, Ok(dataset(1.0)), now, Utc::now()), Outcome::Stale);

        let snap = s.snapshot().unwrap();
        assert_eq!(snap.generation, third.generation);
        assert_eq!(snap.params.days, 30);
        assert_eq!(snap.stats.get("bitcoin").unwrap().latest, Some(3.0));
    }

    #[test]
    fn failure_keeps_previous_snapshot() {
        let mut s = scheduler();
        let now = Instant::now();
        s.start(now);
        s.complete(1, Ok(dataset(5.0)), now, Utc::now());
        let before = s.snapshot().unwrap();

        let t = s.request_refresh(Trigger::Manual, now).unwrap();
        let outcome = s.complete(t.generation, Err(FetchError::Network("down".into())), now, Utc::now());
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(s.state(), RefreshState::Idle);
        assert!(Arc::ptr_eq(&before, &s.snapshot().unwrap()));
        assert_eq!(s.last_error(), Some(&FetchError::Network("down".into())));

        // The next success clears the error.
        let t = s.request_refresh(Trigger::Manual, now).unwrap();
        s.complete(t.generation, Ok(dataset(6.0)), now, Utc::now());
        assert!(s.last_error().is_none());
    }

    #[test]
    fn timer_arms_after_completion() {
        let mut s = scheduler();
        let now = Instant::now();
        s.start(now);
        assert!(s.poll_timer(now + Duration::from_secs(600)).is_none());

        s.complete(1, Ok(dataset(1.0)), now, Utc::now());
        assert!(s.poll_timer(now + Duration::from_secs(299)).is_none());
        assert_eq!(s.time_until_refresh(now), Some(Duration::from_secs(300)));

        let t = s.poll_timer(now + Duration::from_secs(300)).unwrap();
        assert_eq!(t.trigger, Trigger::Timer);
        assert!(s.time_until_refresh(now).is_none());
    }

    #[test]
    fn timer_retries_after_failure() {
        let mut s = scheduler();
        let now = Instant::now();
        s.start(now);
        s.complete(1, Err(FetchError::Schema("bad".into())), now, Utc::now());
        assert!(s.snapshot().is_none());
        assert!(s.poll_timer(now + Duration::from_secs(300)).is_some());
    }

    #[test]
    fn oversized_interval_leaves_timer_unarmed() {
        let now = Instant::now();
        let mut s = Scheduler::new(RequestParameters::default(), Duration::MAX);
        let t = s.start(now);
        assert_eq!(s.complete(t.generation, Ok(dataset(1.0)), now, Utc::now()), Outcome::Applied);
        assert_eq!(s.time_until_refresh(now), None);
        assert!(s.poll_timer(now).is_none());
        // Manual refresh still works.
        assert!(s.request_refresh(Trigger::Manual, now).is_some());
    }
}
