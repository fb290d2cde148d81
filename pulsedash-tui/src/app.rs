//! Application state: single-owner, main-thread only.
//!
//! All TUI state lives here, including the refresh scheduler. The worker
//! thread communicates via channels; every fetch goes out as a scheduler
//! ticket and comes back tagged with its generation.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender};
use std::time::Instant;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use pulsedash_core::domain::{
    RequestParameters, MAX_DAYS, MAX_FORECAST_DAYS, MAX_POINTS, MAX_VOLATILITY, MIN_DAYS,
    MIN_POINTS,
};
use pulsedash_core::error::ErrorKind;
use pulsedash_core::refresh::{Outcome, Scheduler, Ticket, Trigger};
use pulsedash_core::Mode;

use crate::worker::{WorkerCommand, WorkerResponse};

/// Error history length.
pub const ERROR_HISTORY_CAP: usize = 50;

/// Step applied to the stock point count by `+` / `-`.
pub const POINTS_STEP: u32 = 5;

/// Step applied to the stock volatility by `[` / `]`.
pub const VOLATILITY_STEP: f64 = 0.5;

/// Status message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// An error record for the error history overlay.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub timestamp: NaiveDateTime,
    pub kind: ErrorKind,
    pub message: String,
    pub context: String,
}

/// Which overlay (if any) is shown on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    Help,
    ErrorHistory,
    EntityEditor,
}

/// Top-level application state.
pub struct AppState {
    pub running: bool,
    pub scheduler: Scheduler,

    // Worker communication
    pub worker_tx: Sender<WorkerCommand>,
    pub worker_rx: Receiver<WorkerResponse>,

    // Cross-cutting
    pub status_message: Option<(String, StatusLevel)>,
    pub error_history: VecDeque<ErrorRecord>,
    pub error_scroll: usize,
    pub overlay: Overlay,
    pub entity_input: String,
    /// The active mode's provider is refusing requests (circuit breaker open).
    pub provider_paused: bool,
}

impl AppState {
    pub fn new(
        scheduler: Scheduler,
        worker_tx: Sender<WorkerCommand>,
        worker_rx: Receiver<WorkerResponse>,
    ) -> Self {
        Self {
            running: true,
            scheduler,
            worker_tx,
            worker_rx,
            status_message: None,
            error_history: VecDeque::with_capacity(ERROR_HISTORY_CAP),
            error_scroll: 0,
            overlay: Overlay::None,
            entity_input: String::new(),
            provider_paused: false,
        }
    }

    pub fn params(&self) -> &RequestParameters {
        self.scheduler.params()
    }

    /// Initial load.
    pub fn start(&mut self, now: Instant) {
        let ticket = self.scheduler.start(now);
        self.dispatch(ticket);
    }

    /// Apply an edit to a copy of the parameters; a real change supersedes
    /// any in-flight fetch.
    pub fn update_params(&mut self, now: Instant, edit: impl FnOnce(&mut RequestParameters)) {
        let mut params = self.scheduler.params().clone();
        edit(&mut params);
        if let Some(ticket) = self.scheduler.set_parameters(params, now) {
            self.dispatch(ticket);
        }
    }

    /// Manual refresh; coalesced while a fetch is already running.
    pub fn refresh(&mut self, now: Instant) {
        match self.scheduler.request_refresh(Trigger::Manual, now) {
            Some(ticket) => self.dispatch(ticket),
            None => self.set_status("Refresh already in progress"),
        }
    }

    /// Fire the periodic timer if due.
    pub fn tick(&mut self, now: Instant) {
        if let Some(ticket) = self.scheduler.poll_timer(now) {
            self.dispatch(ticket);
        }
    }

    fn dispatch(&mut self, ticket: Ticket) {
        let status = format!("Loading {}...", ticket.params.describe());
        debug!(generation = ticket.generation, trigger = ticket.trigger.label(), "dispatching fetch");
        if self.worker_tx.send(WorkerCommand::Fetch(ticket)).is_err() {
            self.push_error(
                ErrorKind::Network,
                "background worker is not running".into(),
                String::new(),
            );
            return;
        }
        self.set_status(status);
    }

    pub fn handle_response(&mut self, resp: WorkerResponse, now: Instant) {
        match resp {
            WorkerResponse::Fetched {
                generation,
                result,
                fetched_at,
                provider_available,
            } => {
                let outcome = self.scheduler.complete(generation, result, now, fetched_at);
                if outcome != Outcome::Stale {
                    self.provider_paused = !provider_available;
                }
                match outcome {
                    Outcome::Applied => self.on_applied(),
                    Outcome::Failed => {
                        if let Some(err) = self.scheduler.last_error().cloned() {
                            let context = self.params().describe();
                            self.push_error(err.kind(), err.to_string(), context);
                        }
                    }
                    Outcome::Stale => {}
                }
            }
        }
    }

    fn on_applied(&mut self) {
        let Some(snapshot) = self.scheduler.snapshot() else {
            return;
        };
        let skipped = snapshot.dataset.skipped();
        if skipped.is_empty() {
            self.set_status(format!(
                "Updated {} ({} points)",
                snapshot.params.describe(),
                snapshot.dataset.point_count()
            ));
        } else {
            let names: Vec<&str> = skipped.iter().map(|s| s.entity.as_str()).collect();
            warn!(skipped = ?names, "partial dataset");
            self.set_warning(format!("Partial update: skipped {}", names.join(", ")));
        }
    }

    /// Push an error to the history, capping at 50.
    pub fn push_error(&mut self, kind: ErrorKind, message: String, context: String) {
        let record = ErrorRecord {
            timestamp: chrono::Local::now().naive_local(),
            kind,
            message: message.clone(),
            context,
        };
        self.error_history.push_front(record);
        if self.error_history.len() > ERROR_HISTORY_CAP {
            self.error_history.pop_back();
        }
        self.status_message = Some((message, StatusLevel::Error));
    }

    /// Set an info status message.
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    /// Set a warning status message.
    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }
}

// ─── Parameter edits ─────────────────────────────────────────────────

/// `+` / `-`: the look-back window, or the point count in stock mode.
/// Weather stops at the forecast horizon.
pub fn step_range(params: &mut RequestParameters, up: bool) {
    match params.mode {
        Mode::Crypto | Mode::Weather => {
            let max = if params.mode == Mode::Weather {
                MAX_FORECAST_DAYS
            } else {
                MAX_DAYS
            };
            params.days = if up {
                (params.days + 1).min(max)
            } else {
                params.days.saturating_sub(1).clamp(MIN_DAYS, max)
            };
        }
        Mode::Stock => {
            params.points = if up {
                (params.points + POINTS_STEP).min(MAX_POINTS)
            } else {
                params.points.saturating_sub(POINTS_STEP).max(MIN_POINTS)
            };
        }
    }
}

/// `[` / `]`: stock volatility, kept within `0..=MAX_VOLATILITY`.
pub fn step_volatility(params: &mut RequestParameters, up: bool) {
    let next = if up {
        params.volatility + VOLATILITY_STEP
    } else {
        params.volatility - VOLATILITY_STEP
    };
    params.volatility = next.clamp(0.0, MAX_VOLATILITY);
}

/// `n`: move to the next seed.
pub fn next_seed(params: &mut RequestParameters) {
    params.seed = params.seed.wrapping_add(1);
}
