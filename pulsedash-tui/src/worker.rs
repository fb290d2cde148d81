//! Background worker thread: all network I/O runs here.
//!
//! Communication with the TUI main thread is via `mpsc` channels. The worker
//! reads the shared generation gate before each fetch and drops tickets that
//! a newer parameter change has already superseded.

use std::io;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use pulsedash_core::domain::Dataset;
use pulsedash_core::error::FetchError;
use pulsedash_core::refresh::{GenerationGate, Ticket};
use pulsedash_core::sources::SourceSet;

/// Commands sent from the TUI to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    Fetch(Ticket),
    Shutdown,
}

/// Responses sent from the worker back to the TUI.
#[derive(Debug, Clone)]
pub enum WorkerResponse {
    Fetched {
        generation: u64,
        result: Result<Dataset, FetchError>,
        fetched_at: DateTime<Utc>,
        /// False while the provider's circuit breaker refuses requests.
        provider_available: bool,
    },
}

/// Spawn the background worker thread.
pub fn spawn_worker(
    sources: SourceSet,
    gate: GenerationGate,
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("pulsedash-worker".into())
        .spawn(move || worker_loop(&sources, &gate, rx, tx))
}

fn worker_loop(
    sources: &SourceSet,
    gate: &GenerationGate,
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
) {
    while let Ok(cmd) = rx.recv() {
        match cmd {
            WorkerCommand::Shutdown => break,
            WorkerCommand::Fetch(ticket) => {
                if !gate.is_current(ticket.generation) {
                    debug!(
                        generation = ticket.generation,
                        current = gate.current(),
                        "superseded ticket skipped"
                    );
                    continue;
                }
                let result = sources.fetch(&ticket.params);
                let resp = WorkerResponse::Fetched {
                    generation: ticket.generation,
                    result,
                    fetched_at: Utc::now(),
                    provider_available: sources.adapter(ticket.params.mode).is_available(),
                };
                if tx.send(resp).is_err() {
                    break;
                }
            }
        }
    }
    info!("worker stopped");
}
