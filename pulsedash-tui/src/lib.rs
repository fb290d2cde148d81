//! PulseDash TUI: terminal dashboard over the pulsedash-core refresh cycle.
//!
//! Provides:
//! - Mode tabs and parameter controls (coins, location, tickers, range)
//! - Stat cards and a per-entity change list
//! - A line chart of the current snapshot
//! - Error history and help overlays

pub mod app;
pub mod binding;
pub mod input;
pub mod theme;
pub mod ui;
pub mod worker;

pub use app::AppState;
pub use input::handle_key;
