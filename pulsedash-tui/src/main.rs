//! PulseDash: terminal dashboard for crypto prices, weather forecasts and
//! mock stock quotes.
//!
//! Screen layout:
//! 1. Mode tabs and parameter line
//! 2. Stat cards
//! 3. Line chart and per-entity change list
//! 4. Status bar and footer (last update, next refresh)

use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use pulsedash_core::domain::{MAX_DAYS, MIN_DAYS};
use pulsedash_core::{DashboardConfig, Mode, RequestParameters, Scheduler, SourceSet};
use pulsedash_tui::worker::{self, WorkerCommand};
use pulsedash_tui::{input, ui, AppState};

#[derive(Parser)]
#[command(name = "pulsedash", version, about = "Crypto, weather and stock dashboard")]
struct Cli {
    /// Config file (defaults to <config dir>/pulsedash/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial data source: crypto, weather or stock
    #[arg(short, long)]
    mode: Option<Mode>,

    /// Comma-separated coins, location or tickers for the initial mode
    #[arg(short, long)]
    entity: Option<String>,

    /// Look-back / forecast window in days
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(MIN_DAYS as i64..=MAX_DAYS as i64))]
    days: Option<u32>,

    /// Seed for the mock stock generator
    #[arg(long)]
    seed: Option<u64>,

    /// Log file (defaults to <data dir>/pulsedash/pulsedash.log)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Fetch once, print the snapshot as JSON and exit
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(&cli)?;

    let config = DashboardConfig::load(cli.config.as_deref()).context("failed to load config")?;
    let params = initial_parameters(&config, &cli)?;
    let sources = SourceSet::from_config(&config).context("failed to build data sources")?;
    let scheduler = Scheduler::new(params, config.refresh_interval());

    if cli.once {
        return run_once(scheduler, &sources);
    }

    // Install a panic hook that restores the terminal before printing the panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    // Worker channels
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();

    let worker_handle = worker::spawn_worker(sources, scheduler.gate(), cmd_rx, resp_tx)
        .context("failed to spawn worker thread")?;

    let mut app = AppState::new(scheduler, cmd_tx.clone(), resp_rx);
    app.start(Instant::now());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app);

    // Shutdown worker
    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    let _ = worker_handle.join();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("pulsedash exited");
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    loop {
        // 1. Render
        terminal.draw(|f| ui::draw(f, app))?;

        // 2. Drain worker responses (non-blocking)
        while let Ok(resp) = app.worker_rx.try_recv() {
            app.handle_response(resp, Instant::now());
        }

        // 3. Poll for input events (50ms timeout for ~20 FPS tick)
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                input::handle_key(app, key);
            }
        }

        // 4. Timer-driven refresh
        app.tick(Instant::now());

        if !app.running {
            break;
        }
    }
    Ok(())
}

/// Single synchronous refresh cycle; the snapshot goes to stdout as JSON.
fn run_once(mut scheduler: Scheduler, sources: &SourceSet) -> Result<()> {
    let ticket = scheduler.start(Instant::now());
    let result = sources.fetch(&ticket.params);
    scheduler.complete(ticket.generation, result, Instant::now(), Utc::now());

    if let Some(err) = scheduler.last_error() {
        bail!("refresh failed: {err}");
    }
    let snapshot = scheduler
        .snapshot()
        .context("refresh produced no snapshot")?;
    println!("{}", serde_json::to_string_pretty(&*snapshot)?);
    Ok(())
}

fn initial_parameters(config: &DashboardConfig, cli: &Cli) -> Result<RequestParameters> {
    let mut params = config.initial_parameters();
    if let Some(mode) = cli.mode {
        params.mode = mode;
    }
    if let Some(entity) = &cli.entity {
        if !params.set_entities(entity) {
            bail!("--entity must name at least one {}", params.mode.key());
        }
    }
    if let Some(days) = cli.days {
        params.days = days;
    }
    if let Some(seed) = cli.seed {
        params.seed = seed;
    }
    Ok(params)
}

/// The TUI owns the terminal, so logs go to a file unless `--once` is set.
/// `RUST_LOG` overrides the default `info` filter.
fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if cli.once {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
        return Ok(None);
    }

    let path = match &cli.log_file {
        Some(p) => p.clone(),
        None => dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pulsedash")
            .join("pulsedash.log"),
    };
    let dir = path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("pulsedash.log"));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}
