use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ratatui::Terminal;
use ratatui::crossterm::event;
use ratatui::crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::CrosstermBackend;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use readlist_core::config_file::{self, ConfigFile, DisplayConfig};
use readlist_core::{Config, FavoritesStore, FetchScheduler};

mod action;
mod app;
mod input;
mod logging;
mod model;
mod persistence;
mod theme;
mod view;

use app::App;

/// Frames per second when the config file does not set one.
const DEFAULT_FPS: u32 = 10;

/// readlist: browse a book catalog by genre from the terminal.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Catalog JSON file (defaults to the bundled catalog)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Directory for persisted favorites
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Color theme: hacker (default) or modern
    #[arg(long)]
    theme: Option<String>,

    /// Books per fetch; 0 shows every match
    #[arg(long)]
    page_size: Option<usize>,

    /// Answer catalog requests without simulated latency
    #[arg(long)]
    no_latency: bool,

    /// Log file (default: <cache dir>/readlist/readlist.log)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write the resolved settings to the config file and exit
    #[arg(long)]
    save_config: bool,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Resolve runtime config from CLI flags > env vars > config file > defaults.
fn resolve_config(args: &Args, file_cfg: &ConfigFile) -> Config {
    let mut config = Config::default();
    config.apply_file(file_cfg);

    if let Some(path) = args
        .data
        .clone()
        .or_else(|| env_var("READLIST_DATA").map(PathBuf::from))
    {
        config.data_path = Some(path);
    }
    if let Some(dir) = args
        .storage_dir
        .clone()
        .or_else(|| env_var("READLIST_STORAGE_DIR").map(PathBuf::from))
    {
        config.storage_dir = Some(dir);
    }
    if let Some(size) = args.page_size.or_else(|| {
        env_var("READLIST_PAGE_SIZE").and_then(|v| v.parse().ok())
    }) {
        config.page_size = (size > 0).then_some(size);
    }
    if args.no_latency {
        config.max_latency = Duration::ZERO;
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let _log_guard = logging::init(
        args.log_file
            .clone()
            .or_else(|| env_var("READLIST_LOG").map(PathBuf::from)),
    );

    let file_cfg = config_file::load_config();
    let config = resolve_config(&args, &file_cfg);
    tracing::info!(
        data = ?config.data_path,
        page_size = ?config.page_size,
        debounce_ms = config.debounce.as_millis() as u64,
        max_latency_ms = config.max_latency.as_millis() as u64,
        "starting readlist"
    );

    // Select theme
    let display = file_cfg.display.unwrap_or_default();
    let theme_name = args
        .theme
        .clone()
        .or_else(|| env_var("READLIST_THEME"))
        .or(display.theme)
        .unwrap_or_else(|| "hacker".to_string());
    let fps = display.fps.unwrap_or(DEFAULT_FPS).clamp(1, 60);

    if args.save_config {
        let path = config
            .save(DisplayConfig {
                theme: Some(theme_name),
                fps: Some(fps),
            })
            .context("failed to save config")?;
        println!("Saved config to {}", path.display());
        return Ok(());
    }

    let catalog =
        readlist_core::open_catalog(&config).with_context(|| match &config.data_path {
            Some(path) => format!("failed to load catalog from {}", path.display()),
            None => "bundled catalog is invalid".to_string(),
        })?;
    let catalog = Arc::new(catalog);
    let storage = persistence::open_storage(config.resolved_storage_dir().as_deref());
    let favorites = FavoritesStore::hydrate(storage);
    let theme = theme::Theme::from_name(&theme_name);

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    // Install panic hook that restores terminal before printing panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Drain any stray input events (e.g. Enter keypress from launching the command)
    while event::poll(Duration::from_millis(50)).unwrap_or(false) {
        let _ = event::read();
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let scheduler = FetchScheduler::spawn(catalog, config.debounce, event_tx);

    let mut app = App::new(&config, theme, favorites);
    app.fetch = Some(scheduler.handle());
    if let Ok(size) = terminal.size() {
        app.update(action::Action::Resize(size.width, size.height));
    }
    app.start();

    // Also handle Ctrl+C at the OS level for clean shutdown
    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_for_signal.cancel();
        }
    });

    // Main event loop
    let tick_rate = Duration::from_millis(1000 / u64::from(fps));

    loop {
        terminal.draw(|f| app.view(f))?;

        tokio::select! {
            // Catalog events (non-blocking drain)
            maybe_event = event_rx.recv() => {
                if let Some(catalog_event) = maybe_event {
                    app.handle_catalog_event(catalog_event);
                    while let Ok(evt) = event_rx.try_recv() {
                        app.handle_catalog_event(evt);
                    }
                }
            }
            // Terminal input events
            _ = async {
                if event::poll(tick_rate).unwrap_or(false)
                    && let Ok(evt) = event::read()
                {
                    let action = input::map_event(&evt, &app.input_mode);
                    app.update(action);
                }
            } => {}
        }

        app.update(action::Action::Tick);

        if app.should_quit || cancel.is_cancelled() {
            break;
        }
    }

    scheduler.shutdown();
    tracing::info!(reading = app.favorites.len(), "exiting readlist");

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;

    Ok(())
}
