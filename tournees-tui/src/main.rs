//! Terminal dashboard for tournees: pick a record source, filter its tours, and
//! inspect KPIs, charts, the tour table and a map of the routes.

mod app;
mod config;
mod input;
mod ui;

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration as StdDuration,
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use reqwest::Client;
use tournees_core::{
    model::{SourceId, SourceMeta},
    plugin::{SourcePlugin, SourceRegistry},
    service::DashboardService,
};
use tournees_provider_csv as csv_source;
use tournees_provider_supabase::{self as supabase, SupabaseSettings};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::{Config, SourceKind};
use crate::input::Action;

#[derive(Debug, Parser)]
#[command(name = "tournees", version, about = "Delivery tour dashboard")]
struct Args {
    /// TOML configuration file; defaults apply when it does not exist.
    #[arg(long, default_value = "tournees.toml")]
    config: PathBuf,

    /// Open this source directly instead of showing the source list.
    #[arg(long)]
    source: Option<String>,

    /// File receiving the logs, since the terminal is taken by the UI.
    #[arg(long, default_value = "tournees.log")]
    log_file: PathBuf,

    /// Supabase project URL, overriding the configuration file.
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    /// Supabase publishable key, overriding the configuration file.
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    supabase_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;
    tracing::info!("tournees v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_file_or_default(&args.config)?;
    if let Some(url) = args.supabase_url {
        config.supabase.url = url;
    }
    if let Some(key) = args.supabase_key {
        config.supabase.key = key;
    }

    // HTTP + service setup
    let client = Client::builder().user_agent("tournees/0.1").build()?;
    let registry = Arc::new(SourceRegistry::new(build_plugins(&config, &client)));
    let service = Arc::new(DashboardService::new(registry));

    // App state
    let mut app = App::new(service, config.map.fallback());
    let open_directly = match args.source.as_deref() {
        Some(wanted) => Some(
            app.select_source_by_id(wanted)
                .with_context(|| format!("unknown source \"{wanted}\""))?,
        ),
        None => None,
    };

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app, open_directly.is_some()).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn build_plugins(config: &Config, client: &Client) -> Vec<SourcePlugin> {
    let settings = SupabaseSettings {
        base_url: config.supabase.url.clone(),
        api_key: config.supabase.key.clone(),
    };

    config
        .sources
        .iter()
        .map(|source| {
            let meta = SourceMeta {
                id: SourceId(source.id.clone()),
                name: source.name.clone(),
            };
            match &source.kind {
                SourceKind::Supabase { table } => {
                    supabase::plugin(client.clone(), settings.clone(), table.clone(), meta)
                }
                SourceKind::Csv { path } => csv_source::plugin(meta, path.clone()),
            }
        })
        .collect()
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    refresh_first: bool,
) -> Result<()> {
    let mut pending = if refresh_first {
        Action::Refresh
    } else {
        Action::None
    };

    loop {
        match pending {
            Action::Quit => break,
            Action::None => {}
            Action::Refresh => {
                pending = Action::None;

                let Some(source) = app.selected_source.clone() else {
                    app.error_message = Some("Select a source first".into());
                    continue;
                };

                app.start_loading();
                terminal.draw(|frame| ui::draw(frame, &app))?;

                match app.service.refresh(&source).await {
                    Ok(dataset) => app.apply_dataset(dataset),
                    Err(err) => app.load_failed(&err),
                }
            }
        }

        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if event::poll(StdDuration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
        {
            pending = input::handle_key_event(key, &mut app);
        }
    }

    Ok(())
}
