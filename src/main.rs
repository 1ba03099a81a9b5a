mod app;
mod config;
mod theme;
mod ui;
mod verse;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::App;
use config::AppConfig;
use verse::VerseClient;

#[derive(Parser, Debug)]
#[command(name = "versecard")]
#[command(version)]
#[command(about = "A terminal card that shows a random scripture verse and keeps it fresh")]
struct Args {
    /// Fetch a single verse, print it and exit
    #[arg(long)]
    once: bool,

    /// Print the verse as JSON (with --once)
    #[arg(long, requires = "once")]
    json: bool,

    /// Seconds between automatic refreshes
    #[arg(short, long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=config::MAX_REFRESH_INTERVAL_SECS))]
    interval: Option<u64>,

    /// Start with auto-refresh turned off
    #[arg(long)]
    no_auto_refresh: bool,

    /// Base URL of the verse service
    #[arg(long, value_name = "URL")]
    api_base: Option<String>,

    /// Config file to use instead of the default location
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the effective config to the config file and exit
    #[arg(long)]
    init_config: bool,
}

impl Args {
    /// CLI flags win over the config file
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(secs) = self.interval {
            config.refresh_interval_secs = secs;
        }
        if self.no_auto_refresh {
            config.auto_refresh = false;
        }
        if let Some(ref base) = self.api_base {
            config.api_base = base.clone();
        }
    }

    fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => AppConfig::config_path(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load()?,
    };
    args.apply_overrides(&mut config);

    if args.init_config {
        let path = args.config_path()?;
        config.save_to(&path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    if args.once {
        return print_verse(&config, args.json).await;
    }

    run_tui(config).await
}

/// Log to a file under the cache dir so output never lands on the TUI
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("versecard=info"));
    let registry = tracing_subscriber::registry().with(filter);

    match open_log_file() {
        Some(file) => registry
            .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .init(),
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init(),
    }
}

fn open_log_file() -> Option<File> {
    let dir = dirs::cache_dir()?.join("versecard");
    std::fs::create_dir_all(&dir).ok()?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("versecard.log"))
        .ok()
}

async fn print_verse(config: &AppConfig, json: bool) -> Result<()> {
    let client = VerseClient::new(&config.api_base, config.request_timeout())?;

    let verse = match client.fetch_random().await {
        Ok(verse) => verse,
        Err(e) => {
            tracing::error!("Error fetching verse: {}", e);
            anyhow::bail!(e.user_message());
        }
    };

    if json {
        println!("{}", serde_json::to_string(&verse)?);
    } else {
        println!("\"{}\"", verse.display_text());
        println!("— {}", verse.reference);
        println!("{}", verse.translation_name);
    }
    Ok(())
}

async fn run_tui(config: AppConfig) -> Result<()> {
    let client = VerseClient::new(&config.api_base, config.request_timeout())?;
    let mut app = App::new(config, client);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    app.start();

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        // Apply finished fetches and refresh ticks
        app.tick();

        if app.should_quit {
            tracing::info!("Exiting");
            return Ok(());
        }
    }
}
