use plw::app::AppState;
use plw::cli::{self, Cli};
use plw::client::graphql::GraphqlClient;
use plw::config::{self, ConfigFile};
use plw::events::{AppEvent, EventHandler};
use plw::scheduler::PollScheduler;
use plw::tui;
use plw::view::PollPolicy;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, SetTitle};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::sync::Arc;
use std::time::Duration;

fn setup_verbose_logging() -> Result<()> {
    let state_dir = dirs_next_or_fallback();
    std::fs::create_dir_all(&state_dir)
        .map_err(|e| eyre!("Failed to create log directory {state_dir:?}: {e}"))?;
    let log_path = state_dir.join("debug.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| eyre!("Failed to open log file {log_path:?}: {e}"))?;
    tracing_subscriber::fmt()
        .with_writer(file)
        .with_ansi(false)
        .init();
    tracing::info!("plw v{} starting with verbose logging", cli::VERSION);
    Ok(())
}

fn dirs_next_or_fallback() -> std::path::PathBuf {
    if let Some(state) = std::env::var_os("XDG_STATE_HOME") {
        std::path::PathBuf::from(state).join("plw")
    } else if let Some(home) = std::env::var_os("HOME") {
        std::path::PathBuf::from(home)
            .join(".local")
            .join("state")
            .join("plw")
    } else {
        std::path::PathBuf::from("/tmp/plw")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    if args.verbose {
        setup_verbose_logging()?;
    }

    // Contexts: file first, then command-line overrides
    let config_path = args.config.clone().unwrap_or_else(config::default_path);
    let mut contexts = ConfigFile::load(&config_path).into_store();
    if let Some(name) = &args.context {
        contexts
            .switch_to(name)
            .map_err(|e| eyre!("--context {name}: {e}"))?;
    }
    if let Some(url) = &args.url {
        contexts
            .set_adhoc_url(url)
            .map_err(|e| eyre!("--url: {e}"))?;
    }
    if let Some(limit) = args.limit {
        contexts
            .override_runs_limit(limit)
            .map_err(|e| eyre!("--limit: {e}"))?;
    }

    let timeout = Duration::from_secs(args.timeout);
    let client = Arc::new(GraphqlClient::new(timeout)?);
    let policy = PollPolicy {
        list: Duration::from_secs(args.interval),
        detail: Duration::from_secs(args.detail_interval),
    };

    // Setup terminal with panic hook
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if let Err(e) = terminal::disable_raw_mode() {
            eprintln!("Failed to disable raw mode during panic: {e}");
        }
        if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen, SetTitle("")) {
            eprintln!("Failed to leave alternate screen during panic: {e}");
        }
        original_hook(panic_info);
    }));

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, SetTitle("plw"))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let events = EventHandler::new(Duration::from_millis(100));
    let scheduler = PollScheduler::new(client, events.sender(), timeout);
    let mut state = AppState::new(contexts, scheduler, policy, Some(config_path));
    state.version_string = format!("plw v{}", cli::VERSION);

    let result = run_app(&mut terminal, &mut state, events).await;

    // Dropping the state drops the scheduler, which aborts every timer and fetch.
    drop(state);

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, SetTitle(""))?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    mut events: EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|f| tui::render::render(f, state))?;
        state.prune_status();

        match events.next().await {
            Some(AppEvent::Key(key)) => state.handle_key(key),
            Some(AppEvent::Tick) => state.advance_spinner(),
            Some(AppEvent::PollDue(key)) => state.on_poll_due(key),
            Some(AppEvent::FetchComplete { key, seq, result }) => {
                state.on_fetch_complete(key, seq, result);
            }
            Some(AppEvent::Error(msg)) => {
                tracing::error!("{msg}");
                state.set_error(msg);
            }
            None => {
                tracing::warn!("event channel closed");
                break;
            }
        }

        if state.should_quit {
            break;
        }
    }

    events.stop();
    Ok(())
}
