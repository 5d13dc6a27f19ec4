//! `dayboard`: a terminal to-do list with priorities, dates and notes.
//!
//! ```bash
//! # Create an account and start
//! dayboard --email ann@example.com --password secret1 --signup --nickname Ann
//!
//! # Log in later (password may also come from DAYBOARD_PASSWORD)
//! dayboard --email ann@example.com
//!
//! # Dump the account's tasks as JSON
//! dayboard --email ann@example.com export
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dayboard_core::{
    auth::{AuthFlow, AuthService},
    models::Session,
    storage::{Database, RemoteStore, SqliteRemote},
};
use dayboard_tui::{load_config, App, Config, Event, EventHandler};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(version, about = "Terminal to-do list with priorities, dates and notes")]
struct Cli {
    /// Database file holding accounts and tasks
    #[arg(long, default_value = "dayboard.db", env = "DAYBOARD_DB")]
    db: PathBuf,

    /// Config file (defaults to dayboard.toml next to the database)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, env = "DAYBOARD_EMAIL")]
    email: Option<String>,

    #[arg(long, env = "DAYBOARD_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Create the account instead of logging in
    #[arg(long)]
    signup: bool,

    /// Display name for a new account
    #[arg(long)]
    nickname: Option<String>,

    #[arg(long, default_value = "info", env = "DAYBOARD_LOG")]
    log_level: String,

    /// Log file path (defaults to dayboard.log in the temp directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the account's tasks as JSON
    Export,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to a file since the terminal belongs to the UI
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!("dayboard starting");

    let db = Database::new(&cli.db);
    let remote = SqliteRemote::open(&db).with_context(|| format!("failed to open {}", cli.db.display()))?;

    let flow = if cli.signup { AuthFlow::SignUp } else { AuthFlow::LogIn };
    let auth = authenticate(&cli, &remote, flow);

    if let Some(Command::Export) = cli.command {
        let session = match auth {
            Some(Ok(session)) => session,
            Some(Err(message)) => bail!(message),
            None => bail!("export needs --email and --password"),
        };
        let documents = remote.list(&session.uid)?;
        println!("{}", serde_json::to_string_pretty(&documents)?);
        return Ok(());
    }

    let config_path = cli.config.clone().unwrap_or_else(|| default_config_path(&cli.db));
    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {:#}", e);
            tracing::warn!(error = %e, "using default config");
            Config::default()
        }
    };
    let event_handler = EventHandler::new(config.view.tick_rate_ms);

    let mut app = App::new(remote, config);
    match auth {
        Some(Ok(session)) => app.set_session(Some(session)),
        Some(Err(message)) => app.set_status(message),
        None => app.set_status("Not logged in."),
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &event_handler);
    if !app.should_quit {
        // Leaving on an error still flushes unsaved notes
        app.quit();
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        tracing::error!(error = %err, "dayboard stopped on error");
    }
    tracing::info!("dayboard exiting");
    result
}

/// Sign up or log in from the command line.
/// `None` when no email was given; errors are already user-facing text.
fn authenticate(cli: &Cli, remote: &SqliteRemote, flow: AuthFlow) -> Option<std::result::Result<Session, String>> {
    let email = cli.email.as_deref()?;
    let password = cli.password.as_deref().unwrap_or_default();
    let auth = AuthService::new(remote.connection());

    let result = match flow {
        AuthFlow::SignUp => auth.signup(email, password, cli.nickname.as_deref()),
        AuthFlow::LogIn => auth.login(email, password),
    };
    Some(result.map_err(|e| {
        tracing::warn!(error = %e, ?flow, "authentication failed");
        flow.message_for(&e).to_string()
    }))
}

fn default_config_path(db: &Path) -> PathBuf {
    db.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.join("dayboard.toml"))
        .unwrap_or_else(|| PathBuf::from("dayboard.toml"))
}

fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("dayboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_handler: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|f| dayboard_tui::ui::render(f, app))?;

        match event_handler.next()? {
            Event::Key(key) => dayboard_tui::event::handle_key_event(key, app),
            Event::Mouse(mouse) => dayboard_tui::event::handle_mouse_event(mouse, app),
            Event::Tick => {}
        }
        // Snapshots are drained every pass so typing doesn't starve them
        app.tick();

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
