use std::{
    error::Error,
    fs::OpenOptions,
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use rand::{rngs::StdRng, SeedableRng};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reflx::{
    app::App,
    app_dirs::AppDirs,
    clock::{Clock, MonotonicClock},
    config::{Config, ConfigStore, FileConfigStore},
    engine::ReactionEngine,
    feedback::{provider_for, FeedbackMode, FeedbackWorker},
    history::AttemptLog,
    runtime::{CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
    store::{clear_records, MemoryStore, PersistentStore, SqliteStore},
};

/// F1 start-lights reaction timer for the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Wait for the five red lights to go out, then hit space as fast as you can. Best time and attempt count persist between runs."
)]
pub struct Cli {
    /// number of lights in the start sequence (1-10)
    #[clap(short = 'l', long = "lights")]
    light_count: Option<u8>,

    /// where engineer notes come from
    #[clap(short = 'f', long, value_enum)]
    feedback: Option<FeedbackMode>,

    /// gemini model used with --feedback gemini
    #[clap(short = 'm', long)]
    model: Option<String>,

    /// seed the random delays for a repeatable sequence
    #[clap(long)]
    seed: Option<u64>,

    /// do not append completed attempts to the history csv
    #[clap(long)]
    no_history: bool,

    /// read settings from this file instead of the default location
    #[clap(long)]
    config: Option<PathBuf>,

    /// write the effective settings back to the config file
    #[clap(long)]
    save_config: bool,

    /// clear the stored best time and attempt count, then exit
    #[clap(long)]
    reset_records: bool,
}

impl Cli {
    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }

    /// Overlay the flags given for this run on top of the stored settings
    fn apply(&self, mut cfg: Config) -> Config {
        if let Some(n) = self.light_count {
            cfg.light_count = n;
        }
        if let Some(mode) = self.feedback {
            cfg.feedback = mode;
        }
        if let Some(model) = &self.model {
            cfg.gemini_model = model.clone();
        }
        if self.no_history {
            cfg.history = false;
        }
        cfg
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();

    let config_store = cli.config_store();
    let cfg = cli.apply(config_store.load());
    if let Err(e) = cfg.validate() {
        Cli::command().error(ErrorKind::ValueValidation, e).exit();
    }

    if cli.save_config {
        config_store.save(&cfg)?;
        tracing::info!(path = %config_store.path().display(), "saved config");
    }

    if cli.reset_records {
        let mut store = SqliteStore::open_default()?;
        clear_records(&mut store)?;
        tracing::info!("records cleared");
        println!("records cleared");
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store: Box<dyn PersistentStore> = match SqliteStore::open_default() {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!(%e, "could not open records database, records will not persist");
            Box::new(MemoryStore::new())
        }
    };
    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let engine = ReactionEngine::new(MonotonicClock::new(), rng, cfg.timing(), store);

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(cfg.frame_interval_ms)),
    );

    let mut app = App::new(engine);
    if cfg.feedback != FeedbackMode::Off {
        let provider = provider_for(cfg.feedback, &cfg.gemini_model);
        app = app.with_feedback(FeedbackWorker::new(provider, runner.sender()));
    }
    if cfg.history {
        if let Some(log) = AttemptLog::open_default() {
            app = app.with_history(log);
        }
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn start_tui<B, C, E, T>(
    terminal: &mut Terminal<B>,
    app: &mut App<C, StdRng>,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>>
where
    B: Backend,
    C: Clock,
    E: EventSource,
    T: Ticker,
{
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        let event = runner.step();
        app.handle_event(event);
        if app.should_quit() {
            break;
        }
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_path = AppDirs::log_path().unwrap_or_else(|| PathBuf::from("reflx.log"));
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        let _ = std::fs::create_dir_all(parent);
    }

    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(env_filter)
                .init();
            tracing::info!(path = %log_path.display(), "logging initialized");
        }
        // the terminal belongs to the UI, so no log file means no logs
        Err(_) => tracing_subscriber::registry().with(env_filter).init(),
    }
}
