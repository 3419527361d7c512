use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{debug, error, info, warn};
use ratatui::{Terminal, backend::CrosstermBackend, style::Color};
use signage_core::{Backend, Settings, SignageConfig, open_store};
use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

mod app;
mod commands;
mod events;
mod surface;
mod ui;

use app::App;
use events::event_utils;
use surface::ExternalPlayer;

/// Kiosk video signage player
#[derive(Parser, Debug)]
#[command(name = "signage", version, about)]
struct Args {
    /// Where channels and settings are stored
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Config file (defaults to the platform config dir)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Local store file
    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Origin passed to embedded players
    #[arg(long, value_name = "URL")]
    origin: Option<String>,

    /// Media player executable
    #[arg(long, value_name = "CMD")]
    player: Option<String>,

    /// Log file (defaults to signage.log in the data dir)
    #[arg(long, value_name = "PATH", env = "SIGNAGE_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Video link to save as the display's source before starting
    url: Option<String>,
}

fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("signage").join("signage.log"))
        .unwrap_or_else(|| PathBuf::from("signage.log"))
}

/// The TUI owns the terminal, so log records go to a file
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log dir {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:?} {:<5} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                std::thread::current().id(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()
        .context("Failed to initialize logger")?;
    Ok(())
}

fn load_config(args: &Args) -> Result<SignageConfig> {
    let mut config = SignageConfig::load(args.config.as_deref()).context("Failed to load config")?;
    config.apply_env();
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(store) = &args.store {
        config.local_store = Some(store.clone());
    }
    if let Some(origin) = &args.origin {
        config.origin = origin.clone();
    }
    if let Some(player) = &args.player {
        config.player.command = player.clone();
    }
    Ok(config)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste)
        .context("Failed to leave alternate screen")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_path = args.log_file.clone().unwrap_or_else(default_log_path);
    init_logging(&log_path)?;
    info!("Starting signage {}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;
    let mut store = open_store(&config).context("Failed to open video store")?;
    info!("Store: {}", store.describe());

    let mut startup_status = None;
    if let Some(url) = &args.url {
        let settings = Settings {
            video_url: url.clone(),
            loop_enabled: store.settings().map(|s| s.loop_enabled).unwrap_or(true),
        };
        match store.save_settings(&settings) {
            Ok(()) => info!("Saved {} as the display source", url.trim()),
            Err(e) if e.is_store_failure() => {
                warn!("Could not save startup link: {}", e);
                startup_status = Some(format!("Could not save link: {e}"));
            }
            Err(e) => anyhow::bail!("Invalid video link '{}': {}", url, e),
        }
    }

    let player = ExternalPlayer::new(&config.player);
    if !player.is_available() {
        warn!("Media player '{}' not found; playback will fail", player.command());
    }

    // Set up clean terminal restoration on panic
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        error!("PANIC: {}", panic_info);
        orig_hook(panic_info);
    }));

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableBracketedPaste) {
        let _ = disable_raw_mode();
        return Err(e).context("Failed to setup terminal");
    }
    let mut terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(term) => term,
        Err(e) => {
            let _ = restore_terminal();
            return Err(e).context("Failed to create terminal");
        }
    };
    debug!("Terminal setup complete");

    let mut app = App::new(config, store, Box::new(player));
    if let Some(message) = startup_status {
        app.set_status(message, Color::Red);
    }

    let result = run(&mut terminal, &mut app);

    // Tear down the player before giving the terminal back
    if app.view == app::AppView::Player {
        app.stop_playback();
    }

    let cleanup = restore_terminal().and_then(|_| terminal.show_cursor().context("Failed to show cursor"));
    if let Err(e) = cleanup {
        error!("Error during cleanup: {}", e);
        eprintln!("Error during cleanup: {}", e);
    }

    info!("Shutting down");
    result
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    while !app.should_quit {
        terminal.draw(|f| {
            if let Err(e) = ui::draw_ui(f, app) {
                error!("UI draw error: {}", e);
            }
        })?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            match event::read()? {
                ev if event_utils::is_terminate_event(&ev) => {
                    info!("Quit key pressed");
                    app.should_quit = true;
                }
                Event::Key(key) if event_utils::is_key_press(&key) => {
                    if app.is_command_mode() && key.code == event::KeyCode::Enter {
                        let cmd = app.get_command_buffer().to_string();
                        app.exit_command_mode();
                        if let Err(e) = commands::handle_command(app, &cmd) {
                            warn!("Command '{}' failed: {}", cmd, e);
                            app.set_status(format!("Error: {}", e), Color::Red);
                        }
                    } else if event_utils::is_command_key(&key) && app.accepts_command_key() {
                        app.enter_command_mode();
                    } else if let Err(e) = app.handle_key_event(key) {
                        error!("Key handler error: {}", e);
                        app.set_status(format!("Key error: {}", e), Color::Red);
                    }
                }
                Event::Paste(text) => app.handle_paste(&text),
                Event::Resize(w, h) => debug!("Resize event: {}x{}", w, h),
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            if let Err(e) = app.update() {
                error!("App update error: {}", e);
                app.set_status(format!("Error: {}", e), Color::Red);
            }
            last_tick = Instant::now();
        }
    }

    Ok(())
}
