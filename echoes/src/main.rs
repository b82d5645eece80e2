//! Echoes of Dystopia terminal application.
//!
//! A terminal visual novel: dialogue is typed out line by line, then the
//! player picks what happens next. Scenes come from an imported script, the
//! fixed prelude, or AI generation.
//!
//! # Headless Mode
//!
//! Run with `--headless` for a text-based interface suitable for automated testing:
//!
//! ```bash
//! cargo run -p echoes -- --headless --protagonist female --no-images
//! ```

mod app;
mod events;
mod headless;
mod ui;

use crossterm::{
    event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use echoes_core::GameSession;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, stdout};
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, PendingAction};
use events::{handle_event, EventResult};
use ui::render::render;

/// Log file used while the TUI owns the terminal.
const LOG_FILE: &str = "echoes.log";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let headless_mode = args.iter().any(|a| a == "--headless");
    init_tracing(!headless_mode);

    let options = headless::parse_options_from_args(&args);
    for warning in &options.warnings {
        eprintln!("Warning: {warning}");
    }

    if headless_mode {
        if !options.config.api.has_api_key() {
            eprintln!("Warning: no API key set; only the prelude and scripts will play.");
        }
        return headless::run_headless(options).await.map_err(|e| e.into());
    }

    let config = options.config.session_config();
    let save_dir = config.save_dir.clone();

    let session = match GameSession::new(config).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to create game session: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(save_dir = %save_dir.display(), "Starting Echoes");

    let mut app = App::new(session, save_dir);
    app.refresh_autosave_flag().await;
    if let Some(path) = options.config.script.clone() {
        app.queue(PendingAction::LoadScript(options.config.protagonist, path));
    } else if options.resume {
        app.queue(PendingAction::Continue);
    }
    if !app.session.api_config().has_api_key() && !options.config.api.has_api_key() {
        app.set_status("No API key set: use :config key=<your key>");
    }
    if let Some(warning) = options.warnings.first() {
        app.set_status(warning.clone());
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

/// Send logs to stderr, or to `LOG_FILE` when the TUI owns the terminal.
fn init_tracing(to_file: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "echoes=info,echoes_core=info,echoes_llm=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if !to_file {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
        return;
    }

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
    {
        Ok(file) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
            .init(),
        // Without a log file the TUI runs silent rather than writing over the screen.
        Err(_) => registry.init(),
    }
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| render(f, &app))?;

        // The frame above already shows the progress label.
        if let Some(action) = app.take_pending() {
            app.perform(action).await;
            // Input typed while the story was resolving is dropped.
            while event::poll(Duration::ZERO)? {
                event::read()?;
            }
            continue;
        }

        // Poll for events with timeout for animations
        if event::poll(Duration::from_millis(100))? {
            let ev = event::read()?;
            if handle_event(&mut app, ev) == EventResult::Quit {
                return Ok(());
            }
        } else {
            app.tick();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn print_help() {
    println!("Echoes of Dystopia - AI-driven branching visual novel");
    println!();
    println!("USAGE:");
    println!("  echoes [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help                 Show this help message");
    println!("  --headless                 Run in headless mode (text-only, no TUI)");
    println!("  --protagonist <NAME>       male | female (default: male)");
    println!("  --save-dir <DIR>           Autosave and settings directory (default: saves)");
    println!("  --script <FILE>            Play a script file instead of the prelude");
    println!("  --continue                 Resume from the autosave");
    println!("  --no-images                Skip scene image generation");
    println!();
    println!("ENVIRONMENT:");
    println!("  ECHOES_API_KEY / GEMINI_API_KEY   API key");
    println!("  ECHOES_BASE_URL                   OpenAI-compatible chat completions URL");
    println!("  ECHOES_IMAGE_BASE_URL             OpenAI-compatible image generation URL");
    println!("  ECHOES_TEXT_MODEL                 Text model override");
    println!("  ECHOES_IMAGE_MODEL                Image model override");
    println!("  RUST_LOG                          Log filter (logs go to {LOG_FILE} in TUI mode)");
    println!();
    println!("EXAMPLES:");
    println!("  echoes                                      # Interactive TUI mode");
    println!("  echoes --headless --protagonist female      # Headless with the prelude");
    println!("  echoes --headless --script story.json --no-images");
}
