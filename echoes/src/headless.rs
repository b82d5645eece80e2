//! Headless mode for the visual novel.
//!
//! This module provides a simple text-based interface for running the game
//! without a TUI. It's designed for automated testing and AI agents.

use echoes_core::{
    headless::{HeadlessConfig, HeadlessGame},
    GameSession, Protagonist, SessionError, StorySegment,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Options for a headless run.
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    pub config: HeadlessConfig,
    /// Resume from the autosave instead of starting over.
    pub resume: bool,
    /// Problems with the arguments that did not stop parsing.
    pub warnings: Vec<String>,
}

/// Run the game in headless mode.
///
/// This provides a simple line-oriented protocol:
/// - A number picks that choice, any other text is taken as a choice id
/// - Lines starting with `#` are commands (save, load, quit, status)
/// - Output lines are prefixed with their kind (`[SCENE]`, `[CHOICE]`, ...)
pub async fn run_headless(options: HeadlessOptions) -> Result<(), SessionError> {
    let mut game = if options.resume {
        let session = GameSession::new(options.config.session_config()).await?;
        let mut game = HeadlessGame::from_session(session);
        game.resume().await?;
        game
    } else {
        HeadlessGame::new(options.config).await?
    };

    println!("=== Echoes of Dystopia (headless) ===");
    print_help();
    println!();
    print_segment(&game);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('#') {
            let parts: Vec<&str> = command.split_whitespace().collect();
            match parts.first().copied() {
                Some("quit") | Some("exit") => {
                    println!("Goodbye!");
                    break;
                }
                Some("save") => {
                    let dir = parts.get(1).copied().unwrap_or("saves");
                    match game.export(dir).await {
                        Ok(path) => println!("[SAVED] {}", path.display()),
                        Err(e) => println!("[ERROR] Save failed: {}", e.user_message()),
                    }
                }
                Some("load") => match parts.get(1) {
                    Some(path) => match game.load(path).await {
                        Ok(()) => {
                            println!("[LOADED] {path}");
                            print_segment(&game);
                        }
                        Err(e) => println!("[ERROR] {}", e.user_message()),
                    },
                    None => println!("[ERROR] Usage: #load <file.json>"),
                },
                Some("script") => match parts.get(1) {
                    Some(path) => {
                        let protagonist = parts
                            .get(2)
                            .and_then(|p| Protagonist::parse(p))
                            .or_else(|| game.session().protagonist())
                            .unwrap_or(Protagonist::Male);
                        match game.start_script(protagonist, PathBuf::from(path)).await {
                            Ok(()) => {
                                println!("[LOADED] {path}");
                                print_segment(&game);
                            }
                            Err(e) => println!("[ERROR] {}", e.user_message()),
                        }
                    }
                    None => println!("[ERROR] Usage: #script <file.json> [male|female]"),
                },
                Some("dismiss") => {
                    game.dismiss_error();
                    println!("[STATUS] Error cleared");
                }
                Some("status") => print_status(&game),
                Some("choices") => print_choices(&game),
                Some("help") => print_help(),
                _ => println!("[ERROR] Unknown command. Type #help for help."),
            }
            stdout.flush().ok();
            continue;
        }

        if game.is_over() {
            println!("[ERROR] The story has ended. Use #load, #script or #quit.");
            continue;
        }

        print!("[PROCESSING]");
        stdout.flush().ok();

        let result = match line.parse::<usize>() {
            Ok(index) => game.choose_index(index).await,
            Err(_) => game.choose(line).await,
        };

        print!("\r            \r");
        stdout.flush().ok();

        match result {
            Ok(_) => print_segment(&game),
            Err(e) => {
                println!("[ERROR] {}", e.user_message());
                // The banner is only for this attempt; the player may retry.
                game.dismiss_error();
            }
        }
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  <number>                   - Pick a choice by position");
    println!("  <choice id>                - Pick a choice by id");
    println!("  #quit                      - Exit the game");
    println!("  #save [dir]                - Export a save file");
    println!("  #load <file.json>          - Load a save file");
    println!("  #script <file> [male|female] - Play a script file");
    println!("  #dismiss                   - Clear the error so saving works again");
    println!("  #status                    - Show current game status");
    println!("  #choices                   - List the current choices");
    println!("  #help                      - Show this help");
}

fn print_segment(game: &HeadlessGame) {
    let Some(segment) = game.current_segment() else {
        println!("[STATUS] No story in progress");
        return;
    };
    print!("{}", format_segment(segment));
    if game.is_over() {
        let title = segment
            .ending_type
            .map(|e| e.title())
            .unwrap_or("THE END");
        println!("[ENDING] {title}");
    } else {
        print_choices(game);
    }
    println!();
}

/// Text block for one segment, without its choices.
pub fn format_segment(segment: &StorySegment) -> String {
    let mut out = format!("[SCENE] {}\n", segment.visual_description);
    for line in &segment.lines {
        out.push_str(&format!(
            "{} ({}): {}\n",
            line.speaker,
            line.emotion.as_str(),
            line.text
        ));
        if let Some(ref monologue) = line.monologue {
            out.push_str(&format!("  ({monologue})\n"));
        }
    }
    out
}

fn print_choices(game: &HeadlessGame) {
    for (i, choice) in game.choices().iter().enumerate() {
        println!("[CHOICE] {}. {} ({})", i + 1, choice.text, choice.id);
    }
}

fn print_status(game: &HeadlessGame) {
    println!("[STATUS]");
    println!("  Status: {:?}", game.status());
    if let Some(p) = game.session().protagonist() {
        println!("  Protagonist: {} ({})", p.display_name(), p.speaker_name());
    }
    println!("  Turn: {}", game.history().len());
    if let Some(image) = game.session().current_image() {
        let shown: String = image.chars().take(60).collect();
        println!("  Image: {shown}");
    }
    if let Some(error) = game.error() {
        println!("  Error: {error}");
    }
}

/// Parse headless options from command line arguments.
pub fn parse_options_from_args(args: &[String]) -> HeadlessOptions {
    let mut protagonist = Protagonist::Male;
    let mut save_dir: Option<String> = None;
    let mut script: Option<String> = None;
    let mut images = true;
    let mut resume = false;
    let mut warnings = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--protagonist" => {
                if let Some(p) = args.get(i + 1) {
                    match Protagonist::parse(p) {
                        Some(parsed) => protagonist = parsed,
                        None => warnings.push(format!(
                            "Unknown protagonist {p:?} (expected male or female), using male"
                        )),
                    }
                    i += 1;
                }
            }
            "--save-dir" => {
                if let Some(dir) = args.get(i + 1) {
                    save_dir = Some(dir.clone());
                    i += 1;
                }
            }
            "--script" => {
                if let Some(path) = args.get(i + 1) {
                    script = Some(path.clone());
                    i += 1;
                }
            }
            "--no-images" => images = false,
            "--continue" => resume = true,
            _ => {}
        }
        i += 1;
    }

    let mut config = HeadlessConfig::quick_start(protagonist).with_images(images);
    if let Some(dir) = save_dir {
        config = config.with_save_dir(dir);
    }
    if let Some(path) = script {
        config = config.with_script(path);
    }
    HeadlessOptions {
        config,
        resume,
        warnings,
    }
}
