//! Live tests against a real generation backend.
//!
//! Run with: `cargo test -p echoes-core --test api_integration -- --ignored --nocapture`
//!
//! These tests require ECHOES_API_KEY or GEMINI_API_KEY to be set
//! (optionally ECHOES_BASE_URL for an OpenAI-compatible endpoint).

use echoes_core::headless::{HeadlessConfig, HeadlessGame};
use echoes_core::story::START_GAME_CHOICE_ID;
use echoes_core::{
    AiIllustrator, AiNarrator, ApiConfig, GameStatus, Illustrator, IllustratorConfig, Narrator,
    NarratorConfig, Protagonist,
};
use tempfile::TempDir;

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

/// Check if API key is available
fn has_api_key() -> bool {
    ApiConfig::from_env().has_api_key()
}

#[tokio::test]
#[ignore]
async fn test_live_opening_segment() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: no API key set");
        return;
    }

    let client = ApiConfig::from_env().build_client().expect("client");
    let narrator = AiNarrator::new(client, NarratorConfig::default());

    let segment = narrator
        .opening(Protagonist::Female)
        .await
        .expect("Failed to generate opening");

    println!("\n=== Opening ===");
    for line in &segment.lines {
        println!("{} [{}]: {}", line.speaker, line.emotion.as_str(), line.text);
    }
    for choice in &segment.choices {
        println!("  -> {} ({})", choice.text, choice.id);
    }

    assert!(!segment.lines.is_empty());
    assert!(!segment.choices.is_empty());
    assert!(segment.id.as_deref().unwrap_or("").starts_with("ai-"));
}

#[tokio::test]
#[ignore]
async fn test_live_scene_image() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: no API key set");
        return;
    }

    let client = ApiConfig::from_env().build_client().expect("client");
    let illustrator = AiIllustrator::new(client, IllustratorConfig::default());
    let image = illustrator
        .illustrate("Kaelen standing guard in a ruined wedding hall")
        .await;

    match image {
        Some(src) => println!("Image: {}...", src.chars().take(80).collect::<String>()),
        None => println!("No image produced (backend may not support images)"),
    }
}

#[tokio::test]
#[ignore]
async fn test_live_playthrough() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: no API key set");
        return;
    }

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config = HeadlessConfig::quick_start(Protagonist::Male)
        .with_save_dir(temp_dir.path())
        .with_images(false);
    let mut game = HeadlessGame::new(config).await.expect("Failed to start");

    game.choose("next1").await.expect("prelude 1");
    game.choose("next2").await.expect("prelude 2");
    game.choose(START_GAME_CHOICE_ID).await.expect("opening");

    for _ in 0..3 {
        if game.is_over() {
            break;
        }
        let segment = game.choose_index(1).await.expect("continuation");
        println!("--- {}", segment.visual_description);
        for line in &segment.lines {
            println!("{}: {}", line.speaker, line.text);
        }
    }

    assert!(matches!(
        game.status(),
        GameStatus::Playing | GameStatus::Victory | GameStatus::GameOver
    ));
    println!("Transcript length: {}", game.transcript().len());
}
