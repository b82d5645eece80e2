//! QA tests for autosave, export/import and settings persistence.
//!
//! These tests verify that game state is properly saved and restored.
//! Run with: `cargo test -p echoes-core --test qa_persistence -- --nocapture`

use echoes_core::persist::{self, AUTOSAVE_KEY};
use echoes_core::session::messages;
use echoes_core::testing::TestHarness;
use echoes_core::{
    ApiConfig, FileStorage, GameSession, GameStatus, MemoryStorage, Protagonist, SessionConfig,
    SessionError, Storage,
};
use tempfile::TempDir;

// =============================================================================
// Export and import
// =============================================================================

#[tokio::test]
async fn test_export_import_roundtrip() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let mut harness = TestHarness::new();
    harness.session.start_game(Protagonist::Female).await.unwrap();
    harness.session.choose("next1").await.unwrap();

    let path = harness
        .session
        .export_save(temp_dir.path())
        .await
        .expect("Failed to export");
    println!("Exported to {}", path.display());

    let original = harness.session.state().clone();

    let mut other = TestHarness::new();
    other.session.import_save_file(&path).await.expect("Failed to import");
    let loaded = other.session.state();

    assert_eq!(loaded.history.len(), original.history.len());
    assert_eq!(loaded.status, original.status);
    assert_eq!(
        loaded.current_segment.as_ref().and_then(|s| s.id.clone()),
        original.current_segment.as_ref().and_then(|s| s.id.clone())
    );
    assert_eq!(loaded.prelude_queue, original.prelude_queue);

    // Play continues from the imported point.
    other.session.choose("next2").await.unwrap();
    assert_eq!(other.session.history().len(), 3);
}

#[tokio::test]
async fn test_export_refused_while_error_shown() {
    let temp_dir = TempDir::new().unwrap();
    let mut harness = TestHarness::new();
    harness.session.start_game(Protagonist::Male).await.unwrap();
    let _ = harness.session.import_save_json("{}");
    assert!(harness.session.error().is_some());

    assert!(harness.session.export_save(temp_dir.path()).await.is_err());
    harness.session.dismiss_error();
    assert!(harness.session.export_save(temp_dir.path()).await.is_ok());
}

#[tokio::test]
async fn test_import_rejects_wrong_file_type() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("save.png");
    tokio::fs::write(&path, "{}").await.unwrap();

    let mut harness = TestHarness::new();
    harness.session.start_game(Protagonist::Male).await.unwrap();
    let before = harness.session.history().to_vec();

    assert!(harness.session.import_save_file(&path).await.is_err());
    assert_eq!(harness.session.error(), Some(messages::WRONG_FILE_TYPE));
    assert_eq!(harness.session.history(), before.as_slice());
}

#[tokio::test]
async fn test_import_rejects_incomplete_save() {
    let mut harness = TestHarness::new();
    assert!(harness
        .session
        .import_save_json(r#"{"status": "PLAYING"}"#)
        .is_err());
    assert_eq!(harness.session.error(), Some(messages::BAD_SAVE));
    assert_eq!(harness.session.status(), GameStatus::Menu);
}

// =============================================================================
// Autosave
// =============================================================================

#[tokio::test]
async fn test_autosave_is_idempotent() {
    let mut harness = TestHarness::new();
    harness.session.start_game(Protagonist::Male).await.unwrap();
    let state = harness.session.state().clone();

    persist::autosave(harness.storage.as_ref(), &state).await.unwrap();
    let first = harness.storage.get(AUTOSAVE_KEY).await.unwrap();
    persist::autosave(harness.storage.as_ref(), &state).await.unwrap();
    let second = harness.storage.get(AUTOSAVE_KEY).await.unwrap();

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(harness.storage.len().await, 1);
}

#[tokio::test]
async fn test_continue_from_autosave() {
    let mut harness = TestHarness::new();
    assert!(matches!(
        harness.session.continue_game().await,
        Err(SessionError::NoAutosave)
    ));

    harness.session.start_game(Protagonist::Female).await.unwrap();
    harness.session.choose("next1").await.unwrap();
    harness.session.main_menu();
    assert_eq!(harness.session.status(), GameStatus::Menu);
    assert!(harness.session.has_autosave().await);

    harness.session.continue_game().await.unwrap();
    assert_eq!(harness.session.status(), GameStatus::Playing);
    assert_eq!(harness.session.history().len(), 2);
}

#[tokio::test]
async fn test_start_game_clears_old_autosave() {
    let mut harness = TestHarness::new();
    harness.session.start_game(Protagonist::Male).await.unwrap();
    harness.session.choose("next1").await.unwrap();

    harness.session.start_game(Protagonist::Female).await.unwrap();
    harness.session.continue_game().await.unwrap();
    assert_eq!(harness.session.history().len(), 1);
    assert_eq!(harness.session.protagonist(), Some(Protagonist::Female));
}

#[tokio::test]
async fn test_corrupt_autosave_sets_error() {
    let harness = TestHarness::new();
    harness.storage.set(AUTOSAVE_KEY, "not json").await.unwrap();

    let mut session = harness.session;
    assert!(session.continue_game().await.is_err());
    assert_eq!(session.error(), Some(messages::BAD_AUTOSAVE));
}

#[tokio::test]
async fn test_autosave_quota_is_swallowed() {
    let mut harness = TestHarness::build(
        echoes_core::MockNarrator::new(),
        echoes_core::MockIllustrator::new(),
        MemoryStorage::new().with_quota(16),
    );
    harness.session.start_game(Protagonist::Male).await.unwrap();
    harness.session.choose("next1").await.unwrap();

    assert!(harness.session.error().is_none());
    assert!(!harness.session.has_autosave().await);
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn test_settings_survive_restart_and_stay_out_of_saves() {
    let temp_dir = TempDir::new().unwrap();
    let config = SessionConfig::default()
        .with_save_dir(temp_dir.path())
        .with_images(false);

    let mut session = GameSession::new(config.clone()).await.unwrap();
    let overrides = ApiConfig::new()
        .with_api_key("user-key")
        .with_text_model("custom-model");
    session.update_config(overrides.clone()).await.unwrap();
    session.start_game(Protagonist::Male).await.unwrap();

    let exported = session.export_save(temp_dir.path().join("exports")).await.unwrap();
    let content = tokio::fs::read_to_string(&exported).await.unwrap();
    assert!(!content.contains("user-key"));

    let reopened = GameSession::new(config).await.unwrap();
    assert_eq!(reopened.api_config(), &overrides);

    let storage = FileStorage::new(temp_dir.path());
    assert!(storage.get("echoes_config_v1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_imported_state_keeps_current_settings() {
    let mut harness = TestHarness::new();
    let overrides = ApiConfig::new().with_base_url("https://llm.local/v1/chat/completions");
    harness.session.update_config(overrides.clone()).await.unwrap();

    harness.session.start_game(Protagonist::Female).await.unwrap();
    let json = serde_json::to_string(harness.session.state()).unwrap();
    harness.session.import_save_json(&json).unwrap();

    assert_eq!(harness.session.api_config(), &overrides);
}
