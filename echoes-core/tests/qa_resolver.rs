//! QA tests for turn resolution across script graph, prelude and AI.
//!
//! These run against mock generation and in-memory storage.
//! Run with: `cargo test -p echoes-core --test qa_resolver -- --nocapture`

use echoes_core::persist::AUTOSAVE_KEY;
use echoes_core::session::messages;
use echoes_core::story::START_GAME_CHOICE_ID;
use echoes_core::testing::{
    ending_segment, sample_segment, MockIllustrator, MockNarrator, MockReply, NarratorCall,
    TestHarness,
};
use echoes_core::{
    AppState, Choice, DialogueLine, EndingType, GameStatus, MemoryStorage, Protagonist, Resolver,
    SessionError, Storage, StorySegment,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Play through the prelude by always taking the first choice.
async fn finish_prelude(harness: &mut TestHarness) {
    for _ in 0..2 {
        let id = harness.session.current_segment().unwrap().choices[0].id.clone();
        harness.session.choose(&id).await.unwrap();
    }
}

// =============================================================================
// Prelude
// =============================================================================

#[tokio::test]
async fn test_prelude_pops_in_order_then_ai() {
    let mut harness = TestHarness::new();
    harness.session.start_game(Protagonist::Male).await.unwrap();

    let state = harness.session.state();
    assert_eq!(state.status, GameStatus::Playing);
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.prelude_queue.len(), 2);

    let expected: Vec<_> = state.prelude_queue.iter().map(|s| s.id.clone()).collect();

    let second = harness.session.choose("next1").await.unwrap();
    assert_eq!(second.id, expected[0]);
    let third = harness.session.choose("next2").await.unwrap();
    assert_eq!(third.id, expected[1]);
    assert!(harness.session.state().prelude_queue.is_empty());
    assert_eq!(harness.narrator.call_count(), 0);

    // The (N+1)th resolution falls through to AI.
    harness.session.choose(START_GAME_CHOICE_ID).await.unwrap();
    assert_eq!(harness.narrator.call_count(), 1);
    println!("history after prelude: {}", harness.session.history().len());
}

#[tokio::test]
async fn test_start_game_choice_uses_opening() {
    let narrator = MockNarrator::with_replies(vec![MockReply::Segment(sample_segment("open"))]);
    let mut harness = TestHarness::with_narrator(narrator);
    harness.session.start_game(Protagonist::Male).await.unwrap();
    finish_prelude(&mut harness).await;

    let before = harness.session.history().len();
    let segment = harness.session.choose(START_GAME_CHOICE_ID).await.unwrap();

    assert_eq!(harness.narrator.calls(), vec![NarratorCall::Opening(Protagonist::Male)]);
    assert_eq!(segment.id.as_deref(), Some("open"));
    assert_eq!(harness.session.status(), GameStatus::Playing);
    assert_eq!(harness.session.history().len(), before + 1);
    assert_eq!(
        harness.session.history()[before - 1].choice_made.as_deref(),
        Some("仪式开始")
    );
}

#[tokio::test]
async fn test_continuation_sees_choice_made() {
    let mut harness = TestHarness::new();
    harness.session.start_game(Protagonist::Female).await.unwrap();
    finish_prelude(&mut harness).await;
    harness.session.choose(START_GAME_CHOICE_ID).await.unwrap();

    let choice = harness.session.current_segment().unwrap().choices[1].clone();
    harness.session.choose(&choice.id).await.unwrap();

    match harness.narrator.calls().last() {
        Some(NarratorCall::Continuation {
            protagonist,
            turn,
            choice_text,
            last_choice_made,
        }) => {
            assert_eq!(*protagonist, Protagonist::Female);
            assert_eq!(*turn, 4);
            assert_eq!(choice_text, &choice.text);
            assert_eq!(last_choice_made.as_deref(), Some(choice.text.as_str()));
        }
        other => panic!("expected a continuation call, got {other:?}"),
    }
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_ai_failure_keeps_story() {
    let narrator = MockNarrator::with_replies(vec![MockReply::Fail("connection reset".into())]);
    let mut harness = TestHarness::with_narrator(narrator);
    harness.session.start_game(Protagonist::Male).await.unwrap();
    finish_prelude(&mut harness).await;

    let history_before = harness.session.history().to_vec();
    let current_before = harness.session.current_segment().cloned();

    let err = harness.session.choose(START_GAME_CHOICE_ID).await.unwrap_err();
    assert!(matches!(err, SessionError::Resolve(_)));

    assert_eq!(harness.session.history(), history_before.as_slice());
    assert_eq!(harness.session.current_segment().cloned(), current_before);
    assert!(!harness.session.is_loading());
    assert_eq!(harness.session.error(), Some(messages::NETWORK));

    // A retry from the same place succeeds once the backend recovers.
    harness.session.dismiss_error();
    harness.session.choose(START_GAME_CHOICE_ID).await.unwrap();
    assert!(harness.session.error().is_none());
}

#[tokio::test]
async fn test_unknown_choice_is_rejected() {
    let mut harness = TestHarness::new();
    harness.session.start_game(Protagonist::Male).await.unwrap();
    assert!(harness.session.choose("does-not-exist").await.is_err());
    assert_eq!(harness.session.history().len(), 1);
    assert!(harness.session.error().is_none());
}

#[tokio::test]
async fn test_image_failure_is_not_an_error() {
    let mut harness =
        TestHarness::build(MockNarrator::new(), MockIllustrator::failing(), MemoryStorage::new());
    harness.session.start_game(Protagonist::Female).await.unwrap();
    harness.session.choose("next1").await.unwrap();
    assert_eq!(harness.session.current_image(), None);
    assert!(harness.session.error().is_none());
}

// =============================================================================
// Endings
// =============================================================================

#[tokio::test]
async fn test_endings_set_terminal_status() {
    for (ending, status) in [
        (EndingType::True, GameStatus::Victory),
        (EndingType::Normal, GameStatus::Victory),
        (EndingType::Bad, GameStatus::GameOver),
        (EndingType::Dead, GameStatus::GameOver),
    ] {
        let narrator = MockNarrator::with_replies(vec![MockReply::Segment(ending_segment(
            "end", ending,
        ))]);
        let mut harness = TestHarness::with_narrator(narrator);
        harness.session.start_game(Protagonist::Male).await.unwrap();
        finish_prelude(&mut harness).await;
        harness.session.choose(START_GAME_CHOICE_ID).await.unwrap();

        assert_eq!(harness.session.status(), status, "ending {ending:?}");
        assert!(matches!(
            harness.session.choose("anything").await,
            Err(SessionError::NotPlaying(_))
        ));
    }
}

// =============================================================================
// Script graph
// =============================================================================

const TWO_NODE_SCRIPT: &str = r#"[
    {
        "id": "a",
        "visualDescription": "Elara at the archive door",
        "lines": [{"speaker": "艾拉拉", "text": "门锁是新的。", "emotion": "determined"}],
        "choices": [{"id": "open", "text": "撬开", "type": "action", "nextSceneId": "b"}]
    },
    {
        "id": "b",
        "visualDescription": "dusty archive",
        "lines": [{"speaker": "旁白", "text": "尘埃飞扬。"}],
        "choices": [{"id": "back", "text": "回去", "nextSceneId": "a"}]
    }
]"#;

#[tokio::test]
async fn test_two_node_script_without_ai() {
    let mut harness = TestHarness::new();
    harness
        .session
        .import_script_json(Protagonist::Female, TWO_NODE_SCRIPT)
        .await
        .unwrap();

    assert_eq!(harness.session.status(), GameStatus::Playing);
    assert_eq!(harness.session.history().len(), 1);
    assert_eq!(harness.session.current_segment().unwrap().id.as_deref(), Some("a"));
    assert!(harness.session.state().prelude_queue.is_empty());

    let map_before = harness.session.state().script_map.clone();
    let b = harness.session.choose("open").await.unwrap();
    assert_eq!(b.id.as_deref(), Some("b"));

    // Nodes can be revisited and the map is never consumed.
    let a = harness.session.choose("back").await.unwrap();
    assert_eq!(a.id.as_deref(), Some("a"));
    assert_eq!(harness.session.state().script_map, map_before);
    assert_eq!(harness.narrator.call_count(), 0);
    assert_eq!(harness.session.history().len(), 3);
}

#[tokio::test]
async fn test_script_discards_prelude() {
    let mut harness = TestHarness::new();
    harness.session.start_game(Protagonist::Male).await.unwrap();
    assert!(!harness.session.state().prelude_queue.is_empty());

    harness
        .session
        .import_script_json(Protagonist::Male, TWO_NODE_SCRIPT)
        .await
        .unwrap();
    assert!(harness.session.state().prelude_queue.is_empty());
    assert_eq!(harness.session.history().len(), 1);
}

#[tokio::test]
async fn test_bad_script_sets_specific_error() {
    let mut harness = TestHarness::new();
    let result = harness
        .session
        .import_script_json(Protagonist::Male, r#"[{"id": "x"}]"#)
        .await;
    assert!(result.is_err());
    let message = harness.session.error().unwrap();
    assert!(message.starts_with(messages::BAD_SCRIPT));
    assert_eq!(harness.session.status(), GameStatus::Menu);
}

#[tokio::test]
async fn test_malformed_script_json_reports_script_error() {
    for script in ["[{oops", r#"[{"id": "x", "lines": "not a list"}]"#] {
        let mut harness = TestHarness::new();
        let result = harness
            .session
            .import_script_json(Protagonist::Male, script)
            .await;
        assert!(result.is_err());
        let message = harness.session.error().unwrap();
        assert!(message.starts_with(messages::BAD_SCRIPT), "{script}: {message}");
        assert_ne!(message, messages::BAD_SAVE);
    }
}

// =============================================================================
// Resolver directly
// =============================================================================

#[tokio::test]
async fn test_resolver_leaves_input_state_untouched() {
    let narrator = Arc::new(MockNarrator::with_replies(vec![MockReply::Fail("boom".into())]));
    let resolver = Resolver::new(narrator.clone(), Arc::new(MockIllustrator::new()));

    let entry = StorySegment::new("street")
        .with_line(DialogueLine::new("旁白", "雨。"))
        .with_choice(Choice::new("walk", "走"));
    let state = AppState::new().begin(Protagonist::Male, entry, Vec::new(), BTreeMap::new());
    let snapshot = state.clone();

    let choice = Choice::new("walk", "走");
    assert!(resolver.resolve_next(&state, &choice).await.is_err());
    assert_eq!(state, snapshot);

    let (segment, next) = resolver.resolve_next(&state, &choice).await.unwrap();
    assert_eq!(next.current_segment.as_ref(), Some(&segment));
    assert_eq!(next.current_image.as_deref(), Some("mock://image/1"));
    assert_eq!(next.history.len(), 2);
    assert_eq!(narrator.call_count(), 2);
}

#[tokio::test]
async fn test_autosave_written_after_turn() {
    let mut harness = TestHarness::new();
    harness.session.start_game(Protagonist::Male).await.unwrap();
    harness.session.choose("next1").await.unwrap();

    let saved = harness.storage.get(AUTOSAVE_KEY).await.unwrap().unwrap();
    let state: AppState = serde_json::from_str(&saved).unwrap();
    assert_eq!(state.history.len(), 2);
}
