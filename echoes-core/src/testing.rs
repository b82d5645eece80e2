//! Testing utilities.
//!
//! This module provides tools for integration testing:
//! - `MockNarrator` for deterministic stories without API calls
//! - `MockIllustrator` for image calls that record what they were asked
//! - `TestHarness` wiring both into a `GameSession` over in-memory storage
//! - Segment builders for test fixtures

use crate::illustrator::Illustrator;
use crate::narrator::{Narrator, NarratorError};
use crate::session::GameSession;
use crate::storage::MemoryStorage;
use crate::story::{
    Choice, ChoiceKind, DialogueLine, EndingType, GameHistoryItem, Protagonist, StorySegment,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

/// A scripted reply from the mock narrator.
#[derive(Debug, Clone)]
pub enum MockReply {
    Segment(StorySegment),
    /// Fail with a network error carrying this message.
    Fail(String),
}

/// A recorded narrator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarratorCall {
    Opening(Protagonist),
    Continuation {
        protagonist: Protagonist,
        /// History length passed in.
        turn: usize,
        choice_text: String,
        /// `choice_made` of the last history item as the narrator saw it.
        last_choice_made: Option<String>,
    },
}

#[derive(Debug, Default)]
struct MockNarratorState {
    replies: Vec<MockReply>,
    reply_index: usize,
    calls: Vec<NarratorCall>,
}

/// A narrator that returns scripted replies in order.
///
/// Once the script runs out it generates a plain two-choice segment per call.
#[derive(Debug, Default)]
pub struct MockNarrator {
    state: Mutex<MockNarratorState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with scripted replies.
    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            state: Mutex::new(MockNarratorState {
                replies,
                ..Default::default()
            }),
        }
    }

    /// Add a reply to the queue.
    pub fn queue_reply(&self, reply: MockReply) {
        lock(&self.state).replies.push(reply);
    }

    /// Add a segment reply to the queue.
    pub fn queue_segment(&self, segment: StorySegment) {
        self.queue_reply(MockReply::Segment(segment));
    }

    /// Add a failing reply to the queue.
    pub fn queue_failure(&self, message: impl Into<String>) {
        self.queue_reply(MockReply::Fail(message.into()));
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<NarratorCall> {
        lock(&self.state).calls.clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.state).calls.len()
    }

    /// Reset the reply index to replay from the beginning.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.reply_index = 0;
        state.calls.clear();
    }

    fn next_reply(&self, call: NarratorCall) -> Result<StorySegment, NarratorError> {
        let mut state = lock(&self.state);
        state.calls.push(call);
        let n = state.calls.len();

        let reply = if state.reply_index < state.replies.len() {
            let r = state.replies[state.reply_index].clone();
            state.reply_index += 1;
            r
        } else {
            MockReply::Segment(sample_segment(&format!("mock-{n}")))
        };

        match reply {
            MockReply::Segment(segment) => Ok(segment),
            MockReply::Fail(message) => {
                Err(NarratorError::Llm(echoes_llm::Error::Network(message)))
            }
        }
    }
}

#[async_trait]
impl Narrator for MockNarrator {
    async fn opening(&self, protagonist: Protagonist) -> Result<StorySegment, NarratorError> {
        self.next_reply(NarratorCall::Opening(protagonist))
    }

    async fn continuation(
        &self,
        protagonist: Protagonist,
        history: &[GameHistoryItem],
        choice_text: &str,
    ) -> Result<StorySegment, NarratorError> {
        self.next_reply(NarratorCall::Continuation {
            protagonist,
            turn: history.len(),
            choice_text: choice_text.to_string(),
            last_choice_made: history.last().and_then(|h| h.choice_made.clone()),
        })
    }
}

/// An illustrator that records descriptions and returns fake URLs.
#[derive(Debug, Default)]
pub struct MockIllustrator {
    requests: Mutex<Vec<String>>,
    failing: bool,
}

impl MockIllustrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An illustrator whose every call fails (returns no image).
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Descriptions requested so far.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl Illustrator for MockIllustrator {
    async fn illustrate(&self, visual_description: &str) -> Option<String> {
        let mut requests = lock(&self.requests);
        requests.push(visual_description.to_string());
        if self.failing {
            None
        } else {
            Some(format!("mock://image/{}", requests.len()))
        }
    }
}

/// A session wired to mocks, with handles to inspect them.
pub struct TestHarness {
    pub session: GameSession,
    pub narrator: Arc<MockNarrator>,
    pub illustrator: Arc<MockIllustrator>,
    pub storage: Arc<MemoryStorage>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_narrator(MockNarrator::new())
    }

    pub fn with_narrator(narrator: MockNarrator) -> Self {
        Self::build(narrator, MockIllustrator::new(), MemoryStorage::new())
    }

    pub fn build(
        narrator: MockNarrator,
        illustrator: MockIllustrator,
        storage: MemoryStorage,
    ) -> Self {
        let narrator = Arc::new(narrator);
        let illustrator = Arc::new(illustrator);
        let storage = Arc::new(storage);
        let session =
            GameSession::with_components(narrator.clone(), illustrator.clone(), storage.clone());
        Self {
            session,
            narrator,
            illustrator,
            storage,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A playable segment with choices `<id>-a` and `<id>-b`.
pub fn sample_segment(id: &str) -> StorySegment {
    StorySegment::new(format!("Kaelen and Elara in scene {id}"))
        .with_id(id)
        .with_line(DialogueLine::new("旁白", format!("场景 {id}。")))
        .with_choice(Choice::new(format!("{id}-a"), "前进").with_kind(ChoiceKind::Action))
        .with_choice(Choice::new(format!("{id}-b"), "观察").with_kind(ChoiceKind::Deduction))
}

/// A terminal segment without choices.
pub fn ending_segment(id: &str, ending: EndingType) -> StorySegment {
    StorySegment::new(format!("ending {id}"))
        .with_id(id)
        .with_line(DialogueLine::new("旁白", "故事结束。"))
        .ending(ending)
}
