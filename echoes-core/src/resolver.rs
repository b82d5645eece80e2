//! Narrative source resolution.
//!
//! For every player choice exactly one source supplies the next segment,
//! checked in fixed order on every turn:
//!
//! 1. the imported script graph, when the choice names a known node;
//! 2. the prelude queue, while it still has segments;
//! 3. AI generation, opening or continuation.

use crate::illustrator::Illustrator;
use crate::narrator::{Narrator, NarratorError};
use crate::state::AppState;
use crate::story::{Choice, StorySegment, START_GAME_CHOICE_ID};
use std::sync::Arc;
use thiserror::Error;

/// Errors from resolving a choice.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No protagonist selected")]
    NoProtagonist,

    #[error("No segment is being shown")]
    NoCurrentSegment,

    #[error("Choice {0:?} is not offered by the current segment")]
    ChoiceNotOffered(String),

    #[error("Story generation failed: {0}")]
    Narration(#[from] NarratorError),
}

/// Which generator an AI turn uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiVariant {
    Opening,
    Continuation,
}

/// The source selected for a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Stored script node, returned as is.
    Graph(StorySegment),
    /// Head of the prelude queue and what remains after it.
    Prelude {
        head: StorySegment,
        rest: Vec<StorySegment>,
    },
    Ai(AiVariant),
}

impl Source {
    pub fn kind(&self) -> &'static str {
        match self {
            Source::Graph(_) => "graph",
            Source::Prelude { .. } => "prelude",
            Source::Ai(AiVariant::Opening) => "ai-opening",
            Source::Ai(AiVariant::Continuation) => "ai-continuation",
        }
    }
}

/// Pick the source for `choice`. Pure; never touches the network.
pub fn select_source(state: &AppState, choice: &Choice) -> Source {
    if let Some(segment) = choice
        .next_scene_id
        .as_deref()
        .and_then(|id| state.script_map.get(id))
    {
        return Source::Graph(segment.clone());
    }

    if let Some((head, rest)) = state.prelude_queue.split_first() {
        return Source::Prelude {
            head: head.clone(),
            rest: rest.to_vec(),
        };
    }

    if choice.id == START_GAME_CHOICE_ID {
        Source::Ai(AiVariant::Opening)
    } else {
        Source::Ai(AiVariant::Continuation)
    }
}

/// Resolves choices into segments and the state that shows them.
#[derive(Clone)]
pub struct Resolver {
    narrator: Arc<dyn Narrator>,
    illustrator: Arc<dyn Illustrator>,
}

impl Resolver {
    pub fn new(narrator: Arc<dyn Narrator>, illustrator: Arc<dyn Illustrator>) -> Self {
        Self {
            narrator,
            illustrator,
        }
    }

    pub fn illustrator(&self) -> &Arc<dyn Illustrator> {
        &self.illustrator
    }

    /// Resolve `choice` against `state`.
    ///
    /// On success returns the new segment and the next state. On failure
    /// `state` is left as it was; nothing is partially applied.
    pub async fn resolve_next(
        &self,
        state: &AppState,
        choice: &Choice,
    ) -> Result<(StorySegment, AppState), ResolveError> {
        let protagonist = state.protagonist.ok_or(ResolveError::NoProtagonist)?;
        let current = state
            .current_segment
            .as_ref()
            .ok_or(ResolveError::NoCurrentSegment)?;
        if current.find_choice(&choice.id).is_none() {
            return Err(ResolveError::ChoiceNotOffered(choice.id.clone()));
        }

        let source = select_source(state, choice);
        tracing::info!(
            source = source.kind(),
            choice = %choice.id,
            turn = state.turn(),
            "Resolving next segment"
        );

        let (segment, queue) = match source {
            Source::Graph(segment) => (segment, state.prelude_queue.clone()),
            Source::Prelude { head, rest } => (head, rest),
            Source::Ai(AiVariant::Opening) => {
                let segment = self.narrator.opening(protagonist).await?;
                (segment, Vec::new())
            }
            Source::Ai(AiVariant::Continuation) => {
                let mut history = state.history.clone();
                if let Some(last) = history.last_mut() {
                    last.choice_made = Some(choice.text.clone());
                }
                let segment = self
                    .narrator
                    .continuation(protagonist, &history, &choice.text)
                    .await?;
                (segment, Vec::new())
            }
        };

        let image = self.illustrator.illustrate(&segment.visual_description).await;
        let next = state
            .clone()
            .advance(&choice.text, segment.clone(), queue, image);
        Ok((segment, next))
    }
}
