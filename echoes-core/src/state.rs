//! Application state and its transitions.
//!
//! `AppState` is never edited in place by callers. Each transition consumes
//! the old state and returns the next one.

use crate::config::ApiConfig;
use crate::story::{GameHistoryItem, Protagonist, StorySegment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level screen the game is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    #[default]
    Menu,
    Playing,
    GameOver,
    Victory,
}

impl GameStatus {
    /// Status after showing `segment`.
    pub fn after(segment: &StorySegment) -> Self {
        if !segment.is_ending {
            GameStatus::Playing
        } else if segment.is_defeat() {
            GameStatus::GameOver
        } else {
            GameStatus::Victory
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GameStatus::GameOver | GameStatus::Victory)
    }
}

/// Everything the front end renders, and everything a save contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub status: GameStatus,
    #[serde(default)]
    pub protagonist: Option<Protagonist>,
    pub history: Vec<GameHistoryItem>,
    #[serde(default)]
    pub current_segment: Option<StorySegment>,
    #[serde(default)]
    pub current_image: Option<String>,
    #[serde(default)]
    pub prelude_queue: Vec<StorySegment>,
    #[serde(default)]
    pub script_map: BTreeMap<String, StorySegment>,
    #[serde(default)]
    pub is_loading: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Backend overrides. Kept out of saves, persisted on their own.
    #[serde(skip)]
    pub api_config: ApiConfig,
}

impl AppState {
    /// A fresh state on the main menu.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_config(mut self, config: ApiConfig) -> Self {
        self.api_config = config;
        self
    }

    /// Enter play on `entry`, with `queue` and `script_map` as the remaining sources.
    pub fn begin(
        self,
        protagonist: Protagonist,
        entry: StorySegment,
        queue: Vec<StorySegment>,
        script_map: BTreeMap<String, StorySegment>,
    ) -> Self {
        Self {
            status: GameStatus::after(&entry),
            protagonist: Some(protagonist),
            history: vec![GameHistoryItem::new(entry.clone())],
            current_segment: Some(entry),
            current_image: None,
            prelude_queue: queue,
            script_map,
            is_loading: false,
            error: None,
            api_config: self.api_config,
        }
    }

    /// Mark a request in flight.
    pub fn loading(self) -> Self {
        Self {
            is_loading: true,
            error: None,
            ..self
        }
    }

    /// Record `choice_text` on the last history entry and show `segment`.
    pub fn advance(
        self,
        choice_text: &str,
        segment: StorySegment,
        prelude_queue: Vec<StorySegment>,
        image: Option<String>,
    ) -> Self {
        let mut history = self.history;
        if let Some(last) = history.last_mut() {
            last.choice_made = Some(choice_text.to_string());
        }
        history.push(GameHistoryItem::new(segment.clone()));

        Self {
            status: GameStatus::after(&segment),
            history,
            current_segment: Some(segment),
            current_image: image,
            prelude_queue,
            is_loading: false,
            error: None,
            ..self
        }
    }

    pub fn with_image(self, image: Option<String>) -> Self {
        Self {
            current_image: image,
            ..self
        }
    }

    /// Stop loading and show an error banner. History is untouched.
    pub fn fail(self, message: impl Into<String>) -> Self {
        Self {
            is_loading: false,
            error: Some(message.into()),
            ..self
        }
    }

    pub fn dismiss_error(self) -> Self {
        Self {
            error: None,
            ..self
        }
    }

    /// Return to the main menu, keeping the story so it can be exported.
    pub fn back_to_menu(self) -> Self {
        Self {
            status: GameStatus::Menu,
            is_loading: false,
            error: None,
            ..self
        }
    }

    /// Whether the autosave should capture this state.
    pub fn is_autosavable(&self) -> bool {
        self.status == GameStatus::Playing && !self.is_loading && self.current_segment.is_some()
    }

    /// Number of segments shown so far.
    pub fn turn(&self) -> usize {
        self.history.len()
    }
}
