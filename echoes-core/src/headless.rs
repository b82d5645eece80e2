//! Headless game interface for programmatic use.
//!
//! This module drives a story without a TUI. It's designed for:
//! - Automated testing, with mock or real generation
//! - Script-driven play through a fixed list of choices
//! - Inspecting transcripts of whole playthroughs
//!
//! # Example
//!
//! ```ignore
//! use echoes_core::headless::{HeadlessConfig, HeadlessGame};
//! use echoes_core::Protagonist;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HeadlessConfig::quick_start(Protagonist::Female).with_images(false);
//!     let mut game = HeadlessGame::new(config).await?;
//!
//!     // Walk through the prelude
//!     while let Some(choice) = game.choices().first().map(|c| c.id.clone()) {
//!         let segment = game.choose(&choice).await?;
//!         println!("{}", segment.lines[0].text);
//!         if game.is_over() {
//!             break;
//!         }
//!     }
//!
//!     game.export("saves").await?;
//!     Ok(())
//! }
//! ```

use crate::config::ApiConfig;
use crate::session::{GameSession, SessionConfig, SessionError};
use crate::state::GameStatus;
use crate::story::{Choice, GameHistoryItem, Protagonist, StorySegment};
use std::path::{Path, PathBuf};

/// Configuration for a headless game session.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    pub protagonist: Protagonist,
    /// Directory for the autosave and settings.
    pub save_dir: PathBuf,
    /// Script to play instead of the prelude.
    pub script: Option<PathBuf>,
    /// Generate scene images.
    pub images: bool,
    pub api: ApiConfig,
}

impl HeadlessConfig {
    /// Prelude start with API settings from the environment.
    pub fn quick_start(protagonist: Protagonist) -> Self {
        Self {
            protagonist,
            save_dir: PathBuf::from("saves"),
            script: None,
            images: true,
            api: ApiConfig::from_env(),
        }
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }

    pub fn with_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.script = Some(path.into());
        self
    }

    pub fn with_images(mut self, enabled: bool) -> Self {
        self.images = enabled;
        self
    }

    pub fn with_api(mut self, api: ApiConfig) -> Self {
        self.api = api;
        self
    }

    /// Session settings for this configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_save_dir(&self.save_dir)
            .with_api(self.api.clone())
            .with_images(self.images)
    }
}

/// An entry in the game transcript.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    /// Choice that led here, `None` for the first segment.
    pub choice: Option<String>,
    pub segment: StorySegment,
    pub turn: usize,
}

/// A story that can be played programmatically.
///
/// This wraps `GameSession` and keeps a transcript of every segment shown.
pub struct HeadlessGame {
    session: GameSession,
    transcript: Vec<TranscriptEntry>,
}

impl HeadlessGame {
    /// Create a game and enter play, from the script if one is configured.
    pub async fn new(config: HeadlessConfig) -> Result<Self, SessionError> {
        let session = GameSession::new(config.session_config()).await?;
        let mut game = Self::from_session(session);
        match config.script {
            Some(ref path) => game.start_script(config.protagonist, path).await?,
            None => game.start(config.protagonist).await?,
        }
        Ok(game)
    }

    /// Wrap an existing session without starting anything.
    pub fn from_session(session: GameSession) -> Self {
        Self {
            session,
            transcript: Vec::new(),
        }
    }

    /// Start a new story from the prelude.
    pub async fn start(&mut self, protagonist: Protagonist) -> Result<(), SessionError> {
        self.session.start_game(protagonist).await?;
        self.restart_transcript();
        Ok(())
    }

    /// Start a script file.
    pub async fn start_script(
        &mut self,
        protagonist: Protagonist,
        path: impl AsRef<Path>,
    ) -> Result<(), SessionError> {
        self.session.import_script_file(protagonist, path).await?;
        self.restart_transcript();
        Ok(())
    }

    /// Pick a choice by id.
    pub async fn choose(&mut self, choice_id: &str) -> Result<StorySegment, SessionError> {
        let choice_text = self
            .choices()
            .iter()
            .find(|c| c.id == choice_id)
            .map(|c| c.text.clone());
        let segment = self.session.choose(choice_id).await?;

        self.transcript.push(TranscriptEntry {
            choice: choice_text,
            segment: segment.clone(),
            turn: self.transcript.len(),
        });
        Ok(segment)
    }

    /// Pick a choice by 1-based position.
    pub async fn choose_index(&mut self, index: usize) -> Result<StorySegment, SessionError> {
        let id = index
            .checked_sub(1)
            .and_then(|i| self.choices().get(i))
            .map(|c| c.id.clone())
            .unwrap_or_else(|| index.to_string());
        self.choose(&id).await
    }

    /// Export a save into `dir`.
    pub async fn export(&self, dir: impl AsRef<Path>) -> Result<PathBuf, SessionError> {
        self.session.export_save(dir).await
    }

    /// Load a save file, replacing the current story.
    pub async fn load(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        self.session.import_save_file(path).await?;
        self.restart_transcript();
        Ok(())
    }

    /// Resume from the autosave.
    pub async fn resume(&mut self) -> Result<(), SessionError> {
        self.session.continue_game().await?;
        self.restart_transcript();
        Ok(())
    }

    fn restart_transcript(&mut self) {
        self.transcript.clear();
        if let Some(segment) = self.session.current_segment() {
            self.transcript.push(TranscriptEntry {
                choice: None,
                segment: segment.clone(),
                turn: 0,
            });
        }
    }

    // ========================================================================
    // Game State Queries
    // ========================================================================

    pub fn status(&self) -> GameStatus {
        self.session.status()
    }

    /// Whether an ending has been reached.
    pub fn is_over(&self) -> bool {
        self.session.status().is_terminal()
    }

    pub fn current_segment(&self) -> Option<&StorySegment> {
        self.session.current_segment()
    }

    /// Choices offered right now.
    pub fn choices(&self) -> &[Choice] {
        self.session
            .current_segment()
            .map(|s| s.choices.as_slice())
            .unwrap_or(&[])
    }

    pub fn history(&self) -> &[GameHistoryItem] {
        self.session.history()
    }

    pub fn error(&self) -> Option<&str> {
        self.session.error()
    }

    /// Clear the error banner so play and export can go on.
    pub fn dismiss_error(&mut self) {
        self.session.dismiss_error();
    }

    /// Get the transcript of all exchanges.
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Get the underlying session for advanced use.
    pub fn session(&self) -> &GameSession {
        &self.session
    }
}
