//! Branching visual novel engine with AI narration.
//!
//! This crate provides:
//! - The story data model (segments, dialogue lines, choices, history)
//! - A resolver that picks each next segment from an imported script graph,
//!   the fixed prelude, or AI generation, in that order
//! - AI story and scene-image clients over `echoes-llm`
//! - Autosave, export/import of saves and script import
//!
//! # Quick Start
//!
//! ```ignore
//! use echoes_core::{GameSession, Protagonist, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = GameSession::new(SessionConfig::from_env()).await?;
//!     session.start_game(Protagonist::Male).await?;
//!
//!     let segment = session.choose("next1").await?;
//!     for line in &segment.lines {
//!         println!("{}: {}", line.speaker, line.text);
//!     }
//!
//!     session.export_save("saves").await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod headless;
pub mod illustrator;
pub mod narrator;
pub mod persist;
pub mod prelude;
pub mod resolver;
pub mod retry;
pub mod session;
pub mod state;
pub mod storage;
pub mod story;
pub mod testing;

// Primary public API
pub use config::{ApiConfig, ConfigError};
pub use headless::{HeadlessConfig, HeadlessGame, TranscriptEntry};
pub use illustrator::{AiIllustrator, Illustrator, IllustratorConfig, NoopIllustrator};
pub use narrator::{AiNarrator, Narrator, NarratorConfig, NarratorError};
pub use persist::PersistError;
pub use resolver::{ResolveError, Resolver, Source};
pub use retry::RetryPolicy;
pub use session::{GameSession, SessionConfig, SessionError};
pub use state::{AppState, GameStatus};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use story::{
    Choice, ChoiceKind, DialogueLine, Emotion, EndingType, GameHistoryItem, Protagonist,
    StorySegment,
};
pub use testing::{MockIllustrator, MockNarrator, TestHarness};
