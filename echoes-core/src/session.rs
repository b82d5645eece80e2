//! GameSession - the primary public API for playing a story.
//!
//! The session owns the single `AppState`. Every operation computes the next
//! state from the current one and swaps it in whole; on failure the story
//! part of the state is kept and only the loading flag and error banner move.

use crate::config::{ApiConfig, ConfigError};
use crate::illustrator::{AiIllustrator, IllustratorConfig, Illustrator, NoopIllustrator};
use crate::narrator::{AiNarrator, Narrator, NarratorConfig, NarratorError};
use crate::persist::{self, PersistError};
use crate::prelude::prelude;
use crate::resolver::{ResolveError, Resolver};
use crate::state::{AppState, GameStatus};
use crate::storage::{FileStorage, Storage, StorageError};
use crate::story::{GameHistoryItem, Protagonist, StorySegment};
use echoes_llm::Client;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Messages shown in the error banner.
pub mod messages {
    pub const NETWORK: &str = "网络连接中断，请重新选择。";
    pub const NO_API_KEY: &str = "未配置 API 密钥，请先在设置中填写。";
    pub const BAD_SAVE: &str = "无法读取存档文件，格式可能损坏。";
    pub const BAD_AUTOSAVE: &str = "无法读取自动存档。";
    pub const WRONG_FILE_TYPE: &str = "请选择正确的 JSON 存档文件";
    pub const BAD_SCRIPT: &str = "剧本格式错误";
    pub const EXPORT_FAILED: &str = "存档导出失败。";
}

/// Errors from GameSession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("A request is already running")]
    Busy,

    #[error("Not in play (status {0:?})")]
    NotPlaying(GameStatus),

    #[error("No autosave found")]
    NoAutosave,
}

impl SessionError {
    /// Banner text for this error.
    ///
    /// Transport and response-shape failures share one generic message.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Resolve(ResolveError::Narration(NarratorError::Llm(
                echoes_llm::Error::NoApiKey,
            ))) => messages::NO_API_KEY.to_string(),
            SessionError::Resolve(_) => messages::NETWORK.to_string(),
            SessionError::Persist(PersistError::NotJsonFile(_)) => {
                messages::WRONG_FILE_TYPE.to_string()
            }
            SessionError::Persist(PersistError::InvalidScript(detail)) => {
                format!("{}：{detail}", messages::BAD_SCRIPT)
            }
            SessionError::Persist(PersistError::ExportBlocked) => {
                messages::EXPORT_FAILED.to_string()
            }
            SessionError::Persist(_) => messages::BAD_SAVE.to_string(),
            SessionError::Config(ConfigError::NoApiKey) => messages::NO_API_KEY.to_string(),
            other => other.to_string(),
        }
    }
}

/// Configuration for creating a game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory holding the autosave and persisted settings.
    pub save_dir: PathBuf,
    /// Base API configuration, normally from the environment.
    pub api: ApiConfig,
    pub narrator: NarratorConfig,
    pub illustrator: IllustratorConfig,
    /// Generate scene images.
    pub images: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("saves"),
            api: ApiConfig::default(),
            narrator: NarratorConfig::default(),
            illustrator: IllustratorConfig::default(),
            images: true,
        }
    }
}

impl SessionConfig {
    /// Defaults with API settings read from the environment.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            ..Self::default()
        }
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }

    pub fn with_api(mut self, api: ApiConfig) -> Self {
        self.api = api;
        self
    }

    pub fn with_narrator(mut self, narrator: NarratorConfig) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn with_illustrator(mut self, illustrator: IllustratorConfig) -> Self {
        self.illustrator = illustrator;
        self
    }

    pub fn with_images(mut self, enabled: bool) -> Self {
        self.images = enabled;
        self
    }

    fn build_components(&self, user: &ApiConfig) -> (Arc<dyn Narrator>, Arc<dyn Illustrator>) {
        let effective = self.api.clone().overlay(user);
        let client = match effective.build_client() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "AI generation unavailable until an API key is set");
                Client::gemini("")
            }
        };
        tracing::info!(
            transport = client.transport().name(),
            text_model = client.text_model(),
            image_model = client.image_model(),
            images = self.images,
            "Generation backend configured"
        );

        let narrator: Arc<dyn Narrator> =
            Arc::new(AiNarrator::new(client.clone(), self.narrator.clone()));
        let illustrator: Arc<dyn Illustrator> = if self.images {
            Arc::new(AiIllustrator::new(client, self.illustrator.clone()))
        } else {
            Arc::new(NoopIllustrator)
        };
        (narrator, illustrator)
    }
}

/// A single player's story.
pub struct GameSession {
    state: AppState,
    resolver: Resolver,
    storage: Arc<dyn Storage>,
    /// Present when components are built from configuration and can be rebuilt.
    config: Option<SessionConfig>,
}

impl GameSession {
    /// Create a session backed by the save directory in `config`.
    ///
    /// Persisted API overrides are layered over `config.api`.
    pub async fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(&config.save_dir));
        let user = match ApiConfig::load(storage.as_ref()).await {
            Ok(user) => user.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable saved settings");
                ApiConfig::default()
            }
        };

        let (narrator, illustrator) = config.build_components(&user);
        Ok(Self {
            state: AppState::new().with_api_config(user),
            resolver: Resolver::new(narrator, illustrator),
            storage,
            config: Some(config),
        })
    }

    /// Create a session from ready-made components.
    pub fn with_components(
        narrator: Arc<dyn Narrator>,
        illustrator: Arc<dyn Illustrator>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            state: AppState::new(),
            resolver: Resolver::new(narrator, illustrator),
            storage,
            config: None,
        }
    }

    // ========================================================================
    // Story
    // ========================================================================

    /// Start a new story from the prelude, discarding the autosave.
    pub async fn start_game(&mut self, protagonist: Protagonist) -> Result<(), SessionError> {
        if self.state.is_loading {
            return Err(SessionError::Busy);
        }
        if let Err(e) = persist::clear_autosave(self.storage.as_ref()).await {
            tracing::warn!(error = %e, "Failed to clear old autosave");
        }

        let mut segments = prelude(protagonist).into_iter();
        let Some(head) = segments.next() else {
            return Err(SessionError::NotPlaying(self.state.status));
        };
        tracing::info!(protagonist = ?protagonist, "Starting new game");

        self.state = self
            .state
            .clone()
            .begin(protagonist, head, segments.collect(), BTreeMap::new());
        self.refresh_image().await;
        self.autosave().await;
        Ok(())
    }

    /// Pick a choice on the current segment.
    ///
    /// On failure the history and current segment stay as they were and the
    /// error banner is set.
    pub async fn choose(&mut self, choice_id: &str) -> Result<StorySegment, SessionError> {
        if self.state.is_loading {
            return Err(SessionError::Busy);
        }
        if self.state.status != GameStatus::Playing {
            return Err(SessionError::NotPlaying(self.state.status));
        }
        let choice = self
            .state
            .current_segment
            .as_ref()
            .and_then(|s| s.find_choice(choice_id))
            .cloned()
            .ok_or_else(|| ResolveError::ChoiceNotOffered(choice_id.to_string()))?;

        self.state = self.state.clone().loading();
        match self.resolver.resolve_next(&self.state, &choice).await {
            Ok((segment, next)) => {
                self.state = next;
                if self.state.status.is_terminal() {
                    tracing::info!(status = ?self.state.status, "Story reached an ending");
                }
                self.autosave().await;
                Ok(segment)
            }
            Err(e) => {
                let err = SessionError::from(e);
                tracing::error!(error = %err, choice = choice_id, "Turn failed");
                self.state = self.state.clone().fail(err.user_message());
                Err(err)
            }
        }
    }

    /// Resume from the autosave.
    pub async fn continue_game(&mut self) -> Result<(), SessionError> {
        match persist::load_autosave(self.storage.as_ref()).await {
            Ok(Some(state)) => {
                self.replace_state(state);
                Ok(())
            }
            Ok(None) => Err(SessionError::NoAutosave),
            Err(e) => {
                self.state = self.state.clone().fail(messages::BAD_AUTOSAVE);
                Err(e.into())
            }
        }
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Write the state to a timestamped file in `dir`.
    pub async fn export_save(&self, dir: impl AsRef<Path>) -> Result<PathBuf, SessionError> {
        let path = persist::export_save(&self.state, dir).await?;
        tracing::info!(path = %path.display(), "Game exported");
        Ok(path)
    }

    /// Replace the state with a save given as JSON text.
    pub fn import_save_json(&mut self, json: &str) -> Result<(), SessionError> {
        let result = persist::parse_save(json);
        self.apply_import(result)
    }

    /// Replace the state with a save file.
    pub async fn import_save_file(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let result = persist::read_save_file(path).await;
        self.apply_import(result)
    }

    /// Start playing a script given as JSON text.
    pub async fn import_script_json(
        &mut self,
        protagonist: Protagonist,
        json: &str,
    ) -> Result<(), SessionError> {
        let result = persist::parse_script(json);
        self.begin_script(protagonist, result).await
    }

    /// Start playing a script file.
    pub async fn import_script_file(
        &mut self,
        protagonist: Protagonist,
        path: impl AsRef<Path>,
    ) -> Result<(), SessionError> {
        let result = persist::read_script_file(path).await;
        self.begin_script(protagonist, result).await
    }

    // ========================================================================
    // Menu and settings
    // ========================================================================

    pub fn main_menu(&mut self) {
        self.state = self.state.clone().back_to_menu();
    }

    pub fn dismiss_error(&mut self) {
        self.state = self.state.clone().dismiss_error();
    }

    /// Replace the API overrides, persist them and rebuild the clients.
    pub async fn update_config(&mut self, config: ApiConfig) -> Result<(), SessionError> {
        config.save(self.storage.as_ref()).await?;
        if let Some(ref session_config) = self.config {
            let (narrator, illustrator) = session_config.build_components(&config);
            self.resolver = Resolver::new(narrator, illustrator);
        }
        self.state = self.state.clone().with_api_config(config);
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn status(&self) -> GameStatus {
        self.state.status
    }

    pub fn protagonist(&self) -> Option<Protagonist> {
        self.state.protagonist
    }

    pub fn current_segment(&self) -> Option<&StorySegment> {
        self.state.current_segment.as_ref()
    }

    pub fn current_image(&self) -> Option<&str> {
        self.state.current_image.as_deref()
    }

    pub fn history(&self) -> &[GameHistoryItem] {
        &self.state.history
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn api_config(&self) -> &ApiConfig {
        &self.state.api_config
    }

    pub async fn has_autosave(&self) -> bool {
        persist::has_autosave(self.storage.as_ref()).await
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn replace_state(&mut self, state: AppState) {
        let api_config = self.state.api_config.clone();
        self.state = state.with_api_config(api_config);
    }

    fn apply_import(&mut self, result: Result<AppState, PersistError>) -> Result<(), SessionError> {
        match result {
            Ok(state) => {
                tracing::info!(
                    turns = state.history.len(),
                    status = ?state.status,
                    "Save imported"
                );
                self.replace_state(state);
                Ok(())
            }
            Err(e) => {
                let err = SessionError::from(e);
                tracing::warn!(error = %err, "Save import rejected");
                self.state = self.state.clone().fail(err.user_message());
                Err(err)
            }
        }
    }

    async fn begin_script(
        &mut self,
        protagonist: Protagonist,
        result: Result<persist::ScriptGraph, PersistError>,
    ) -> Result<(), SessionError> {
        let script = match result {
            Ok(script) => script,
            Err(e) => {
                let err = SessionError::from(e);
                tracing::warn!(error = %err, "Script import rejected");
                self.state = self.state.clone().fail(err.user_message());
                return Err(err);
            }
        };
        tracing::info!(scenes = script.nodes.len(), "Script imported");

        self.state = self
            .state
            .clone()
            .begin(protagonist, script.entry, Vec::new(), script.nodes);
        self.refresh_image().await;
        self.autosave().await;
        Ok(())
    }

    async fn refresh_image(&mut self) {
        let Some(description) = self
            .state
            .current_segment
            .as_ref()
            .map(|s| s.visual_description.clone())
        else {
            return;
        };
        let image = self.resolver.illustrator().illustrate(&description).await;
        self.state = self.state.clone().with_image(image);
    }

    async fn autosave(&self) {
        match persist::autosave(self.storage.as_ref(), &self.state).await {
            Ok(true) => tracing::debug!(turn = self.state.turn(), "Autosaved"),
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "Autosave failed, continuing without it"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::default()
            .with_save_dir("/tmp/echoes")
            .with_images(false)
            .with_api(ApiConfig::new().with_api_key("k"));
        assert_eq!(config.save_dir, PathBuf::from("/tmp/echoes"));
        assert!(!config.images);
        assert!(config.api.has_api_key());
    }

    #[test]
    fn test_user_messages() {
        let network = SessionError::from(ResolveError::Narration(NarratorError::Invalid(
            "no lines".into(),
        )));
        assert_eq!(network.user_message(), messages::NETWORK);

        let key = SessionError::from(ResolveError::Narration(NarratorError::Llm(
            echoes_llm::Error::NoApiKey,
        )));
        assert_eq!(key.user_message(), messages::NO_API_KEY);

        let wrong_type = SessionError::from(PersistError::NotJsonFile(PathBuf::from("a.txt")));
        assert_eq!(wrong_type.user_message(), messages::WRONG_FILE_TYPE);

        let script = SessionError::from(PersistError::InvalidScript("script is empty".into()));
        assert!(script.user_message().contains("script is empty"));
    }
}
