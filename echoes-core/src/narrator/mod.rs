//! AI story generation.
//!
//! The [`Narrator`] trait is the seam the resolver calls. [`AiNarrator`]
//! implements it over an `echoes_llm::Client` with a fixed system
//! instruction, a JSON response schema and whole-call retries.

pub mod prompts;
pub mod schema;

use crate::retry::RetryPolicy;
use crate::story::{GameHistoryItem, Protagonist, StorySegment};
use async_trait::async_trait;
use echoes_llm::{Client, TextRequest};
use thiserror::Error;

pub use prompts::Pacing;
pub use schema::{parse_segment, segment_schema, strip_code_fences, validate_segment};

/// Errors from segment generation.
#[derive(Debug, Error)]
pub enum NarratorError {
    #[error("Generation error: {0}")]
    Llm(#[from] echoes_llm::Error),

    #[error("Malformed segment JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid segment: {0}")]
    Invalid(String),

    #[error("Cannot continue a story with no history")]
    EmptyHistory,
}

/// Source of generated story segments.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// The first generated scene after the prelude.
    async fn opening(&self, protagonist: Protagonist) -> Result<StorySegment, NarratorError>;

    /// The scene following `choice_text`, given everything shown so far.
    ///
    /// The last history item already has its `choice_made` set.
    async fn continuation(
        &self,
        protagonist: Protagonist,
        history: &[GameHistoryItem],
        choice_text: &str,
    ) -> Result<StorySegment, NarratorError>;
}

/// Configuration for the AI narrator.
#[derive(Debug, Clone)]
pub struct NarratorConfig {
    /// Language the story is written in.
    pub language: String,
    /// History entries included in continuation prompts.
    pub history_window: usize,
    pub temperature: Option<f64>,
    pub retry: RetryPolicy,
    /// Appended to the system instruction.
    pub custom_instructions: Option<String>,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            language: "Simplified Chinese (简体中文)".to_string(),
            history_window: 6,
            temperature: None,
            retry: RetryPolicy::default(),
            custom_instructions: None,
        }
    }
}

impl NarratorConfig {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_custom_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.custom_instructions = Some(instructions.into());
        self
    }
}

/// Narrator backed by a remote text model.
pub struct AiNarrator {
    client: Client,
    config: NarratorConfig,
    system_prompt: String,
}

impl AiNarrator {
    pub fn new(client: Client, config: NarratorConfig) -> Self {
        let system_prompt = prompts::system_prompt(&config);
        Self {
            client,
            config,
            system_prompt,
        }
    }

    pub fn config(&self) -> &NarratorConfig {
        &self.config
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Prompt, schema and retry shared by both story variants.
    pub async fn generate_segment(&self, prompt: &str) -> Result<StorySegment, NarratorError> {
        self.config
            .retry
            .run("generate_segment", || self.request_segment(prompt))
            .await
    }

    async fn request_segment(&self, prompt: &str) -> Result<StorySegment, NarratorError> {
        let mut request = TextRequest::new(prompt)
            .with_system(self.system_prompt.clone())
            .with_json_schema(segment_schema());
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }

        let raw = self.client.generate_text(request).await?;
        parse_segment(&raw)
    }
}

#[async_trait]
impl Narrator for AiNarrator {
    async fn opening(&self, protagonist: Protagonist) -> Result<StorySegment, NarratorError> {
        tracing::info!(protagonist = ?protagonist, "Generating story opening");
        let prompt = prompts::opening_prompt(protagonist, &self.config);
        self.generate_segment(&prompt).await
    }

    async fn continuation(
        &self,
        protagonist: Protagonist,
        history: &[GameHistoryItem],
        choice_text: &str,
    ) -> Result<StorySegment, NarratorError> {
        if history.is_empty() {
            return Err(NarratorError::EmptyHistory);
        }
        tracing::info!(turn = history.len(), choice = choice_text, "Generating next segment");
        let prompt = prompts::continuation_prompt(protagonist, history, choice_text, &self.config);
        self.generate_segment(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NarratorConfig::default();
        assert_eq!(config.history_window, 6);
        assert!(config.language.contains("Chinese"));
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_config_builder() {
        let config = NarratorConfig::default()
            .with_history_window(2)
            .with_temperature(0.4)
            .with_custom_instructions("Keep it short.");
        assert_eq!(config.history_window, 2);
        assert_eq!(config.temperature, Some(0.4));
        assert_eq!(config.custom_instructions.as_deref(), Some("Keep it short."));
    }

    #[test]
    fn test_system_prompt_includes_custom_instructions() {
        let narrator = AiNarrator::new(
            Client::gemini("test-key"),
            NarratorConfig::default().with_custom_instructions("No gore."),
        );
        assert!(narrator.system_prompt().ends_with("No gore.\n"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_retry_delay() {
        let narrator = AiNarrator::new(
            Client::gemini(""),
            NarratorConfig::default().with_retry(RetryPolicy::none()),
        );
        let err = narrator.opening(Protagonist::Male).await.unwrap_err();
        assert!(matches!(err, NarratorError::Llm(echoes_llm::Error::NoApiKey)));
    }

    #[tokio::test]
    async fn test_continuation_requires_history() {
        let narrator = AiNarrator::new(Client::gemini("k"), NarratorConfig::default());
        let err = narrator
            .continuation(Protagonist::Female, &[], "go")
            .await
            .unwrap_err();
        assert!(matches!(err, NarratorError::EmptyHistory));
    }
}
