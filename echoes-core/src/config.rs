//! API configuration: keys, endpoints and model overrides.

use crate::storage::{Storage, StorageError};
use echoes_llm::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage key for the persisted configuration.
pub const CONFIG_KEY: &str = "echoes_config_v1";

/// Errors from configuration handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No API key configured - set ECHOES_API_KEY or GEMINI_API_KEY")]
    NoApiKey,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// User-supplied overrides for the generation backend.
///
/// An empty `base_url` selects Gemini; any other value is treated as an
/// OpenAI-compatible chat completions URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_model: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ApiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from the environment.
    ///
    /// `ECHOES_API_KEY` wins over `GEMINI_API_KEY`.
    pub fn from_env() -> Self {
        let var = |name: &str| non_empty(std::env::var(name).ok());
        Self {
            api_key: var("ECHOES_API_KEY").or_else(|| var("GEMINI_API_KEY")),
            base_url: var("ECHOES_BASE_URL"),
            image_base_url: var("ECHOES_IMAGE_BASE_URL"),
            text_model: var("ECHOES_TEXT_MODEL"),
            image_model: var("ECHOES_IMAGE_MODEL"),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_image_base_url(mut self, url: impl Into<String>) -> Self {
        self.image_base_url = Some(url.into());
        self
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = Some(model.into());
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = Some(model.into());
        self
    }

    /// Fields set in `other` replace ours; blank values are ignored.
    pub fn overlay(self, other: &ApiConfig) -> Self {
        Self {
            api_key: non_empty(other.api_key.clone()).or(self.api_key),
            base_url: non_empty(other.base_url.clone()).or(self.base_url),
            image_base_url: non_empty(other.image_base_url.clone()).or(self.image_base_url),
            text_model: non_empty(other.text_model.clone()).or(self.text_model),
            image_model: non_empty(other.image_model.clone()).or(self.image_model),
        }
    }

    pub fn has_api_key(&self) -> bool {
        non_empty(self.api_key.clone()).is_some()
    }

    /// Whether requests go to a custom OpenAI-compatible endpoint.
    pub fn uses_custom_endpoint(&self) -> bool {
        non_empty(self.base_url.clone()).is_some()
    }

    /// Build a transport client for this configuration.
    pub fn build_client(&self) -> Result<Client, ConfigError> {
        let api_key = non_empty(self.api_key.clone()).ok_or(ConfigError::NoApiKey)?;

        let mut client = match non_empty(self.base_url.clone()) {
            Some(base_url) => Client::openai_compatible(
                api_key,
                base_url,
                non_empty(self.image_base_url.clone()),
            ),
            None => Client::gemini(api_key),
        };
        if let Some(model) = non_empty(self.text_model.clone()) {
            client = client.with_text_model(model);
        }
        if let Some(model) = non_empty(self.image_model.clone()) {
            client = client.with_image_model(model);
        }
        Ok(client)
    }

    /// Load the persisted configuration, if any.
    pub async fn load(storage: &dyn Storage) -> Result<Option<Self>, ConfigError> {
        match storage.get(CONFIG_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Persist this configuration independently of any game save.
    pub async fn save(&self, storage: &dyn Storage) -> Result<(), ConfigError> {
        let json = serde_json::to_string(self)?;
        storage.set(CONFIG_KEY, &json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use echoes_llm::Transport;

    #[test]
    fn test_overlay_prefers_set_fields() {
        let base = ApiConfig::new()
            .with_api_key("env-key")
            .with_text_model("gemini-2.5-flash");
        let user = ApiConfig::new().with_api_key("user-key").with_base_url("  ");
        let merged = base.overlay(&user);
        assert_eq!(merged.api_key.as_deref(), Some("user-key"));
        assert_eq!(merged.base_url, None);
        assert_eq!(merged.text_model.as_deref(), Some("gemini-2.5-flash"));
    }

    #[test]
    fn test_build_client_requires_key() {
        assert!(matches!(
            ApiConfig::new().build_client(),
            Err(ConfigError::NoApiKey)
        ));
    }

    #[test]
    fn test_build_client_selects_transport() {
        let gemini = ApiConfig::new().with_api_key("k").build_client().unwrap();
        assert_eq!(gemini.transport().name(), "gemini");

        let custom = ApiConfig::new()
            .with_api_key("k")
            .with_base_url("https://llm.local/v1/chat/completions")
            .with_text_model("qwen")
            .build_client()
            .unwrap();
        assert_eq!(custom.text_model(), "qwen");
        match custom.transport() {
            Transport::OpenAiCompatible { image_url, .. } => {
                assert_eq!(image_url, "https://llm.local/v1/images/generations")
            }
            other => panic!("unexpected transport {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_persisted_config_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(ApiConfig::load(&storage).await.unwrap(), None);

        let config = ApiConfig::new().with_api_key("k").with_image_model("img");
        config.save(&storage).await.unwrap();
        assert_eq!(ApiConfig::load(&storage).await.unwrap(), Some(config));
    }
}
