//! Minimal generative-AI client for story text and scene images.
//!
//! This crate provides a focused client with two interchangeable transports:
//! - Gemini `generateContent` (the default when no custom endpoint is set)
//! - OpenAI-compatible `chat/completions` and `images/generations`
//!
//! Callers build a [`TextRequest`] or [`ImageRequest`] and never need to know
//! which transport serves it.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default Gemini REST base.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default model for story text.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
/// Default model for scene images.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

const CHAT_PATH: &str = "chat/completions";
const IMAGES_PATH: &str = "images/generations";

/// Errors that can occur when using the client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Empty response from {0}")]
    EmptyResponse(&'static str),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Which wire protocol a [`Client`] speaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Gemini `generateContent` at the given API base.
    Gemini { api_base: String },
    /// OpenAI-compatible endpoints with bearer authentication.
    OpenAiCompatible { chat_url: String, image_url: String },
}

impl Transport {
    /// Name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Transport::Gemini { .. } => "gemini",
            Transport::OpenAiCompatible { .. } => "openai-compatible",
        }
    }
}

/// Text and image generation client.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: String,
    transport: Transport,
    text_model: String,
    image_model: String,
}

impl Client {
    /// Create a client for the Gemini API.
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::with_transport(
            api_key,
            Transport::Gemini {
                api_base: GEMINI_API_BASE.to_string(),
            },
        )
    }

    /// Create a client for an OpenAI-compatible endpoint.
    ///
    /// `base_url` is the chat completions URL. When `image_url` is `None` the
    /// images endpoint is inferred from it with [`infer_image_endpoint`].
    pub fn openai_compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        image_url: Option<String>,
    ) -> Self {
        let chat_url = base_url.into();
        let image_url = image_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| infer_image_endpoint(&chat_url));
        Self::with_transport(
            api_key,
            Transport::OpenAiCompatible {
                chat_url,
                image_url,
            },
        )
    }

    fn with_transport(api_key: impl Into<String>, transport: Transport) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key: api_key.into(),
            transport,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }

    /// Set the default text model.
    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    /// Set the default image model.
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    /// Point the Gemini transport at a different API base (proxies, tests).
    pub fn with_gemini_base(mut self, api_base: impl Into<String>) -> Self {
        if let Transport::Gemini { .. } = self.transport {
            self.transport = Transport::Gemini {
                api_base: api_base.into().trim_end_matches('/').to_string(),
            };
        }
        self
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    /// Generate text and return the raw model output.
    pub async fn generate_text(&self, request: TextRequest) -> Result<String, Error> {
        if self.api_key.is_empty() {
            return Err(Error::NoApiKey);
        }
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.text_model.clone());
        tracing::debug!(
            transport = self.transport.name(),
            %model,
            json = request.json,
            "text request"
        );

        match &self.transport {
            Transport::Gemini { api_base } => {
                let body = build_gemini_text_request(&request);
                let response: GeminiResponse = self
                    .post_json(&gemini_url(api_base, &model), self.gemini_headers()?, &body)
                    .await?;
                let text = response.text();
                if text.trim().is_empty() {
                    return Err(Error::EmptyResponse("Gemini"));
                }
                Ok(text)
            }
            Transport::OpenAiCompatible { chat_url, .. } => {
                let body = build_chat_request(&request, model);
                let response: ChatResponse = self
                    .post_json(chat_url, self.bearer_headers()?, &body)
                    .await?;
                response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .filter(|c| !c.trim().is_empty())
                    .ok_or(Error::EmptyResponse("chat completions"))
            }
        }
    }

    /// Generate an image for a prompt.
    pub async fn generate_image(&self, request: ImageRequest) -> Result<Image, Error> {
        if self.api_key.is_empty() {
            return Err(Error::NoApiKey);
        }
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.image_model.clone());
        tracing::debug!(transport = self.transport.name(), %model, "image request");

        match &self.transport {
            Transport::Gemini { api_base } => {
                let body = build_gemini_image_request(&request);
                let response: GeminiResponse = self
                    .post_json(&gemini_url(api_base, &model), self.gemini_headers()?, &body)
                    .await?;
                response
                    .inline_image()
                    .ok_or(Error::EmptyResponse("Gemini image generation"))
            }
            Transport::OpenAiCompatible { image_url, .. } => {
                let body = ApiImageRequest {
                    model,
                    prompt: request.prompt.clone(),
                    n: 1,
                    size: request.size.clone(),
                };
                let response: ApiImageResponse = self
                    .post_json(image_url, self.bearer_headers()?, &body)
                    .await?;
                response
                    .data
                    .into_iter()
                    .next()
                    .and_then(|d| match (d.url, d.b64_json) {
                        (Some(url), _) => Some(Image::Url(url)),
                        (None, Some(data)) => Some(Image::Inline {
                            mime_type: "image/png".to_string(),
                            data,
                        }),
                        (None, None) => None,
                    })
                    .ok_or_else(|| Error::Parse("unknown image response format".to_string()))
            }
        }
    }

    async fn post_json<B, R>(&self, url: &str, headers: HeaderMap, body: &B) -> Result<R, Error>
    where
        B: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .http
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }

    fn gemini_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }

    fn bearer_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }
}

/// Infer the images endpoint from a chat completions URL.
///
/// `.../chat/completions` becomes `.../images/generations`; any other URL not
/// already ending in `images/generations` gets that path appended.
pub fn infer_image_endpoint(chat_url: &str) -> String {
    let replaced = chat_url.replace(CHAT_PATH, IMAGES_PATH);
    if replaced.ends_with(IMAGES_PATH) {
        replaced
    } else {
        format!("{}/{IMAGES_PATH}", replaced.trim_end_matches('/'))
    }
}

fn gemini_url(api_base: &str, model: &str) -> String {
    format!("{api_base}/models/{model}:generateContent")
}

// ============================================================================
// Public types
// ============================================================================

/// A text generation request.
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub model: Option<String>,
    pub system: Option<String>,
    pub prompt: String,
    /// Ask for a JSON object response.
    pub json: bool,
    /// Schema the JSON response must follow (Gemini `responseSchema` style).
    pub response_schema: Option<serde_json::Value>,
    pub temperature: Option<f64>,
}

impl TextRequest {
    /// Create a plain-text request for the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            system: None,
            prompt: prompt.into(),
            json: false,
            response_schema: None,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Request a JSON response validated against `schema`.
    pub fn with_json_schema(mut self, schema: serde_json::Value) -> Self {
        self.json = true;
        self.response_schema = Some(schema);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// An image generation request.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub model: Option<String>,
    pub prompt: String,
    /// Aspect ratio hint for Gemini, e.g. "16:9".
    pub aspect_ratio: String,
    /// Pixel size for OpenAI-compatible endpoints, e.g. "1024x1024".
    pub size: String,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            prompt: prompt.into(),
            aspect_ratio: "16:9".to_string(),
            size: "1024x1024".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = ratio.into();
        self
    }
}

/// A generated image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Image {
    /// Hosted image.
    Url(String),
    /// Inline base64 payload.
    Inline { mime_type: String, data: String },
}

impl Image {
    /// Render as something an `<img src>` (or a file writer) can consume.
    pub fn to_src(&self) -> String {
        match self {
            Image::Url(url) => url.clone(),
            Image::Inline { mime_type, data } => format!("data:{mime_type};base64,{data}"),
        }
    }
}

// ============================================================================
// Gemini wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<GeminiImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl GeminiResponse {
    fn parts(&self) -> impl Iterator<Item = &GeminiPart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter())
            .into_iter()
            .flatten()
    }

    fn text(&self) -> String {
        self.parts()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    fn inline_image(&self) -> Option<Image> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
            .map(|d| Image::Inline {
                mime_type: d.mime_type.clone(),
                data: d.data.clone(),
            })
    }
}

fn user_content(text: &str) -> GeminiContent {
    GeminiContent {
        role: Some("user".to_string()),
        parts: vec![GeminiPart {
            text: Some(text.to_string()),
            inline_data: None,
        }],
    }
}

fn build_gemini_text_request(request: &TextRequest) -> GeminiRequest {
    GeminiRequest {
        contents: vec![user_content(&request.prompt)],
        system_instruction: request.system.as_ref().map(|s| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: Some(s.clone()),
                inline_data: None,
            }],
        }),
        generation_config: GeminiGenerationConfig {
            temperature: request.temperature,
            response_mime_type: request.json.then(|| "application/json".to_string()),
            response_schema: if request.json {
                request.response_schema.clone()
            } else {
                None
            },
            ..Default::default()
        },
    }
}

fn build_gemini_image_request(request: &ImageRequest) -> GeminiRequest {
    GeminiRequest {
        contents: vec![user_content(&request.prompt)],
        system_instruction: None,
        generation_config: GeminiGenerationConfig {
            response_modalities: Some(vec!["IMAGE".to_string()]),
            image_config: Some(GeminiImageConfig {
                aspect_ratio: request.aspect_ratio.clone(),
            }),
            ..Default::default()
        },
    }
}

// ============================================================================
// OpenAI-compatible wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
struct ApiImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
}

#[derive(Debug, Deserialize)]
struct ApiImageResponse {
    #[serde(default)]
    data: Vec<ApiImageData>,
}

#[derive(Debug, Deserialize)]
struct ApiImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}

fn build_chat_request(request: &TextRequest, model: String) -> ChatRequest {
    let mut system = request.system.clone().unwrap_or_default();
    if request.json {
        // Generic endpoints cannot enforce a schema, so describe it inline.
        system.push_str(
            "\nIMPORTANT: Respond ONLY with valid JSON matching the schema provided.",
        );
        let schema = request
            .response_schema
            .clone()
            .unwrap_or_else(|| serde_json::json!({}));
        let pretty = serde_json::to_string_pretty(&schema).unwrap_or_default();
        system.push_str(&format!("\nOutput JSON schema: {pretty}"));
    }

    let mut messages = Vec::with_capacity(2);
    if !system.is_empty() {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: Some(system),
        });
    }
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: Some(request.prompt.clone()),
    });

    ChatRequest {
        model,
        messages,
        temperature: request.temperature.unwrap_or(0.7),
        stream: false,
        response_format: request.json.then(|| ResponseFormat {
            r#type: "json_object".to_string(),
        }),
    }
}
