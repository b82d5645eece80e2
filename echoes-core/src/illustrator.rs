//! Scene illustration.
//!
//! Images are decoration: every failure here ends in `None` and a log line,
//! never in an error the player sees.

use crate::retry::RetryPolicy;
use crate::story::Protagonist;
use async_trait::async_trait;
use echoes_llm::{Client, ImageRequest, TextRequest};

const KAELEN_APPEARANCE: &str = "1boy, solo, male protagonist Kaelen, 23 years old, young \
    handsome ex-soldier, short messy black hair, sharp blue eyes, visible scar on neck, wearing a \
    torn white tuxedo with tactical gear equipped over it, holding a futuristic pistol, resolute \
    expression, dynamic pose, anime style, detailed face, cinematic lighting.";

const ELARA_APPEARANCE: &str = "1girl, solo, female protagonist Elara, 20 years old, genius \
    detective lolita, long silver hair in twin-tails with red ribbons, black gothic dress with \
    white lace, wearing a golden monocle on one eye, holding a magnifying glass or data pad, cute \
    but arrogant expression, anime style, masterpiece, highly detailed.";

const COUPLE_APPEARANCE: &str = "1boy and 1girl, Kaelen (black hair, tactical tuxedo, protective \
    stance) standing back-to-back with Elara (silver hair, gothic dress, analyzing data), \
    battlefield wedding ruin background, anime style, Makoto Shinkai style, dramatic lighting.";

/// Produces an image source (URL or `data:` URL) for a scene.
#[async_trait]
pub trait Illustrator: Send + Sync {
    async fn illustrate(&self, visual_description: &str) -> Option<String>;
}

/// Which leads a scene description mentions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterPresence {
    Nobody,
    Kaelen,
    Elara,
    Both,
}

impl CharacterPresence {
    pub fn detect(description: &str) -> Self {
        let mentions = |p: Protagonist| p.keywords().iter().any(|k| description.contains(k));
        match (mentions(Protagonist::Male), mentions(Protagonist::Female)) {
            (true, true) => CharacterPresence::Both,
            (true, false) => CharacterPresence::Kaelen,
            (false, true) => CharacterPresence::Elara,
            (false, false) => CharacterPresence::Nobody,
        }
    }

    /// Fixed appearance tags that keep the characters consistent across images.
    pub fn appearance(&self) -> &'static str {
        match self {
            CharacterPresence::Nobody => "",
            CharacterPresence::Kaelen => KAELEN_APPEARANCE,
            CharacterPresence::Elara => ELARA_APPEARANCE,
            CharacterPresence::Both => COUPLE_APPEARANCE,
        }
    }
}

/// Prompt used when enhancement is off or fails.
pub fn fallback_prompt(description: &str, characters: &str) -> String {
    let mut prompt = String::from("(Best Quality), (Masterpiece), (Anime Style)");
    for part in [characters, description] {
        if !part.trim().is_empty() {
            prompt.push_str(", ");
            prompt.push_str(part.trim());
        }
    }
    prompt
}

/// Configuration for the AI illustrator.
#[derive(Debug, Clone)]
pub struct IllustratorConfig {
    /// Rewrite scene descriptions into detailed art prompts first.
    pub enhance_prompts: bool,
    pub aspect_ratio: String,
    pub retry: RetryPolicy,
}

impl Default for IllustratorConfig {
    fn default() -> Self {
        Self {
            enhance_prompts: true,
            aspect_ratio: "16:9".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl IllustratorConfig {
    pub fn with_enhancement(mut self, enabled: bool) -> Self {
        self.enhance_prompts = enabled;
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = ratio.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Illustrator backed by a remote image model.
pub struct AiIllustrator {
    client: Client,
    config: IllustratorConfig,
}

impl AiIllustrator {
    pub fn new(client: Client, config: IllustratorConfig) -> Self {
        Self { client, config }
    }

    /// Build the final image prompt for a scene.
    pub async fn image_prompt(&self, description: &str) -> String {
        let characters = CharacterPresence::detect(description).appearance();
        if !self.config.enhance_prompts {
            return fallback_prompt(description, characters);
        }

        let request = TextRequest::new(format!(
            "Input Scene: \"{description}\"\nInput Character: \"{characters}\"\n\n\
             Generate the detailed prompt now:"
        ))
        .with_system(include_str!("prompts/image_prompt_engineer.txt"));

        match self.client.generate_text(request).await {
            Ok(enhanced) if !enhanced.trim().is_empty() => enhanced.trim().to_string(),
            Ok(_) => fallback_prompt(description, characters),
            Err(e) => {
                tracing::warn!(error = %e, "Prompt enhancement failed, using plain prompt");
                fallback_prompt(description, characters)
            }
        }
    }

    /// Generate an image, surfacing the error instead of swallowing it.
    pub async fn try_illustrate(&self, description: &str) -> Result<String, echoes_llm::Error> {
        let prompt = self.image_prompt(description).await;
        tracing::debug!(prompt = %prompt, "Image prompt");

        let image = self
            .config
            .retry
            .run("generate_image", || {
                let request = ImageRequest::new(prompt.as_str())
                    .with_aspect_ratio(self.config.aspect_ratio.as_str());
                self.client.generate_image(request)
            })
            .await?;
        Ok(image.to_src())
    }
}

#[async_trait]
impl Illustrator for AiIllustrator {
    async fn illustrate(&self, visual_description: &str) -> Option<String> {
        if visual_description.trim().is_empty() {
            return None;
        }
        match self.try_illustrate(visual_description).await {
            Ok(src) => Some(src),
            Err(e) => {
                tracing::warn!(error = %e, "Scene illustration failed, showing placeholder");
                None
            }
        }
    }
}

/// Illustrator that never produces images.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIllustrator;

#[async_trait]
impl Illustrator for NoopIllustrator {
    async fn illustrate(&self, _visual_description: &str) -> Option<String> {
        None
    }
}
