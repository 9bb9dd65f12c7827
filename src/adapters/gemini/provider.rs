//! Gemini provider - Implementation of ImageGenerator over generateContent.
//!
//! Speaks the multimodal `generateContent` wire format: text and inline-data
//! parts, `responseModalities` requesting TEXT+IMAGE, and an `imageConfig`
//! carrying the aspect-ratio token. Image payloads travel base64-encoded in
//! both directions.
//!
//! # Configuration
//!
//! ```ignore
//! let config = GeminiProviderConfig::new(api_key)
//!     .with_model("gemini-3-pro-image-preview")
//!     .with_base_url("https://generativelanguage.googleapis.com/v1beta");
//!
//! let provider = GeminiImageProvider::new(config);
//! ```

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::history::{HistoryTurn, SessionHistory};
use crate::domain::brand;
use crate::domain::catalog::{ImagePurpose, StylePreset};
use crate::domain::foundation::SessionId;
use crate::ports::{
    ChatReply, ChatRequest, ConverseReply, ConverseRequest, GeneratedImage, GenerateRequest,
    GenerationError, ImageGenerator, RefineRequest,
};

/// Configuration for the Gemini provider.
#[derive(Debug, Clone)]
pub struct GeminiProviderConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model used for every generation call.
    pub model: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl GeminiProviderConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "gemini-3-pro-image-preview".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(90),
        }
    }

    /// Builds a configuration from the loaded settings section.
    ///
    /// Returns `None` when no API key is configured; the service then runs
    /// without a generator and turn endpoints reject generation requests.
    pub fn from_settings(settings: &crate::config::GeminiConfig) -> Option<Self> {
        let api_key = settings.api_key.as_ref().filter(|key| !key.is_empty())?;
        Some(
            Self::new(api_key.clone())
                .with_model(settings.model.clone())
                .with_base_url(settings.base_url.clone())
                .with_timeout(settings.timeout()),
        )
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Gemini implementation of the image generation port.
pub struct GeminiImageProvider {
    config: GeminiProviderConfig,
    client: Client,
    history: SessionHistory,
}

impl GeminiImageProvider {
    /// Creates a new provider with the given configuration.
    pub fn new(config: GeminiProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            client,
            history: SessionHistory::new(),
        }
    }

    /// Builds the generateContent endpoint URL.
    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    /// Composes the full generation prompt: brand constraints first, then
    /// the purpose hint (with nominal dimensions when the preset has them),
    /// then the style hint, then the raw user prompt.
    fn compose_generation_prompt(
        &self,
        prompt: &str,
        purpose: ImagePurpose,
        style: Option<StylePreset>,
    ) -> String {
        let mut composed = String::new();
        composed.push_str(brand::brand_prompt());
        composed.push_str("\n\n");
        if let Some((width, height)) = purpose.dimensions() {
            composed.push_str(&format!("Image dimensions: {width}x{height}px. "));
        }
        composed.push_str(purpose.prompt_hint());
        if let Some(style) = style {
            composed.push_str(&format!(". Style: {}", style.prompt_hint()));
        }
        composed.push_str(".\n\n");
        composed.push_str(prompt);
        composed
    }

    /// Refinement prompt. Brand constraints are re-stated in full because a
    /// refinement call carries no conversational memory.
    fn compose_refinement_prompt(&self, feedback: &str) -> String {
        format!(
            "{}\n\nPlease modify the attached previous image based on this feedback: {}",
            brand::brand_prompt(),
            feedback
        )
    }

    fn consultant_system_prompt() -> String {
        format!(
            "You are a creative marketing image consultant. Help users develop ideas \
             for marketing images. Provide specific suggestions for visual concepts, \
             composition, colors, and styles. Keep responses concise and actionable.\n\n{}",
            brand::conversation_guidelines()
        )
    }

    fn converse_system_prompt(purpose: ImagePurpose, style: Option<StylePreset>) -> String {
        let mut prompt = format!(
            "You are a marketing image consultant and generator. Decide from the \
             conversation whether the user wants an image produced this turn. When they \
             clearly ask for or describe one, generate it alongside a short reply; \
             otherwise answer with concise, actionable consultation and no image.\n\n{}\n\n\
             When generating: {}",
            brand::conversation_guidelines(),
            purpose.prompt_hint(),
        );
        if let Some((width, height)) = purpose.dimensions() {
            prompt.push_str(&format!(" Image dimensions: {width}x{height}px."));
        }
        if let Some(style) = style {
            prompt.push_str(&format!(" Style: {}.", style.prompt_hint()));
        }
        prompt
    }

    /// Reads image bytes from a URL. Inline `data:` URLs (the degraded mode
    /// when no file store is configured) are decoded locally; anything else
    /// is fetched over HTTP.
    async fn read_image_source(&self, url: &str) -> Result<(Vec<u8>, String), GenerationError> {
        if let Some(rest) = url.strip_prefix("data:") {
            let (mime, payload) = rest.split_once(";base64,").ok_or_else(|| {
                GenerationError::upstream_fetch_failed("unsupported data URL encoding")
            })?;
            let bytes = BASE64_STANDARD.decode(payload.as_bytes()).map_err(|e| {
                GenerationError::upstream_fetch_failed(format!("invalid data URL payload: {e}"))
            })?;
            let mime = if mime.is_empty() {
                "image/png".to_string()
            } else {
                mime.to_string()
            };
            return Ok((bytes, mime));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GenerationError::upstream_fetch_failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(GenerationError::upstream_fetch_failed(format!(
                "previous image fetch returned {}",
                response.status()
            )));
        }
        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "image/png".to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GenerationError::upstream_fetch_failed(e.to_string()))?
            .to_vec();
        Ok((bytes, mime))
    }

    /// Sends a generateContent request and parses the response body.
    async fn send(
        &self,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let response = self
            .client
            .post(self.generate_url())
            .query(&[("key", self.config.api_key())])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout {
                        timeout_secs: self.config.timeout.as_secs(),
                    }
                } else if e.is_connect() {
                    GenerationError::network(format!("Connection failed: {e}"))
                } else {
                    GenerationError::network(e.to_string())
                }
            })?;

        let response = self.handle_response_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| GenerationError::invalid_response(format!("Failed to parse response: {e}")))
    }

    /// Maps non-success statuses onto the port error taxonomy.
    async fn handle_response_status(
        &self,
        response: Response,
    ) -> Result<Response, GenerationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(GenerationError::AuthenticationFailed),
            429 => Err(GenerationError::RateLimited),
            400..=499 => Err(GenerationError::generation_failed(format!(
                "API rejected request ({status}): {body}"
            ))),
            _ => Err(GenerationError::network(format!(
                "server error {status}: {body}"
            ))),
        }
    }

    /// Builds the port-level image from an inline-data part.
    fn decoded_image(
        &self,
        inline: WireInlineData,
        prompt_used: String,
        purpose: ImagePurpose,
        generation_time_ms: u64,
        tokens_used: i64,
    ) -> Result<GeneratedImage, GenerationError> {
        let bytes = BASE64_STANDARD.decode(inline.data.as_bytes()).map_err(|e| {
            GenerationError::invalid_response(format!("image payload is not valid base64: {e}"))
        })?;
        let (width, height) = match purpose.dimensions() {
            Some((width, height)) => (Some(width), Some(height)),
            None => (None, None),
        };
        Ok(GeneratedImage {
            bytes,
            base64_data: inline.data,
            mime_type: inline.mime_type,
            prompt_used,
            model_used: self.config.model.clone(),
            width,
            height,
            generation_time_ms,
            tokens_used,
            estimated_cost_usd: self.estimate_image_cost(),
        })
    }

    /// Flat per-image cost estimate.
    fn estimate_image_cost(&self) -> f64 {
        // Per-image prices as of early 2025
        match self.config.model.as_str() {
            model if model.contains("pro") => 0.12,
            _ => 0.04,
        }
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageProvider {
    async fn generate_image(
        &self,
        request: GenerateRequest,
    ) -> Result<GeneratedImage, GenerationError> {
        let started = Instant::now();
        let prompt =
            self.compose_generation_prompt(&request.prompt, request.purpose, request.style);

        // Hold the session's turn lock across the call so concurrent turns
        // against the same session cannot interleave history writes.
        let mut history_guard = match request.session_id {
            Some(id) => Some(self.history.lock(id).await),
            None => None,
        };

        let body = GenerateContentRequest {
            contents: vec![WireContent {
                role: "user".to_string(),
                parts: vec![WirePart::text(prompt.clone())],
            }],
            system_instruction: None,
            generation_config: WireGenerationConfig::image(request.purpose.aspect_ratio()),
        };

        let response = self.send(&body).await?;
        let generation_time_ms = started.elapsed().as_millis() as u64;
        let (_texts, inline, tokens) = split_reply(response);
        let inline = inline
            .ok_or_else(|| GenerationError::generation_failed("response contained no image"))?;
        let image =
            self.decoded_image(inline, prompt.clone(), request.purpose, generation_time_ms, tokens)?;

        if let Some(turns) = history_guard.as_mut() {
            turns.push(HistoryTurn::user_text(prompt));
            turns.push(HistoryTurn::model_image(image.mime_type.clone()));
        }

        tracing::debug!(
            model = %self.config.model,
            purpose = %request.purpose,
            generation_time_ms,
            "generated marketing image"
        );
        Ok(image)
    }

    async fn refine_image(
        &self,
        request: RefineRequest,
    ) -> Result<GeneratedImage, GenerationError> {
        let url = request
            .previous_image_url
            .as_deref()
            .ok_or(GenerationError::NoPriorImage)?;

        let started = Instant::now();
        let (previous_bytes, previous_mime) = self.read_image_source(url).await?;
        let prompt = self.compose_refinement_prompt(&request.feedback);

        let body = GenerateContentRequest {
            contents: vec![WireContent {
                role: "user".to_string(),
                parts: vec![
                    WirePart::text(prompt.clone()),
                    WirePart::inline(previous_mime, BASE64_STANDARD.encode(&previous_bytes)),
                ],
            }],
            system_instruction: None,
            generation_config: WireGenerationConfig::image(request.purpose.aspect_ratio()),
        };

        let response = self.send(&body).await?;
        let generation_time_ms = started.elapsed().as_millis() as u64;
        let (_texts, inline, tokens) = split_reply(response);
        let inline = inline
            .ok_or_else(|| GenerationError::refinement_failed("response contained no image"))?;

        // Refinements are deliberately absent from history
        self.decoded_image(inline, prompt, request.purpose, generation_time_ms, tokens)
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, GenerationError> {
        let mut turns = self.history.lock(request.session_id).await;

        let mut contents = replay_turns(&turns);
        contents.push(WireContent {
            role: "user".to_string(),
            parts: vec![WirePart::text(request.message.clone())],
        });

        let body = GenerateContentRequest {
            contents,
            system_instruction: Some(WireSystemInstruction::text(Self::consultant_system_prompt())),
            generation_config: WireGenerationConfig::text_only(),
        };

        let response = self.send(&body).await?;
        let (texts, _inline, tokens) = split_reply(response);
        if texts.is_empty() {
            return Err(GenerationError::generation_failed("reply contained no text"));
        }
        let text = texts.join("\n");

        turns.push(HistoryTurn::user_text(request.message));
        turns.push(HistoryTurn::model_text(text.clone()));

        Ok(ChatReply {
            text,
            model_used: self.config.model.clone(),
            tokens_used: tokens,
        })
    }

    async fn converse(&self, request: ConverseRequest) -> Result<ConverseReply, GenerationError> {
        let started = Instant::now();
        let mut turns = self.history.lock(request.session_id).await;

        let mut outgoing_text = request.message.clone();
        let mut attachment = None;
        if let Some(url) = request.previous_image_url.as_deref() {
            match self.read_image_source(url).await {
                Ok((bytes, mime)) => {
                    attachment = Some(WirePart::inline(mime, BASE64_STANDARD.encode(&bytes)));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "previous image unavailable, continuing without it");
                    outgoing_text.push_str(
                        "\n\n(Note: the previous image could not be retrieved; continue without it.)",
                    );
                }
            }
        }

        let mut user_parts = vec![WirePart::text(outgoing_text.clone())];
        if let Some(part) = attachment {
            user_parts.push(part);
        }

        let mut contents = replay_turns(&turns);
        contents.push(WireContent {
            role: "user".to_string(),
            parts: user_parts,
        });

        let body = GenerateContentRequest {
            contents,
            system_instruction: Some(WireSystemInstruction::text(Self::converse_system_prompt(
                request.purpose,
                request.style,
            ))),
            generation_config: WireGenerationConfig::image(request.purpose.aspect_ratio()),
        };

        let response = self.send(&body).await?;
        let generation_time_ms = started.elapsed().as_millis() as u64;
        let (texts, inline, tokens) = split_reply(response);

        let text = if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        };
        let image = match inline {
            Some(inline) => Some(self.decoded_image(
                inline,
                outgoing_text,
                request.purpose,
                generation_time_ms,
                tokens,
            )?),
            None => None,
        };
        if text.is_none() && image.is_none() {
            return Err(GenerationError::generation_failed(
                "reply contained neither text nor image",
            ));
        }

        // Images never enter history; the model's text does
        turns.push(HistoryTurn::user_text(request.message));
        if let Some(text) = &text {
            turns.push(HistoryTurn::model_text(text.clone()));
        }

        Ok(ConverseReply {
            text,
            image,
            model_used: self.config.model.clone(),
            tokens_used: tokens,
        })
    }

    async fn clear_session(&self, session_id: &SessionId) {
        self.history.clear(session_id).await;
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

/// Splits a response into its text parts, the first inline image, and the
/// reported token total.
fn split_reply(response: GenerateContentResponse) -> (Vec<String>, Option<WireInlineData>, i64) {
    let tokens = response
        .usage_metadata
        .map(|usage| usage.total_token_count)
        .unwrap_or(0);

    let mut texts = Vec::new();
    let mut image = None;
    if let Some(candidate) = response.candidates.into_iter().next() {
        if let Some(content) = candidate.content {
            for part in content.parts {
                if let Some(text) = part.text {
                    if !text.is_empty() {
                        texts.push(text);
                    }
                }
                if image.is_none() {
                    if let Some(inline) = part.inline_data {
                        image = Some(inline);
                    }
                }
            }
        }
    }
    (texts, image, tokens)
}

/// Turns history into wire contents, dropping image markers and any turn
/// left with no parts.
fn replay_turns(turns: &[HistoryTurn]) -> Vec<WireContent> {
    turns
        .iter()
        .filter_map(|turn| {
            let parts: Vec<WirePart> = turn
                .replayable_texts()
                .into_iter()
                .map(WirePart::text)
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(WireContent {
                    role: turn.role.as_wire().to_string(),
                    parts,
                })
            }
        })
        .collect()
}

// Wire format types for the generateContent API

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<WireContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireSystemInstruction>,
    #[serde(rename = "generationConfig")]
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize)]
struct WireSystemInstruction {
    parts: Vec<WirePart>,
}

impl WireSystemInstruction {
    fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![WirePart::text(text)],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(
        rename = "inlineData",
        alias = "inline_data",
        skip_serializing_if = "Option::is_none"
    )]
    inline_data: Option<WireInlineData>,
}

impl WirePart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(WireInlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireInlineData {
    #[serde(rename = "mimeType", alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    response_modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<WireImageConfig>,
}

impl WireGenerationConfig {
    fn image(aspect_ratio: &str) -> Self {
        Self {
            response_modalities: vec!["TEXT", "IMAGE"],
            image_config: Some(WireImageConfig {
                aspect_ratio: aspect_ratio.to_string(),
            }),
        }
    }

    fn text_only() -> Self {
        Self {
            response_modalities: vec!["TEXT"],
            image_config: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<WireContent>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: i64,
}
