//! Image Generation Port - Interface for multimodal generation providers.
//!
//! Abstracts the conversational image generation API (Gemini) behind a
//! provider-agnostic contract: prompt-to-image generation, feedback-driven
//! refinement, text consultation, and a unified converse entry where the
//! model decides whether a turn produces an image.
//!
//! # Design
//!
//! - Request types carry everything the provider needs; per-session
//!   conversation history lives behind the provider, keyed by session id
//! - Refinement never replays history: callers resolve the previous image
//!   URL and the provider re-fetches its bytes
//! - Errors are classified but never retried by callers

use async_trait::async_trait;

use crate::domain::catalog::{ImagePurpose, StylePreset};
use crate::domain::foundation::SessionId;

/// Port for conversational image generation.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image from a prompt.
    ///
    /// Composes the final prompt from brand guidelines, purpose and style
    /// hints, and the raw user prompt. When a session id is present the
    /// prompt and a binary-free image marker are appended to that session's
    /// history.
    async fn generate_image(
        &self,
        request: GenerateRequest,
    ) -> Result<GeneratedImage, GenerationError>;

    /// Refine the previously generated image from user feedback.
    ///
    /// Fetches the previous image over HTTP and sends one fresh request
    /// with the bytes attached; fails with [`GenerationError::NoPriorImage`]
    /// before any generation call when no URL was resolvable. The result is
    /// not appended to history.
    async fn refine_image(
        &self,
        request: RefineRequest,
    ) -> Result<GeneratedImage, GenerationError>;

    /// Text-only consultation over the session's history.
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, GenerationError>;

    /// Unified turn: the model decides whether to also emit an image.
    ///
    /// Only text turns are appended to history; images are never replayed.
    async fn converse(&self, request: ConverseRequest) -> Result<ConverseReply, GenerationError>;

    /// Drop a session's in-memory conversation history.
    async fn clear_session(&self, session_id: &SessionId);

    /// Model identifier used for generation calls.
    fn model_id(&self) -> &str;
}

/// Request to generate an image from a prompt.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Raw user prompt; brand and hint text are prepended by the provider.
    pub prompt: String,
    /// Marketing purpose driving the aspect ratio and hint.
    pub purpose: ImagePurpose,
    /// Optional style preset hint.
    pub style: Option<StylePreset>,
    /// Session whose history records this turn, if any.
    pub session_id: Option<SessionId>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, purpose: ImagePurpose) -> Self {
        Self {
            prompt: prompt.into(),
            purpose,
            style: None,
            session_id: None,
        }
    }

    pub fn with_style(mut self, style: StylePreset) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// Request to refine the previous image from feedback.
#[derive(Debug, Clone)]
pub struct RefineRequest {
    pub session_id: SessionId,
    /// User feedback wrapped into the refinement prompt.
    pub feedback: String,
    pub purpose: ImagePurpose,
    /// Resolved URL of the image to refine; `None` fails the request.
    pub previous_image_url: Option<String>,
}

impl RefineRequest {
    pub fn new(session_id: SessionId, feedback: impl Into<String>, purpose: ImagePurpose) -> Self {
        Self {
            session_id,
            feedback: feedback.into(),
            purpose,
            previous_image_url: None,
        }
    }

    pub fn with_previous_image_url(mut self, url: impl Into<String>) -> Self {
        self.previous_image_url = Some(url.into());
        self
    }
}

/// Request for a text-only consultation turn.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub session_id: SessionId,
    pub message: String,
}

impl ChatRequest {
    pub fn new(session_id: SessionId, message: impl Into<String>) -> Self {
        Self {
            session_id,
            message: message.into(),
        }
    }
}

/// Request for a unified turn where the model may emit an image.
#[derive(Debug, Clone)]
pub struct ConverseRequest {
    pub session_id: SessionId,
    pub message: String,
    pub purpose: ImagePurpose,
    pub style: Option<StylePreset>,
    /// Previous image attached as a modification reference when present.
    /// A failed fetch degrades the turn to text-only instead of failing it.
    pub previous_image_url: Option<String>,
}

impl ConverseRequest {
    pub fn new(
        session_id: SessionId,
        message: impl Into<String>,
        purpose: ImagePurpose,
    ) -> Self {
        Self {
            session_id,
            message: message.into(),
            purpose,
            style: None,
            previous_image_url: None,
        }
    }

    pub fn with_style(mut self, style: StylePreset) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_previous_image_url(mut self, url: impl Into<String>) -> Self {
        self.previous_image_url = Some(url.into());
        self
    }
}

/// A generated image with its provenance.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// Decoded image bytes.
    pub bytes: Vec<u8>,
    /// Base64 payload as received from the API.
    pub base64_data: String,
    /// MIME type reported by the API.
    pub mime_type: String,
    /// The literal composed prompt sent to the API.
    pub prompt_used: String,
    /// Model that generated the image.
    pub model_used: String,
    /// Nominal width from the purpose preset (not decoded from bytes).
    pub width: Option<u32>,
    /// Nominal height from the purpose preset (not decoded from bytes).
    pub height: Option<u32>,
    /// Wall-clock duration of the generation call.
    pub generation_time_ms: u64,
    /// API-reported token usage for the whole call.
    pub tokens_used: i64,
    /// Flat per-image cost estimate.
    pub estimated_cost_usd: f64,
}

impl GeneratedImage {
    /// File format derived from the MIME subtype (`image/png` -> `png`).
    pub fn format(&self) -> Option<&str> {
        self.mime_type.split('/').nth(1)
    }

    /// Inline `data:` URL used when no file store is configured.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data)
    }
}

/// Reply from a text-only consultation turn.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub model_used: String,
    /// API-reported token usage for the whole call.
    pub tokens_used: i64,
}

/// Reply from a unified converse turn.
#[derive(Debug, Clone)]
pub struct ConverseReply {
    /// Newline-joined text parts, when the model replied with text.
    pub text: Option<String>,
    /// First inline image part, when the model emitted one.
    pub image: Option<GeneratedImage>,
    pub model_used: String,
    /// API-reported token usage for the whole call.
    pub tokens_used: i64,
}

impl ConverseReply {
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

/// Image generation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The API answered but produced no image.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// Refinement answered without an image.
    #[error("refinement failed: {0}")]
    RefinementFailed(String),

    /// Refinement requested with no resolvable previous image.
    #[error("no previous image to refine")]
    NoPriorImage,

    /// Fetching the previous image bytes failed.
    #[error("failed to fetch previous image: {0}")]
    UpstreamFetchFailed(String),

    /// No API credential is configured.
    #[error("image generation service is not configured")]
    ServiceUnavailable,

    /// Rate limited by the API.
    #[error("rate limited by generation API")]
    RateLimited,

    /// API key rejected.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Network error during the request.
    #[error("network error: {0}")]
    Network(String),

    /// Response could not be parsed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

impl GenerationError {
    pub fn generation_failed(message: impl Into<String>) -> Self {
        Self::GenerationFailed(message.into())
    }

    pub fn refinement_failed(message: impl Into<String>) -> Self {
        Self::RefinementFailed(message.into())
    }

    pub fn upstream_fetch_failed(message: impl Into<String>) -> Self {
        Self::UpstreamFetchFailed(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Classifier only; nothing in this service retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::RateLimited
                | GenerationError::Network(_)
                | GenerationError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_builder() {
        let id = SessionId::new();
        let request = GenerateRequest::new("a walnut lounge chair", ImagePurpose::BannerWeb)
            .with_style(StylePreset::Luxury)
            .with_session(id);

        assert_eq!(request.purpose, ImagePurpose::BannerWeb);
        assert_eq!(request.style, Some(StylePreset::Luxury));
        assert_eq!(request.session_id, Some(id));
    }

    #[test]
    fn format_extracts_mime_subtype() {
        let image = GeneratedImage {
            bytes: vec![1, 2, 3],
            base64_data: "AQID".to_string(),
            mime_type: "image/png".to_string(),
            prompt_used: "p".to_string(),
            model_used: "m".to_string(),
            width: None,
            height: None,
            generation_time_ms: 10,
            tokens_used: 0,
            estimated_cost_usd: 0.0,
        };
        assert_eq!(image.format(), Some("png"));
    }

    #[test]
    fn data_url_embeds_mime_and_payload() {
        let image = GeneratedImage {
            bytes: vec![1, 2, 3],
            base64_data: "AQID".to_string(),
            mime_type: "image/jpeg".to_string(),
            prompt_used: "p".to_string(),
            model_used: "m".to_string(),
            width: None,
            height: None,
            generation_time_ms: 10,
            tokens_used: 0,
            estimated_cost_usd: 0.0,
        };
        assert_eq!(image.data_url(), "data:image/jpeg;base64,AQID");
    }

    #[test]
    fn retryable_classification() {
        assert!(GenerationError::RateLimited.is_retryable());
        assert!(GenerationError::network("reset").is_retryable());
        assert!(GenerationError::Timeout { timeout_secs: 90 }.is_retryable());
        assert!(!GenerationError::NoPriorImage.is_retryable());
        assert!(!GenerationError::generation_failed("no image part").is_retryable());
    }
}
