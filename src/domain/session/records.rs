//! Image chat session records.
//!
//! `ChatSession` is the aggregate: it owns the denormalized counters that
//! must always equal the number of persisted message/image rows. Messages
//! and generated-image records are append-only rows hanging off a session.

use crate::domain::catalog::{ImagePurpose, StylePreset};
use crate::domain::foundation::{ImageId, MessageId, SessionId, Timestamp};
use crate::domain::session::errors::ChatError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for session title.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Lifecycle status of an image chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shape of a message's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Image,
    Mixed,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
            ContentKind::Mixed => "mixed",
        }
    }

    /// Kind for a message that carries the given parts.
    pub fn for_parts(has_text: bool, has_image: bool) -> Self {
        match (has_text, has_image) {
            (true, true) => ContentKind::Mixed,
            (_, true) => ContentKind::Image,
            _ => ContentKind::Text,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Image chat session aggregate.
///
/// # Invariants
///
/// - `title`, when present, is 1-200 characters
/// - `messages_count` / `images_generated` equal the persisted row counts
/// - `final_image_url` points at the most recently published image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    id: SessionId,
    title: Option<String>,
    purpose: ImagePurpose,
    status: SessionStatus,
    style: Option<StylePreset>,
    brand_guidelines: Option<serde_json::Value>,
    final_image_url: Option<String>,
    messages_count: i32,
    images_generated: i32,
    total_tokens_used: i64,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl ChatSession {
    /// Create a new active session with zeroed counters.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the title is empty or too long
    pub fn new(
        id: SessionId,
        title: Option<String>,
        purpose: ImagePurpose,
        style: Option<StylePreset>,
        brand_guidelines: Option<serde_json::Value>,
    ) -> Result<Self, ChatError> {
        if let Some(title) = &title {
            Self::validate_title(title)?;
        }

        let now = Timestamp::now();
        Ok(Self {
            id,
            title,
            purpose,
            status: SessionStatus::Active,
            style,
            brand_guidelines,
            final_image_url: None,
            messages_count: 0,
            images_generated: 0,
            total_tokens_used: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstitute a session from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: SessionId,
        title: Option<String>,
        purpose: ImagePurpose,
        status: SessionStatus,
        style: Option<StylePreset>,
        brand_guidelines: Option<serde_json::Value>,
        final_image_url: Option<String>,
        messages_count: i32,
        images_generated: i32,
        total_tokens_used: i64,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            title,
            purpose,
            status,
            style,
            brand_guidelines,
            final_image_url,
            messages_count,
            images_generated,
            total_tokens_used,
            created_at,
            updated_at,
        }
    }

    fn validate_title(title: &str) -> Result<(), ChatError> {
        if title.trim().is_empty() {
            return Err(ChatError::validation("title", "Title cannot be empty"));
        }
        if title.len() > MAX_TITLE_LENGTH {
            return Err(ChatError::validation(
                "title",
                format!("Title cannot exceed {} characters", MAX_TITLE_LENGTH),
            ));
        }
        Ok(())
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn purpose(&self) -> ImagePurpose {
        self.purpose
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn style(&self) -> Option<StylePreset> {
        self.style
    }

    pub fn brand_guidelines(&self) -> Option<&serde_json::Value> {
        self.brand_guidelines.as_ref()
    }

    pub fn final_image_url(&self) -> Option<&str> {
        self.final_image_url.as_deref()
    }

    pub fn messages_count(&self) -> i32 {
        self.messages_count
    }

    pub fn images_generated(&self) -> i32 {
        self.images_generated
    }

    pub fn total_tokens_used(&self) -> i64 {
        self.total_tokens_used
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// Count one persisted message.
    pub fn count_message(&mut self) {
        self.messages_count += 1;
        self.touch();
    }

    /// Count one published image and remember its URL.
    pub fn count_image(&mut self, url: impl Into<String>) {
        self.images_generated += 1;
        self.final_image_url = Some(url.into());
        self.touch();
    }

    /// Add API-reported token usage to the session total.
    pub fn add_tokens(&mut self, tokens: i64) {
        self.total_tokens_used += tokens;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

/// One persisted chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub session_id: SessionId,
    pub role: MessageRole,
    pub content_kind: ContentKind,
    pub text_content: Option<String>,
    pub image_url: Option<String>,
    pub image_thumbnail_url: Option<String>,
    pub generation_metadata: Option<serde_json::Value>,
    pub tokens_used: i64,
    pub generation_time_ms: Option<i64>,
    pub created_at: Timestamp,
}

impl ChatMessage {
    /// A user's text message.
    pub fn user_text(session_id: SessionId, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            session_id,
            role: MessageRole::User,
            content_kind: ContentKind::Text,
            text_content: Some(text.into()),
            image_url: None,
            image_thumbnail_url: None,
            generation_metadata: None,
            tokens_used: 0,
            generation_time_ms: None,
            created_at: Timestamp::now(),
        }
    }

    /// An assistant text reply.
    pub fn assistant_text(session_id: SessionId, text: impl Into<String>, tokens: i64) -> Self {
        Self {
            id: MessageId::new(),
            session_id,
            role: MessageRole::Assistant,
            content_kind: ContentKind::Text,
            text_content: Some(text.into()),
            image_url: None,
            image_thumbnail_url: None,
            generation_metadata: None,
            tokens_used: tokens,
            generation_time_ms: None,
            created_at: Timestamp::now(),
        }
    }

    /// An assistant reply carrying a published image, optionally with text.
    pub fn assistant_image(
        session_id: SessionId,
        text: Option<String>,
        image_url: impl Into<String>,
        metadata: Option<serde_json::Value>,
        generation_time_ms: i64,
        tokens: i64,
    ) -> Self {
        let has_text = text.as_deref().is_some_and(|t| !t.is_empty());
        Self {
            id: MessageId::new(),
            session_id,
            role: MessageRole::Assistant,
            content_kind: ContentKind::for_parts(has_text, true),
            text_content: text.filter(|t| !t.is_empty()),
            image_url: Some(image_url.into()),
            image_thumbnail_url: None,
            generation_metadata: metadata,
            tokens_used: tokens,
            generation_time_ms: Some(generation_time_ms),
            created_at: Timestamp::now(),
        }
    }
}

/// A published generated image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImageRecord {
    pub id: ImageId,
    pub session_id: SessionId,
    pub message_id: MessageId,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub format: Option<String>,
    pub prompt_used: String,
    pub model_used: String,
    pub image_purpose: ImagePurpose,
    pub generation_cost_usd: f64,
    pub is_selected: bool,
    pub is_exported: bool,
    pub created_at: Timestamp,
}

impl GeneratedImageRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: SessionId,
        message_id: MessageId,
        image_url: impl Into<String>,
        width: Option<i32>,
        height: Option<i32>,
        format: Option<String>,
        prompt_used: impl Into<String>,
        model_used: impl Into<String>,
        image_purpose: ImagePurpose,
        generation_cost_usd: f64,
    ) -> Self {
        Self {
            id: ImageId::new(),
            session_id,
            message_id,
            image_url: image_url.into(),
            thumbnail_url: None,
            width,
            height,
            format,
            prompt_used: prompt_used.into(),
            model_used: model_used.into(),
            image_purpose,
            generation_cost_usd,
            is_selected: false,
            is_exported: false,
            created_at: Timestamp::now(),
        }
    }
}
