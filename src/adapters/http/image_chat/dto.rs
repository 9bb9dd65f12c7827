//! HTTP DTOs for the image chat endpoints.
//!
//! These types decouple the HTTP API from domain types, allowing independent evolution.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::{ImagePurpose, PurposePreset, StylePreset};
use crate::domain::session::{ChatMessage, ChatSession, ContentKind, MessageRole, SessionStatus};
use crate::ports::SessionPage;

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Request to create a new image chat session.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub image_purpose: ImagePurpose,
    #[serde(default)]
    pub style_preset: Option<StylePreset>,
    #[serde(default)]
    pub brand_guidelines: Option<serde_json::Value>,
}

/// Request to send a chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    /// When set, the message is treated as a generation prompt.
    #[serde(default)]
    pub generate_image: bool,
}

/// Request to generate an image from an explicit prompt.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateImageRequest {
    pub prompt: String,
    #[serde(default)]
    pub style_preset: Option<StylePreset>,
}

/// Request to refine a previously generated image.
#[derive(Debug, Clone, Deserialize)]
pub struct RefineImageRequest {
    pub feedback: String,
    /// Refine this image instead of the session's latest one.
    #[serde(default)]
    pub image_id: Option<String>,
}

/// Query parameters for listing sessions.
#[derive(Debug, Clone, Deserialize)]
pub struct ListSessionsQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Session view for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub image_purpose: ImagePurpose,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_preset: Option<StylePreset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_image_url: Option<String>,
    pub messages_count: i32,
    pub images_generated: i32,
    pub total_tokens_used: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&ChatSession> for SessionResponse {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id().to_string(),
            title: session.title().map(str::to_string),
            image_purpose: session.purpose(),
            status: session.status(),
            style_preset: session.style(),
            final_image_url: session.final_image_url().map(str::to_string),
            messages_count: session.messages_count(),
            images_generated: session.images_generated(),
            total_tokens_used: session.total_tokens_used(),
            created_at: session.created_at().to_rfc3339(),
            updated_at: session.updated_at().to_rfc3339(),
        }
    }
}

/// Session detail view including the full message history.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetailResponse {
    #[serde(flatten)]
    pub session: SessionResponse,
    pub messages: Vec<MessageResponse>,
}

/// One chat message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content_type: ContentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_thumbnail_url: Option<String>,
    pub tokens_used: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_time_ms: Option<i64>,
    pub created_at: String,
}

impl From<ChatMessage> for MessageResponse {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.id.to_string(),
            session_id: message.session_id.to_string(),
            role: message.role,
            content_type: message.content_kind,
            text_content: message.text_content,
            image_url: message.image_url,
            image_thumbnail_url: message.image_thumbnail_url,
            tokens_used: message.tokens_used,
            generation_time_ms: message.generation_time_ms,
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

/// Paginated list of sessions.
#[derive(Debug, Clone, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl SessionListResponse {
    pub fn from_page(page: SessionPage, limit: i64, offset: i64) -> Self {
        Self {
            sessions: page.sessions.iter().map(SessionResponse::from).collect(),
            total: page.total,
            limit,
            offset,
        }
    }
}

/// Confirmation for a session delete.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteSessionResponse {
    pub message: String,
    pub session_id: String,
}

/// One purpose preset for client display.
#[derive(Debug, Clone, Serialize)]
pub struct PurposePresetResponse {
    pub id: ImagePurpose,
    pub name: &'static str,
    pub ratio: &'static str,
    pub width: u32,
    pub height: u32,
    pub description: &'static str,
}

impl From<&PurposePreset> for PurposePresetResponse {
    fn from(preset: &PurposePreset) -> Self {
        Self {
            id: preset.purpose,
            name: preset.name,
            ratio: preset.ratio,
            width: preset.width,
            height: preset.height,
            description: preset.description,
        }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(resource_type: &str, id: &str) -> Self {
        Self {
            code: "NOT_FOUND".to_string(),
            message: format!("{} not found: {}", resource_type, id),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            code: "UPSTREAM_ERROR".to_string(),
            message: message.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self {
            code: "SERVICE_UNAVAILABLE".to_string(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
        }
    }
}
