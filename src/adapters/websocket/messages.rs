//! WebSocket message types for the live image chat.
//!
//! Defines the protocol between server and connected clients:
//! - Client → Server: turn requests (`chat`, `generate`, `refine`, `converse`)
//! - Server → Client: turn events (`status`, `message`, `image`, `mixed`, `error`)
//!
//! Inbound parsing is closed: an unknown `type`, `purpose`, or `style`
//! fails the frame instead of falling back to a default turn.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::application::TurnOutcome;
use crate::domain::catalog::{ImagePurpose, StylePreset};
use crate::domain::foundation::Timestamp;

// ============================================
// Client → Server Messages
// ============================================

/// One requested turn.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnRequest {
    /// Text consultation.
    Chat(TurnPayload),

    /// Image generation from an explicit prompt.
    Generate(TurnPayload),

    /// Refinement of the session's latest image.
    Refine(TurnPayload),

    /// Mixed-mode turn; the model decides between text and image.
    Converse(TurnPayload),
}

/// Common payload of a turn request.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnPayload {
    pub content: String,
    #[serde(default)]
    pub data: TurnOptions,
}

/// Per-turn overrides of the session defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TurnOptions {
    #[serde(default)]
    pub purpose: Option<ImagePurpose>,
    #[serde(default)]
    pub style: Option<StylePreset>,
}

// ============================================
// Server → Client Messages
// ============================================

/// One event sent to the client. Every frame carries a timestamp.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Progress update preceding a turn's work.
    Status {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        timestamp: String,
    },

    /// Text reply.
    Message {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        timestamp: String,
    },

    /// Completed image turn.
    Image {
        content: String,
        image_url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        timestamp: String,
    },

    /// Reply carrying both text and an image.
    Mixed {
        content: String,
        image_url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        timestamp: String,
    },

    /// Turn or frame failure.
    Error { content: String, timestamp: String },
}

impl TurnEvent {
    pub fn status(content: impl Into<String>) -> Self {
        TurnEvent::Status {
            content: content.into(),
            data: None,
            timestamp: now(),
        }
    }

    pub fn status_with(content: impl Into<String>, data: serde_json::Value) -> Self {
        TurnEvent::Status {
            content: content.into(),
            data: Some(data),
            timestamp: now(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        TurnEvent::Error {
            content: content.into(),
            timestamp: now(),
        }
    }

    /// Event for a completed turn.
    ///
    /// `fallback` is used as the content of an image-only reply.
    pub fn from_outcome(outcome: &TurnOutcome, fallback: &str) -> Self {
        let message = &outcome.message;
        match (&message.image_url, &outcome.image) {
            (Some(url), Some(record)) => {
                let data = json!({
                    "prompt_used": record.prompt_used,
                    "model_used": record.model_used,
                    "width": record.width,
                    "height": record.height,
                    "generation_time_ms": message.generation_time_ms,
                });
                match &message.text_content {
                    Some(text) => TurnEvent::Mixed {
                        content: text.clone(),
                        image_url: url.clone(),
                        data: Some(data),
                        timestamp: now(),
                    },
                    None => TurnEvent::Image {
                        content: fallback.to_string(),
                        image_url: url.clone(),
                        data: Some(data),
                        timestamp: now(),
                    },
                }
            }
            _ => TurnEvent::Message {
                content: message.text_content.clone().unwrap_or_default(),
                data: Some(json!({
                    "generation_time_ms": message.generation_time_ms,
                })),
                timestamp: now(),
            },
        }
    }
}

fn now() -> String {
    Timestamp::now().to_rfc3339()
}
