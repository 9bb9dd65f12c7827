//! Image-chat error types.

use crate::domain::foundation::{ImageId, SessionId};
use crate::ports::{GenerationError, StoreError, UploadError};

/// Errors surfaced by session and turn operations.
///
/// Transport layers map these onto HTTP statuses and WebSocket error
/// events; nothing below this layer retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Session was not found.
    NotFound(SessionId),
    /// Referenced generated image was not found.
    ImageNotFound(ImageId),
    /// Refinement requested with no previous image to refine.
    NoPriorImage,
    /// Validation failed.
    ValidationFailed { field: String, message: String },
    /// No generation credential is configured.
    GeneratorUnavailable,
    /// The generation API failed.
    Generation(String),
    /// Publishing the image to the file store failed.
    Upload(String),
    /// Persistence failure.
    Storage(String),
}

impl ChatError {
    pub fn not_found(id: SessionId) -> Self {
        ChatError::NotFound(id)
    }

    pub fn image_not_found(id: ImageId) -> Self {
        ChatError::ImageNotFound(id)
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ChatError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        ChatError::Generation(message.into())
    }

    pub fn upload(message: impl Into<String>) -> Self {
        ChatError::Upload(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        ChatError::Storage(message.into())
    }

    pub fn message(&self) -> String {
        match self {
            ChatError::NotFound(id) => format!("Session not found: {}", id),
            ChatError::ImageNotFound(id) => format!("Generated image not found: {}", id),
            ChatError::NoPriorImage => {
                "No previous image to refine in this session".to_string()
            }
            ChatError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            ChatError::GeneratorUnavailable => {
                "Image generation is not configured".to_string()
            }
            ChatError::Generation(msg) => format!("Image generation failed: {}", msg),
            ChatError::Upload(msg) => format!("Image upload failed: {}", msg),
            ChatError::Storage(msg) => format!("Storage error: {}", msg),
        }
    }
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ChatError {}

impl From<GenerationError> for ChatError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::NoPriorImage => ChatError::NoPriorImage,
            GenerationError::ServiceUnavailable => ChatError::GeneratorUnavailable,
            other => ChatError::Generation(other.to_string()),
        }
    }
}

impl From<UploadError> for ChatError {
    fn from(err: UploadError) -> Self {
        ChatError::Upload(err.to_string())
    }
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SessionNotFound(id) => ChatError::NotFound(id),
            other => ChatError::Storage(other.to_string()),
        }
    }
}
