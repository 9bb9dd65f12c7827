//! File Store Port - Interface for publishing generated images.
//!
//! Implementations upload image bytes to an external file service and
//! return a public URL. Upload failure is a hard turn failure when a store
//! is configured; the orchestrator only falls back to inline data URLs
//! when no store is wired at all.

use async_trait::async_trait;

/// Port for publishing generated images to an external file store.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Upload image bytes and return the public URL.
    async fn upload_image(&self, request: UploadRequest) -> Result<StoredFile, UploadError>;
}

/// Request to upload one image.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
    /// Alt text attached to the created file record.
    pub alt: Option<String>,
}

impl UploadRequest {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            mime_type: mime_type.into(),
            alt: None,
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }
}

/// A successfully published file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Public URL of the uploaded image.
    pub url: String,
    /// Backend file record id, when the store reports one.
    pub file_id: Option<String>,
}

/// File store errors, one per upload stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// Creating the staged upload target failed.
    #[error("staged upload creation failed: {0}")]
    StagingFailed(String),

    /// Posting the bytes to the staged target failed.
    #[error("upload to staged target failed: {0}")]
    UploadFailed(String),

    /// Registering the file record failed.
    #[error("file record creation failed: {0}")]
    FileRecordFailed(String),

    /// Credential acquisition or use failed.
    #[error("file store authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Network error during any stage.
    #[error("network error: {0}")]
    Network(String),
}

impl UploadError {
    pub fn staging_failed(message: impl Into<String>) -> Self {
        Self::StagingFailed(message.into())
    }

    pub fn upload_failed(message: impl Into<String>) -> Self {
        Self::UploadFailed(message.into())
    }

    pub fn file_record_failed(message: impl Into<String>) -> Self {
        Self::FileRecordFailed(message.into())
    }

    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }
}
