//! Chat Store Port - Persistence contract for sessions, messages, and images.
//!
//! Counter maintenance is part of the contract: `append_user_message` and
//! `record_assistant_turn` update the owning session's counters in the same
//! transaction as the row writes, so the counters always equal the row
//! counts no matter where a turn fails.

use async_trait::async_trait;

use crate::domain::foundation::{ImageId, SessionId};
use crate::domain::session::{ChatMessage, ChatSession, GeneratedImageRecord, SessionStatus};

/// Port for image chat persistence.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Insert a new session.
    async fn create_session(&self, session: &ChatSession) -> Result<(), StoreError>;

    /// Look up a session by id.
    async fn find_session(&self, id: &SessionId) -> Result<Option<ChatSession>, StoreError>;

    /// List sessions, newest first, with the unfiltered-within-status total.
    async fn list_sessions(&self, filter: SessionFilter) -> Result<SessionPage, StoreError>;

    /// Delete a session; message and image rows go with it.
    ///
    /// Returns `false` when no such session existed.
    async fn delete_session(&self, id: &SessionId) -> Result<bool, StoreError>;

    /// All messages of a session, oldest first.
    async fn list_messages(&self, session_id: &SessionId)
        -> Result<Vec<ChatMessage>, StoreError>;

    /// Persist a user message, bumping the session's message counter
    /// transactionally.
    async fn append_user_message(&self, message: &ChatMessage) -> Result<(), StoreError>;

    /// Persist a completed assistant turn in one transaction: the assistant
    /// message, the optional image row, counter bumps, token total, and
    /// `final_image_url`.
    async fn record_assistant_turn(&self, turn: &AssistantTurn) -> Result<(), StoreError>;

    /// Look up a generated image record by id.
    async fn find_image(&self, id: &ImageId) -> Result<Option<GeneratedImageRecord>, StoreError>;
}

/// Filter for listing sessions.
#[derive(Debug, Clone, Copy)]
pub struct SessionFilter {
    pub status: Option<SessionStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl SessionFilter {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            status: None,
            limit,
            offset,
        }
    }

    pub fn with_status(mut self, status: SessionStatus) -> Self {
        self.status = Some(status);
        self
    }
}

impl Default for SessionFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: 20,
            offset: 0,
        }
    }
}

/// One page of sessions plus the total matching count.
#[derive(Debug, Clone)]
pub struct SessionPage {
    pub sessions: Vec<ChatSession>,
    pub total: i64,
}

/// A completed assistant turn ready to persist atomically.
#[derive(Debug, Clone)]
pub struct AssistantTurn {
    pub message: ChatMessage,
    /// Present for image turns; its URL becomes the session's
    /// `final_image_url`.
    pub image: Option<GeneratedImageRecord>,
    /// Token usage added to the session total.
    pub tokens_used: i64,
}

impl AssistantTurn {
    pub fn text(message: ChatMessage, tokens_used: i64) -> Self {
        Self {
            message,
            image: None,
            tokens_used,
        }
    }

    pub fn with_image(message: ChatMessage, image: GeneratedImageRecord, tokens_used: i64) -> Self {
        Self {
            message,
            image: Some(image),
            tokens_used,
        }
    }
}

/// Persistence errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The referenced session does not exist.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }
}
