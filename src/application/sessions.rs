//! Session lifecycle service.
//!
//! Creation, lookup, listing, and deletion of image chat sessions.
//! Deleting a session also drops the generator's in-memory conversation
//! history for it; disconnecting a WebSocket does not.

use std::sync::Arc;

use crate::domain::catalog::{purpose_presets, ImagePurpose, PurposePreset, StylePreset};
use crate::domain::foundation::SessionId;
use crate::domain::session::{ChatError, ChatMessage, ChatSession};
use crate::ports::{ChatStore, ImageGenerator, SessionFilter, SessionPage};

/// Command to create a new image chat session.
#[derive(Debug, Clone, Default)]
pub struct CreateSessionCommand {
    pub title: Option<String>,
    pub purpose: ImagePurpose,
    pub style: Option<StylePreset>,
    pub brand_guidelines: Option<serde_json::Value>,
}

/// Service for session lifecycle operations.
pub struct SessionService {
    store: Arc<dyn ChatStore>,
    generator: Option<Arc<dyn ImageGenerator>>,
}

impl SessionService {
    pub fn new(store: Arc<dyn ChatStore>, generator: Option<Arc<dyn ImageGenerator>>) -> Self {
        Self { store, generator }
    }

    /// Create and persist a new session.
    pub async fn create_session(&self, cmd: CreateSessionCommand) -> Result<ChatSession, ChatError> {
        let session = ChatSession::new(
            SessionId::new(),
            cmd.title,
            cmd.purpose,
            cmd.style,
            cmd.brand_guidelines,
        )?;

        self.store.create_session(&session).await?;

        tracing::info!(
            session_id = %session.id(),
            purpose = %session.purpose(),
            "created image chat session"
        );
        Ok(session)
    }

    /// Look up a session by id.
    pub async fn get_session(&self, id: &SessionId) -> Result<ChatSession, ChatError> {
        self.store
            .find_session(id)
            .await?
            .ok_or(ChatError::NotFound(*id))
    }

    /// A session together with its full message history, oldest first.
    pub async fn get_session_with_messages(
        &self,
        id: &SessionId,
    ) -> Result<(ChatSession, Vec<ChatMessage>), ChatError> {
        let session = self.get_session(id).await?;
        let messages = self.store.list_messages(id).await?;
        Ok((session, messages))
    }

    /// List sessions, newest first.
    pub async fn list_sessions(&self, filter: SessionFilter) -> Result<SessionPage, ChatError> {
        Ok(self.store.list_sessions(filter).await?)
    }

    /// Delete a session and everything hanging off it.
    ///
    /// Cascades to message and image rows, and clears the generator's
    /// conversation history for the session.
    pub async fn delete_session(&self, id: &SessionId) -> Result<(), ChatError> {
        let deleted = self.store.delete_session(id).await?;
        if !deleted {
            return Err(ChatError::NotFound(*id));
        }

        if let Some(generator) = &self.generator {
            generator.clear_session(id).await;
        }

        tracing::info!(session_id = %id, "deleted image chat session");
        Ok(())
    }

    /// The built-in purpose presets, for client display.
    pub fn purpose_presets(&self) -> &'static [PurposePreset] {
        purpose_presets()
    }
}
