//! Per-session in-memory conversation history.
//!
//! History stores API-shaped turns so consultation calls can replay the
//! conversation. Image binaries are never kept: an emitted image becomes a
//! marker part that replay drops, because the API cannot round-trip its own
//! generated image state.
//!
//! Each session's turns sit behind their own async mutex. A turn holds the
//! guard across the remote call, so turns against one session are processed
//! strictly one at a time while distinct sessions proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::domain::foundation::SessionId;

/// Role of a history turn, in API vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRole {
    User,
    Model,
}

impl HistoryRole {
    pub fn as_wire(&self) -> &'static str {
        match self {
            HistoryRole::User => "user",
            HistoryRole::Model => "model",
        }
    }
}

/// One part of a history turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryPart {
    Text(String),
    /// Marker for an emitted image; replay skips it.
    ImageMarker { mime_type: String },
}

/// One recorded turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTurn {
    pub role: HistoryRole,
    pub parts: Vec<HistoryPart>,
}

impl HistoryTurn {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::User,
            parts: vec![HistoryPart::Text(text.into())],
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::Model,
            parts: vec![HistoryPart::Text(text.into())],
        }
    }

    pub fn model_image(mime_type: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::Model,
            parts: vec![HistoryPart::ImageMarker {
                mime_type: mime_type.into(),
            }],
        }
    }

    /// Text parts that survive replay; empty for marker-only turns.
    pub fn replayable_texts(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                HistoryPart::Text(text) => Some(text.as_str()),
                HistoryPart::ImageMarker { .. } => None,
            })
            .collect()
    }
}

/// Conversation history for all sessions, keyed by session id.
#[derive(Debug, Default)]
pub struct SessionHistory {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Vec<HistoryTurn>>>>>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the turn lock for a session, creating its entry on first use.
    ///
    /// The returned guard is held for the whole turn, including the remote
    /// call, which serializes turn processing per session.
    pub async fn lock(&self, id: SessionId) -> OwnedMutexGuard<Vec<HistoryTurn>> {
        let entry = {
            let mut sessions = self.sessions.write().await;
            sessions
                .entry(id)
                .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
                .clone()
        };
        entry.lock_owned().await
    }

    /// Drop a session's history.
    ///
    /// A turn already holding the session's guard keeps its detached copy;
    /// the next turn starts from an empty history.
    pub async fn clear(&self, id: &SessionId) {
        self.sessions.write().await.remove(id);
    }

    /// Number of recorded turns for a session.
    pub async fn turn_count(&self, id: &SessionId) -> usize {
        let entry = {
            let sessions = self.sessions.read().await;
            sessions.get(id).cloned()
        };
        match entry {
            Some(turns) => turns.lock().await.len(),
            None => 0,
        }
    }
}
