//! Image chat session domain module.
//!
//! Sessions bind a conversation to a marketing purpose and carry the
//! denormalized counters over their message and generated-image rows.

mod errors;
mod records;

pub use errors::ChatError;
pub use records::{
    ChatMessage, ChatSession, ContentKind, GeneratedImageRecord, MessageRole, SessionStatus,
    MAX_TITLE_LENGTH,
};
