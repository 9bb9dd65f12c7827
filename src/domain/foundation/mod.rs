//! Foundation module - Shared domain primitives.
//!
//! Contains the identifier and timestamp value objects that form
//! the vocabulary of the Brand Atelier domain.

mod ids;
mod timestamp;

pub use ids::{ImageId, MessageId, SessionId};
pub use timestamp::Timestamp;
