//! Gemini adapter - conversational image generation over generateContent.

mod history;
mod provider;

pub use provider::{GeminiImageProvider, GeminiProviderConfig};
