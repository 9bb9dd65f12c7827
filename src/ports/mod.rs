//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `ImageGenerator` - Conversational image generation (Gemini)
//! - `FileStore` - Publishing generated images (Shopify Files)
//! - `ChatStore` - Session/message/image persistence (PostgreSQL)

mod chat_store;
mod file_store;
mod image_generator;

pub use chat_store::{AssistantTurn, ChatStore, SessionFilter, SessionPage, StoreError};
pub use file_store::{FileStore, StoredFile, UploadError, UploadRequest};
pub use image_generator::{
    ChatReply, ChatRequest, ConverseReply, ConverseRequest, GeneratedImage, GenerateRequest,
    GenerationError, ImageGenerator, RefineRequest,
};
