//! HTTP adapters - REST API implementations.

pub mod image_chat;
pub mod system;

pub use image_chat::{image_chat_routes, ImageChatState};
pub use system::system_routes;
