//! Image chat HTTP adapter - session, turn, and preset endpoints.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::ImageChatState;
pub use routes::image_chat_routes;
