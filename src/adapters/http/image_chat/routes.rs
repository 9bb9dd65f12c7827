//! HTTP routes for the image chat endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers::{
    create_session, delete_session, generate_image, get_session, list_sessions, purpose_presets,
    refine_image, send_message, ImageChatState,
};

/// Creates the image chat router, for mounting at `/api/image-chat`.
pub fn image_chat_routes() -> Router<ImageChatState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions", get(list_sessions))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id", delete(delete_session))
        .route("/sessions/:id/message", post(send_message))
        .route("/sessions/:id/generate", post(generate_image))
        .route("/sessions/:id/refine", post(refine_image))
        .route("/purposes", get(purpose_presets))
}
