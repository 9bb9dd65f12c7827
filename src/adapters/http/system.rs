//! Service-level endpoints: health check and API info.

use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;

use super::image_chat::ImageChatState;

/// GET /health - Liveness and configuration snapshot
async fn health(State(state): State<ImageChatState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.environment.as_str(),
        "gemini_configured": state.generator_configured,
    }))
}

/// GET /api/info - Static API description
async fn api_info() -> Json<serde_json::Value> {
    Json(json!({
        "name": "Brand Atelier",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Conversational marketing image generation service",
        "endpoints": {
            "sessions": "/api/image-chat/sessions",
            "purposes": "/api/image-chat/purposes",
            "websocket": "/ws/image-chat/:session_id",
        },
    }))
}

/// Routes mounted at the application root.
pub fn system_routes() -> Router<ImageChatState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/info", get(api_info))
}
