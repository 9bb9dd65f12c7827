//! HTTP handlers for the image chat endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::application::{
    ChatTurn, CreateSessionCommand, GenerateTurn, RefineTurn, SessionService, TurnOrchestrator,
};
use crate::config::Environment;
use crate::domain::foundation::{ImageId, SessionId};
use crate::domain::session::ChatError;

use super::dto::{
    CreateSessionRequest, DeleteSessionResponse, ErrorResponse, GenerateImageRequest,
    ListSessionsQuery, MessageResponse, PurposePresetResponse, RefineImageRequest,
    SendMessageRequest, SessionDetailResponse, SessionListResponse, SessionResponse,
};
use crate::ports::SessionFilter;

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

/// Shared state for the HTTP and WebSocket handlers.
#[derive(Clone)]
pub struct ImageChatState {
    pub sessions: Arc<SessionService>,
    pub turns: Arc<TurnOrchestrator>,
    pub environment: Environment,
    pub generator_configured: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// Session handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/image-chat/sessions - Create a new session
pub async fn create_session(
    State(state): State<ImageChatState>,
    Json(req): Json<CreateSessionRequest>,
) -> Response {
    let cmd = CreateSessionCommand {
        title: req.title,
        purpose: req.image_purpose,
        style: req.style_preset,
        brand_guidelines: req.brand_guidelines,
    };

    match state.sessions.create_session(cmd).await {
        Ok(session) => {
            (StatusCode::CREATED, Json(SessionResponse::from(&session))).into_response()
        }
        Err(e) => handle_chat_error(e),
    }
}

/// GET /api/image-chat/sessions - List sessions
pub async fn list_sessions(
    State(state): State<ImageChatState>,
    Query(query): Query<ListSessionsQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    let mut filter = SessionFilter::new(limit, offset);
    if let Some(status) = query.status {
        filter = filter.with_status(status);
    }

    match state.sessions.list_sessions(filter).await {
        Ok(page) => (
            StatusCode::OK,
            Json(SessionListResponse::from_page(page, limit, offset)),
        )
            .into_response(),
        Err(e) => handle_chat_error(e),
    }
}

/// GET /api/image-chat/sessions/:id - Get session details with messages
pub async fn get_session(
    State(state): State<ImageChatState>,
    Path(session_id): Path<String>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.sessions.get_session_with_messages(&session_id).await {
        Ok((session, messages)) => {
            let response = SessionDetailResponse {
                session: SessionResponse::from(&session),
                messages: messages.into_iter().map(MessageResponse::from).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => handle_chat_error(e),
    }
}

/// DELETE /api/image-chat/sessions/:id - Delete a session
pub async fn delete_session(
    State(state): State<ImageChatState>,
    Path(session_id): Path<String>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.sessions.delete_session(&session_id).await {
        Ok(()) => {
            let response = DeleteSessionResponse {
                message: "Session deleted".to_string(),
                session_id: session_id.to_string(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => handle_chat_error(e),
    }
}

/// GET /api/image-chat/purposes - List purpose presets
pub async fn purpose_presets(State(state): State<ImageChatState>) -> Response {
    let presets: Vec<PurposePresetResponse> = state
        .sessions
        .purpose_presets()
        .iter()
        .map(PurposePresetResponse::from)
        .collect();
    (StatusCode::OK, Json(presets)).into_response()
}

// ════════════════════════════════════════════════════════════════════════════
// Turn handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/image-chat/sessions/:id/message - Send a chat message
///
/// With `generate_image: true` the content is used as a generation prompt
/// instead of a consultation message.
pub async fn send_message(
    State(state): State<ImageChatState>,
    Path(session_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let result = if req.generate_image {
        state
            .turns
            .generate(GenerateTurn {
                session_id,
                prompt: req.content,
                purpose: None,
                style: None,
            })
            .await
    } else {
        state
            .turns
            .chat(ChatTurn {
                session_id,
                message: req.content,
            })
            .await
    };

    match result {
        Ok(outcome) => {
            (StatusCode::OK, Json(MessageResponse::from(outcome.message))).into_response()
        }
        Err(e) => handle_chat_error(e),
    }
}

/// POST /api/image-chat/sessions/:id/generate - Generate an image
pub async fn generate_image(
    State(state): State<ImageChatState>,
    Path(session_id): Path<String>,
    Json(req): Json<GenerateImageRequest>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let turn = GenerateTurn {
        session_id,
        prompt: req.prompt,
        purpose: None,
        style: req.style_preset,
    };

    match state.turns.generate(turn).await {
        Ok(outcome) => {
            (StatusCode::OK, Json(MessageResponse::from(outcome.message))).into_response()
        }
        Err(e) => handle_chat_error(e),
    }
}

/// POST /api/image-chat/sessions/:id/refine - Refine the previous image
pub async fn refine_image(
    State(state): State<ImageChatState>,
    Path(session_id): Path<String>,
    Json(req): Json<RefineImageRequest>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let image_id = match req.image_id.as_deref() {
        Some(raw) => match raw.parse::<ImageId>() {
            Ok(id) => Some(id),
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::bad_request("Invalid image ID")),
                )
                    .into_response()
            }
        },
        None => None,
    };

    let turn = RefineTurn {
        session_id,
        feedback: req.feedback,
        image_id,
    };

    match state.turns.refine(turn).await {
        Ok(outcome) => {
            (StatusCode::OK, Json(MessageResponse::from(outcome.message))).into_response()
        }
        Err(e) => handle_chat_error(e),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Error handling
// ════════════════════════════════════════════════════════════════════════════

fn parse_session_id(raw: &str) -> Result<SessionId, Response> {
    raw.parse::<SessionId>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("Invalid session ID")),
        )
            .into_response()
    })
}

pub(crate) fn handle_chat_error(error: ChatError) -> Response {
    match error {
        ChatError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found("Session", &id.to_string())),
        )
            .into_response(),
        ChatError::ImageNotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found("Image", &id.to_string())),
        )
            .into_response(),
        ChatError::ValidationFailed { field, message } => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(format!(
                "Validation failed for {}: {}",
                field, message
            ))),
        )
            .into_response(),
        ChatError::NoPriorImage => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(
                "No previous image to refine in this session",
            )),
        )
            .into_response(),
        ChatError::GeneratorUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::service_unavailable(
                "Image generation is not configured",
            )),
        )
            .into_response(),
        ChatError::Generation(msg) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse::upstream(msg)),
        )
            .into_response(),
        ChatError::Upload(msg) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse::upstream(format!(
                "Image upload failed: {}",
                msg
            ))),
        )
            .into_response(),
        ChatError::Storage(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal(msg)),
        )
            .into_response(),
    }
}
