//! WebSocket upgrade handler for live image chat connections.
//!
//! Handles the HTTP → WebSocket upgrade and the connection lifecycle:
//! 1. Validate the session exists (404 before the upgrade)
//! 2. Upgrade to WebSocket and greet the client
//! 3. Process turn requests sequentially until disconnect
//!
//! Turns run through the same orchestrator as the REST endpoints, so
//! every WebSocket turn is persisted. A disconnect leaves the generator's
//! conversation history in place; only deleting the session clears it.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::adapters::http::image_chat::dto::ErrorResponse;
use crate::adapters::http::image_chat::handlers::handle_chat_error;
use crate::adapters::http::ImageChatState;
use crate::application::{ChatTurn, ConverseTurn, GenerateTurn, RefineTurn, TurnOutcome};
use crate::domain::foundation::SessionId;
use crate::domain::session::ChatError;

use super::messages::{TurnEvent, TurnRequest};

/// Handle WebSocket upgrade requests for live image chat.
///
/// Route: `GET /ws/image-chat/:session_id`
pub async fn image_chat_ws(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<ImageChatState>,
) -> Response {
    let session_id: SessionId = match session_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request("Invalid session ID")),
            )
                .into_response()
        }
    };

    // The session must exist before the upgrade
    if let Err(e) = state.sessions.get_session(&session_id).await {
        return handle_chat_error(e);
    }

    ws.on_upgrade(move |socket| handle_socket(socket, session_id, state))
}

/// Run an established connection until the client disconnects.
///
/// One turn at a time: the read loop does not pick up the next frame
/// until the current turn has completed and its events are sent.
async fn handle_socket(mut socket: WebSocket, session_id: SessionId, state: ImageChatState) {
    let hello = TurnEvent::status_with(
        "Connected.",
        json!({ "session_id": session_id.to_string() }),
    );
    if send_event(&mut socket, &hello).await.is_err() {
        return; // Client disconnected immediately
    }

    while let Some(frame) = socket.recv().await {
        let message = match frame {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(session_id = %session_id, "WebSocket receive error: {}", e);
                break;
            }
        };

        match message {
            Message::Text(text) => {
                if process_frame(&state, session_id, &mut socket, &text)
                    .await
                    .is_err()
                {
                    tracing::debug!(session_id = %session_id, "Send error, closing connection");
                    break;
                }
            }
            Message::Binary(_) => {
                tracing::warn!(
                    session_id = %session_id,
                    "Received unsupported binary message"
                );
            }
            Message::Ping(_) | Message::Pong(_) => {
                // Protocol frames handled by axum
            }
            Message::Close(_) => {
                tracing::debug!(session_id = %session_id, "Client sent close frame");
                break;
            }
        }
    }

    // Conversation history survives the disconnect
    tracing::debug!(session_id = %session_id, "WebSocket connection closed");
}

/// Decode one frame, run the turn, and send the resulting events.
///
/// Errors propagate only for socket failures; turn failures are reported
/// to the client as `error` events.
async fn process_frame(
    state: &ImageChatState,
    session_id: SessionId,
    socket: &mut WebSocket,
    text: &str,
) -> Result<(), axum::Error> {
    let request = match serde_json::from_str::<TurnRequest>(text) {
        Ok(request) => request,
        Err(e) => {
            // Closed protocol: unknown types, purposes, or styles fail the frame
            let event = TurnEvent::error(format!("Unrecognized frame: {}", e));
            return send_event(socket, &event).await;
        }
    };

    let (status, fallback) = match &request {
        TurnRequest::Chat(_) => ("Generating response...", ""),
        TurnRequest::Generate(_) => ("Generating image...", "Image generated."),
        TurnRequest::Refine(_) => ("Refining image...", "Image refined."),
        TurnRequest::Converse(_) => ("Generating response...", "Image generated."),
    };
    send_event(socket, &TurnEvent::status(status)).await?;

    match run_turn(state, session_id, request).await {
        Ok(outcome) => send_event(socket, &TurnEvent::from_outcome(&outcome, fallback)).await,
        Err(e) => {
            tracing::warn!(session_id = %session_id, "Turn failed: {}", e);
            send_event(socket, &TurnEvent::error(e.to_string())).await
        }
    }
}

async fn run_turn(
    state: &ImageChatState,
    session_id: SessionId,
    request: TurnRequest,
) -> Result<TurnOutcome, ChatError> {
    match request {
        TurnRequest::Chat(payload) => {
            state
                .turns
                .chat(ChatTurn {
                    session_id,
                    message: payload.content,
                })
                .await
        }
        TurnRequest::Generate(payload) => {
            state
                .turns
                .generate(GenerateTurn {
                    session_id,
                    prompt: payload.content,
                    purpose: payload.data.purpose,
                    style: payload.data.style,
                })
                .await
        }
        TurnRequest::Refine(payload) => {
            state
                .turns
                .refine(RefineTurn {
                    session_id,
                    feedback: payload.content,
                    image_id: None,
                })
                .await
        }
        TurnRequest::Converse(payload) => {
            state
                .turns
                .converse(ConverseTurn {
                    session_id,
                    message: payload.content,
                    purpose: payload.data.purpose,
                    style: payload.data.style,
                })
                .await
        }
    }
}

/// Send a JSON event over the WebSocket.
async fn send_event(socket: &mut WebSocket, event: &TurnEvent) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).expect("TurnEvent serialization should not fail");
    socket.send(Message::Text(json)).await
}

/// Create the axum router for the WebSocket endpoint.
pub fn websocket_routes() -> axum::Router<ImageChatState> {
    use axum::routing::get;

    axum::Router::new().route("/ws/image-chat/:session_id", get(image_chat_ws))
}
