//! WebSocket adapter for the live image chat.
//!
//! Each connection is bound to one session and processes turn requests
//! sequentially through the same orchestrator as the REST endpoints.
//!
//! - [`messages`] - WebSocket message protocol types
//! - [`handler`] - Axum WebSocket upgrade handler and turn loop

pub mod handler;
pub mod messages;

pub use handler::{image_chat_ws, websocket_routes};
pub use messages::{TurnEvent, TurnOptions, TurnPayload, TurnRequest};
