//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `gemini` - Image generation via the Gemini API
//! - `shopify` - Image publishing via Shopify Files
//! - `postgres` - Session/message/image persistence
//! - `http` - REST API surface
//! - `websocket` - Live chat surface

pub mod gemini;
pub mod http;
pub mod postgres;
pub mod shopify;
pub mod websocket;
