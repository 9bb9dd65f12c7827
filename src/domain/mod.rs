//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps)
//! - `catalog` - Image purposes, style presets, and prompt hints
//! - `brand` - Brand guideline prompt blocks
//! - `session` - Image chat sessions, messages, and generated-image records

pub mod brand;
pub mod catalog;
pub mod foundation;
pub mod session;
