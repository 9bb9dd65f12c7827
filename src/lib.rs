//! Brand Atelier - Conversational Marketing Image Generation
//!
//! This crate implements a chat-style backend for producing brand-consistent
//! marketing imagery: sessions bound to a marketing purpose, consultative and
//! generative turns against a multimodal model, and publication of generated
//! images to an external file store.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
