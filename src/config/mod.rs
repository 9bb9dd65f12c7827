//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `BRAND_ATELIER_` prefix and nested values use underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use brand_atelier::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod gemini;
mod server;
mod shopify;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use gemini::GeminiConfig;
pub use server::{Environment, ServerConfig};
pub use shopify::ShopifyConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Contains all configuration sections for the Brand Atelier backend.
/// Load using [`AppConfig::load()`] which reads from environment variables,
/// then pass the loaded value (or its sections) explicitly to constructors.
/// There is no global configuration singleton.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Image generation API configuration (Gemini)
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// File upload configuration (Shopify Files)
    #[serde(default)]
    pub shopify: ShopifyConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `BRAND_ATELIER` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `BRAND_ATELIER__SERVER__PORT=8000` -> `server.port = 8000`
    /// - `BRAND_ATELIER__DATABASE__URL=...` -> `database.url = ...`
    /// - `BRAND_ATELIER__GEMINI__API_KEY=...` -> `gemini.api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("BRAND_ATELIER")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.gemini.validate()?;
        self.shopify.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
