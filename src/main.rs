//! Brand Atelier server entry point.
//!
//! Loads configuration, connects and migrates the database, wires the
//! adapters into the application services, and serves the REST and
//! WebSocket surfaces.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use http::{HeaderValue, Method};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use brand_atelier::adapters::gemini::{GeminiImageProvider, GeminiProviderConfig};
use brand_atelier::adapters::http::{image_chat_routes, system_routes, ImageChatState};
use brand_atelier::adapters::postgres::PostgresChatStore;
use brand_atelier::adapters::shopify::{ShopifyFilesAdapter, ShopifyFilesConfig};
use brand_atelier::adapters::websocket::websocket_routes;
use brand_atelier::application::{SessionService, TurnOrchestrator};
use brand_atelier::config::AppConfig;
use brand_atelier::ports::{ChatStore, FileStore, ImageGenerator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    tracing::info!(
        environment = config.server.environment.as_str(),
        "Starting Brand Atelier"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let store: Arc<dyn ChatStore> = Arc::new(PostgresChatStore::new(pool));

    let generator: Option<Arc<dyn ImageGenerator>> =
        match GeminiProviderConfig::from_settings(&config.gemini) {
            Some(provider_config) => {
                tracing::info!(model = %config.gemini.model, "Gemini image generation enabled");
                Some(Arc::new(GeminiImageProvider::new(provider_config)))
            }
            None => {
                tracing::warn!("Gemini API key not set; generation turns will be rejected");
                None
            }
        };

    let file_store: Option<Arc<dyn FileStore>> =
        match ShopifyFilesConfig::from_settings(&config.shopify) {
            Some(files_config) => {
                tracing::info!("Shopify Files uploads enabled");
                Some(Arc::new(ShopifyFilesAdapter::new(files_config)))
            }
            None => {
                tracing::warn!(
                    "Shopify Files not configured; images will be published as inline data URLs"
                );
                None
            }
        };

    let sessions = Arc::new(SessionService::new(store.clone(), generator.clone()));
    let turns = Arc::new(TurnOrchestrator::new(
        store,
        generator.clone(),
        file_store,
    ));

    let state = ImageChatState {
        sessions,
        turns,
        environment: config.server.environment.clone(),
        generator_configured: generator.is_some(),
    };

    let app = Router::new()
        .merge(system_routes())
        .nest("/api/image-chat", image_chat_routes())
        .merge(websocket_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout_secs,
                )))
                .layer(cors_layer(&config)),
        );

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Brand Atelier listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        // Development default: permissive
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers(Any)
    }
}
