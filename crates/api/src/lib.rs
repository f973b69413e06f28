//! Minimal HTTP service exposing a health check endpoint.
//!
//! Settings come from the environment, logging goes through `tracing`, and
//! the router serves `GET /health` behind a permissive CORS policy.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Settings;

pub const APP_DESCRIPTION: &str = "A simple FastAPI application with a health endpoint";

/// Descriptive metadata published by the service.
#[derive(Debug, Clone)]
pub struct AppMetadata {
    pub title: String,
    pub description: String,
    pub version: String,
    pub debug: bool,
}

impl AppMetadata {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            title: settings.app_name.clone(),
            description: APP_DESCRIPTION.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            debug: settings.debug,
        }
    }
}

/// Creates the Axum application router with all routes and middleware.
pub fn create_app(settings: &Settings) -> Router {
    let metadata = Arc::new(AppMetadata::from_settings(settings));
    tracing::info!(
        title = %metadata.title,
        version = %metadata.version,
        debug = metadata.debug,
        "application created"
    );

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/openapi.json", get(routes::openapi::document))
        .fallback(routes::fallback::not_found)
        .method_not_allowed_fallback(routes::fallback::method_not_allowed)
        .with_state(metadata)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Allows every origin, method and header, with credentials.
///
/// Browsers reject `*` alongside credentials, so each request's own origin,
/// method and headers are echoed back.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
