//! Router configuration for panocube.
//!
//! # Route Structure
//!
//! ```text
//! /health                          - Health check
//! /aggregates                      - POST upload (multipart)
//! /aggregates/{id}                 - GET status, DELETE tour
//! /aggregates/{id}/publish         - POST
//! /aggregates/{id}/unpublish       - POST
//! /aggregates/{id}/activate        - POST
//! /aggregates/{id}/deactivate      - POST
//! /magic/{code}                    - GET public tour
//! ```
//!
//! # Example
//!
//! ```ignore
//! use panocube::server::{create_router, RouterConfig};
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//! let router = create_router(orchestrator, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    activate_handler, aggregate_status_handler, create_aggregate_handler,
    deactivate_handler, delete_aggregate_handler, health_handler, magic_code_handler,
    publish_handler, unpublish_handler, AppState,
};
use crate::config::DEFAULT_MAX_UPLOAD_SIZE;
use crate::pipeline::Orchestrator;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Request body limit in bytes
    pub max_upload_size: usize,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Any origin, 1 GiB body limit, tracing on.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    pub fn with_max_upload_size(mut self, bytes: usize) -> Self {
        self.max_upload_size = bytes;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router around `orchestrator`.
pub fn create_router(orchestrator: Orchestrator, config: RouterConfig) -> Router {
    let app_state = AppState::new(orchestrator);
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/aggregates", post(create_aggregate_handler))
        .route(
            "/aggregates/{id}",
            get(aggregate_status_handler).delete(delete_aggregate_handler),
        )
        .route("/aggregates/{id}/publish", post(publish_handler))
        .route("/aggregates/{id}/unpublish", post(unpublish_handler))
        .route("/aggregates/{id}/activate", post(activate_handler))
        .route("/aggregates/{id}/deactivate", post(deactivate_handler))
        .route("/magic/{code}", get(magic_code_handler))
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(config.max_upload_size))
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
