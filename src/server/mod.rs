//! HTTP server layer for panocube.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │     /aggregates, /aggregates/{id}, /magic/{code}, /health       │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (multipart, JSON, errors)│  │  (CORS, body limit, trace)  │  │
//! │  └────────────┬─────────────┘  └─────────────────────────────┘  │
//! └───────────────┼─────────────────────────────────────────────────┘
//!                 ▼
//!           Orchestrator
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    activate_handler, aggregate_status_handler, create_aggregate_handler, deactivate_handler,
    delete_aggregate_handler, health_handler, magic_code_handler, publish_handler,
    unpublish_handler, viewer_key,
    ApiError, AppState, ErrorResponse, HealthResponse, MessageResponse, PublishResponse,
    ANONYMOUS_VIEWER,
};
pub use routes::{create_router, RouterConfig};
