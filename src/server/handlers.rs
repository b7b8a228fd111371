//! HTTP request handlers for the panocube API.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /aggregates` - Upload a tour (multipart)
//! - `GET /aggregates/{id}` - Processing status
//! - `DELETE /aggregates/{id}` - Delete a tour and its artifacts
//! - `POST /aggregates/{id}/publish` - Make a tour public
//! - `POST /aggregates/{id}/unpublish` - Make a tour private
//! - `GET /magic/{code}` - Open a public tour by magic code

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{PipelineError, SubmitError};
use crate::pipeline::{
    AggregateRecord, Orchestrator, PublicView, SourceUpload, StatusReport, SubmitRequest,
};

/// Viewer key used when the request carries no client address.
pub const ANONYMOUS_VIEWER: &str = "anonymous";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state, passed to handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Plain confirmation message.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Result of publishing a tour.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublishResponse {
    pub magic_code: Option<String>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Errors a handler can return.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request (bad multipart, missing field)
    BadRequest(String),

    Submit(SubmitError),

    Pipeline(PipelineError),
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        ApiError::Submit(err)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err))
    }
}

impl ApiError {
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),

            ApiError::Submit(SubmitError::NoImages) => (StatusCode::BAD_REQUEST, "no_images"),
            ApiError::Submit(SubmitError::Allocation(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "allocation_error")
            }
            ApiError::Submit(SubmitError::Staging { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "staging_error")
            }
            ApiError::Submit(SubmitError::Repository(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "repository_error")
            }

            ApiError::Pipeline(PipelineError::AggregateNotFound(_))
            | ApiError::Pipeline(PipelineError::MagicCodeNotFound(_)) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ApiError::Pipeline(PipelineError::Allocation(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "allocation_error")
            }
            ApiError::Pipeline(PipelineError::Repository(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "repository_error")
            }
            ApiError::Pipeline(PipelineError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
            ApiError::Pipeline(PipelineError::LocalCleanup { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "io_error")
            }
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Submit(err) => err.to_string(),
            ApiError::Pipeline(err) => err.to_string(),
        }
    }
}

/// Convert handler errors to HTTP responses.
///
/// 5xx errors are logged at ERROR, 404s at DEBUG and other 4xx at WARN.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.classify();
        let message = self.message();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
///
/// `GET /health` returns `{"status": "healthy", "version": "..."}`.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle tour uploads.
///
/// # Endpoint
///
/// `POST /aggregates` (multipart/form-data)
///
/// # Fields
///
/// - `owner`: owner identifier (required)
/// - `name`: tour name (default: "Untitled tour")
/// - `is_public`: `true`/`1`/`on` to publish immediately
/// - `panos[]` or `pano`: one or more panorama files
///
/// # Response
///
/// `200 OK` with the new aggregate record. Processing continues in the
/// background; poll `GET /aggregates/{id}` for progress.
pub async fn create_aggregate_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AggregateRecord>, ApiError> {
    let mut owner_id = None;
    let mut name = None;
    let mut is_public = false;
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "owner" => owner_id = Some(field.text().await?),
            "name" => name = Some(field.text().await?),
            "is_public" => is_public = parse_flag(&field.text().await?),
            "panos[]" | "panos" | "pano" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("pano-{}", uploads.len()));
                let data = field.bytes().await?;
                uploads.push(SourceUpload::new(file_name, data));
            }
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let owner_id = owner_id
        .filter(|owner| !owner.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Field 'owner' is required".to_string()))?;

    let submission = state
        .orchestrator
        .submit(SubmitRequest {
            owner_id,
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Untitled tour".to_string()),
            is_public,
            uploads,
        })
        .await?;

    // Tasks keep running after the submission handle is dropped
    Ok(Json(submission.aggregate))
}

/// Handle status requests.
///
/// `GET /aggregates/{id}` returns the aggregate status and its items.
pub async fn aggregate_status_handler(
    State(state): State<AppState>,
    Path(aggregate_id): Path<String>,
) -> Result<Json<StatusReport>, ApiError> {
    Ok(Json(state.orchestrator.status(&aggregate_id).await?))
}

/// Handle tour deletion.
///
/// `DELETE /aggregates/{id}` removes records, magic code and artifacts.
pub async fn delete_aggregate_handler(
    State(state): State<AppState>,
    Path(aggregate_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.orchestrator.delete_aggregate(&aggregate_id).await?;
    Ok(Json(MessageResponse {
        message: "Project deleted".to_string(),
    }))
}

/// `POST /aggregates/{id}/publish` returns the tour's magic code.
pub async fn publish_handler(
    State(state): State<AppState>,
    Path(aggregate_id): Path<String>,
) -> Result<Json<PublishResponse>, ApiError> {
    let record = state.orchestrator.publish(&aggregate_id).await?;
    Ok(Json(PublishResponse {
        magic_code: record.magic_code,
    }))
}

/// `POST /aggregates/{id}/unpublish` returns the updated record.
pub async fn unpublish_handler(
    State(state): State<AppState>,
    Path(aggregate_id): Path<String>,
) -> Result<Json<AggregateRecord>, ApiError> {
    Ok(Json(state.orchestrator.unpublish(&aggregate_id).await?))
}

/// `POST /aggregates/{id}/activate` returns the updated record.
pub async fn activate_handler(
    State(state): State<AppState>,
    Path(aggregate_id): Path<String>,
) -> Result<Json<AggregateRecord>, ApiError> {
    Ok(Json(state.orchestrator.activate(&aggregate_id).await?))
}

/// `POST /aggregates/{id}/deactivate` locks the tour for magic-code viewers.
pub async fn deactivate_handler(
    State(state): State<AppState>,
    Path(aggregate_id): Path<String>,
) -> Result<Json<AggregateRecord>, ApiError> {
    Ok(Json(state.orchestrator.deactivate(&aggregate_id).await?))
}

/// Handle public viewer requests.
///
/// `GET /magic/{code}` returns the public tour and counts the view at most
/// once per viewer per cooldown window.
pub async fn magic_code_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<PublicView>, ApiError> {
    let viewer = viewer_key(&headers);
    Ok(Json(
        state.orchestrator.view_by_magic_code(&code, &viewer).await?,
    ))
}

/// Identify the viewer from proxy headers.
///
/// First `X-Forwarded-For` address, else `X-Real-IP`, else
/// [`ANONYMOUS_VIEWER`].
pub fn viewer_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(ANONYMOUS_VIEWER)
        .to_string()
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}

// =============================================================================
// Tests
// =============================================================================
