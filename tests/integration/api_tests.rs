//! HTTP API integration tests.
//!
//! Tests verify:
//! - Multipart upload and status polling
//! - Publish, unpublish and magic code viewing
//! - JSON error bodies and status codes

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use panocube::{create_router, RouterConfig};

use super::test_utils::{orchestrator, panorama_jpeg, CountingRepository};

const BOUNDARY: &str = "panocube-test-boundary";

// =============================================================================
// Helpers
// =============================================================================

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, Vec<u8>),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: image/jpeg\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/aggregates")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn test_router(root: &std::path::Path) -> Router {
    let orch = orchestrator(root, Arc::new(CountingRepository::new()), 2);
    create_router(orch, RouterConfig::new().with_tracing(false))
}

/// Upload one panorama and wait until the tour is ready.
async fn upload_ready_tour(router: &Router, is_public: &str) -> Value {
    let (status, created) = send(
        router,
        upload_request(&[
            Part::Text("owner", "owner-1"),
            Part::Text("name", "Lobby"),
            Part::Text("is_public", is_public),
            Part::File("panos[]", "lobby.jpg", panorama_jpeg(64, 32).to_vec()),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let id = created["id"].as_str().unwrap().to_string();
    for _ in 0..200 {
        let (_, report) = send(router, empty_request("GET", &format!("/aggregates/{}", id))).await;
        if report["status"] == "ready" {
            return created;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("tour {} never became ready", id);
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    let (status, body) = send(&router, empty_request("GET", "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

// =============================================================================
// Upload and Status
// =============================================================================

#[tokio::test]
async fn test_upload_then_poll_status() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    let created = upload_ready_tour(&router, "false").await;
    assert_eq!(created["owner_id"], "owner-1");
    assert_eq!(created["name"], "Lobby");
    assert_eq!(created["status"], "processing");
    assert_eq!(created["is_public"], false);
    assert!(created["magic_code"].is_null());

    let id = created["id"].as_str().unwrap();
    let (status, report) = send(&router, empty_request("GET", &format!("/aggregates/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["aggregate_id"], id);
    assert_eq!(report["items"].as_array().unwrap().len(), 1);
    assert_eq!(report["items"][0]["name"], "Scene 1");
    assert_eq!(report["items"][0]["status"], "ready");
}

#[tokio::test]
async fn test_upload_without_files_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    let (status, body) = send(
        &router,
        upload_request(&[Part::Text("owner", "owner-1"), Part::Text("name", "Empty")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no_images");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_upload_without_owner_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    let (status, body) = send(
        &router,
        upload_request(&[Part::File("pano", "a.jpg", panorama_jpeg(64, 32).to_vec())]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn test_unknown_aggregate_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    let (status, body) = send(&router, empty_request("GET", "/aggregates/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert!(body["message"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn test_delete_aggregate() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    let created = upload_ready_tour(&router, "false").await;
    let uri = format!("/aggregates/{}", created["id"].as_str().unwrap());

    let (status, body) = send(&router, empty_request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());

    let (status, _) = send(&router, empty_request("GET", &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&router, empty_request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Public Access
// =============================================================================

#[tokio::test]
async fn test_public_upload_and_magic_code_views() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    let created = upload_ready_tour(&router, "true").await;
    let code = created["magic_code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 4);

    let view_request = || {
        Request::builder()
            .uri(format!("/magic/{}", code.to_lowercase()))
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap()
    };

    let (status, first) = send(&router, view_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["counted"], true);
    assert_eq!(first["aggregate"]["views"], 1);
    assert_eq!(first["items"].as_array().unwrap().len(), 1);

    let (_, second) = send(&router, view_request()).await;
    assert_eq!(second["counted"], false);
    assert_eq!(second["aggregate"]["views"], 1);
}

#[tokio::test]
async fn test_publish_and_unpublish() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    let created = upload_ready_tour(&router, "false").await;
    let id = created["id"].as_str().unwrap();

    let (status, published) = send(
        &router,
        empty_request("POST", &format!("/aggregates/{}/publish", id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = published["magic_code"].as_str().unwrap().to_string();

    let (status, _) = send(&router, empty_request("GET", &format!("/magic/{}", code))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, record) = send(
        &router,
        empty_request("POST", &format!("/aggregates/{}/unpublish", id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["is_public"], false);
    assert_eq!(record["magic_code"], code.as_str());

    let (status, body) = send(&router, empty_request("GET", &format!("/magic/{}", code))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_publish_unknown_aggregate_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    let (status, _) = send(&router, empty_request("POST", "/aggregates/nope/publish")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deactivate_and_activate() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    let created = upload_ready_tour(&router, "true").await;
    assert_eq!(created["is_active"], true);
    let id = created["id"].as_str().unwrap();
    let code = created["magic_code"].as_str().unwrap().to_string();

    let (status, record) = send(
        &router,
        empty_request("POST", &format!("/aggregates/{}/deactivate", id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["is_active"], false);

    let (status, _) = send(&router, empty_request("GET", &format!("/magic/{}", code))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, record) = send(
        &router,
        empty_request("POST", &format!("/aggregates/{}/activate", id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["is_active"], true);

    let (status, _) = send(&router, empty_request("GET", &format!("/magic/{}", code))).await;
    assert_eq!(status, StatusCode::OK);
}
