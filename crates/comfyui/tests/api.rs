//! Integration tests for the ComfyUI REST client.
//!
//! Each test starts an in-process axum server that mimics the subset of
//! the ComfyUI HTTP API the client talks to.

use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use imgflow_comfyui::api::{ComfyUIApi, ComfyUIApiError};
use imgflow_core::workflow::{connections_for, Position, WorkflowNode};

type Captured = Arc<Mutex<Vec<Value>>>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Serve `app` on an ephemeral port and return its base URL.
async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing is listening on.
async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn record_prompt(State(seen): State<Captured>, Json(body): Json<Value>) -> Json<Value> {
    seen.lock().unwrap().push(body);
    Json(json!({ "prompt_id": "test-123", "number": 4, "node_errors": {} }))
}

async fn accept_upload(mut multipart: Multipart) -> Result<Json<Value>, StatusCode> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        parts.push((name, file_name, bytes.len()));
    }

    match parts.as_slice() {
        [(name, file_name, len)] if name == "image" && *len > 0 => Ok(Json(json!({
            "name": file_name,
            "subfolder": "",
            "type": "input",
        }))),
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

fn sample_sequence() -> Vec<WorkflowNode> {
    vec![
        WorkflowNode::from_stage(1, "upload", Position { x: 100.0, y: 200.0 })
            .unwrap()
            .with_field("image", json!({ "name": "test.jpg" })),
        WorkflowNode::from_stage(2, "repair", Position { x: 300.0, y: 200.0 })
            .unwrap()
            .with_field("detail", 75),
        WorkflowNode::from_stage(3, "preview", Position { x: 500.0, y: 200.0 }).unwrap(),
    ]
}

// ---------------------------------------------------------------------------
// Test: submit_workflow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_posts_document_with_client_id() {
    let seen: Captured = Arc::default();
    let app = Router::new()
        .route("/prompt", post(record_prompt))
        .with_state(seen.clone());
    let api = ComfyUIApi::new(spawn_server(app).await);

    let nodes = sample_sequence();
    let response = api
        .submit_workflow(&nodes, &connections_for(&nodes))
        .await
        .expect("submit should succeed");

    assert_eq!(response.prompt_id.as_deref(), Some("test-123"));
    assert_eq!(response.number, Some(4));

    let bodies = seen.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];
    assert_eq!(body["client_id"], "workflow-builder");
    assert_eq!(body["prompt"]["nodes"]["1"]["type"], "LoadImage");
    assert_eq!(body["prompt"]["nodes"]["1"]["widgets_values"], json!(["test.jpg", "image"]));
    assert_eq!(body["prompt"]["nodes"]["2"]["type"], "ImageRepair");
    assert_eq!(body["prompt"]["nodes"]["2"]["widgets_values"], json!([75]));
    assert_eq!(body["prompt"]["nodes"]["3"]["properties"], json!({ "metadata": {} }));
    assert_eq!(body["prompt"]["connections"], json!({ "1": { "2": [0] }, "2": { "3": [0] } }));
}

#[tokio::test]
async fn submit_accepts_body_without_prompt_id() {
    let app = Router::new().route(
        "/prompt",
        post(|| async { Json(json!({ "number": 1, "node_errors": {} })) }),
    );
    let api = ComfyUIApi::new(spawn_server(app).await);

    let response = api
        .submit_workflow(&sample_sequence(), &[])
        .await
        .expect("a 2xx body without prompt_id is still a successful submit");

    assert_eq!(response.prompt_id, None);
    assert_eq!(response.number, Some(1));
    assert_eq!(response.node_errors, json!({}));
}

#[tokio::test]
async fn submit_keeps_unrecognised_response_keys() {
    let app = Router::new().route(
        "/prompt",
        post(|| async { Json(json!({ "prompt_id": "p-1", "queue_remaining": 2 })) }),
    );
    let api = ComfyUIApi::new(spawn_server(app).await);

    let response = api.submit_workflow(&[], &[]).await.unwrap();

    assert_eq!(response.prompt_id.as_deref(), Some("p-1"));
    assert_eq!(response.extra.get("queue_remaining"), Some(&json!(2)));
}

#[tokio::test]
async fn submit_surfaces_server_error_status() {
    let app = Router::new().route(
        "/prompt",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "queue exploded") }),
    );
    let api = ComfyUIApi::new(spawn_server(app).await);

    let err = api.submit_workflow(&[], &[]).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("status: 500"));
    assert_matches!(err, ComfyUIApiError::ApiError { status: 500, body } if body == "queue exploded");
}

#[tokio::test]
async fn submit_surfaces_transport_failure() {
    let api = ComfyUIApi::new(dead_url().await);

    let err = api.submit_workflow(&sample_sequence(), &[]).await.unwrap_err();

    assert_matches!(err, ComfyUIApiError::Request(_));
    assert_eq!(err.status(), None);
}

// ---------------------------------------------------------------------------
// Test: fetch_history
// ---------------------------------------------------------------------------

#[tokio::test]
async fn history_returns_parsed_json() {
    let app = Router::new().route(
        "/history",
        get(|| async { Json(json!({ "test-123": { "prompt": [], "outputs": {} } })) }),
    );
    let api = ComfyUIApi::new(spawn_server(app).await);

    let history = api.fetch_history().await.expect("history should load");

    assert!(history["test-123"]["outputs"].is_object());
}

#[tokio::test]
async fn history_surfaces_not_found() {
    let api = ComfyUIApi::new(spawn_server(Router::new()).await);

    let err = api.fetch_history().await.unwrap_err();

    assert_matches!(err, ComfyUIApiError::ApiError { status: 404, .. });
}

// ---------------------------------------------------------------------------
// Test: upload_image
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_sends_single_image_part() {
    let app = Router::new().route("/upload/image", post(accept_upload));
    let api = ComfyUIApi::new(spawn_server(app).await);

    let uploaded = api
        .upload_image("test.jpg", b"\xff\xd8\xff\xe0fake-jpeg".to_vec())
        .await
        .expect("upload should succeed");

    assert_eq!(uploaded.name.as_deref(), Some("test.jpg"));
    assert_eq!(uploaded.folder_type, "input");
}

#[tokio::test]
async fn upload_accepts_body_without_name() {
    let app = Router::new().route(
        "/upload/image",
        post(|| async { Json(json!({ "subfolder": "pasted" })) }),
    );
    let api = ComfyUIApi::new(spawn_server(app).await);

    let uploaded = api
        .upload_image("test.jpg", vec![1, 2, 3])
        .await
        .expect("a 2xx body without name is still a successful upload");

    assert_eq!(uploaded.name, None);
    assert_eq!(uploaded.subfolder, "pasted");
}

#[tokio::test]
async fn upload_surfaces_payload_too_large() {
    let app = Router::new().route(
        "/upload/image",
        post(|| async { StatusCode::PAYLOAD_TOO_LARGE }),
    );
    let api = ComfyUIApi::new(spawn_server(app).await);

    let err = api.upload_image("huge.png", vec![0; 16]).await.unwrap_err();

    assert_eq!(err.status(), Some(413));
}

// ---------------------------------------------------------------------------
// Test: check_health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_true_when_system_stats_ok() {
    let app = Router::new().route(
        "/system_stats",
        get(|| async { Json(json!({ "system": { "os": "posix" }, "devices": [] })) }),
    );
    let api = ComfyUIApi::new(spawn_server(app).await);

    assert!(api.check_health().await);
}

#[tokio::test]
async fn health_false_on_error_status() {
    let app = Router::new().route(
        "/system_stats",
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let api = ComfyUIApi::new(spawn_server(app).await);

    assert!(!api.check_health().await);
}

#[tokio::test]
async fn health_false_when_unreachable() {
    let api = ComfyUIApi::new(dead_url().await);

    assert!(!api.check_health().await);
}
