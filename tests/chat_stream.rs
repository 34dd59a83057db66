//! Integration tests for the streaming chat route with scripted models.
//!
//! Covered:
//! - chunks arrive in order and concatenate to the full reply
//! - the model sees the system prompt first, then the history verbatim
//! - failure to open the upstream stream → 502, nothing streamed
//! - failure mid-stream aborts the body

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use futures::stream::{self, StreamExt};
use serde_json::json;
use tower::ServiceExt as _;

use source_maturity::chat::completion::{
    CompletionError, CompletionMessage, CompletionModel, TextStream,
};
use source_maturity::{api, StaticCatalog};

const BODY_LIMIT: usize = 1024 * 1024;

#[derive(Default)]
struct ScriptedModel {
    chunks: Vec<&'static str>,
    fail_open: bool,
    fail_after: Option<usize>,
    seen: Mutex<Vec<CompletionMessage>>,
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn stream(&self, messages: Vec<CompletionMessage>) -> Result<TextStream, CompletionError> {
        *self.seen.lock().unwrap() = messages;
        if self.fail_open {
            return Err(CompletionError::RateLimited);
        }
        let mut items: Vec<Result<String, CompletionError>> =
            self.chunks.iter().map(|c| Ok(c.to_string())).collect();
        if let Some(n) = self.fail_after {
            items.truncate(n);
            items.push(Err(CompletionError::Stream("connection reset".into())));
        }
        Ok(stream::iter(items).boxed())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn router_with(model: Arc<ScriptedModel>) -> Router {
    api::router(api::AppState::new(StaticCatalog::demo(), model))
}

fn chat_request(payload: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /api/chat")
}

#[tokio::test]
async fn streams_chunks_in_order() {
    let model = Arc::new(ScriptedModel {
        chunks: vec!["Reliability ", "is ", "90."],
        ..Default::default()
    });
    let app = router_with(model.clone());

    let resp = app
        .oneshot(chat_request(json!({
            "messages": [
                { "id": "1", "role": "user", "content": "How reliable is it?" }
            ],
            "selectedSource": "1",
            "userRole": "owner"
        })))
        .await
        .expect("oneshot /api/chat");

    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp
        .headers()
        .get("content-type")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    assert!(ct.starts_with("text/plain"), "content-type was {ct}");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(std::str::from_utf8(&bytes).unwrap(), "Reliability is 90.");

    let seen = model.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].role, "system");
    assert!(seen[0].content.contains("CRM system"));
    assert!(seen[0].content.contains("Data source owner"));
    assert_eq!(seen[1].role, "user");
    assert_eq!(seen[1].content, "How reliable is it?");
}

#[tokio::test]
async fn missing_role_and_source_default_to_requester_without_selection() {
    let model = Arc::new(ScriptedModel {
        chunks: vec!["ok"],
        ..Default::default()
    });
    let app = router_with(model.clone());

    let resp = app
        .oneshot(chat_request(json!({
            "messages": [{ "role": "user", "content": "hi" }]
        })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let seen = model.seen.lock().unwrap();
    assert!(seen[0].content.contains("Data requester"));
    assert!(seen[0].content.contains("has not selected a source"));
}

#[tokio::test]
async fn upstream_open_failure_is_bad_gateway() {
    let model = Arc::new(ScriptedModel {
        fail_open: true,
        ..Default::default()
    });
    let resp = router_with(model)
        .oneshot(chat_request(json!({
            "messages": [{ "id": "1", "role": "user", "content": "hi" }],
            "selectedSource": null,
            "userRole": "requester"
        })))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["error"], "upstream model failure");
}

#[tokio::test]
async fn mid_stream_failure_aborts_body() {
    let model = Arc::new(ScriptedModel {
        chunks: vec!["partial ", "answer"],
        fail_after: Some(1),
        ..Default::default()
    });
    let resp = router_with(model)
        .oneshot(chat_request(json!({
            "messages": [{ "id": "1", "role": "user", "content": "hi" }]
        })))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let read = body::to_bytes(resp.into_body(), BODY_LIMIT).await;
    assert!(read.is_err(), "body must not complete after an upstream error");
}

#[tokio::test]
async fn invalid_role_is_rejected_before_model_call() {
    let model = Arc::new(ScriptedModel::default());
    let resp = router_with(model.clone())
        .oneshot(chat_request(json!({
            "messages": [],
            "userRole": "admin"
        })))
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
    assert!(model.seen.lock().unwrap().is_empty());
}
