//! OpenAI-compatible streaming client against an in-process `/chat/completions`
//! server bound to 127.0.0.1:0.
//!
//! Covered:
//! - request shape (bearer key, model, stream=true, messages in order)
//! - SSE deltas arrive in order and stop at `[DONE]`
//! - body closed before `[DONE]` ends with an error item
//! - slow but steady upstream outlives `timeout_secs`
//! - 401/403 → Auth, 429 → RateLimited, other non-2xx → Status

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use source_maturity::chat::completion::{
    CompletionError, CompletionMessage, CompletionModel, OpenAiCompletion,
};
use source_maturity::config::CompletionConfig;

#[derive(Clone, Copy)]
enum Mode {
    Complete,
    Truncated,
    Slow,
    Status(u16),
}

#[derive(Clone)]
struct Upstream {
    mode: Mode,
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

fn delta(text: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({ "choices": [{ "delta": { "content": text } }] })
    )
}

fn sse(body: Body) -> Response {
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

async fn completions(
    State(u): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);
    u.seen.lock().unwrap().push((auth, body));

    match u.mode {
        Mode::Complete => sse(Body::from(format!(
            "{}{}{}data: [DONE]\n\n",
            delta("Accuracy "),
            delta("is "),
            delta("80.")
        ))),
        Mode::Truncated => sse(Body::from(format!(
            "{}{}{}",
            delta("Accuracy "),
            delta("is "),
            delta("8")
        ))),
        Mode::Slow => {
            let chunks = async_stream::stream! {
                for i in 0..3 {
                    if i > 0 {
                        tokio::time::sleep(Duration::from_millis(800)).await;
                    }
                    yield Ok::<_, Infallible>(delta(&format!("c{i} ")));
                }
                yield Ok("data: [DONE]\n\n".to_string());
            };
            sse(Body::from_stream(chunks))
        }
        Mode::Status(code) => (
            StatusCode::from_u16(code).unwrap(),
            Json(json!({ "error": { "message": "nope" } })),
        )
            .into_response(),
    }
}

type SeenLog = Arc<Mutex<Vec<(Option<String>, Value)>>>;

async fn spawn_upstream(mode: Mode) -> (OpenAiCompletion, SeenLog) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(Upstream {
            mode,
            seen: seen.clone(),
        });

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let model = OpenAiCompletion::new(&CompletionConfig {
        provider: "openai".to_string(),
        model: "gpt-4-turbo".to_string(),
        base_url: format!("http://{addr}/v1"),
        api_key: "sk-test".to_string(),
        connect_timeout_secs: 2,
        timeout_secs: 2,
    })
    .expect("client");
    (model, seen)
}

fn messages() -> Vec<CompletionMessage> {
    vec![
        CompletionMessage::system("You are a data quality analyst."),
        CompletionMessage {
            role: "user".to_string(),
            content: "How accurate is it?".to_string(),
        },
    ]
}

async fn collect(model: &OpenAiCompletion) -> Vec<Result<String, CompletionError>> {
    model
        .stream(messages())
        .await
        .expect("stream opens")
        .collect()
        .await
}

#[tokio::test]
async fn streams_deltas_until_done() {
    let (model, seen) = spawn_upstream(Mode::Complete).await;

    let items = collect(&model).await;
    let text: Vec<String> = items.into_iter().map(|i| i.expect("chunk")).collect();
    assert_eq!(text, vec!["Accuracy ", "is ", "80."]);

    let log = seen.lock().unwrap();
    let (auth, body) = &log[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], "gpt-4-turbo");
    assert_eq!(body["stream"], true);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "How accurate is it?");
}

#[tokio::test]
async fn close_without_done_ends_in_error() {
    let (model, _) = spawn_upstream(Mode::Truncated).await;

    let items = collect(&model).await;
    assert_eq!(items.len(), 4);
    assert!(items[..3].iter().all(Result::is_ok));
    assert!(
        matches!(items.last(), Some(Err(CompletionError::Stream(_)))),
        "got {:?}",
        items.last()
    );
}

#[tokio::test]
async fn slow_healthy_stream_is_not_cut_by_timeout() {
    let (model, _) = spawn_upstream(Mode::Slow).await;

    let items = collect(&model).await;
    let text: Vec<String> = items.into_iter().map(|i| i.expect("chunk")).collect();
    assert_eq!(text.concat(), "c0 c1 c2 ");
}

#[tokio::test]
async fn upstream_statuses_map_to_errors() {
    for (code, check) in [
        (401u16, (|e: &CompletionError| matches!(e, CompletionError::Auth(401))) as fn(&CompletionError) -> bool),
        (403, |e| matches!(e, CompletionError::Auth(403))),
        (429, |e| matches!(e, CompletionError::RateLimited)),
        (500, |e| matches!(e, CompletionError::Status { status: 500, body } if body.contains("nope"))),
    ] {
        let (model, _) = spawn_upstream(Mode::Status(code)).await;
        let err = match model.stream(messages()).await {
            Ok(_) => panic!("status {code} must fail before streaming"),
            Err(e) => e,
        };
        assert!(check(&err), "status {code} gave {err:?}");
    }
}
