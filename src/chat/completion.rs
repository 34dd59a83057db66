//! Hosted completion model abstraction: provider trait, the OpenAI-compatible
//! streaming client, and a deterministic mock for local runs and tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CompletionConfig;

/// Incremental assistant text, one chunk per upstream delta.
pub type TextStream = BoxStream<'static, Result<String, CompletionError>>;

pub type DynCompletionModel = Arc<dyn CompletionModel>;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("network error: {0}")]
    Network(String),
    #[error("upstream rejected credentials (status {0})")]
    Auth(u16),
    #[error("upstream rate limited")]
    RateLimited,
    #[error("upstream error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("stream interrupted: {0}")]
    Stream(String),
    #[error("no API key configured for provider {0}")]
    MissingApiKey(&'static str),
}

/// Message as sent to the model. Unlike `ChatMessage` it may carry the `system` role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub role: String,
    pub content: String,
}

impl CompletionMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

impl From<&super::ChatMessage> for CompletionMessage {
    fn from(m: &super::ChatMessage) -> Self {
        Self {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        }
    }
}

#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Open a streamed completion. Errors before the first chunk are returned
    /// here; errors after that surface as `Err` items of the stream.
    async fn stream(&self, messages: Vec<CompletionMessage>) -> Result<TextStream, CompletionError>;

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Build the model named by `cfg.provider`.
pub fn build_completion_model(cfg: &CompletionConfig) -> anyhow::Result<DynCompletionModel> {
    match cfg.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiCompletion::new(cfg)?)),
        "mock" => Ok(Arc::new(MockCompletion::default())),
        other => anyhow::bail!("Unsupported completion provider: {other}"),
    }
}

// ------------------------------------------------------------
// OpenAI-compatible provider
// ------------------------------------------------------------

pub struct OpenAiCompletion {
    http: reqwest::Client,
    open_timeout: Duration,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiCompletion {
    pub fn new(cfg: &CompletionConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("source-maturity-dashboard/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            // Idle gap between chunks; a long but healthy answer must not be cut.
            .read_timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            open_timeout: Duration::from_secs(cfg.timeout_secs),
            api_key: cfg.api_key.clone(),
            base_url: cfg.base_url.clone(),
            model: cfg.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionModel for OpenAiCompletion {
    async fn stream(&self, messages: Vec<CompletionMessage>) -> Result<TextStream, CompletionError> {
        if self.api_key.is_empty() {
            return Err(CompletionError::MissingApiKey("openai"));
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: &'a [CompletionMessage],
            stream: bool,
        }

        let send = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&Req {
                model: &self.model,
                messages: &messages,
                stream: true,
            })
            .send();
        let resp = tokio::time::timeout(self.open_timeout, send)
            .await
            .map_err(|_| CompletionError::Network("timed out waiting for response headers".into()))?
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => CompletionError::Auth(status.as_u16()),
                429 => CompletionError::RateLimited,
                code => CompletionError::Status { status: code, body },
            });
        }

        let mut bytes = resp.bytes_stream();
        let out = async_stream::stream! {
            let mut decoder = SseDecoder::default();
            let mut done = false;
            'read: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(CompletionError::Stream(e.to_string()));
                        return;
                    }
                };
                for event in decoder.push(&chunk) {
                    match event {
                        SseEvent::Delta(text) => yield Ok(text),
                        SseEvent::Done => {
                            done = true;
                            break 'read;
                        }
                    }
                }
            }
            if !done {
                yield Err(CompletionError::Stream("upstream closed before [DONE]".into()));
            }
        };
        Ok(Box::pin(out))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Server-sent events decoding
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Delta(String),
    Done,
}

/// Line-buffered decoder for `data: {...}` completion chunks.
/// Network chunks may split a line anywhere, including inside a UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let Ok(line) = std::str::from_utf8(&line) else {
                continue;
            };
            if let Some(ev) = parse_sse_line(line.trim()) {
                out.push(ev);
            }
        }
        out
    }
}

fn parse_sse_line(line: &str) -> Option<SseEvent> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return Some(SseEvent::Done);
    }

    #[derive(Deserialize)]
    struct Chunk {
        #[serde(default)]
        choices: Vec<Choice>,
    }
    #[derive(Deserialize)]
    struct Choice {
        #[serde(default)]
        delta: Delta,
    }
    #[derive(Deserialize, Default)]
    struct Delta {
        content: Option<String>,
    }

    let chunk: Chunk = serde_json::from_str(data).ok()?;
    let content = chunk.choices.into_iter().next()?.delta.content?;
    if content.is_empty() {
        None
    } else {
        Some(SseEvent::Delta(content))
    }
}

// ------------------------------------------------------------
// Mock provider
// ------------------------------------------------------------

/// Streams a fixed reply word by word; used when `provider = "mock"`.
#[derive(Debug, Clone)]
pub struct MockCompletion {
    pub reply: String,
}

impl Default for MockCompletion {
    fn default() -> Self {
        Self {
            reply: "This is a mock analyst reply.".to_string(),
        }
    }
}

#[async_trait]
impl CompletionModel for MockCompletion {
    async fn stream(&self, _messages: Vec<CompletionMessage>) -> Result<TextStream, CompletionError> {
        let chunks: Vec<Result<String, CompletionError>> = self
            .reply
            .split_inclusive(' ')
            .map(|w| Ok(w.to_string()))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
