//! REST fallback transport: one-shot `/ask` and `/clear` calls against an
//! external chat backend. No retries; every failure is reported to the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::{anon_id, ChatMessage};
use crate::config::BackendConfig;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("no message content provided")]
    EmptyInput,
    #[error("network request failed: {0}")]
    Network(String),
    #[error("HTTP error! status: {0}")]
    Http(u16),
    #[error("failed to parse server response: {0}")]
    Decode(String),
}

/// Backend answer. Extra fields are kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    #[serde(default)]
    pub answer: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct HistoryItem<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AskRequest<'a> {
    text: &'a str,
    history: Vec<HistoryItem<'a>>,
    model: &'a str,
    selected_topics: &'a [String],
}

impl<'a> AskRequest<'a> {
    /// `last` is the question; `prior` becomes role/content history.
    fn new(
        last: &'a ChatMessage,
        prior: &'a [ChatMessage],
        model: &'a str,
        selected_topics: &'a [String],
    ) -> Self {
        Self {
            text: &last.content,
            history: prior
                .iter()
                .map(|m| HistoryItem {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            model,
            selected_topics,
        }
    }
}

/// Seam used by `ChatSession`, so UI state logic can be tested with a double.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send_chat_request(
        &self,
        messages: &[ChatMessage],
        model: &str,
        selected_topics: &[String],
    ) -> Result<AskResponse, ChatError>;

    async fn clear_chat_history(&self) -> Result<serde_json::Value, ChatError>;
}

#[derive(Clone)]
pub struct RestChatClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestChatClient {
    pub fn new(cfg: &BackendConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("source-maturity-dashboard/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatBackend for RestChatClient {
    async fn send_chat_request(
        &self,
        messages: &[ChatMessage],
        model: &str,
        selected_topics: &[String],
    ) -> Result<AskResponse, ChatError> {
        let Some((last, prior)) = messages.split_last() else {
            return Err(ChatError::EmptyInput);
        };
        if last.content.is_empty() {
            return Err(ChatError::EmptyInput);
        }

        let body = AskRequest::new(last, prior, model, selected_topics);
        debug!(
            id = %anon_id(&last.content),
            history = prior.len(),
            model,
            "posting chat request to backend"
        );

        let resp = self
            .http
            .post(format!("{}/ask", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "chat backend returned non-2xx");
            return Err(ChatError::Http(status.as_u16()));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ChatError::Decode(e.to_string()))
    }

    async fn clear_chat_history(&self) -> Result<serde_json::Value, ChatError> {
        let resp = self
            .http
            .post(format!("{}/clear", self.base_url))
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "chat backend refused to clear history");
            return Err(ChatError::Http(status.as_u16()));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ChatError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::MessageRole;

    fn client_to_nowhere() -> RestChatClient {
        // Port 9 (discard) on loopback: nothing listens in CI.
        RestChatClient::new(&BackendConfig {
            base_url: "http://127.0.0.1:9/api/v1/".to_string(),
            connect_timeout_secs: 1,
            timeout_secs: 1,
        })
        .unwrap()
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(client_to_nowhere().base_url(), "http://127.0.0.1:9/api/v1");
    }

    #[tokio::test]
    async fn empty_last_message_fails_before_network() {
        let c = client_to_nowhere();
        let msgs = vec![ChatMessage::user("1", "")];
        let err = c.send_chat_request(&msgs, "gpt3", &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyInput), "got {err:?}");

        let err = c.send_chat_request(&[], "gpt3", &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyInput), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        let c = client_to_nowhere();
        let msgs = vec![ChatMessage::user("1", "hello")];
        let err = c.send_chat_request(&msgs, "gpt3", &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Network(_)), "got {err:?}");
    }

    #[test]
    fn request_body_shape() {
        let msgs = [
            ChatMessage::user("1", "first"),
            ChatMessage::assistant("2", "reply"),
            ChatMessage::user("3", "second"),
        ];
        let (last, prior) = msgs.split_last().unwrap();
        let topics = vec!["1".to_string()];
        let body = AskRequest::new(last, prior, "gpt3", &topics);
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["text"], "second");
        assert_eq!(v["history"].as_array().unwrap().len(), 2);
        assert_eq!(v["history"][1]["role"], MessageRole::Assistant.as_str());
        assert!(v["history"][0].get("id").is_none());
        assert_eq!(v["selectedTopics"][0], "1");
    }
}
