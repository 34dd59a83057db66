// src/session.rs
//! Chat panel state as a plain value with explicit event functions.
//! Each event consumes the session and returns the next one, so state
//! transitions can be tested without a rendering environment.

use serde::Serialize;
use tracing::warn;

use crate::chat::{AskResponse, ChatBackend, ChatError, ChatMessage, UserRole};

/// Model name the chat panel sends to the REST backend.
pub const DEFAULT_BACKEND_MODEL: &str = "gpt3";

const REQUESTER_SUGGESTIONS: [&str; 4] = [
    "What does the maturity index mean?",
    "How is the index calculated?",
    "Which factors affect reliability?",
    "Which source should I choose?",
];

const OWNER_SUGGESTIONS: [&str; 4] = [
    "How can I improve my source's metrics?",
    "What affects data accuracy?",
    "How do I raise the reliability of my source?",
    "Show a code example for data validation",
];

/// Canned prompts shown on an empty conversation.
pub fn suggestions(role: UserRole) -> &'static [&'static str] {
    match role {
        UserRole::Requester => &REQUESTER_SUGGESTIONS,
        UserRole::Owner => &OWNER_SUGGESTIONS,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatSession {
    pub role: UserRole,
    pub selected_source: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub is_loading: bool,
    pub show_suggestions: bool,
    next_id: u64,
}

impl ChatSession {
    pub fn new(role: UserRole, selected_source: Option<String>) -> Self {
        Self {
            role,
            selected_source,
            messages: Vec::new(),
            input: String::new(),
            is_loading: false,
            show_suggestions: true,
            next_id: 1,
        }
    }

    fn alloc_id(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        id.to_string()
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    pub fn select_source(mut self, id: Option<String>) -> Self {
        self.selected_source = id;
        self
    }

    /// Switching to owner with nothing selected picks the first owned source.
    pub fn set_role(mut self, role: UserRole, owned_ids: &[String]) -> Self {
        self.role = role;
        if role == UserRole::Owner && self.selected_source.is_none() {
            self.selected_source = owned_ids.first().cloned();
        }
        self
    }

    /// Topics sent with every backend request: the selected source id, or "".
    pub fn selected_topics(&self) -> Vec<String> {
        vec![self.selected_source.clone().unwrap_or_default()]
    }

    /// Start a turn from the current input.
    ///
    /// Returns the messages to send, or `None` when the input is blank or a
    /// request is already outstanding (the session is then unchanged).
    pub fn begin_submit(mut self) -> (Self, Option<Vec<ChatMessage>>) {
        if self.is_loading || self.input.trim().is_empty() {
            return (self, None);
        }
        let id = self.alloc_id();
        let content = std::mem::take(&mut self.input);
        self.messages.push(ChatMessage::user(id, content));
        self.is_loading = true;
        self.show_suggestions = false;
        let outgoing = self.messages.clone();
        (self, Some(outgoing))
    }

    /// Apply the backend result. Failures are logged and leave the
    /// conversation as it was; the loading flag is always cleared.
    pub fn finish_submit(mut self, result: Result<AskResponse, ChatError>) -> Self {
        match result {
            Ok(resp) if !resp.answer.is_empty() => {
                let id = self.alloc_id();
                self.messages.push(ChatMessage::assistant(id, resp.answer));
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "chat request failed"),
        }
        self.is_loading = false;
        self
    }

    /// Full submit round trip against a backend.
    pub async fn submit(self, backend: &dyn ChatBackend) -> Self {
        let (session, outgoing) = self.begin_submit();
        let Some(outgoing) = outgoing else {
            return session;
        };
        let topics = session.selected_topics();
        let result = backend
            .send_chat_request(&outgoing, DEFAULT_BACKEND_MODEL, &topics)
            .await;
        session.finish_submit(result)
    }

    /// Clear the conversation only after the backend confirms.
    pub async fn clear_history(mut self, backend: &dyn ChatBackend) -> Self {
        match backend.clear_chat_history().await {
            Ok(_) => {
                self.messages.clear();
                self.show_suggestions = true;
            }
            Err(e) => warn!(error = %e, "clearing chat history failed"),
        }
        self
    }
}
