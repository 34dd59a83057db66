// src/chat/mod.rs
//! Chat transports: streaming to a hosted completion model (`stream`) and the
//! REST fallback backend (`rest`), plus the shared message types.

pub mod completion;
pub mod rest;
pub mod stream;

use serde::{Deserialize, Serialize};

pub use completion::{CompletionError, CompletionMessage, CompletionModel, DynCompletionModel};
pub use rest::{AskResponse, ChatBackend, ChatError, RestChatClient};
pub use stream::{handle_chat_turn, ChatTurnRequest};

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation. `id` is assigned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Active dashboard role. Only changes prompt framing and UI affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Requester,
    Owner,
}

impl UserRole {
    /// Human-readable label used in the system prompt.
    pub fn label(self) -> &'static str {
        match self {
            Self::Requester => "Data requester",
            Self::Owner => "Data source owner",
        }
    }
}

/// Short SHA-256 prefix so user text can be correlated in logs without being logged.
pub(crate) fn anon_id(text: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
