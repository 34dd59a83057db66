//! Streaming chat turn: resolve the selected source, prepend the system
//! prompt, and hand back the model's incremental output.

use serde::Deserialize;
use tracing::{info, warn};

use super::completion::{CompletionError, CompletionMessage, CompletionModel, TextStream};
use super::{anon_id, ChatMessage, UserRole};
use crate::catalog::SourceLookup;
use crate::prompt::build_system_prompt;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub selected_source: Option<String>,
    #[serde(default)]
    pub user_role: UserRole,
}

/// Full message list sent upstream: system prompt first, then the history as given.
pub fn compose_messages(
    catalog: &dyn SourceLookup,
    history: &[ChatMessage],
    role: UserRole,
    source_id: Option<&str>,
) -> Vec<CompletionMessage> {
    let source = source_id.and_then(|id| catalog.find_by_id(id));
    let system = build_system_prompt(role, source.as_ref());

    let mut out = Vec::with_capacity(history.len() + 1);
    out.push(CompletionMessage::system(system));
    out.extend(history.iter().map(CompletionMessage::from));
    out
}

/// Run one chat turn against the model.
///
/// The upstream request is opened before returning, so connection, auth and
/// rate-limit failures come back as `Err` and nothing is streamed.
pub async fn handle_chat_turn(
    catalog: &dyn SourceLookup,
    model: &dyn CompletionModel,
    history: &[ChatMessage],
    role: UserRole,
    source_id: Option<&str>,
) -> Result<TextStream, CompletionError> {
    let messages = compose_messages(catalog, history, role, source_id);
    let last_id = history
        .last()
        .map(|m| anon_id(&m.content))
        .unwrap_or_default();

    match model.stream(messages).await {
        Ok(stream) => {
            info!(
                provider = model.name(),
                role = ?role,
                source = source_id.unwrap_or("-"),
                turns = history.len(),
                id = %last_id,
                "chat turn streaming"
            );
            Ok(stream)
        }
        Err(e) => {
            warn!(provider = model.name(), error = %e, id = %last_id, "chat turn failed upstream");
            Err(e)
        }
    }
}
