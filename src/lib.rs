// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod maturity;
pub mod metrics;
pub mod prompt;
pub mod render;
pub mod session;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::catalog::{Source, SourceDetails, SourceLookup, StaticCatalog};
pub use crate::chat::{ChatMessage, MessageRole, UserRole};
pub use crate::prompt::build_system_prompt;
pub use crate::render::{render, Segment};
pub use crate::session::ChatSession;

use axum::Router;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::chat::completion::build_completion_model;
use crate::config::AppConfig;

/// Build the full router from `AppConfig::load_default()` and the demo catalog.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = AppConfig::load_default()?;
    app_with_config(&cfg)
}

pub fn app_with_config(cfg: &AppConfig) -> anyhow::Result<Router> {
    let model = build_completion_model(&cfg.completion)?;
    // Safe diagnostics: provider + model + key length only
    info!(
        provider = model.name(),
        model = %cfg.completion.model,
        key_len = cfg.completion.api_key.len(),
        backend = %cfg.backend.base_url,
        "dashboard configured"
    );
    let state = AppState::new(StaticCatalog::demo(), model);
    Ok(router(state))
}

/// Install the tracing subscriber. `DASHBOARD_LOG_JSON=1` switches to JSON lines.
/// Safe to call when a subscriber already exists (e.g. under Shuttle).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("source_maturity=info,warn"));
    let json = std::env::var("DASHBOARD_LOG_JSON").is_ok_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}
