use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::catalog::{OwnedPage, Source, SourceLookup, StaticCatalog};
use crate::chat::{handle_chat_turn, ChatTurnRequest, DynCompletionModel};
use crate::maturity::{self, Metric, ScoreBand, WeakPoint};
use crate::metrics as chat_metrics;
use crate::render::{self, Segment};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<StaticCatalog>,
    pub model: DynCompletionModel,
}

impl AppState {
    pub fn new(catalog: StaticCatalog, model: DynCompletionModel) -> Self {
        Self {
            catalog: Arc::new(catalog),
            model,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/sources", get(list_sources))
        .route("/api/sources/owned", get(owned_sources))
        .route("/api/sources/{id}", get(source_detail))
        .route("/api/sources/{id}/suggestions", get(source_suggestions))
        .route("/api/sources/{id}/export", post(export_source))
        .route("/api/render", post(render_message))
        .route("/api/chat", post(chat))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug)]
enum ApiError {
    SourceNotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::SourceNotFound(id) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": format!("unknown source '{id}'") })),
            )
                .into_response(),
        }
    }
}

fn lookup(state: &AppState, id: &str) -> Result<Source, ApiError> {
    state
        .catalog
        .find_by_id(id)
        .ok_or_else(|| ApiError::SourceNotFound(id.to_string()))
}

// ---- catalog ----

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    search: String,
    #[serde(default)]
    min_score: u8,
}

#[derive(Serialize)]
struct SourceSummary {
    #[serde(flatten)]
    source: Source,
    band: ScoreBand,
    band_label: &'static str,
    color_class: &'static str,
}

impl From<Source> for SourceSummary {
    fn from(source: Source) -> Self {
        let band = ScoreBand::from_score(source.score);
        Self {
            source,
            band,
            band_label: band.label(),
            color_class: band.color_class(),
        }
    }
}

async fn list_sources(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Json<Vec<SourceSummary>> {
    let rows = state
        .catalog
        .filter(&q.search, q.min_score)
        .into_iter()
        .map(SourceSummary::from)
        .collect();
    Json(rows)
}

#[derive(Deserialize)]
struct OwnedQuery {
    #[serde(default)]
    search: String,
    #[serde(default)]
    page: usize,
}

async fn owned_sources(State(state): State<AppState>, Query(q): Query<OwnedQuery>) -> Json<OwnedPage> {
    Json(state.catalog.owned_page(&q.search, q.page))
}

#[derive(Serialize)]
struct MetricView {
    metric: Metric,
    label: &'static str,
    value: u8,
    band: ScoreBand,
    band_label: &'static str,
    color_class: &'static str,
    recommendation: &'static str,
}

#[derive(Serialize)]
struct SourceView {
    #[serde(flatten)]
    summary: SourceSummary,
    metrics: Vec<MetricView>,
    can_preorder: bool,
}

async fn source_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SourceView>, ApiError> {
    let source = lookup(&state, &id)?;
    let metrics = Metric::ALL
        .iter()
        .map(|&metric| {
            let value = metric.value_in(&source.details);
            let band = ScoreBand::from_score(value);
            MetricView {
                metric,
                label: metric.label(),
                value,
                band,
                band_label: band.label(),
                color_class: band.color_class(),
                recommendation: maturity::recommendation(metric, value),
            }
        })
        .collect();
    let can_preorder = maturity::can_preorder(source.score);
    Ok(Json(SourceView {
        summary: source.into(),
        metrics,
        can_preorder,
    }))
}

#[derive(Serialize)]
struct SuggestionsView {
    source_id: String,
    weak_points: Vec<WeakPoint>,
}

async fn source_suggestions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuggestionsView>, ApiError> {
    let source = lookup(&state, &id)?;
    Ok(Json(SuggestionsView {
        weak_points: maturity::improvement_suggestions(&source.details),
        source_id: source.id,
    }))
}

// ---- export (options are logged only) ----

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ExportFormat {
    #[default]
    Pdf,
    Excel,
    Image,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ExportReq {
    #[serde(default)]
    format: ExportFormat,
    #[serde(default = "default_true")]
    include_details: bool,
    #[serde(default = "default_true")]
    include_history: bool,
    #[serde(default = "default_true")]
    include_recommendations: bool,
}

#[derive(Serialize)]
struct ExportAck {
    source_id: String,
    format: ExportFormat,
    requested_at: String,
}

async fn export_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ExportReq>,
) -> Result<(StatusCode, Json<ExportAck>), ApiError> {
    let source = lookup(&state, &id)?;
    info!(
        source = %source.id,
        format = ?req.format,
        details = req.include_details,
        history = req.include_history,
        recommendations = req.include_recommendations,
        "export requested"
    );
    Ok((
        StatusCode::ACCEPTED,
        Json(ExportAck {
            source_id: source.id,
            format: req.format,
            requested_at: chrono::Utc::now().to_rfc3339(),
        }),
    ))
}

// ---- rendering ----

#[derive(Deserialize)]
struct RenderReq {
    content: String,
}

#[derive(Serialize)]
struct RenderResp {
    segments: Vec<Segment>,
    html: String,
}

async fn render_message(Json(req): Json<RenderReq>) -> Json<RenderResp> {
    let segments = render::render(&req.content);
    let html = render::to_html(&segments);
    Json(RenderResp { segments, html })
}

// ---- chat ----

async fn chat(State(state): State<AppState>, Json(req): Json<ChatTurnRequest>) -> Response {
    let started = Instant::now();
    let opened = handle_chat_turn(
        state.catalog.as_ref(),
        state.model.as_ref(),
        &req.messages,
        req.user_role,
        req.selected_source.as_deref(),
    )
    .await;

    let mut upstream = match opened {
        Ok(s) => s,
        Err(_) => {
            chat_metrics::record_upstream_failure("open");
            chat_metrics::record_turn_duration("failed", started.elapsed());
            return (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": "upstream model failure" })),
            )
                .into_response();
        }
    };
    chat_metrics::record_chat_turn(req.user_role);

    // An Err item aborts the body, so a broken stream never looks complete.
    let body = async_stream::stream! {
        let mut outcome = "complete";
        while let Some(item) = upstream.next().await {
            match item {
                Ok(text) => {
                    chat_metrics::record_stream_chunk();
                    yield Ok(bytes::Bytes::from(text));
                }
                Err(e) => {
                    warn!(error = %e, "chat stream aborted");
                    chat_metrics::record_upstream_failure("stream");
                    outcome = "aborted";
                    yield Err(e);
                    break;
                }
            }
        }
        chat_metrics::record_turn_duration(outcome, started.elapsed());
    };

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response()
}
