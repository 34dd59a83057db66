use axum::{routing::get, Router};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::chat::UserRole;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        describe();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("chat_turns_total", "Streaming chat turns accepted, by role");
    describe_counter!(
        "chat_upstream_failures_total",
        "Chat turns that failed before or during streaming"
    );
    describe_counter!("chat_stream_chunks_total", "Text chunks forwarded to clients");
    describe_histogram!(
        "chat_turn_duration_seconds",
        Unit::Seconds,
        "Time from request to the end of the streamed reply"
    );
}

pub fn record_chat_turn(role: UserRole) {
    let role = match role {
        UserRole::Requester => "requester",
        UserRole::Owner => "owner",
    };
    counter!("chat_turns_total", "role" => role).increment(1);
}

pub fn record_upstream_failure(stage: &'static str) {
    counter!("chat_upstream_failures_total", "stage" => stage).increment(1);
}

pub fn record_stream_chunk() {
    counter!("chat_stream_chunks_total").increment(1);
}

pub fn record_turn_duration(outcome: &'static str, elapsed: Duration) {
    histogram!("chat_turn_duration_seconds", "outcome" => outcome).record(elapsed.as_secs_f64());
}
