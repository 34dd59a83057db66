//! Source Maturity Dashboard - Binary Entrypoint
//! Boots the Axum HTTP server with the catalog, chat routes, and `/metrics`.

use shuttle_axum::ShuttleAxum;
use tracing::warn;

use source_maturity::metrics::Metrics;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    source_maturity::init_tracing();

    let mut router = source_maturity::app().await?;

    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => warn!(error = %e, "prometheus recorder not installed; /metrics disabled"),
    }

    Ok(router.into())
}
