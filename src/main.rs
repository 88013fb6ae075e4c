use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::post,
    Router,
};
use council_ingest::runtime::callbacks::post_scrape_error;
use council_ingest::runtime::host::{idle_shutdown, JobTracker, IDLE_TIMEOUT};
use council_ingest::runtime::orchestrator::run_scrape;
use council_ingest::types::ScrapeConfig;
use serde_json::{json, Value};
use std::sync::Arc;

const LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Runs the scrape to completion and answers with its summary. The job runs
/// on its own task so a panic is reported instead of tearing down the host.
async fn handle_scrape(
    State(tracker): State<Arc<JobTracker>>,
    Json(config): Json<ScrapeConfig>,
) -> (StatusCode, Json<Value>) {
    let _job = tracker.start();
    let config = config.normalized();
    let callback_base = config.callback_base.clone();
    let callback_token = config.callback_token.clone();
    let portal = config.portal.clone();

    let (status, error) = match tokio::spawn(run_scrape(config)).await {
        Ok(Ok(summary)) => {
            tracing::info!("[Scraper] {portal}: {:?}", summary);
            return (StatusCode::OK, Json(json!(summary)));
        }
        Ok(Err(err)) => (StatusCode::BAD_GATEWAY, err),
        Err(join_err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("scrape task panicked or was cancelled: {join_err}"),
        ),
    };

    tracing::error!("[Scraper] {portal}: {error}");
    post_scrape_error(&reqwest::Client::new(), &callback_base, &callback_token, &error).await;
    (status, Json(json!({ "status": "error", "error": error })))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let tracker = JobTracker::new();
    let app = Router::new()
        .route("/scrape", post(handle_scrape))
        .fallback(|| async { "ok" })
        .with_state(tracker.clone());

    let listener = tokio::net::TcpListener::bind(LISTEN_ADDR).await?;
    tracing::info!("[Scraper] Listening on {LISTEN_ADDR}");

    axum::serve(listener, app)
        .with_graceful_shutdown(idle_shutdown(tracker, IDLE_TIMEOUT))
        .await?;
    Ok(())
}
