//! Axum router wiring.
//!
//! `/v1/health` is untimed; `/v1/users` demonstrates handler-side timing and
//! returns its live snapshot as JSON.

use std::time::Duration;

use axum::{routing::get, Json, Router};
use splitwatch_core::{Metric, SnapshotOptions};

use crate::{app_state::AppState, context::Timing, middleware::with_server_timing};

pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/v1/health", get(health))
        .route("/v1/users", get(list_users));
    with_server_timing(routes, state.server_timing())
}

async fn health() -> &'static str {
    "ok"
}

async fn list_users(timing: Timing) -> Json<Vec<Metric>> {
    timing.start("db", Some("query users"));
    tokio::time::sleep(Duration::from_millis(2)).await;
    timing.end("db");

    // left open; the middleware completes it when headers are finalized
    timing.start("render", None);
    Json(timing.snapshot(SnapshotOptions::default()))
}
