//! API route definitions.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use super::state::AppState;
use crate::health::derive_verdict;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/admin", get(admin))
}

/// Health check handler.
///
/// Works in tandem with the `taskpulse-probe` binary: the supervisor reads
/// the body, not the HTTP status, which is always 200.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.run_state.snapshot();
    let verdict = derive_verdict(&snapshot, Utc::now(), state.max_expected_task_duration);
    Json(json!({ "status": verdict }))
}

/// Admin request handler.
///
/// Raw diagnostic snapshot of the run state; useful to see how long task
/// attempts take.
async fn admin(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.run_state.snapshot();
    Json(json!({
        "last_start": snapshot.last_start.map(|t| t.to_rfc3339()),
        "last_end": snapshot.last_end.map(|t| t.to_rfc3339()),
        "errors": snapshot.consecutive_errors,
    }))
}
