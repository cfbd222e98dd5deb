//! Health check route.

use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::server::AppState;

/// Create the health router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Last fetch attempt, `None` before the first full cycle.
    pub last_fetched: Option<DateTime<Utc>>,
    pub user_authorized: bool,
}

async fn health_check(State(app): State<AppState>) -> Json<HealthResponse> {
    let (last_fetched, user_authorized) = {
        let state = app.state.lock().await;
        (state.snapshot.last_fetched, state.credential.is_authorized())
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: app.start_time.elapsed().as_secs(),
        last_fetched,
        user_authorized,
    })
}
