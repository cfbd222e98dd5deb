//! Snapshot delivery and forced refresh.

use axum::{
    Router,
    extract::{ConnectInfo, Query, State},
    http::{Extensions, HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::info;

use super::{INFO_TEXT, found};
use crate::api::error::ApiResult;
use crate::api::server::AppState;
use crate::error::Error;

/// Content type clients must send to receive the encoded snapshot.
pub const SNAPSHOT_CONTENT_TYPE: &str = "application/octet-stream";

pub fn router() -> Router<AppState> {
    Router::new().route("/stream-data", get(get_stream_data).post(request_refresh))
}

fn wants_snapshot(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(SNAPSHOT_CONTENT_TYPE))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

async fn get_stream_data(
    State(app): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
) -> ApiResult<Response> {
    if !wants_snapshot(&headers) {
        return Ok(INFO_TEXT.into_response());
    }

    // Absent when the router is not served with connect info.
    let remote = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();
    info!(
        ip = %remote,
        x_real_ip = header_str(&headers, "x-real-ip"),
        x_forwarded_for = header_str(&headers, "x-forwarded-for"),
        "Snapshot requested"
    );

    let encoded = {
        let state = app.state.lock().await;
        if !state.credential.is_authorized() {
            return Ok(found("/auth"));
        }
        bincode::serialize(&state.snapshot).map_err(Error::from)?
    };

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, SNAPSHOT_CONTENT_TYPE)],
        encoded,
    )
        .into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    /// Fetch the follow list again as well.
    #[serde(default)]
    follows: bool,
}

async fn request_refresh(
    State(app): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> ApiResult<Response> {
    if !app.state.lock().await.credential.is_authorized() {
        return Ok(found("/auth"));
    }

    // Returns once the orchestrator has taken the request, not after the check.
    app.refresh.request_refresh(query.follows).await?;
    Ok(StatusCode::ACCEPTED.into_response())
}
