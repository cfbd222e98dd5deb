//! API route modules.

pub mod auth;
pub mod health;
pub mod stream_data;

use axum::{
    Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::api::server::AppState;

/// Body of `/` and of snapshot requests without the binary content type.
pub const INFO_TEXT: &str = "This endpoint is meant to be used through the streamchecker project";

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(info))
        .merge(auth::router())
        .merge(stream_data::router())
        .nest("/health", health::router())
        .with_state(state)
}

async fn info() -> &'static str {
    INFO_TEXT
}

/// `302 Found` to `location`.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
