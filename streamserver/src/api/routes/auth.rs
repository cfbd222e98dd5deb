//! Authorization routes.

use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::{error, info, warn};

use super::found;
use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::credentials::lifecycle;
use crate::gateway::TwitchClient;

/// Scope needed to read the account's follow list.
pub const FOLLOW_SCOPE: &str = "user:read:follows";

pub const WELCOME_TEXT: &str = "Welcome to streamserver.";
pub const CALLBACK_SUCCESS_TEXT: &str = "Authentication successful! You can now close this page.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth", get(authorize))
        .route("/oauth-callback", get(oauth_callback))
}

/// Send the account owner to the provider's consent page unless a usable
/// user token is already held.
async fn authorize(State(app): State<AppState>) -> ApiResult<Response> {
    let state = app.state.lock().await;
    if state.credential.has_usable_user_token(app.token_skew) {
        return Ok(WELCOME_TEXT.into_response());
    }

    let url = TwitchClient::authorize_url(
        &state.credential.client.client_id,
        &app.redirect_uri,
        FOLLOW_SCOPE,
    )
    .map_err(|e| ApiError::internal(format!("Invalid authorization URL: {}", e)))?;

    Ok(found(url.as_str()))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
}

async fn oauth_callback(
    State(app): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<&'static str> {
    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::bad_request("Access token not found"))?;

    tokio::spawn(complete_authorization(app, code));

    Ok(CALLBACK_SUCCESS_TEXT)
}

/// Exchange the code without holding the lock, store the token, then ask for
/// a refresh so the follow list is fetched right away.
async fn complete_authorization(app: AppState, code: String) {
    let credential = app.state.lock().await.credential.clone();

    let token = match lifecycle::exchange_auth_code(
        app.gateway.as_ref(),
        &credential,
        &code,
        &app.redirect_uri,
    )
    .await
    {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "Failed to exchange authorization code");
            return;
        }
    };

    app.state.lock().await.credential.user_token = Some(token);
    info!(user = %credential.user_name, "User authorized");

    if let Err(e) = app.refresh.request_refresh(false).await {
        warn!(error = %e, "Could not request refresh after authorization");
    }
}
