//! Token lifecycle: expiry checks, refresh and degrade.
//!
//! Every function here runs with the shared state lock held and mutates the
//! [`Credential`] in place.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::{Credential, Token};
use crate::error::{Error, Result};
use crate::gateway::{GatewayError, GatewayResult, UpstreamGateway};

/// What [`ensure_app_token`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppTokenRefresh {
    /// Current token is still good.
    Fresh,
    /// A new token was stored.
    Refreshed,
    /// The fetch failed; whatever was there before is kept.
    Failed,
}

/// State of the user token after [`ensure_user_token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserTokenStatus {
    /// Account was never authorized.
    Absent,
    /// Token present and not expiring within the skew.
    Valid,
    /// Token was expiring and has been replaced.
    Refreshed,
    /// Provider rejected the refresh token; the user token was dropped.
    Degraded,
}

/// Fetch a new app token if there is none or it expires within `skew`.
///
/// The outcome is reported but never fails the caller: a rejected or stale
/// token surfaces later as `Unauthorized` on the call that uses it.
pub async fn ensure_app_token(
    gateway: &dyn UpstreamGateway,
    credential: &mut Credential,
    skew: Duration,
) -> AppTokenRefresh {
    if credential
        .app_token
        .as_ref()
        .is_some_and(|token| !token.is_expired(skew))
    {
        return AppTokenRefresh::Fresh;
    }

    match gateway.fetch_app_token(&credential.client).await {
        Ok(token) => {
            debug!(expires_at = %token.expires_at, "Obtained app token");
            credential.app_token = Some(token);
            AppTokenRefresh::Refreshed
        }
        Err(e) => {
            warn!(error = %e, "Failed to obtain app token, keeping the previous one");
            AppTokenRefresh::Failed
        }
    }
}

/// Refresh the user token if it expires within `skew`.
///
/// `Unauthorized` drops the token and is not an error. Any other upstream
/// failure is returned.
pub async fn ensure_user_token(
    gateway: &dyn UpstreamGateway,
    credential: &mut Credential,
    skew: Duration,
) -> Result<UserTokenStatus> {
    let Some(current) = credential.user_token.as_ref() else {
        return Ok(UserTokenStatus::Absent);
    };
    if !current.is_expired(skew) {
        return Ok(UserTokenStatus::Valid);
    }

    match gateway.refresh_user_token(&credential.client, current).await {
        Ok(token) => {
            info!(expires_at = %token.expires_at, "Refreshed user token");
            credential.user_token = Some(token);
            Ok(UserTokenStatus::Refreshed)
        }
        Err(GatewayError::Unauthorized) => {
            warn!(
                user = %credential.user_name,
                "User token refresh was rejected, re-authorization required"
            );
            credential.user_token = None;
            Ok(UserTokenStatus::Degraded)
        }
        Err(e) => Err(e.into()),
    }
}

/// Trade an authorization code for a user token.
///
/// Only the gateway call happens here so the caller can run it without
/// holding the state lock.
pub async fn exchange_auth_code(
    gateway: &dyn UpstreamGateway,
    credential: &Credential,
    code: &str,
    redirect_uri: &str,
) -> GatewayResult<Token> {
    gateway
        .exchange_auth_code(&credential.client, code, redirect_uri)
        .await
}

/// Startup variant of [`ensure_app_token`] where any failure is fatal.
pub async fn require_app_token(
    gateway: &dyn UpstreamGateway,
    credential: &mut Credential,
    skew: Duration,
) -> Result<()> {
    if credential
        .app_token
        .as_ref()
        .is_some_and(|token| !token.is_expired(skew))
    {
        return Ok(());
    }

    let token = gateway.fetch_app_token(&credential.client).await?;
    debug!(expires_at = %token.expires_at, "Obtained app token");
    credential.app_token = Some(token);
    Ok(())
}

/// Resolve the account id from its login name if it is not known yet.
pub async fn resolve_user_id(
    gateway: &dyn UpstreamGateway,
    credential: &mut Credential,
) -> Result<()> {
    if credential.user_id.is_some() {
        return Ok(());
    }

    let app_token = credential
        .app_token
        .as_ref()
        .ok_or_else(|| Error::other("cannot resolve user id without an app token"))?;
    let user_id = gateway
        .fetch_user_id(app_token, &credential.client.client_id, &credential.user_name)
        .await?;

    info!(user = %credential.user_name, user_id = %user_id, "Resolved user id");
    credential.user_id = Some(user_id);
    Ok(())
}
