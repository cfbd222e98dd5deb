//! Core credential types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An OAuth access token with its expiry instant.
///
/// Tokens are never mutated once issued; a refresh replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Opaque bearer value.
    pub access_token: String,
    /// Refresh token handed out with user tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Instant after which the provider rejects the token.
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at,
        }
    }

    /// Attach a refresh token.
    pub fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token;
        self
    }

    /// Build a token that expires `expires_in` from `now`.
    pub fn expiring_in(
        access_token: impl Into<String>,
        now: DateTime<Utc>,
        expires_in: Duration,
    ) -> Self {
        let lifetime = chrono::Duration::from_std(expires_in).unwrap_or(chrono::Duration::MAX);
        let expires_at = now.checked_add_signed(lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(access_token, expires_at)
    }

    /// Whether the token is expired, or will be within `skew`.
    #[inline]
    pub fn is_expired(&self, skew: Duration) -> bool {
        self.is_expired_at(Utc::now(), skew)
    }

    /// `now + skew >= expires_at`. Equality counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        let skew = chrono::Duration::from_std(skew).unwrap_or(chrono::Duration::MAX);
        match now.checked_add_signed(skew) {
            Some(deadline) => deadline >= self.expires_at,
            None => true,
        }
    }
}

/// Application identity registered with the identity provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Everything the daemon knows about the configured account.
///
/// `app_token == None` means a token was never obtained (or was dropped after
/// the provider rejected it). `user_token == None` means the account is not
/// authorized, which is distinct from an expired user token.
#[derive(Debug, Clone)]
pub struct Credential {
    pub client: ClientCredentials,
    /// Login name of the account on the primary provider.
    pub user_name: String,
    /// Provider-internal id of the account, resolved at bootstrap.
    pub user_id: Option<String>,
    pub app_token: Option<Token>,
    pub user_token: Option<Token>,
}

impl Credential {
    pub fn new(client: ClientCredentials, user_name: impl Into<String>) -> Self {
        Self {
            client,
            user_name: user_name.into(),
            user_id: None,
            app_token: None,
            user_token: None,
        }
    }

    /// Whether a user token is present, regardless of expiry.
    #[inline]
    pub fn is_authorized(&self) -> bool {
        self.user_token.is_some()
    }

    /// Whether a user token is present and not expired within `skew`.
    pub fn has_usable_user_token(&self, skew: Duration) -> bool {
        self.user_token
            .as_ref()
            .is_some_and(|token| !token.is_expired(skew))
    }
}
