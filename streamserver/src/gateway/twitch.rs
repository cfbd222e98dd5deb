//! Twitch identity provider and Helix API client.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use super::{GatewayError, GatewayResult};
use crate::credentials::{ClientCredentials, Token};
use crate::monitor::{FollowSet, FollowedChannel, Provider, StreamRecord};

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Helix caps `first` and repeated `user_id` parameters at 100.
const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl TokenResponse {
    fn into_token(self, now: DateTime<Utc>) -> Token {
        let lifetime = self
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        Token::expiring_in(self.access_token, now, lifetime).with_refresh_token(self.refresh_token)
    }
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    cursor: Option<String>,
}

impl<T> Page<T> {
    fn next_cursor(&self) -> Option<String> {
        self.pagination
            .as_ref()
            .and_then(|p| p.cursor.clone())
            .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct HelixUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct HelixFollow {
    broadcaster_id: String,
    broadcaster_login: String,
    broadcaster_name: String,
}

#[derive(Debug, Deserialize)]
struct HelixStream {
    user_login: String,
    user_name: String,
    #[serde(default)]
    game_name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    viewer_count: u64,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    thumbnail_url: String,
}

impl HelixStream {
    fn into_record(self) -> StreamRecord {
        let url = format!("https://www.twitch.tv/{}", self.user_login);
        StreamRecord::new(Provider::Twitch, self.user_name)
            .with_title(self.title)
            .with_viewer_count(self.viewer_count)
            .with_category(Some(self.game_name).filter(|g| !g.is_empty()))
            .with_started_at(self.started_at)
            .with_url(Some(url))
            .with_thumbnail_url(Some(self.thumbnail_url).filter(|t| !t.is_empty()))
    }
}

/// Client for `id.twitch.tv` and the Helix API.
#[derive(Clone)]
pub struct TwitchClient {
    client: Client,
    id_base: String,
    api_base: String,
}

impl TwitchClient {
    const ID_BASE: &'static str = "https://id.twitch.tv";
    const API_BASE: &'static str = "https://api.twitch.tv";

    pub fn new(client: Client) -> Self {
        Self::with_base_urls(client, Self::ID_BASE, Self::API_BASE)
    }

    /// Point the client at other hosts (proxies, mock servers).
    pub fn with_base_urls(
        client: Client,
        id_base: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            id_base: id_base.into().trim_end_matches('/').to_string(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Authorization page the account owner is redirected to.
    pub fn authorize_url(
        client_id: &str,
        redirect_uri: &str,
        scope: &str,
    ) -> Result<url::Url, url::ParseError> {
        url::Url::parse_with_params(
            &format!("{}/oauth2/authorize", Self::ID_BASE),
            &[
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope),
            ],
        )
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> GatewayResult<Token> {
        let response = self
            .client
            .post(format!("{}/oauth2/token", self.id_base))
            .form(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        let token: TokenResponse = serde_json::from_str(&body)?;
        Ok(token.into_token(Utc::now()))
    }

    pub async fn fetch_app_token(&self, client: &ClientCredentials) -> GatewayResult<Token> {
        self.post_token(&[
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ])
        .await
    }

    pub async fn refresh_user_token(
        &self,
        client: &ClientCredentials,
        current: &Token,
    ) -> GatewayResult<Token> {
        let Some(refresh_token) = current.refresh_token.as_deref() else {
            return Err(GatewayError::Unauthorized);
        };

        let result = self
            .post_token(&[
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await;

        match result {
            // A revoked or unknown refresh token comes back as 400.
            Err(GatewayError::Status { status: 400, .. }) => Err(GatewayError::Unauthorized),
            Ok(mut token) => {
                if token.refresh_token.is_none() {
                    token.refresh_token = Some(refresh_token.to_string());
                }
                Ok(token)
            }
            other => other,
        }
    }

    pub async fn exchange_auth_code(
        &self,
        client: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
    ) -> GatewayResult<Token> {
        self.post_token(&[
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ])
        .await
    }

    async fn helix_get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        token: &Token,
        client_id: &str,
        query: &[(&str, &str)],
    ) -> GatewayResult<Page<T>> {
        let response = self
            .client
            .get(format!("{}/helix/{}", self.api_base, path))
            .bearer_auth(&token.access_token)
            .header("Client-Id", client_id)
            .query(query)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn fetch_user_id(
        &self,
        app_token: &Token,
        client_id: &str,
        login: &str,
    ) -> GatewayResult<String> {
        let page: Page<HelixUser> = self
            .helix_get("users", app_token, client_id, &[("login", login)])
            .await?;
        page.data
            .into_iter()
            .next()
            .map(|user| user.id)
            .ok_or_else(|| GatewayError::Other(format!("user '{}' not found", login)))
    }

    pub async fn fetch_follow_list(
        &self,
        user_token: &Token,
        client_id: &str,
        user_id: &str,
    ) -> GatewayResult<FollowSet> {
        let first = PAGE_SIZE.to_string();
        let mut channels = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![("user_id", user_id), ("first", first.as_str())];
            if let Some(after) = cursor.as_deref() {
                query.push(("after", after));
            }

            let page: Page<HelixFollow> = self
                .helix_get("channels/followed", user_token, client_id, &query)
                .await?;
            let next = page.next_cursor();
            let fetched = page.data.len();

            channels.extend(page.data.into_iter().map(|f| FollowedChannel {
                id: f.broadcaster_id,
                login: f.broadcaster_login,
                display_name: f.broadcaster_name,
            }));

            match next {
                Some(next) if fetched > 0 => cursor = Some(next),
                _ => break,
            }
        }

        debug!(count = channels.len(), "Fetched follow list");
        Ok(FollowSet::new(channels))
    }

    pub async fn fetch_live_streams(
        &self,
        app_token: &Token,
        client_id: &str,
        follows: &FollowSet,
    ) -> GatewayResult<Vec<StreamRecord>> {
        let ids: Vec<&str> = follows.ids().collect();
        let first = PAGE_SIZE.to_string();
        let mut records = Vec::new();

        for chunk in ids.chunks(PAGE_SIZE) {
            let mut query: Vec<(&str, &str)> = chunk.iter().map(|id| ("user_id", *id)).collect();
            query.push(("first", first.as_str()));

            let page: Page<HelixStream> = self
                .helix_get("streams", app_token, client_id, &query)
                .await?;
            records.extend(page.data.into_iter().map(HelixStream::into_record));
        }

        debug!(count = records.len(), "Fetched live streams");
        Ok(records)
    }
}

async fn ensure_success(response: Response) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::from_status(status, body))
}
