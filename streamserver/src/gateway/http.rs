//! Production gateway backed by the Twitch and strims.gg HTTP APIs.

use async_trait::async_trait;
use reqwest::Client;

use super::{GatewayResult, StrimsClient, TwitchClient, UpstreamGateway};
use crate::credentials::{ClientCredentials, Token};
use crate::monitor::{FollowSet, StreamRecord};

/// [`UpstreamGateway`] over a shared [`reqwest::Client`].
///
/// Per-request deadlines come from the client's timeout.
#[derive(Clone)]
pub struct HttpGateway {
    twitch: TwitchClient,
    strims: StrimsClient,
}

impl HttpGateway {
    pub fn new(client: Client) -> Self {
        Self {
            twitch: TwitchClient::new(client.clone()),
            strims: StrimsClient::new(client),
        }
    }
}

#[async_trait]
impl UpstreamGateway for HttpGateway {
    async fn fetch_app_token(&self, client: &ClientCredentials) -> GatewayResult<Token> {
        self.twitch.fetch_app_token(client).await
    }

    async fn refresh_user_token(
        &self,
        client: &ClientCredentials,
        current: &Token,
    ) -> GatewayResult<Token> {
        self.twitch.refresh_user_token(client, current).await
    }

    async fn exchange_auth_code(
        &self,
        client: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
    ) -> GatewayResult<Token> {
        self.twitch
            .exchange_auth_code(client, code, redirect_uri)
            .await
    }

    async fn fetch_user_id(
        &self,
        app_token: &Token,
        client_id: &str,
        login: &str,
    ) -> GatewayResult<String> {
        self.twitch.fetch_user_id(app_token, client_id, login).await
    }

    async fn fetch_follow_list(
        &self,
        user_token: &Token,
        client_id: &str,
        user_id: &str,
    ) -> GatewayResult<FollowSet> {
        self.twitch
            .fetch_follow_list(user_token, client_id, user_id)
            .await
    }

    async fn fetch_primary_live(
        &self,
        app_token: &Token,
        client_id: &str,
        follows: &FollowSet,
    ) -> GatewayResult<Vec<StreamRecord>> {
        self.twitch
            .fetch_live_streams(app_token, client_id, follows)
            .await
    }

    async fn fetch_secondary_live(&self) -> GatewayResult<Vec<StreamRecord>> {
        self.strims.fetch_live_streams().await
    }
}
