//! Upstream gateway.
//!
//! The check cycle talks to the identity provider and both stream listings
//! only through [`UpstreamGateway`]. [`HttpGateway`] is the production
//! implementation; tests substitute deterministic stubs.

mod error;
mod http;
mod strims;
mod twitch;

pub use error::GatewayError;
pub use http::HttpGateway;
pub use strims::StrimsClient;
pub use twitch::TwitchClient;

use async_trait::async_trait;

use crate::credentials::{ClientCredentials, Token};
use crate::monitor::{FollowSet, StreamRecord};

/// Result type for gateway calls.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Capabilities the daemon needs from upstream.
///
/// Every call is expected to carry its own deadline and report it as
/// [`GatewayError::DeadlineExceeded`].
#[async_trait]
pub trait UpstreamGateway: Send + Sync {
    /// Obtain an application token (client-credentials grant).
    async fn fetch_app_token(&self, client: &ClientCredentials) -> GatewayResult<Token>;

    /// Refresh a user token. A rejected refresh token is `Unauthorized`.
    async fn refresh_user_token(
        &self,
        client: &ClientCredentials,
        current: &Token,
    ) -> GatewayResult<Token>;

    /// Trade an authorization code for a user token.
    async fn exchange_auth_code(
        &self,
        client: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
    ) -> GatewayResult<Token>;

    /// Resolve the provider-internal id of an account name.
    async fn fetch_user_id(
        &self,
        app_token: &Token,
        client_id: &str,
        login: &str,
    ) -> GatewayResult<String>;

    /// Channels followed by `user_id`, in provider order.
    async fn fetch_follow_list(
        &self,
        user_token: &Token,
        client_id: &str,
        user_id: &str,
    ) -> GatewayResult<FollowSet>;

    /// Followed channels that are live on the primary provider.
    async fn fetch_primary_live(
        &self,
        app_token: &Token,
        client_id: &str,
        follows: &FollowSet,
    ) -> GatewayResult<Vec<StreamRecord>>;

    /// Everything live on the secondary provider. Needs no credential.
    async fn fetch_secondary_live(&self) -> GatewayResult<Vec<StreamRecord>>;
}
