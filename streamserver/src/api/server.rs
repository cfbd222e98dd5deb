//! API server setup and configuration.

use axum::Router;
use axum::extract::Request;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{Span, info, warn};

use crate::api::routes;
use crate::error::{Error, Result};
use crate::gateway::UpstreamGateway;
use crate::scheduler::{RefreshHandle, SharedState};

/// Default listen address.
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:8181";

/// How long open requests may run on after shutdown starts.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// `host:port` to bind, without scheme.
    pub address: String,
    /// Connections still open this long after cancellation are abandoned.
    pub shutdown_grace: Duration,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server start time for uptime calculation
    pub start_time: Instant,
    /// Credentials and snapshot, shared with the orchestrator
    pub state: SharedState,
    /// Forced-refresh sender
    pub refresh: RefreshHandle,
    /// Used for the authorization-code exchange
    pub gateway: Arc<dyn UpstreamGateway>,
    /// OAuth redirect URI registered with the identity provider
    pub redirect_uri: String,
    /// Expiry skew applied when deciding whether to re-authorize
    pub token_skew: Duration,
}

impl AppState {
    pub fn new(
        state: SharedState,
        refresh: RefreshHandle,
        gateway: Arc<dyn UpstreamGateway>,
        redirect_uri: impl Into<String>,
        token_skew: Duration,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            state,
            refresh,
            gateway,
            redirect_uri: redirect_uri.into(),
            token_skew,
        }
    }
}

pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, state: AppState, cancel_token: CancellationToken) -> Self {
        Self {
            config,
            state,
            cancel_token,
        }
    }

    fn build_router(&self) -> Router {
        let router = routes::create_router(self.state.clone());

        router.layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| {
                    if req.uri().path() == "/health" {
                        Span::none()
                    } else {
                        let mut make_span =
                            tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO);
                        use tower_http::trace::MakeSpan;
                        make_span.make_span(req)
                    }
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        if span.is_disabled() {
                            return;
                        }
                        let on_response =
                            tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO);
                        use tower_http::trace::OnResponse;
                        on_response.on_response(res, latency, span);
                    },
                ),
        )
    }

    /// Bind the configured address and serve until the cancel token fires.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.address)
            .await
            .map_err(|e| {
                Error::ApiError(format!("Failed to bind {}: {}", self.config.address, e))
            })?;
        self.serve(listener).await
    }

    /// Serve on `listener` until the cancel token fires.
    ///
    /// Returns at most `shutdown_grace` after cancellation. Connections that
    /// are still open then are not waited for and die with the runtime.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("API server listening on http://{}", local_addr);

        let cancel_token = self.cancel_token.clone();
        let server = axum::serve(
            listener,
            self.build_router().into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            info!("API server shutting down...");
        })
        .into_future();

        let grace = self.config.shutdown_grace;
        let deadline = async {
            self.cancel_token.cancelled().await;
            tokio::time::sleep(grace).await;
        };

        tokio::select! {
            result = server => {
                result.map_err(|e| Error::ApiError(format!("Server error: {}", e)))?;
            }
            _ = deadline => {
                warn!(
                    grace_ms = grace.as_millis() as u64,
                    "Connections still open after shutdown grace, closing"
                );
            }
        }

        Ok(())
    }
}

/// Strip an optional `http://`/`https://` scheme and trailing slash from a
/// listen address. Returns `None` if nothing is left.
pub fn normalize_address(address: &str) -> Option<String> {
    let trimmed = address.trim();
    let without_scheme = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .unwrap_or(trimmed)
        .trim_end_matches('/');

    if without_scheme.is_empty() {
        None
    } else {
        Some(without_scheme.to_string())
    }
}
