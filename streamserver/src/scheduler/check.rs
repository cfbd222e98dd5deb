//! The check cycle.
//!
//! One cycle refreshes tokens, fetches the follow list when needed, fetches
//! both live listings and runs edge detection. Upstream failures are
//! classified here; only unexpected ones are returned as errors.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::state::MonitorState;
use crate::Result;
use crate::credentials::lifecycle;
use crate::gateway::{GatewayError, UpstreamGateway};
use crate::monitor::StatusListener;

/// Result of [`CheckCycle::refresh_live_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Listings were fetched (possibly partially) and the fetch time recorded.
    Refreshed,
    /// No follow list is available; nothing was fetched.
    FollowsUnavailable,
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    pub outcome: RefreshOutcome,
    /// Transitions dispatched to listeners.
    pub transitions: usize,
}

/// Settings and collaborators of the check cycle.
#[derive(Clone)]
pub struct CheckCycle {
    gateway: Arc<dyn UpstreamGateway>,
    /// Refresh interval, also the expiry skew for both tokens.
    interval: Duration,
    secondary_enabled: bool,
    listeners: Vec<Arc<dyn StatusListener>>,
}

impl CheckCycle {
    pub fn new(
        gateway: Arc<dyn UpstreamGateway>,
        interval: Duration,
        secondary_enabled: bool,
    ) -> Self {
        Self {
            gateway,
            interval,
            secondary_enabled,
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: Arc<dyn StatusListener>) {
        self.listeners.push(listener);
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn gateway(&self) -> &Arc<dyn UpstreamGateway> {
        &self.gateway
    }

    /// Run one full cycle against `state`.
    #[instrument(skip_all, fields(refresh_follows = refresh_follows))]
    pub async fn run(
        &self,
        state: &mut MonitorState,
        refresh_follows: bool,
    ) -> Result<CheckReport> {
        let gateway = self.gateway.as_ref();

        // Outcome ignored: a bad token shows up as
        // Unauthorized on the primary fetch.
        lifecycle::ensure_app_token(gateway, &mut state.credential, self.interval).await;
        lifecycle::ensure_user_token(gateway, &mut state.credential, self.interval).await?;

        let outcome = self.refresh_live_data(state, refresh_follows).await?;
        if outcome == RefreshOutcome::FollowsUnavailable {
            info!("No follow list available, skipping this cycle");
            return Ok(CheckReport {
                outcome,
                transitions: 0,
            });
        }

        let transitions = if self.listeners.is_empty() {
            0
        } else {
            state
                .detector
                .detect_and_dispatch(&state.snapshot, &self.listeners)
        };

        debug!(
            primary = state.snapshot.primary.len(),
            secondary = state.snapshot.secondary.len(),
            transitions,
            "Check complete"
        );
        Ok(CheckReport {
            outcome,
            transitions,
        })
    }

    /// Fetch the follow list if needed, then both live listings.
    pub async fn refresh_live_data(
        &self,
        state: &mut MonitorState,
        refresh_follows: bool,
    ) -> Result<RefreshOutcome> {
        if state.follows.is_none() || refresh_follows {
            self.refresh_follows(state).await?;
        }
        let Some(follows) = state.follows.as_ref() else {
            return Ok(RefreshOutcome::FollowsUnavailable);
        };

        let gateway = self.gateway.as_ref();
        let credential = &state.credential;

        match credential.app_token.as_ref() {
            None => warn!("No app token, keeping previous primary streams"),
            Some(app_token) => {
                let result = gateway
                    .fetch_primary_live(app_token, &credential.client.client_id, follows)
                    .await;
                match result {
                    Ok(records) => state.snapshot.replace_primary(records),
                    Err(GatewayError::DeadlineExceeded) => {
                        warn!("Primary stream fetch timed out, keeping previous streams");
                    }
                    Err(GatewayError::Unauthorized) => {
                        warn!("App token rejected, it will be fetched again next cycle");
                        state.credential.app_token = None;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        if self.secondary_enabled {
            match gateway.fetch_secondary_live().await {
                Ok(records) => state.snapshot.replace_secondary(records),
                Err(GatewayError::DeadlineExceeded) => {
                    warn!("Secondary stream fetch timed out, keeping previous streams");
                }
                Err(GatewayError::Unavailable(reason)) => {
                    warn!(
                        reason = %reason,
                        "Secondary provider unavailable, keeping previous streams"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        state.snapshot.mark_fetched(Utc::now());
        Ok(RefreshOutcome::Refreshed)
    }

    /// Fetch the follow list with the user token. Keeps the cached list on
    /// soft failures.
    ///
    /// The token must outlive the refresh interval, the same skew the cycle
    /// refreshes it with.
    async fn refresh_follows(&self, state: &mut MonitorState) -> Result<()> {
        let credential = &state.credential;
        let Some(user_token) = credential
            .user_token
            .as_ref()
            .filter(|token| !token.is_expired(self.interval))
        else {
            debug!("No usable user token, cannot fetch follow list");
            return Ok(());
        };
        let Some(user_id) = credential.user_id.as_deref() else {
            warn!("User id unknown, cannot fetch follow list");
            return Ok(());
        };

        let result = self
            .gateway
            .fetch_follow_list(user_token, &credential.client.client_id, user_id)
            .await;

        match result {
            Ok(follows) => {
                info!(count = follows.len(), "Fetched follow list");
                state.follows = Some(follows);
            }
            Err(GatewayError::DeadlineExceeded) => {
                warn!("Follow list fetch timed out, keeping cached list");
            }
            Err(GatewayError::Unauthorized) => {
                warn!("User token rejected while fetching follows, re-authorization required");
                state.credential.user_token = None;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}
