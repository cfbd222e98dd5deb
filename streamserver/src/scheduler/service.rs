//! Refresh orchestrator.
//!
//! Owns the periodic timer and the receiving end of the forced-refresh
//! signal. Checks are only ever run from here, so they never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::check::{CheckCycle, CheckReport};
use super::signal::{RefreshHandle, RefreshRequest, refresh_channel};
use super::state::SharedState;
use crate::credentials::lifecycle;
use crate::gateway::UpstreamGateway;
use crate::monitor::StatusListener;
use crate::{Error, Result};

/// Default refresh interval (5 minutes).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Time between natural ticks; also the token expiry skew.
    pub interval: Duration,
    /// Whether the secondary provider is polled.
    pub secondary_enabled: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            secondary_enabled: true,
        }
    }
}

pub struct Orchestrator {
    cycle: CheckCycle,
    state: SharedState,
    handle: RefreshHandle,
    requests: mpsc::Receiver<RefreshRequest>,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn UpstreamGateway>,
        state: SharedState,
        config: OrchestratorConfig,
    ) -> Self {
        let (handle, requests) = refresh_channel();
        Self {
            cycle: CheckCycle::new(gateway, config.interval, config.secondary_enabled),
            state,
            handle,
            requests,
        }
    }

    /// Register an edge listener. Must happen before [`Orchestrator::run`].
    pub fn with_listener(mut self, listener: Arc<dyn StatusListener>) -> Self {
        self.cycle.add_listener(listener);
        self
    }

    /// Sender for forced refreshes, handed to the delivery interface.
    pub fn refresh_handle(&self) -> RefreshHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn interval(&self) -> Duration {
        self.cycle.interval()
    }

    /// Obtain an app token and resolve the account id. Any failure is fatal.
    pub async fn bootstrap(&self) -> Result<()> {
        let gateway = self.cycle.gateway().as_ref();
        let mut state = self.state.lock().await;

        lifecycle::require_app_token(gateway, &mut state.credential, self.cycle.interval()).await?;
        lifecycle::resolve_user_id(gateway, &mut state.credential).await?;

        info!(
            user = %state.credential.user_name,
            authorized = state.credential.is_authorized(),
            "Bootstrap complete"
        );
        Ok(())
    }

    /// Run one check cycle under the state lock.
    pub async fn check(&self, refresh_follows: bool) -> Result<CheckReport> {
        let mut state = self.state.lock().await;
        self.cycle.run(&mut state, refresh_follows).await
    }

    /// Wait for ticks and forced refreshes until `cancel` fires or a check fails.
    ///
    /// The first natural tick comes one interval after the call; run the
    /// initial check with [`Orchestrator::check`] beforehand. `delivery` is
    /// cancelled on every exit path.
    pub async fn run(
        mut self,
        cancel: CancellationToken,
        delivery: CancellationToken,
    ) -> Result<()> {
        let result = self.event_loop(&cancel).await;
        delivery.cancel();
        if let Err(e) = &result {
            error!(error = %e, "Check failed, stopping");
        }
        result
    }

    async fn event_loop(&mut self, cancel: &CancellationToken) -> Result<()> {
        let interval = self.cycle.interval();
        if interval.is_zero() {
            return Err(Error::config("refresh interval must be greater than zero"));
        }

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = interval.as_secs(), "Refresh loop started");

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Refresh loop received cancellation signal");
                    return Ok(());
                }

                Some(request) = self.requests.recv() => {
                    let refresh_follows = request.refresh_follows;
                    if !request.acknowledge() {
                        debug!("Refresh requester went away before acknowledgement");
                    }
                    // Next natural tick one full interval after this check.
                    ticker.reset();
                    debug!(refresh_follows, "Forced refresh");
                    self.check(refresh_follows).await?;
                }

                _ = ticker.tick() => {
                    debug!("Refresh timer fired");
                    self.check(false).await?;
                }
            }
        }
    }
}
