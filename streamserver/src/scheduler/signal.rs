//! Forced-refresh signal.
//!
//! A request is only considered delivered once the orchestrator has taken it
//! off the channel and acknowledged it. Senders wait for that acknowledgement
//! but never for the check it triggers, so a second concurrent sender stays
//! blocked until the orchestrator has drained the first.

use tokio::sync::{mpsc, oneshot};

use crate::{Error, Result};

/// A "refresh now" request.
#[derive(Debug)]
pub struct RefreshRequest {
    /// Fetch the follow list again even if one is cached.
    pub refresh_follows: bool,
    ack: oneshot::Sender<()>,
}

impl RefreshRequest {
    /// Release the sender. Returns `false` if it already gave up.
    pub fn acknowledge(self) -> bool {
        self.ack.send(()).is_ok()
    }
}

/// Sending side of the forced-refresh signal, cloned into request handlers.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    sender: mpsc::Sender<RefreshRequest>,
}

impl RefreshHandle {
    /// Hand a refresh request to the orchestrator.
    ///
    /// Resolves once the orchestrator has received it. Fails with
    /// [`Error::OrchestratorStopped`] if the loop is gone or dropped the
    /// request unacknowledged.
    pub async fn request_refresh(&self, refresh_follows: bool) -> Result<()> {
        let (ack, acked) = oneshot::channel();
        self.sender
            .send(RefreshRequest {
                refresh_follows,
                ack,
            })
            .await
            .map_err(|_| Error::OrchestratorStopped)?;
        acked.await.map_err(|_| Error::OrchestratorStopped)
    }

    /// Whether the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Create the forced-refresh channel.
pub fn refresh_channel() -> (RefreshHandle, mpsc::Receiver<RefreshRequest>) {
    // One slot: the request in flight. Its sender still waits for the ack.
    let (sender, receiver) = mpsc::channel(1);
    (RefreshHandle { sender }, receiver)
}
