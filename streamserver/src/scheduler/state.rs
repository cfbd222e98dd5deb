//! State shared between the orchestrator and the delivery interface.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::credentials::Credential;
use crate::monitor::{EdgeDetector, FollowSet, Snapshot};

/// Everything a check cycle reads and writes.
///
/// Held behind one async lock ([`SharedState`]). A check cycle keeps the lock
/// for its whole duration; request handlers take it only to copy or encode.
#[derive(Debug)]
pub struct MonitorState {
    pub credential: Credential,
    /// Cached follow list; `None` until fetched or after it was never obtainable.
    pub follows: Option<FollowSet>,
    pub snapshot: Snapshot,
    pub detector: EdgeDetector,
}

/// Handle to the shared [`MonitorState`].
pub type SharedState = Arc<Mutex<MonitorState>>;

impl MonitorState {
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            follows: None,
            snapshot: Snapshot::default(),
            detector: EdgeDetector::new(),
        }
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }
}
