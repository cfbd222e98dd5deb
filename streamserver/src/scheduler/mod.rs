//! Refresh scheduling.
//!
//! - [`Orchestrator`]: the event loop (timer, forced refresh, cancellation)
//! - [`CheckCycle`]: one serialized check against the shared state
//! - [`RefreshHandle`]: rendezvous sender for "refresh now" requests

mod check;
mod service;
mod signal;
mod state;

pub use check::{CheckCycle, CheckReport, RefreshOutcome};
pub use service::{DEFAULT_REFRESH_INTERVAL, Orchestrator, OrchestratorConfig};
pub use signal::{RefreshHandle, RefreshRequest, refresh_channel};
pub use state::{MonitorState, SharedState};
