//! Live-status monitoring.
//!
//! - [`Snapshot`]: latest live records of both providers
//! - [`EdgeDetector`]: diffs successive snapshots into live/offline transitions
//! - [`MonitorEventBroadcaster`]: publishes transitions on a broadcast channel

mod detector;
mod events;
mod snapshot;

pub use detector::{EdgeDetector, LiveIndex, LiveTransition, StatusListener, build_index};
pub use events::{MonitorEvent, MonitorEventBroadcaster};
pub use snapshot::{
    FollowSet, FollowedChannel, Provider, Snapshot, StreamRecord, normalize_key,
};
