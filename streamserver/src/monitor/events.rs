//! Monitor events for downstream consumers.
//!
//! [`MonitorEventBroadcaster`] turns edge-detector callbacks into events on a
//! broadcast channel so consumers never run under the state lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::detector::StatusListener;
use super::snapshot::StreamRecord;

/// Events emitted by the live-status monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// Channel went live.
    StreamerLive {
        record: StreamRecord,
        timestamp: DateTime<Utc>,
    },
    /// Channel went offline.
    StreamerOffline {
        record: StreamRecord,
        timestamp: DateTime<Utc>,
    },
}

impl MonitorEvent {
    pub fn record(&self) -> &StreamRecord {
        match self {
            MonitorEvent::StreamerLive { record, .. }
            | MonitorEvent::StreamerOffline { record, .. } => record,
        }
    }

    /// Get a human-readable description of the event.
    pub fn description(&self) -> String {
        match self {
            MonitorEvent::StreamerLive { record, .. } => {
                if record.title.is_empty() {
                    format!("{} is now live on {}", record.identity, record.provider)
                } else {
                    format!(
                        "{} is now live on {}: {}",
                        record.identity, record.provider, record.title
                    )
                }
            }
            MonitorEvent::StreamerOffline { record, .. } => {
                format!("{} went offline on {}", record.identity, record.provider)
            }
        }
    }
}

/// Broadcaster for monitor events.
#[derive(Clone)]
pub struct MonitorEventBroadcaster {
    sender: broadcast::Sender<MonitorEvent>,
}

impl MonitorEventBroadcaster {
    /// Create a new broadcaster with default capacity (256).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new broadcaster with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to monitor events.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    /// Publish a monitor event. Returns the number of receivers reached.
    pub fn publish(&self, event: MonitorEvent) -> usize {
        // No subscribers is not an error for the monitor.
        self.sender.send(event).unwrap_or(0)
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for MonitorEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusListener for MonitorEventBroadcaster {
    fn on_live(&self, record: &StreamRecord) {
        self.publish(MonitorEvent::StreamerLive {
            record: record.clone(),
            timestamp: Utc::now(),
        });
    }

    fn on_offline(&self, record: &StreamRecord) {
        self.publish(MonitorEvent::StreamerOffline {
            record: record.clone(),
            timestamp: Utc::now(),
        });
    }
}
