//! Live/offline edge detection.
//!
//! Each check cycle builds a fresh index of who is live, keyed by the
//! case-insensitive identity, and diffs it against the previous cycle's index.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::snapshot::{Snapshot, StreamRecord};

/// Receives live/offline transitions.
///
/// Called while the shared state lock is held, so implementations must not
/// block. Calls within one cycle arrive in no particular order.
pub trait StatusListener: Send + Sync {
    /// A channel that was not live in the previous cycle is live now.
    fn on_live(&self, record: &StreamRecord);

    /// A channel that was live in the previous cycle is gone. `record` is the
    /// last record seen for it.
    fn on_offline(&self, record: &StreamRecord);
}

/// A single edge produced by [`EdgeDetector::detect`].
#[derive(Debug, Clone, PartialEq)]
pub enum LiveTransition {
    Live(StreamRecord),
    Offline(StreamRecord),
}

impl LiveTransition {
    pub fn record(&self) -> &StreamRecord {
        match self {
            LiveTransition::Live(record) | LiveTransition::Offline(record) => record,
        }
    }

    /// Hand the transition to a listener.
    pub fn dispatch(&self, listener: &dyn StatusListener) {
        match self {
            LiveTransition::Live(record) => listener.on_live(record),
            LiveTransition::Offline(record) => listener.on_offline(record),
        }
    }
}

/// Live records by normalized key, rebuilt every cycle.
pub type LiveIndex = HashMap<String, StreamRecord>;

/// Build the index for a snapshot.
///
/// Secondary records go in first and primary records overwrite them, so on a
/// key collision across providers the primary record wins.
pub fn build_index(snapshot: &Snapshot) -> LiveIndex {
    let mut index = LiveIndex::with_capacity(snapshot.live_count());
    for record in snapshot.secondary.iter().chain(snapshot.primary.iter()) {
        index.insert(record.key.clone(), record.clone());
    }
    index
}

/// Diffs successive snapshots.
#[derive(Debug, Default)]
pub struct EdgeDetector {
    /// `None` until the first cycle has established a baseline.
    baseline: Option<LiveIndex>,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a baseline exists yet.
    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn baseline(&self) -> Option<&LiveIndex> {
        self.baseline.as_ref()
    }

    /// Compare `snapshot` with the baseline and make it the new baseline.
    ///
    /// The first call only records the baseline and reports nothing, so
    /// channels that were already live at startup are not announced.
    pub fn detect(&mut self, snapshot: &Snapshot) -> Vec<LiveTransition> {
        let current = build_index(snapshot);

        let Some(previous) = self.baseline.take() else {
            debug!(live = current.len(), "Established live baseline");
            self.baseline = Some(current);
            return Vec::new();
        };

        let mut transitions: Vec<LiveTransition> = current
            .iter()
            .filter(|(key, _)| !previous.contains_key(*key))
            .map(|(_, record)| LiveTransition::Live(record.clone()))
            .collect();

        transitions.extend(
            previous
                .into_iter()
                .filter(|(key, _)| !current.contains_key(key))
                .map(|(_, record)| LiveTransition::Offline(record)),
        );

        self.baseline = Some(current);
        transitions
    }

    /// Run detection and hand every transition to each listener.
    pub fn detect_and_dispatch(
        &mut self,
        snapshot: &Snapshot,
        listeners: &[Arc<dyn StatusListener>],
    ) -> usize {
        let transitions = self.detect(snapshot);
        for transition in &transitions {
            debug!(
                channel = %transition.record().identity,
                provider = %transition.record().provider,
                live = matches!(transition, LiveTransition::Live(_)),
                "Live status changed"
            );
            for listener in listeners {
                transition.dispatch(listener.as_ref());
            }
        }
        transitions.len()
    }
}
