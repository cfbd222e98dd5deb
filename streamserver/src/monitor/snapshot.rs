//! Live-stream snapshot held in memory and served to clients.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which upstream listing a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// Follow-scoped listing that needs the app token.
    Twitch,
    /// Public listing, no credentials.
    Strims,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Twitch => write!(f, "twitch"),
            Provider::Strims => write!(f, "strims"),
        }
    }
}

/// One channel that is currently broadcasting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub provider: Provider,
    /// Channel name as reported by the provider.
    pub identity: String,
    /// Lowercased `identity`, used to match records across cycles.
    pub key: String,
    pub title: String,
    pub viewer_count: u64,
    /// Game/category on Twitch, embedded service on Strims.
    pub category: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl StreamRecord {
    pub fn new(provider: Provider, identity: impl Into<String>) -> Self {
        let identity = identity.into();
        Self {
            provider,
            key: normalize_key(&identity),
            identity,
            title: String::new(),
            viewer_count: 0,
            category: None,
            started_at: None,
            url: None,
            thumbnail_url: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_viewer_count(mut self, viewer_count: u64) -> Self {
        self.viewer_count = viewer_count;
        self
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    pub fn with_started_at(mut self, started_at: Option<DateTime<Utc>>) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    pub fn with_thumbnail_url(mut self, thumbnail_url: Option<String>) -> Self {
        self.thumbnail_url = thumbnail_url;
        self
    }
}

/// Case-insensitive identity key.
#[inline]
pub fn normalize_key(identity: &str) -> String {
    identity.to_lowercase()
}

/// A channel followed by the configured account on the primary provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowedChannel {
    pub id: String,
    pub login: String,
    pub display_name: String,
}

/// Ordered follow list of the configured account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowSet {
    pub channels: Vec<FollowedChannel>,
}

impl FollowSet {
    pub fn new(channels: Vec<FollowedChannel>) -> Self {
        Self { channels }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Provider ids in follow order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.id.as_str())
    }
}

/// Latest known live records from both providers.
///
/// This is the value handed to clients. Within each list keys are unique;
/// the same key may appear once in each list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub primary: Vec<StreamRecord>,
    pub secondary: Vec<StreamRecord>,
    /// When a fetch was last attempted, successful or not.
    pub last_fetched: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn replace_primary(&mut self, records: Vec<StreamRecord>) {
        self.primary = dedup_by_key(records);
    }

    pub fn replace_secondary(&mut self, records: Vec<StreamRecord>) {
        self.secondary = dedup_by_key(records);
    }

    /// Record a fetch attempt at `now`. Never moves the timestamp backwards.
    pub fn mark_fetched(&mut self, now: DateTime<Utc>) {
        self.last_fetched = Some(match self.last_fetched {
            Some(previous) if previous > now => previous,
            _ => now,
        });
    }

    pub fn live_count(&self) -> usize {
        self.primary.len() + self.secondary.len()
    }
}

/// Drop later records whose key was already seen, keeping list order.
fn dedup_by_key(records: Vec<StreamRecord>) -> Vec<StreamRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.key.clone()))
        .collect()
}
