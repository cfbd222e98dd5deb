//! strims.gg stream listing.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{GatewayError, GatewayResult};
use crate::monitor::{Provider, StreamRecord};

#[derive(Debug, Deserialize)]
struct StrimsListing {
    #[serde(default)]
    stream_list: Vec<StrimsStream>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StrimsStream {
    channel: String,
    service: String,
    title: String,
    rustlers: u64,
    viewers: u64,
    live: bool,
    hidden: bool,
    thumbnail: String,
    url: String,
}

impl StrimsStream {
    fn is_visible(&self) -> bool {
        self.live && !self.hidden && !self.channel.is_empty()
    }

    fn into_record(self) -> StreamRecord {
        // `rustlers` counts strims.gg watchers, `viewers` the embedded service's.
        let viewer_count = self.viewers.max(self.rustlers);
        let url = if self.url.is_empty() {
            None
        } else if self.url.starts_with('/') {
            Some(format!("https://strims.gg{}", self.url))
        } else {
            Some(self.url)
        };

        StreamRecord::new(Provider::Strims, self.channel)
            .with_title(self.title)
            .with_viewer_count(viewer_count)
            .with_category(Some(self.service).filter(|s| !s.is_empty()))
            .with_url(url)
            .with_thumbnail_url(Some(self.thumbnail).filter(|t| !t.is_empty()))
    }
}

/// Client for the public strims.gg listing.
#[derive(Clone)]
pub struct StrimsClient {
    client: Client,
    endpoint: String,
}

impl StrimsClient {
    const ENDPOINT: &'static str = "https://strims.gg/api";

    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, Self::ENDPOINT)
    }

    pub fn with_endpoint(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Every visible live stream.
    ///
    /// Server errors and unreadable bodies are reported as
    /// [`GatewayError::Unavailable`]; the site goes down often enough that
    /// callers treat it as routine.
    pub async fn fetch_live_streams(&self) -> GatewayResult<Vec<StreamRecord>> {
        let response = self.client.get(&self.endpoint).send().await?;
        let status = response.status();

        if status.is_server_error() {
            return Err(GatewayError::Unavailable(format!("status {}", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, body));
        }

        let body = response.text().await?;
        let records = parse_listing(&body)?;
        debug!(count = records.len(), "Fetched strims listing");
        Ok(records)
    }
}

fn parse_listing(body: &str) -> GatewayResult<Vec<StreamRecord>> {
    if body.trim().is_empty() {
        return Err(GatewayError::Unavailable("empty body".to_string()));
    }

    let listing: StrimsListing = serde_json::from_str(body)
        .map_err(|e| GatewayError::Unavailable(format!("malformed listing: {}", e)))?;

    Ok(listing
        .stream_list
        .into_iter()
        .filter(StrimsStream::is_visible)
        .map(StrimsStream::into_record)
        .collect())
}
