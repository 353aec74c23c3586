//! Client for the relay's control API.
//!
//! Wraps the handful of MediaMTX v3 endpoints the supervisor needs and
//! projects their responses into `stagehand_core` types.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use stagehand_core::{ControlApiError, PathList, StreamPath, StreamTrack};
use tracing::debug;

/// Endpoint used as the readiness/health probe.
const PROBE_ENDPOINT: &str = "/v3/config/global/get";

/// Endpoint listing publish paths.
const PATHS_ENDPOINT: &str = "/v3/paths/list";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPathList {
    #[serde(default)]
    item_count: usize,
    #[serde(default)]
    page_count: usize,
    #[serde(default)]
    items: Vec<RawPath>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPath {
    name: String,
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    tracks: Vec<String>,
    #[serde(default)]
    readers: Vec<serde_json::Value>,
    #[serde(default)]
    bytes_received: u64,
    #[serde(default)]
    bytes_sent: u64,
}

impl From<RawPath> for StreamPath {
    fn from(raw: RawPath) -> Self {
        Self {
            name: raw.name,
            ready: raw.ready,
            tracks: raw.tracks.into_iter().map(StreamTrack::from_codec).collect(),
            reader_count: raw.readers.len(),
            bytes_received: raw.bytes_received,
            bytes_sent: raw.bytes_sent,
        }
    }
}

impl From<RawPathList> for PathList {
    fn from(raw: RawPathList) -> Self {
        Self {
            item_count: raw.item_count,
            page_count: raw.page_count,
            items: raw.items.into_iter().map(StreamPath::from).collect(),
        }
    }
}

/// HTTP client bound to one relay's control API.
#[derive(Debug, Clone)]
pub struct RelayApiClient {
    client: Client,
    base_url: String,
}

impl RelayApiClient {
    /// Create a client. Every request is bounded by `request_timeout`.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, ControlApiError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ControlApiError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, endpoint: &str) -> Result<reqwest::Response, ControlApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ControlApiError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            debug!(%url, %status, "Control API returned non-success status");
            return Err(ControlApiError::Status(status.as_u16()));
        }
        Ok(response)
    }

    /// Single readiness/health probe.
    pub async fn probe(&self) -> Result<(), ControlApiError> {
        self.get(PROBE_ENDPOINT).await.map(|_| ())
    }

    /// List publish paths.
    pub async fn list_paths(&self) -> Result<PathList, ControlApiError> {
        let response = self.get(PATHS_ENDPOINT).await?;
        let raw: RawPathList = response
            .json()
            .await
            .map_err(|e| ControlApiError::Decode(e.to_string()))?;
        Ok(raw.into())
    }
}
