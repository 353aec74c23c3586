//! WHEP signaling: one HTTP POST of an SDP offer, an SDP answer back.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use tracing::debug;
use url::Url;

use crate::error::TransportError;

const SDP_CONTENT_TYPE: &str = "application/sdp";

/// Answer returned by a WHEP endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhepAnswer {
    pub sdp: String,
    /// Session resource from the `Location` header, used to end the session.
    pub session_url: Option<String>,
}

/// Minimal WHEP client.
#[derive(Debug, Clone)]
pub struct WhepClient {
    client: Client,
}

impl WhepClient {
    /// Every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Signaling(e.to_string()))?;
        Ok(Self { client })
    }

    /// POST `offer` to `endpoint`.
    ///
    /// A non-2xx status or a body that does not look like SDP is a
    /// signaling failure.
    pub async fn exchange(&self, endpoint: &str, offer: &str) -> Result<WhepAnswer, TransportError> {
        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, SDP_CONTENT_TYPE)
            .body(offer.to_string())
            .send()
            .await
            .map_err(|e| TransportError::Signaling(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Signaling(format!(
                "signaling endpoint returned {status}"
            )));
        }

        let session_url = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|location| resolve_location(endpoint, location));

        let sdp = response
            .text()
            .await
            .map_err(|e| TransportError::Signaling(e.to_string()))?;
        validate_answer(&sdp)?;

        debug!(%endpoint, ?session_url, "WHEP answer received");
        Ok(WhepAnswer { sdp, session_url })
    }

    /// End a WHEP session. Failures are logged and ignored.
    pub async fn delete_session(&self, session_url: &str) {
        match self.client.delete(session_url).send().await {
            Ok(response) => debug!(%session_url, status = %response.status(), "WHEP session deleted"),
            Err(e) => debug!(%session_url, error = %e, "Failed to delete WHEP session"),
        }
    }
}

fn resolve_location(endpoint: &str, location: &str) -> Option<String> {
    Url::parse(endpoint)
        .and_then(|base| base.join(location))
        .map(String::from)
        .ok()
}

fn validate_answer(sdp: &str) -> Result<(), TransportError> {
    let trimmed = sdp.trim_start();
    if !trimmed.starts_with("v=0") {
        return Err(TransportError::Signaling(
            "signaling endpoint returned a malformed answer".to_string(),
        ));
    }
    if !trimmed.lines().any(|line| line.starts_with("m=")) {
        return Err(TransportError::Signaling(
            "answer has no media sections".to_string(),
        ));
    }
    Ok(())
}
