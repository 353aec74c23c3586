//! Buffered playback over HLS.
//!
//! Native HLS support on the sink is used when present; otherwise the
//! manifest is loaded here and handed to the sink's client-side player,
//! and a background task follows the live playlist until closed.

mod playlist;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use stagehand_core::TransportKind;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

pub use playlist::{
    MediaPlaylist, MultivariantPlaylist, Playlist, PlaylistError, Rendition, Segment, Variant,
    parse_playlist,
};

use crate::config::{HlsTuning, NegotiatorConfig};
use crate::error::TransportError;
use crate::sink::{HlsSource, MediaSink};
use crate::transport::{ActiveTransport, LinkState, OpenRequest, PlaybackStrategy, TransportEvents};

/// Floor for the live playlist refresh interval.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(200);

/// Base delay between manifest retries; grows linearly per attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
enum FetchError {
    /// Recoverable: retried up to the configured limit.
    #[error("network error: {0}")]
    Network(String),

    #[error("invalid playlist: {0}")]
    Parse(#[from] PlaylistError),
}

async fn fetch_playlist(client: &Client, url: &Url) -> Result<Playlist, FetchError> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Network(format!("{url} returned {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;
    Ok(parse_playlist(&body)?)
}

/// HLS playback strategy.
pub struct HlsStrategy {
    sink: Arc<dyn MediaSink>,
    client: Client,
    manifest_timeout: Duration,
    metadata_timeout: Duration,
    tuning: HlsTuning,
}

impl HlsStrategy {
    pub fn new(sink: Arc<dyn MediaSink>, config: &NegotiatorConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.hls_manifest_timeout)
            .build()
            .map_err(|e| TransportError::Hls(e.to_string()))?;
        Ok(Self {
            sink,
            client,
            manifest_timeout: config.hls_manifest_timeout,
            metadata_timeout: config.hls_metadata_timeout,
            tuning: config.hls,
        })
    }

    /// Load a playlist, retrying network errors. Parse errors are fatal.
    async fn load_manifest(&self, url: &Url) -> Result<Playlist, TransportError> {
        let mut attempt = 0;
        loop {
            match fetch_playlist(&self.client, url).await {
                Ok(playlist) => return Ok(playlist),
                Err(FetchError::Network(e)) if attempt < self.tuning.manifest_retries => {
                    attempt += 1;
                    debug!(%url, attempt, error = %e, "Manifest load failed, retrying...");
                    sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(TransportError::Hls(e.to_string())),
            }
        }
    }

    async fn open_native(
        &self,
        request: &OpenRequest,
        events: &TransportEvents,
    ) -> Result<Box<dyn ActiveTransport>, TransportError> {
        let include_video = request.mode.wants_video();
        let loaded = events
            .guard(timeout(
                self.metadata_timeout,
                self.sink.load_native_hls(&request.hls_url, include_video),
            ))
            .await;

        match loaded {
            Ok(Ok(Ok(()))) => Ok(Box::new(NativeHlsTransport {
                sink: self.sink.clone(),
            })),
            Ok(Ok(Err(e))) => {
                self.sink.detach();
                Err(e)
            }
            Ok(Err(_)) => {
                self.sink.detach();
                Err(TransportError::Hls(
                    "native playback did not load metadata in time".to_string(),
                ))
            }
            Err(e) => {
                self.sink.detach();
                Err(e)
            }
        }
    }

    async fn open_with_player(
        &self,
        request: &OpenRequest,
        events: &TransportEvents,
    ) -> Result<Box<dyn ActiveTransport>, TransportError> {
        let include_video = request.mode.wants_video();
        let url = Url::parse(&request.hls_url)
            .map_err(|e| TransportError::Hls(format!("invalid playlist URL: {e}")))?;

        let manifest = events
            .guard(timeout(self.manifest_timeout, self.load_manifest(&url)))
            .await?
            .map_err(|_| TransportError::Hls("manifest load timed out".to_string()))??;

        let (playlist, media_url) = match manifest {
            Playlist::Multivariant(playlist) => {
                let uri = playlist
                    .media_playlist_uri(include_video)
                    .ok_or_else(|| TransportError::Hls("manifest lists no variants".to_string()))?;
                let media_url = url
                    .join(uri)
                    .map_err(|e| TransportError::Hls(format!("invalid variant URI: {e}")))?;
                (playlist, media_url)
            }
            // Served a media playlist directly; treat it as its own only variant
            Playlist::Media(_) => (
                MultivariantPlaylist {
                    variants: vec![Variant {
                        uri: url.to_string(),
                        bandwidth: None,
                        codecs: None,
                        resolution: None,
                    }],
                    renditions: Vec::new(),
                },
                url.clone(),
            ),
        };

        debug!(
            %url,
            %media_url,
            variants = playlist.variants.len(),
            "HLS manifest parsed"
        );
        self.sink.attach_hls(HlsSource {
            url: request.hls_url.clone(),
            playlist,
            tuning: self.tuning,
            include_video,
        });

        let cancel = CancellationToken::new();
        tokio::spawn(follow_live_playlist(
            self.client.clone(),
            media_url,
            self.tuning.manifest_retries,
            events.clone(),
            cancel.clone(),
        ));

        Ok(Box::new(HlsTransport {
            sink: self.sink.clone(),
            cancel,
        }))
    }
}

#[async_trait]
impl PlaybackStrategy for HlsStrategy {
    fn kind(&self) -> TransportKind {
        TransportKind::Hls
    }

    async fn open(
        &self,
        request: &OpenRequest,
        events: TransportEvents,
    ) -> Result<Box<dyn ActiveTransport>, TransportError> {
        if self.sink.supports_native_hls() {
            debug!(url = %request.hls_url, "Using native HLS playback");
            self.open_native(request, &events).await
        } else {
            self.open_with_player(request, &events).await
        }
    }
}

/// Re-fetch the live media playlist until cancelled.
///
/// Network errors are retried `retries` times in a row before playback is
/// reported failed; an unparsable playlist fails immediately. An ended
/// stream is reported as a lost link.
async fn follow_live_playlist(
    client: Client,
    url: Url,
    retries: u32,
    events: TransportEvents,
    cancel: CancellationToken,
) {
    let mut refresh = Duration::from_secs(1);
    let mut failures = 0u32;

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!(%url, "Live playlist follower stopped");
                return;
            }
            () = sleep(refresh) => {}
        }

        match fetch_playlist(&client, &url).await {
            Ok(Playlist::Media(media)) => {
                failures = 0;
                if media.ended {
                    events.report(LinkState::Lost("stream ended".to_string()));
                    return;
                }
                let seconds = media.part_target.unwrap_or(media.target_duration);
                refresh = Duration::try_from_secs_f64(seconds)
                    .unwrap_or(MIN_REFRESH_INTERVAL)
                    .max(MIN_REFRESH_INTERVAL);
            }
            Ok(Playlist::Multivariant(_)) => {
                events.report(LinkState::Failed(
                    "expected a media playlist while following the live edge".to_string(),
                ));
                return;
            }
            Err(FetchError::Network(e)) if failures < retries => {
                failures += 1;
                debug!(%url, failures, error = %e, "Live playlist refresh failed");
            }
            Err(e) => {
                warn!(%url, error = %e, "HLS playback failed");
                events.report(LinkState::Failed(e.to_string()));
                return;
            }
        }
    }
}

/// Client-side HLS playback.
struct HlsTransport {
    sink: Arc<dyn MediaSink>,
    cancel: CancellationToken,
}

#[async_trait]
impl ActiveTransport for HlsTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Hls
    }

    async fn close(&mut self) {
        self.cancel.cancel();
        self.sink.detach();
    }
}

/// HLS played by the sink itself.
struct NativeHlsTransport {
    sink: Arc<dyn MediaSink>,
}

#[async_trait]
impl ActiveTransport for NativeHlsTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Hls
    }

    async fn close(&mut self) {
        self.sink.detach();
    }
}
