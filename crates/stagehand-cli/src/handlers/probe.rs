//! Headless playback probe.
//!
//! Runs one `PlaybackSession` against a relay with a sink that renders
//! nothing and prints every state change.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use stagehand_core::{ConnectionState, PlaybackSnapshot};
use stagehand_playback::{
    HlsSource, MediaKind, MediaSink, NegotiatorConfig, PlaybackSession, TrackRemote,
    TransportError,
};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::info;

use crate::commands::ProbeArgs;

/// Pause before each manual retry so the relay gets a chance to recover.
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Sink that logs what it is given and plays nothing.
struct LoggingSink;

#[async_trait]
impl MediaSink for LoggingSink {
    fn attach_track(&self, kind: MediaKind, track: Arc<TrackRemote>) {
        info!(?kind, codec = %track.codec().capability.mime_type, "Track attached");
    }

    fn supports_native_hls(&self) -> bool {
        false
    }

    async fn load_native_hls(&self, _url: &str, _include_video: bool) -> Result<(), TransportError> {
        Err(TransportError::Sink("native HLS is not available headless".to_string()))
    }

    fn attach_hls(&self, source: HlsSource) {
        info!(
            url = %source.url,
            variants = source.playlist.variants.len(),
            include_video = source.include_video,
            "HLS attached"
        );
    }

    fn detach(&self) {}
}

fn format_snapshot(snapshot: &PlaybackSnapshot) -> String {
    let mut line = format!(
        "{:<12} transport={:<6} attempts={}/{}",
        snapshot.state.to_string(),
        format!("{:?}", snapshot.transport).to_lowercase(),
        snapshot.reconnect_attempts,
        snapshot.max_reconnect_attempts,
    );
    if !snapshot.retry_available {
        line.push_str(" retry=disabled");
    }
    if let Some(error) = &snapshot.error {
        line.push_str(&format!(" error={error:?}"));
    }
    line
}

async fn print_changes(mut rx: watch::Receiver<PlaybackSnapshot>) {
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        println!("{}", format_snapshot(&snapshot));
    }
}

/// Retry each time the session lands in `error` until the budget is spent.
async fn retry_until_exhausted(session: &PlaybackSession) {
    let mut rx = session.subscribe();
    loop {
        if rx
            .wait_for(|s| s.state == ConnectionState::Error)
            .await
            .is_err()
        {
            return;
        }
        sleep(RETRY_DELAY).await;
        if let Err(e) = session.retry().await {
            info!(error = %e, "Not retrying");
            return;
        }
    }
}

pub async fn execute(args: ProbeArgs) -> Result<()> {
    let request = args.open_request();
    println!("Probing {} (WebRTC) / {} (HLS)", request.webrtc_url, request.hls_url);

    let session = PlaybackSession::with_default_strategies(
        "probe",
        request,
        Arc::new(LoggingSink),
        NegotiatorConfig::default(),
    )?;
    let printer = tokio::spawn(print_changes(session.subscribe()));

    let run = async {
        session.set_stream_active(true).await;
        if args.retry {
            retry_until_exhausted(&session).await;
        }
        std::future::pending::<()>().await;
    };

    tokio::select! {
        () = run => {}
        () = sleep(Duration::from_secs(args.duration)) => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    let last = session.snapshot();
    session.close().await;
    printer.abort();
    println!("Final: {}", format_snapshot(&last));
    Ok(())
}
