//! Real WebRTC and HLS strategies against an in-process relay origin.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use common::{FakeOrigin, HlsBehavior, RecordingSink, test_config};
use stagehand_core::{ConnectionState, PlaybackMode, TransportKind};
use stagehand_playback::{
    ActiveTransport, HlsStrategy, PlaybackSession, PlaybackStrategy, TransportError, TransportEvents,
    WebRtcStrategy,
};

const BAD_SDP: &str = "this is not a session description";

#[tokio::test]
async fn whep_error_status_is_a_signaling_failure() {
    let origin = FakeOrigin::spawn(StatusCode::INTERNAL_SERVER_ERROR, "", HlsBehavior::Serve).await;
    let sink = Arc::new(RecordingSink::default());
    let strategy = WebRtcStrategy::new(sink.clone(), &test_config()).unwrap();

    let result = strategy
        .open(&origin.request(PlaybackMode::AudioVideo), TransportEvents::detached())
        .await;

    match result {
        Err(TransportError::Signaling(message)) => assert!(message.contains("500")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("signaling should have failed"),
    }
    assert_eq!(origin.whep_hits(), 1);
    assert!(sink.tracks().is_empty());
}

#[tokio::test]
async fn malformed_answer_is_a_signaling_failure() {
    let origin = FakeOrigin::spawn(StatusCode::CREATED, BAD_SDP, HlsBehavior::Serve).await;
    let sink = Arc::new(RecordingSink::default());
    let strategy = WebRtcStrategy::new(sink, &test_config()).unwrap();

    let result = strategy
        .open(&origin.request(PlaybackMode::Audio), TransportEvents::detached())
        .await;

    assert!(matches!(result, Err(TransportError::Signaling(_))));
}

#[tokio::test]
async fn hls_audio_only_attaches_audio_rendition() {
    let origin = FakeOrigin::spawn(StatusCode::NOT_FOUND, "", HlsBehavior::Serve).await;
    let sink = Arc::new(RecordingSink::default());
    let strategy = HlsStrategy::new(sink.clone(), &test_config()).unwrap();

    let mut transport = strategy
        .open(&origin.request(PlaybackMode::Audio), TransportEvents::detached())
        .await
        .unwrap();
    assert_eq!(transport.kind(), TransportKind::Hls);

    let sources = sink.hls_sources();
    assert_eq!(sources.len(), 1);
    let source = &sources[0];
    assert!(!source.include_video);
    assert!(source.tuning.low_latency);
    assert_eq!(
        source.playlist.media_playlist_uri(false),
        Some("audio2_stream.m3u8")
    );

    transport.close().await;
    assert!(sink.detaches() >= 1);
}

#[tokio::test]
async fn hls_video_mode_includes_video() {
    let origin = FakeOrigin::spawn(StatusCode::NOT_FOUND, "", HlsBehavior::Serve).await;
    let sink = Arc::new(RecordingSink::default());
    let strategy = HlsStrategy::new(sink.clone(), &test_config()).unwrap();

    let mut transport = strategy
        .open(&origin.request(PlaybackMode::AudioVideo), TransportEvents::detached())
        .await
        .unwrap();

    let sources = sink.hls_sources();
    assert!(sources[0].include_video);
    assert_eq!(
        sources[0].playlist.media_playlist_uri(true),
        Some("video1_stream.m3u8")
    );
    transport.close().await;
}

#[tokio::test]
async fn unparsable_manifest_fails_without_retry() {
    let origin = FakeOrigin::spawn(StatusCode::NOT_FOUND, "", HlsBehavior::Garbage).await;
    let sink = Arc::new(RecordingSink::default());
    let strategy = HlsStrategy::new(sink.clone(), &test_config()).unwrap();

    let result = strategy
        .open(&origin.request(PlaybackMode::AudioVideo), TransportEvents::detached())
        .await;

    assert!(matches!(result, Err(TransportError::Hls(_))));
    assert_eq!(origin.hls_hits(), 1);
    assert!(sink.hls_sources().is_empty());
}

#[tokio::test]
async fn missing_manifest_is_retried_before_failing() {
    let origin = FakeOrigin::spawn(StatusCode::NOT_FOUND, "", HlsBehavior::NotFound).await;
    let sink = Arc::new(RecordingSink::default());
    let config = test_config();
    let strategy = HlsStrategy::new(sink, &config).unwrap();

    let result = strategy
        .open(&origin.request(PlaybackMode::AudioVideo), TransportEvents::detached())
        .await;

    assert!(matches!(result, Err(TransportError::Hls(_))));
    assert_eq!(origin.hls_hits(), 1 + config.hls.manifest_retries as usize);
}

#[tokio::test]
async fn native_hls_skips_manifest_fetch() {
    let origin = FakeOrigin::spawn(StatusCode::NOT_FOUND, "", HlsBehavior::Serve).await;
    let sink = Arc::new(RecordingSink::native());
    let strategy = HlsStrategy::new(sink.clone(), &test_config()).unwrap();
    let request = origin.request(PlaybackMode::Audio);

    let mut transport = strategy
        .open(&request, TransportEvents::detached())
        .await
        .unwrap();

    assert_eq!(sink.native_loads(), vec![(request.hls_url.clone(), false)]);
    assert_eq!(origin.hls_hits(), 0);
    transport.close().await;
}

#[tokio::test]
async fn session_falls_back_to_hls_when_signaling_fails() {
    let origin = FakeOrigin::spawn(StatusCode::INTERNAL_SERVER_ERROR, "", HlsBehavior::Serve).await;
    let sink = Arc::new(RecordingSink::default());
    let session = PlaybackSession::with_default_strategies(
        "preview-1",
        origin.request(PlaybackMode::AudioVideo),
        sink.clone(),
        test_config(),
    )
    .unwrap();

    let state = tokio::time::timeout(Duration::from_secs(10), session.set_stream_active(true))
        .await
        .unwrap();

    assert_eq!(state, ConnectionState::Connected);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.transport, TransportKind::Hls);
    assert_eq!(snapshot.error, None);
    assert_eq!(origin.whep_hits(), 1);
    assert_eq!(sink.hls_sources().len(), 1);

    session.close().await;
}

#[tokio::test]
async fn inactive_session_makes_no_requests() {
    let origin = FakeOrigin::spawn(StatusCode::INTERNAL_SERVER_ERROR, "", HlsBehavior::Serve).await;
    let session = PlaybackSession::with_default_strategies(
        "preview-1",
        origin.request(PlaybackMode::AudioVideo),
        Arc::new(RecordingSink::default()),
        test_config(),
    )
    .unwrap();

    assert_eq!(session.connect().await, ConnectionState::Disconnected);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(origin.whep_hits(), 0);
    assert_eq!(origin.hls_hits(), 0);
}

#[tokio::test]
async fn session_reports_error_when_both_transports_fail() {
    let origin = FakeOrigin::spawn(StatusCode::INTERNAL_SERVER_ERROR, "", HlsBehavior::Garbage).await;
    let session = PlaybackSession::with_default_strategies(
        "preview-1",
        origin.request(PlaybackMode::Audio),
        Arc::new(RecordingSink::default()),
        test_config(),
    )
    .unwrap();

    let state = tokio::time::timeout(Duration::from_secs(10), session.set_stream_active(true))
        .await
        .unwrap();

    assert_eq!(state, ConnectionState::Error);
    let snapshot = session.snapshot();
    assert!(snapshot.retry_available);
    assert!(snapshot.error.unwrap().starts_with("Unable to connect to stream"));
}
