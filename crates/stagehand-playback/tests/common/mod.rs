//! Shared fakes for playback tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::Response;
use axum::routing::{get, post};
use stagehand_core::TransportKind;
use stagehand_playback::{
    ActiveTransport, HlsSource, MediaKind, MediaSink, NegotiatorConfig, OpenRequest,
    PlaybackStrategy, TransportError, TransportEvents,
};
use webrtc::track::track_remote::TrackRemote;

/// Counts transports that are open at the same time across strategies.
#[derive(Default)]
pub struct LiveCounter {
    live: AtomicUsize,
    max_live: AtomicUsize,
}

impl LiveCounter {
    fn open(&self) {
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
    }

    fn close(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }
}

/// Strategy whose outcome is set by the test.
pub struct FakeStrategy {
    kind: TransportKind,
    succeed: AtomicBool,
    delay: Mutex<Duration>,
    /// Ignore cancellation while "negotiating".
    stubborn: AtomicBool,
    opens: AtomicUsize,
    counter: Arc<LiveCounter>,
    last_events: Mutex<Option<TransportEvents>>,
}

impl FakeStrategy {
    pub fn new(kind: TransportKind, succeed: bool, counter: Arc<LiveCounter>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            succeed: AtomicBool::new(succeed),
            delay: Mutex::new(Duration::ZERO),
            stubborn: AtomicBool::new(false),
            opens: AtomicUsize::new(0),
            counter,
            last_events: Mutex::new(None),
        })
    }

    pub fn set_succeed(&self, succeed: bool) {
        self.succeed.store(succeed, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn set_stubborn(&self, stubborn: bool) {
        self.stubborn.store(stubborn, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Events handle given to the most recent `open`.
    pub fn last_events(&self) -> TransportEvents {
        self.last_events.lock().unwrap().clone().expect("strategy was never opened")
    }
}

#[async_trait]
impl PlaybackStrategy for FakeStrategy {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn open(
        &self,
        _request: &OpenRequest,
        events: TransportEvents,
    ) -> Result<Box<dyn ActiveTransport>, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        *self.last_events.lock().unwrap() = Some(events.clone());

        let delay = *self.delay.lock().unwrap();
        if self.stubborn.load(Ordering::SeqCst) {
            tokio::time::sleep(delay).await;
        } else {
            events.guard(tokio::time::sleep(delay)).await?;
        }

        if !self.succeed.load(Ordering::SeqCst) {
            return Err(match self.kind {
                TransportKind::Webrtc => TransportError::Signaling("signaling endpoint returned 500".into()),
                _ => TransportError::Hls("manifest returned 404".into()),
            });
        }

        self.counter.open();
        Ok(Box::new(FakeTransport {
            kind: self.kind,
            counter: self.counter.clone(),
            closed: false,
        }))
    }
}

struct FakeTransport {
    kind: TransportKind,
    counter: Arc<LiveCounter>,
    closed: bool,
}

#[async_trait]
impl ActiveTransport for FakeTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counter.close();
        }
    }
}

/// Sink that records what was attached.
#[derive(Default)]
pub struct RecordingSink {
    pub native_hls: bool,
    tracks: Mutex<Vec<MediaKind>>,
    hls: Mutex<Vec<HlsSource>>,
    native_loads: Mutex<Vec<(String, bool)>>,
    detaches: AtomicUsize,
}

impl RecordingSink {
    pub fn native() -> Self {
        Self {
            native_hls: true,
            ..Self::default()
        }
    }

    pub fn tracks(&self) -> Vec<MediaKind> {
        self.tracks.lock().unwrap().clone()
    }

    pub fn hls_sources(&self) -> Vec<HlsSource> {
        self.hls.lock().unwrap().clone()
    }

    pub fn native_loads(&self) -> Vec<(String, bool)> {
        self.native_loads.lock().unwrap().clone()
    }

    pub fn detaches(&self) -> usize {
        self.detaches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSink for RecordingSink {
    fn attach_track(&self, kind: MediaKind, _track: Arc<TrackRemote>) {
        self.tracks.lock().unwrap().push(kind);
    }

    fn supports_native_hls(&self) -> bool {
        self.native_hls
    }

    async fn load_native_hls(&self, url: &str, include_video: bool) -> Result<(), TransportError> {
        self.native_loads
            .lock()
            .unwrap()
            .push((url.to_string(), include_video));
        Ok(())
    }

    fn attach_hls(&self, source: HlsSource) {
        self.hls.lock().unwrap().push(source);
    }

    fn detach(&self) {
        self.detaches.fetch_add(1, Ordering::SeqCst);
    }
}

/// Short timeouts and no automatic reconnect.
pub fn test_config() -> NegotiatorConfig {
    NegotiatorConfig {
        ice_timeout: Duration::from_secs(2),
        signaling_timeout: Duration::from_secs(2),
        hls_manifest_timeout: Duration::from_secs(2),
        hls_metadata_timeout: Duration::from_secs(2),
        auto_reconnect_delay: None,
        ..NegotiatorConfig::default()
    }
}

pub const MULTIVARIANT: &str = "#EXTM3U\n\
#EXT-X-VERSION:9\n\
#EXT-X-INDEPENDENT-SEGMENTS\n\
#EXT-X-MEDIA:TYPE=\"AUDIO\",GROUP-ID=\"audio\",NAME=\"audio2\",AUTOSELECT=YES,DEFAULT=YES,URI=\"audio2_stream.m3u8\"\n\
#EXT-X-STREAM-INF:BANDWIDTH=1128000,CODECS=\"avc1.64001f,mp4a.40.2\",RESOLUTION=1280x720,AUDIO=\"audio\"\n\
video1_stream.m3u8\n";

pub const MEDIA: &str = "#EXTM3U\n\
#EXT-X-VERSION:9\n\
#EXT-X-TARGETDURATION:1\n\
#EXT-X-MEDIA-SEQUENCE:1\n\
#EXTINF:1.00000,\n\
seg1.mp4\n";

/// What the fake relay origin answers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum HlsBehavior {
    Serve,
    NotFound,
    Garbage,
}

#[derive(Clone)]
struct OriginState {
    whep_status: StatusCode,
    whep_body: &'static str,
    hls: HlsBehavior,
    whep_hits: Arc<AtomicUsize>,
    hls_hits: Arc<AtomicUsize>,
}

/// In-process stand-in for the relay's WebRTC and HLS listeners.
pub struct FakeOrigin {
    pub base_url: String,
    whep_hits: Arc<AtomicUsize>,
    hls_hits: Arc<AtomicUsize>,
}

impl FakeOrigin {
    pub async fn spawn(whep_status: StatusCode, whep_body: &'static str, hls: HlsBehavior) -> Self {
        let state = OriginState {
            whep_status,
            whep_body,
            hls,
            whep_hits: Arc::new(AtomicUsize::new(0)),
            hls_hits: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route("/live/whep", post(whep))
            .route("/live/{playlist}", get(playlist))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            whep_hits: state.whep_hits,
            hls_hits: state.hls_hits,
        }
    }

    pub fn request(&self, mode: stagehand_core::PlaybackMode) -> OpenRequest {
        OpenRequest::new(
            mode,
            format!("{}/live/whep", self.base_url),
            format!("{}/live/index.m3u8", self.base_url),
        )
    }

    pub fn whep_hits(&self) -> usize {
        self.whep_hits.load(Ordering::SeqCst)
    }

    pub fn hls_hits(&self) -> usize {
        self.hls_hits.load(Ordering::SeqCst)
    }
}

async fn whep(State(state): State<OriginState>, body: String) -> Response {
    state.whep_hits.fetch_add(1, Ordering::SeqCst);
    assert!(body.starts_with("v=0"), "offer should be SDP");
    Response::builder()
        .status(state.whep_status)
        .header(header::CONTENT_TYPE, "application/sdp")
        .body(Body::from(state.whep_body))
        .unwrap()
}

async fn playlist(
    State(state): State<OriginState>,
    axum::extract::Path(name): axum::extract::Path<String>,
) -> Response {
    state.hls_hits.fetch_add(1, Ordering::SeqCst);
    let (status, body) = match state.hls {
        HlsBehavior::NotFound => (StatusCode::NOT_FOUND, "not found"),
        HlsBehavior::Garbage => (StatusCode::OK, "<html>oops</html>"),
        HlsBehavior::Serve if name == "index.m3u8" => (StatusCode::OK, MULTIVARIANT),
        HlsBehavior::Serve => (StatusCode::OK, MEDIA),
    };
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")
        .body(Body::from(body))
        .unwrap()
}
