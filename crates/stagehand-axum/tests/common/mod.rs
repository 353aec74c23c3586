//! Shared fixtures for route tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::routing::get;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use stagehand_axum::{AxumContext, CorsConfig, create_router};
use stagehand_core::{RelayError, RelayProcessConfig};
use stagehand_runtime::{
    RelayLauncher, RelayLogBuffer, RelayProcess, RelaySupervisor, SupervisorSettings,
};
use tower::ServiceExt;

#[derive(Clone)]
struct ApiState {
    healthy: Arc<AtomicBool>,
    path_requests: Arc<AtomicUsize>,
}

/// In-process stand-in for the relay control API with one live path.
pub struct FakeControlApi {
    pub port: u16,
    healthy: Arc<AtomicBool>,
    path_requests: Arc<AtomicUsize>,
}

impl FakeControlApi {
    pub async fn spawn() -> Self {
        let state = ApiState {
            healthy: Arc::new(AtomicBool::new(true)),
            path_requests: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route("/v3/config/global/get", get(global_config))
            .route("/v3/paths/list", get(list_paths))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            port,
            healthy: state.healthy,
            path_requests: state.path_requests,
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// How many times `/v3/paths/list` was asked.
    pub fn path_requests(&self) -> usize {
        self.path_requests.load(Ordering::SeqCst)
    }
}

async fn global_config(State(state): State<ApiState>) -> Result<Json<Value>, StatusCode> {
    if state.healthy.load(Ordering::SeqCst) {
        Ok(Json(json!({"api": true})))
    } else {
        Err(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

async fn list_paths(State(state): State<ApiState>) -> Result<Json<Value>, StatusCode> {
    state.path_requests.fetch_add(1, Ordering::SeqCst);
    if !state.healthy.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(json!({
        "itemCount": 1,
        "pageCount": 1,
        "items": [{
            "name": "live",
            "ready": true,
            "tracks": ["H264", "MPEG-4 Audio"],
            "readers": [{"type": "webRTCSession", "id": "a"}],
            "bytesReceived": 2048,
            "bytesSent": 1024
        }]
    })))
}

/// Launcher that hands out in-memory processes.
pub struct FakeLauncher {
    available: bool,
    launches: AtomicUsize,
}

impl FakeLauncher {
    pub fn new(available: bool) -> Arc<Self> {
        Arc::new(Self {
            available,
            launches: AtomicUsize::new(0),
        })
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelayLauncher for FakeLauncher {
    fn binary_path(&self) -> &Path {
        Path::new("/fake/mediamtx")
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn launch(
        &self,
        _config_file: &Path,
        logs: Arc<RelayLogBuffer>,
    ) -> Result<Box<dyn RelayProcess>, RelayError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        logs.push("stdout", "INF [RTMP] listener opened on :1935");
        Ok(Box::new(FakeProcess { exited: false }))
    }
}

struct FakeProcess {
    exited: bool,
}

#[async_trait]
impl RelayProcess for FakeProcess {
    fn pid(&self) -> Option<u32> {
        None
    }

    fn try_exit(&mut self) -> Option<String> {
        self.exited.then(|| "exit status: 0".to_string())
    }

    async fn terminate(&mut self, _grace: Duration) -> std::io::Result<()> {
        self.exited = true;
        Ok(())
    }
}

/// Short timings so failure paths finish quickly.
pub fn fast_settings() -> SupervisorSettings {
    SupervisorSettings {
        readiness_timeout: Duration::from_millis(500),
        probe_interval: Duration::from_millis(20),
        api_timeout: Duration::from_millis(200),
        stop_grace: Duration::from_millis(100),
        monitor_interval: Duration::from_secs(60),
        failure_threshold: 3,
    }
}

/// A supervisor wired to `launcher` and a control API on `api_port`.
pub fn supervisor(
    api_port: u16,
    launcher: Arc<FakeLauncher>,
    dir: &tempfile::TempDir,
) -> RelaySupervisor {
    RelaySupervisor::new(
        RelayProcessConfig {
            api_port,
            ..RelayProcessConfig::default()
        },
        fast_settings(),
        dir.path().join("mediamtx.yml"),
        launcher,
    )
    .unwrap()
}

/// Send one request through a fresh router and decode the JSON body.
pub async fn call(supervisor: &RelaySupervisor, method: Method, uri: &str) -> (StatusCode, Value) {
    let app = create_router(AxumContext::new(supervisor.clone()), &CorsConfig::AllowAll);
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}
