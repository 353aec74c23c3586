//! Shared fakes for supervisor integration tests.
//!
//! `FakeControlApi` serves the two MediaMTX endpoints the supervisor uses;
//! `FakeLauncher` hands out in-memory processes and counts how many are
//! alive at once.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use serde_json::{Value, json};
use stagehand_core::{RelayError, RelayProcessConfig};
use stagehand_runtime::{RelayLauncher, RelayLogBuffer, RelayProcess, SupervisorSettings};

#[derive(Clone)]
struct ApiState {
    healthy: Arc<AtomicBool>,
    paths: Arc<Mutex<Value>>,
}

/// In-process stand-in for the relay control API.
pub struct FakeControlApi {
    pub port: u16,
    healthy: Arc<AtomicBool>,
    paths: Arc<Mutex<Value>>,
}

impl FakeControlApi {
    pub async fn spawn() -> Self {
        let state = ApiState {
            healthy: Arc::new(AtomicBool::new(true)),
            paths: Arc::new(Mutex::new(json!({"itemCount": 0, "pageCount": 0, "items": []}))),
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
            paths: state.paths,
        }
    }

    /// Make every endpoint answer 500 (or recover).
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_paths(&self, paths: Value) {
        *self.paths.lock().unwrap() = paths;
    }

    /// One ready path named `live` with video and audio.
    pub fn publish_live(&self) {
        self.set_paths(json!({
            "itemCount": 1,
            "pageCount": 1,
            "items": [{
                "name": "live",
                "ready": true,
                "tracks": ["H264", "Opus"],
                "readers": [],
                "bytesReceived": 4096,
                "bytesSent": 0
            }]
        }));
    }
}

async fn global_config(State(state): State<ApiState>) -> Result<Json<Value>, StatusCode> {
    if state.healthy.load(Ordering::SeqCst) {
        Ok(Json(json!({"logLevel": "info", "api": true})))
    } else {
        Err(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

async fn list_paths(State(state): State<ApiState>) -> Result<Json<Value>, StatusCode> {
    if state.healthy.load(Ordering::SeqCst) {
        Ok(Json(state.paths.lock().unwrap().clone()))
    } else {
        Err(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// A port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Relay config whose control API lives on `api_port`.
pub fn config_with_api_port(api_port: u16) -> RelayProcessConfig {
    RelayProcessConfig {
        api_port,
        ..RelayProcessConfig::default()
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

#[derive(Default)]
struct Counters {
    launches: AtomicUsize,
    alive: AtomicUsize,
    max_alive: AtomicUsize,
}

/// How launched fake processes behave.
#[derive(Clone, Copy, Default)]
pub struct FakeBehavior {
    pub unavailable: bool,
    pub fail_spawn: bool,
    pub exit_on_start: bool,
    pub fail_terminate: bool,
    pub spawn_delay: Duration,
    pub stop_delay: Duration,
}

/// In-memory launcher.
pub struct FakeLauncher {
    behavior: Mutex<FakeBehavior>,
    counters: Arc<Counters>,
    last_exit: Mutex<Option<Arc<AtomicBool>>>,
}

impl FakeLauncher {
    pub fn new(behavior: FakeBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            counters: Arc::new(Counters::default()),
            last_exit: Mutex::new(None),
        })
    }

    pub fn set_behavior(&self, behavior: FakeBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn launches(&self) -> usize {
        self.counters.launches.load(Ordering::SeqCst)
    }

    pub fn alive(&self) -> usize {
        self.counters.alive.load(Ordering::SeqCst)
    }

    pub fn max_alive(&self) -> usize {
        self.counters.max_alive.load(Ordering::SeqCst)
    }

    /// Simulate the most recently launched process dying on its own.
    pub fn kill_last(&self) {
        if let Some(exited) = self.last_exit.lock().unwrap().as_ref() {
            exited.store(true, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl RelayLauncher for FakeLauncher {
    fn binary_path(&self) -> &Path {
        Path::new("/fake/mediamtx")
    }

    fn is_available(&self) -> bool {
        !self.behavior.lock().unwrap().unavailable
    }

    async fn launch(
        &self,
        config_file: &Path,
        logs: Arc<RelayLogBuffer>,
    ) -> Result<Box<dyn RelayProcess>, RelayError> {
        let behavior = *self.behavior.lock().unwrap();
        tokio::time::sleep(behavior.spawn_delay).await;

        if behavior.fail_spawn {
            return Err(RelayError::SpawnFailed("No such file or directory".to_string()));
        }
        assert!(config_file.exists(), "config must be written before launch");

        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        let alive = self.counters.alive.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_alive.fetch_max(alive, Ordering::SeqCst);

        logs.push("stdout", "INF MediaMTX v1.9.0");

        let exited = Arc::new(AtomicBool::new(behavior.exit_on_start));
        *self.last_exit.lock().unwrap() = Some(exited.clone());

        Ok(Box::new(FakeProcess {
            counters: self.counters.clone(),
            exited,
            reaped: false,
            fail_terminate: behavior.fail_terminate,
            stop_delay: behavior.stop_delay,
            config_file: config_file.to_path_buf(),
        }))
    }
}

struct FakeProcess {
    counters: Arc<Counters>,
    exited: Arc<AtomicBool>,
    reaped: bool,
    fail_terminate: bool,
    stop_delay: Duration,
    config_file: PathBuf,
}

impl FakeProcess {
    fn reap(&mut self) {
        if !self.reaped {
            self.reaped = true;
            self.counters.alive.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl RelayProcess for FakeProcess {
    fn pid(&self) -> Option<u32> {
        None
    }

    fn try_exit(&mut self) -> Option<String> {
        if self.exited.load(Ordering::SeqCst) {
            self.reap();
            Some("exit status: 1".to_string())
        } else {
            None
        }
    }

    async fn terminate(&mut self, _grace: Duration) -> std::io::Result<()> {
        tokio::time::sleep(self.stop_delay).await;
        if self.fail_terminate {
            return Err(std::io::Error::other(format!(
                "cannot signal relay for {}",
                self.config_file.display()
            )));
        }
        self.exited.store(true, Ordering::SeqCst);
        self.reap();
        Ok(())
    }
}
