//! Axum server bootstrap - the composition root.
//!
//! The only place where the relay supervisor is wired up for the web
//! adapter.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use stagehand_core::{RelayProcessConfig, relay_config_file, validate_relay_config};
use stagehand_runtime::{RelaySupervisor, SupervisorSettings, resolve_relay_binary};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins (production mode).
    AllowOrigins(Vec<String>),
}

/// Server configuration for the Axum adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    pub bind: SocketAddr,
    /// Relay ports and addressing.
    pub relay: RelayProcessConfig,
    /// Supervisor timings.
    pub settings: SupervisorSettings,
    /// Explicit relay binary; resolved from the environment when `None`.
    pub relay_binary: Option<PathBuf>,
    /// Where the generated relay configuration is written; defaults to
    /// the data root.
    pub relay_config_file: Option<PathBuf>,
    /// CORS configuration.
    pub cors: CorsConfig,
    /// Start the relay as soon as the server is up.
    pub autostart: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            relay: RelayProcessConfig::default(),
            settings: SupervisorSettings::default(),
            relay_binary: None,
            relay_config_file: None,
            cors: CorsConfig::default(),
            autostart: false,
        }
    }
}

impl ServerConfig {
    /// Set CORS to allow specific origins.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }
}

/// Application context for the Axum adapter.
pub struct AxumContext {
    pub supervisor: RelaySupervisor,
}

impl AxumContext {
    pub const fn new(supervisor: RelaySupervisor) -> Self {
        Self { supervisor }
    }
}

/// Build the relay supervisor from `config`.
///
/// A missing binary is not an error here: the supervisor is created
/// anyway and reports `enabled: false` until one is installed.
pub fn bootstrap(config: &ServerConfig) -> Result<AxumContext> {
    validate_relay_config(&config.relay).context("Invalid relay configuration")?;

    let binary = match resolve_relay_binary(config.relay_binary.as_deref()) {
        Ok(path) => path,
        Err(e) => {
            warn!(error = %e, "MediaMTX binary unavailable; relay start will be refused");
            match e.path() {
                Some(path) => path.to_path_buf(),
                None => PathBuf::from("mediamtx"),
            }
        }
    };

    let config_file = match &config.relay_config_file {
        Some(path) => path.clone(),
        None => relay_config_file()?,
    };

    info!(
        target: "stagehand.paths",
        relay_binary = %binary.display(),
        relay_config = %config_file.display(),
        api_port = config.relay.api_port,
        "Axum bootstrap resolved paths"
    );

    let supervisor = RelaySupervisor::with_binary(
        config.relay.clone(),
        config.settings.clone(),
        binary,
        config_file,
    )?;
    Ok(AxumContext::new(supervisor))
}

/// Resolve on Ctrl-C (and SIGTERM on unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Run the web server until Ctrl-C, then stop the relay.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let ctx = bootstrap(&config)?;
    let supervisor = ctx.supervisor.clone();

    if config.autostart {
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            if let Err(e) = supervisor.start().await {
                warn!(error = %e, "Relay autostart failed");
            }
        });
    }

    let app = crate::routes::create_router(ctx, &config.cors);
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("stagehand web server listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    supervisor.shutdown().await;
    Ok(())
}
