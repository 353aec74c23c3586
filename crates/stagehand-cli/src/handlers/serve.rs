//! Serve command handler.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use stagehand_axum::{CorsConfig, ServerConfig, start_server};
use stagehand_runtime::SupervisorSettings;

use crate::commands::ServeArgs;

pub fn server_config(args: &ServeArgs) -> ServerConfig {
    let cors = if args.allowed_origins.is_empty() {
        CorsConfig::AllowAll
    } else {
        CorsConfig::AllowOrigins(args.allowed_origins.clone())
    };

    ServerConfig {
        bind: SocketAddr::new(args.bind, args.port),
        relay: args.relay.to_config(),
        settings: SupervisorSettings {
            readiness_timeout: Duration::from_secs(args.readiness_timeout),
            ..SupervisorSettings::default()
        },
        relay_binary: args.relay.mediamtx.clone(),
        relay_config_file: None,
        cors,
        autostart: args.autostart,
    }
}

/// Run the web server until Ctrl-C; the relay is stopped before returning.
pub async fn execute(args: ServeArgs) -> Result<()> {
    start_server(server_config(&args)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use crate::commands::Commands;
    use clap::Parser;

    #[test]
    fn test_server_config_from_args() {
        let cli = Cli::parse_from([
            "stagehand",
            "serve",
            "--port",
            "9090",
            "--allowed-origin",
            "http://dash.local",
            "--readiness-timeout",
            "3",
        ]);
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };

        let config = server_config(&args);
        assert_eq!(config.bind.port(), 9090);
        assert_eq!(config.settings.readiness_timeout, Duration::from_secs(3));
        assert!(matches!(config.cors, CorsConfig::AllowOrigins(ref o) if o.len() == 1));
    }
}
