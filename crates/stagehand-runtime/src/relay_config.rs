//! Generation of the MediaMTX configuration file.
//!
//! Only the listeners the dashboard needs are enabled: RTMP ingest,
//! WebRTC and low-latency HLS playback, and the control API on loopback.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use stagehand_core::{RelayError, RelayProcessConfig};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MediaMtxConfig {
    log_level: &'static str,
    log_destinations: Vec<&'static str>,

    api: bool,
    api_address: String,

    rtsp: bool,
    srt: bool,

    rtmp: bool,
    rtmp_address: String,

    hls: bool,
    hls_address: String,
    hls_allow_origin: &'static str,
    hls_variant: &'static str,
    hls_segment_count: u32,
    hls_segment_duration: &'static str,
    hls_part_duration: &'static str,

    webrtc: bool,
    webrtc_address: String,
    webrtc_allow_origin: &'static str,

    paths: BTreeMap<&'static str, BTreeMap<String, String>>,
}

impl MediaMtxConfig {
    fn from_config(config: &RelayProcessConfig) -> Self {
        let mut paths = BTreeMap::new();
        // Accept publishing on any path name
        paths.insert("all_others", BTreeMap::new());

        Self {
            log_level: "info",
            log_destinations: vec!["stdout"],
            api: true,
            api_address: format!("127.0.0.1:{}", config.api_port),
            rtsp: false,
            srt: false,
            rtmp: true,
            rtmp_address: format!(":{}", config.rtmp_port),
            hls: true,
            hls_address: format!(":{}", config.hls_port),
            hls_allow_origin: "*",
            hls_variant: "lowLatency",
            hls_segment_count: 7,
            hls_segment_duration: "1s",
            hls_part_duration: "200ms",
            webrtc: true,
            webrtc_address: format!(":{}", config.webrtc_port),
            webrtc_allow_origin: "*",
            paths,
        }
    }
}

/// Render the relay configuration as YAML.
pub fn render_relay_config(config: &RelayProcessConfig) -> Result<String, RelayError> {
    serde_yaml::to_string(&MediaMtxConfig::from_config(config))
        .map_err(|e| RelayError::Internal(format!("Failed to render relay config: {e}")))
}

/// Render and write the relay configuration, creating parent directories.
pub async fn write_relay_config(config: &RelayProcessConfig, path: &Path) -> Result<(), RelayError> {
    let rendered = render_relay_config(config)?;
    let write_err = |e: std::io::Error| RelayError::ConfigWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    tokio::fs::write(path, rendered).await.map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_uses_configured_ports() {
        let config = RelayProcessConfig {
            rtmp_port: 11935,
            webrtc_port: 18889,
            hls_port: 18888,
            api_port: 19997,
            ..RelayProcessConfig::default()
        };
        let yaml = render_relay_config(&config).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed["apiAddress"].as_str(), Some("127.0.0.1:19997"));
        assert_eq!(parsed["rtmpAddress"].as_str(), Some(":11935"));
        assert_eq!(parsed["hlsAddress"].as_str(), Some(":18888"));
        assert_eq!(parsed["webrtcAddress"].as_str(), Some(":18889"));
        assert_eq!(parsed["api"].as_bool(), Some(true));
        assert_eq!(parsed["rtsp"].as_bool(), Some(false));
        assert_eq!(parsed["hlsVariant"].as_str(), Some("lowLatency"));
        assert!(parsed["paths"]["all_others"].is_mapping());
    }

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mediamtx.yml");

        write_relay_config(&RelayProcessConfig::default(), &path)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&written).unwrap();
        assert_eq!(parsed["rtmpAddress"].as_str(), Some(":1935"));
    }
}
