//! `relay status`: what the local relay reports right now.

use anyhow::Result;
use stagehand_core::PathList;
use stagehand_runtime::{RelayApiClient, SupervisorSettings, resolve_relay_binary};

use crate::commands::RelayArgs;

fn print_paths(paths: &PathList) {
    if paths.items.is_empty() {
        println!("  (no publish paths)");
        return;
    }
    for path in &paths.items {
        let tracks: Vec<&str> = path.tracks.iter().map(|t| t.codec.as_str()).collect();
        println!(
            "  {:<16} {:<5} readers={:<3} rx={}B tracks=[{}]",
            path.name,
            if path.is_live() { "live" } else { "idle" },
            path.reader_count,
            path.bytes_received,
            tracks.join(", ")
        );
    }
}

pub async fn status(args: RelayArgs) -> Result<()> {
    let config = args.to_config();

    match resolve_relay_binary(args.mediamtx.as_deref()) {
        Ok(path) => println!("Binary:      {}", path.display()),
        Err(e) => println!("Binary:      unavailable ({e})"),
    }
    println!("RTMP ingest: {}", config.rtmp_ingest_url());
    println!("WebRTC:      {}", config.webrtc_playback_url());
    println!("HLS:         {}", config.hls_playback_url());

    let api = RelayApiClient::new(config.api_base_url(), SupervisorSettings::default().api_timeout)?;
    match api.list_paths().await {
        Ok(paths) => {
            println!("Control API: reachable at {}", api.base_url());
            println!("Stream:      {}", if paths.any_live() { "active" } else { "idle" });
            print_paths(&paths);
        }
        Err(e) => {
            println!("Control API: {e}");
            println!("Stream:      unknown");
        }
    }
    Ok(())
}
