//! Low-latency playback over WebRTC with WHEP signaling.
//!
//! Gathering is full, not trickle: the offer is sent once every local
//! candidate is in it.

mod whep;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stagehand_core::TransportKind;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;

pub use whep::{WhepAnswer, WhepClient};

use crate::config::NegotiatorConfig;
use crate::error::TransportError;
use crate::sink::{MediaKind, MediaSink};
use crate::transport::{ActiveTransport, LinkState, OpenRequest, PlaybackStrategy, TransportEvents};

/// Opens receive-only peer connections against a WHEP endpoint.
pub struct WebRtcStrategy {
    sink: Arc<dyn MediaSink>,
    whep: WhepClient,
    ice_timeout: Duration,
    ice_servers: Vec<String>,
}

impl WebRtcStrategy {
    pub fn new(sink: Arc<dyn MediaSink>, config: &NegotiatorConfig) -> Result<Self, TransportError> {
        Ok(Self {
            sink,
            whep: WhepClient::new(config.signaling_timeout)?,
            ice_timeout: config.ice_timeout,
            ice_servers: config.ice_servers.clone(),
        })
    }

    async fn build_peer_connection(&self) -> Result<Arc<RTCPeerConnection>, TransportError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers = if self.ice_servers.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                ..Default::default()
            }]
        };

        let pc = api
            .new_peer_connection(RTCConfiguration {
                ice_servers,
                ..Default::default()
            })
            .await?;
        Ok(Arc::new(pc))
    }

    /// Everything after the peer connection exists. On error the caller
    /// closes `pc`; `session_url` is filled in once signaling succeeded.
    async fn negotiate(
        &self,
        pc: &Arc<RTCPeerConnection>,
        request: &OpenRequest,
        events: &TransportEvents,
        session_url: &mut Option<String>,
    ) -> Result<(), TransportError> {
        let recv_only = || {
            Some(RTCRtpTransceiverInit {
                direction: RTCRtpTransceiverDirection::Recvonly,
                send_encodings: vec![],
            })
        };
        pc.add_transceiver_from_kind(RTPCodecType::Audio, recv_only())
            .await?;
        if request.mode.wants_video() {
            pc.add_transceiver_from_kind(RTPCodecType::Video, recv_only())
                .await?;
        }

        let (state_tx, mut state_rx) = watch::channel(RTCPeerConnectionState::New);
        let link_events = events.clone();
        pc.on_peer_connection_state_change(Box::new(move |state| {
            debug!(generation = link_events.generation(), %state, "Peer connection state changed");
            let _ = state_tx.send(state);
            match state {
                RTCPeerConnectionState::Connected => link_events.report(LinkState::Connected),
                RTCPeerConnectionState::Disconnected
                | RTCPeerConnectionState::Failed
                | RTCPeerConnectionState::Closed => {
                    link_events.report(LinkState::Lost(format!("peer connection {state}")));
                }
                _ => {}
            }
            Box::pin(async {})
        }));

        let sink = self.sink.clone();
        let wants_video = request.mode.wants_video();
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let kind = match track.kind() {
                RTPCodecType::Audio => Some(MediaKind::Audio),
                RTPCodecType::Video if wants_video => Some(MediaKind::Video),
                _ => None,
            };
            match kind {
                Some(kind) => {
                    debug!(?kind, codec = %track.codec().capability.mime_type, "Track received");
                    sink.attach_track(kind, track);
                }
                None => debug!(kind = ?track.kind(), "Ignoring track not requested by this session"),
            }
            Box::pin(async {})
        }));

        let offer = events.guard(pc.create_offer(None)).await??;
        let mut gather_complete = pc.gathering_complete_promise().await;
        events.guard(pc.set_local_description(offer)).await??;

        if events
            .guard(timeout(self.ice_timeout, gather_complete.recv()))
            .await?
            .is_err()
        {
            return Err(TransportError::Ice("ICE gathering timed out".to_string()));
        }

        let local = pc
            .local_description()
            .await
            .ok_or_else(|| TransportError::Ice("no local description after gathering".to_string()))?;

        let answer = events
            .guard(self.whep.exchange(&request.webrtc_url, &local.sdp))
            .await??;
        session_url.clone_from(&answer.session_url);

        let remote = RTCSessionDescription::answer(answer.sdp)
            .map_err(|e| TransportError::Signaling(format!("malformed answer: {e}")))?;
        events
            .guard(pc.set_remote_description(remote))
            .await?
            .map_err(|e| TransportError::Signaling(format!("answer rejected: {e}")))?;

        let settled = events
            .guard(timeout(
                self.ice_timeout,
                state_rx.wait_for(|state| {
                    matches!(
                        state,
                        RTCPeerConnectionState::Connected
                            | RTCPeerConnectionState::Failed
                            | RTCPeerConnectionState::Closed
                    )
                }),
            ))
            .await?;

        match settled {
            Err(_) => Err(TransportError::Ice("ICE connection timed out".to_string())),
            Ok(Err(_)) => Err(TransportError::PeerConnection(
                "peer connection dropped during negotiation".to_string(),
            )),
            Ok(Ok(state)) => {
                let state = *state;
                if state == RTCPeerConnectionState::Connected {
                    Ok(())
                } else {
                    Err(TransportError::Ice(format!("peer connection {state}")))
                }
            }
        }
    }
}

#[async_trait]
impl PlaybackStrategy for WebRtcStrategy {
    fn kind(&self) -> TransportKind {
        TransportKind::Webrtc
    }

    async fn open(
        &self,
        request: &OpenRequest,
        events: TransportEvents,
    ) -> Result<Box<dyn ActiveTransport>, TransportError> {
        let pc = self.build_peer_connection().await?;
        let mut session_url = None;

        match self.negotiate(&pc, request, &events, &mut session_url).await {
            Ok(()) => Ok(Box::new(WebRtcTransport {
                pc,
                whep: self.whep.clone(),
                session_url,
                closed: false,
            })),
            Err(e) => {
                debug!(error = %e, "WebRTC attempt failed, tearing down peer connection");
                let mut partial = WebRtcTransport {
                    pc,
                    whep: self.whep.clone(),
                    session_url,
                    closed: false,
                };
                partial.close().await;
                Err(e)
            }
        }
    }
}

/// Live WebRTC playback.
struct WebRtcTransport {
    pc: Arc<RTCPeerConnection>,
    whep: WhepClient,
    session_url: Option<String>,
    closed: bool,
}

#[async_trait]
impl ActiveTransport for WebRtcTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Webrtc
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        // A deliberate close is not a lost link; the same generation may
        // already be playing over a fallback transport.
        self.pc
            .on_peer_connection_state_change(Box::new(|_| Box::pin(async {})));
        if let Err(e) = self.pc.close().await {
            warn!(error = %e, "Failed to close peer connection");
        }
        if let Some(url) = self.session_url.take() {
            self.whep.delete_session(&url).await;
        }
    }
}
