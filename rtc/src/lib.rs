#![warn(rust_2018_idioms)]

//! WebRTC edge transport.
//!
//! A [`WebRtcTransport`](transport::WebRtcTransport) terminates one browser
//! peer on one UDP socket: it answers ICE-lite connectivity checks, runs the
//! passive side of the DTLS handshake once ICE is connected, installs an
//! outbound SRTP session from the exported keys and then forwards the video
//! track of a [`MediaSource`](media::MediaSource) to the peer, encrypted.
//!
//! The core is sans-IO and implements [`sansio::Protocol`]; the
//! [`udp`] module binds it to a tokio socket.

pub mod classifier;
pub mod config;
pub mod sdp;
pub mod transport;
pub mod udp;

pub use classifier::{PacketKind, classify};
pub use config::{TransportConfig, TransportConfigBuilder};
pub use sdp::SdpAnswer;
pub use transport::event::{InboundPacket, RTCTransportEvent, TransportEvent};
pub use transport::state::RTCTransportState;
pub use transport::WebRtcTransport;
pub use udp::UdpWebRtcTransport;
