use bytes::BytesMut;
use local_ip_address::{local_ip, local_ipv6};
use log::{debug, error, info, trace, warn};
use media::{MediaSource, RingData, RingReader};
use sansio::Protocol;
use shared::error::Result;
use shared::{TransportContext, TransportMessage};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use crate::config::TransportConfig;
use crate::transport::WebRtcTransport;
use crate::transport::event::{InboundPacket, RTCTransportEvent};

const RECEIVE_MTU: usize = 1500;

/// How long the loop sleeps when neither ICE nor DTLS has a timer armed.
const DEFAULT_TIMEOUT_DURATION: Duration = Duration::from_secs(86400);

/// A [`WebRtcTransport`] bound to its own tokio UDP socket.
///
/// [`UdpWebRtcTransport::run`] is the transport's event loop: socket input,
/// timers and the media ring are all handled on that one task.
pub struct UdpWebRtcTransport {
    socket: UdpSocket,
    core: WebRtcTransport,
}

impl UdpWebRtcTransport {
    /// Opens the socket at the configured bind address and creates a
    /// transport forwarding the video track of `source`.
    pub async fn bind(config: TransportConfig, source: Arc<MediaSource>) -> Result<Self> {
        let socket = UdpSocket::bind(config.bind_addr()).await?;
        let bound = socket.local_addr()?;

        let ip = if bound.ip().is_unspecified() {
            detect_local_ip(bound.is_ipv6())
        } else {
            bound.ip()
        };
        let local_addr = SocketAddr::new(ip, bound.port());

        let announced = config.announced_ip().unwrap_or(ip);
        let mut core = WebRtcTransport::new(config, local_addr)?;
        core.attach(source)?;

        info!("[udp] listening on {bound}, announcing {announced}:{}", bound.port());
        Ok(Self { socket, core })
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn local_sdp(&mut self) -> Result<String> {
        self.core.local_sdp()
    }

    pub fn transport(&self) -> &WebRtcTransport {
        &self.core
    }

    pub fn transport_mut(&mut self) -> &mut WebRtcTransport {
        &mut self.core
    }

    /// Drives the transport until `shutdown` fires or its sender is dropped,
    /// then closes it.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let local_addr = self.socket.local_addr()?;
        // One spare byte tells a datagram of exactly RECEIVE_MTU from a
        // larger one the socket truncated.
        let mut buf = vec![0u8; RECEIVE_MTU + 1];
        let mut media_open = true;

        loop {
            self.flush_writes().await;
            self.drain_events();
            self.drain_reads();

            let timeout = self
                .core
                .poll_timeout()
                .unwrap_or_else(|| Instant::now() + DEFAULT_TIMEOUT_DURATION);
            let delay = timeout.saturating_duration_since(Instant::now());
            let timer = tokio::time::sleep(delay);
            tokio::pin!(timer);

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("[udp] shutting down");
                    break;
                }
                _ = timer.as_mut() => {
                    if let Err(err) = self.core.handle_timeout(Instant::now()) {
                        error!("[udp] handle_timeout: {err}");
                    }
                }
                res = self.socket.recv_from(&mut buf) => {
                    match res {
                        Ok((n, peer_addr)) if n > RECEIVE_MTU => {
                            warn!("[udp] dropping datagram from {peer_addr} larger than {RECEIVE_MTU} bytes");
                        }
                        Ok((n, peer_addr)) => {
                            trace!("[udp] received {n} bytes from {peer_addr}");
                            if let Err(err) = self.core.handle_read(TransportMessage {
                                now: Instant::now(),
                                transport: TransportContext::udp(local_addr, peer_addr),
                                message: BytesMut::from(&buf[..n]),
                            }) {
                                error!("[udp] handle_read: {err}");
                            }
                        }
                        Err(err) => warn!("[udp] recv_from: {err}"),
                    }
                }
                data = recv_media(self.core.media_reader_mut()), if media_open => {
                    match data {
                        Some(data) => {
                            if let Err(err) = self.core.write_media(&data) {
                                error!("[udp] write_media: {err}");
                            }
                        }
                        None => {
                            warn!("[udp] media source ended");
                            media_open = false;
                        }
                    }
                }
            }
        }

        if let Err(err) = self.core.close() {
            warn!("[udp] close: {err}");
        }
        self.flush_writes().await;
        self.drain_events();

        Ok(())
    }

    async fn flush_writes(&mut self) {
        while let Some(msg) = self.core.poll_write() {
            if let Err(err) = self
                .socket
                .send_to(&msg.message, msg.transport.peer_addr)
                .await
            {
                warn!(
                    "[udp] send_to {} failed: {err}",
                    msg.transport.peer_addr
                );
            }
        }
    }

    fn drain_events(&mut self) {
        while let Some(event) = self.core.poll_event() {
            match event {
                RTCTransportEvent::StateChange(state) => {
                    info!("[udp] transport is {state}");
                }
                RTCTransportEvent::IceStateChange(state) => {
                    info!("[udp] ICE is {state}");
                }
                RTCTransportEvent::SelectedTupleChange(transport) => {
                    info!("[udp] sending to {}", transport.peer_addr);
                }
                RTCTransportEvent::DtlsStateChange(state) => {
                    debug!("[udp] DTLS is {state}");
                }
            }
        }
    }

    fn drain_reads(&mut self) {
        while let Some(packet) = self.core.poll_read() {
            match packet {
                InboundPacket::Rtp { header, packet } => {
                    trace!(
                        "[udp] inbound SRTP ssrc {} from {} not decrypted",
                        header.ssrc, packet.transport.peer_addr
                    );
                }
                InboundPacket::Rtcp { header, packet } => {
                    trace!(
                        "[udp] inbound SRTCP pt {} from {} not decrypted",
                        header.packet_type, packet.transport.peer_addr
                    );
                }
            }
        }
    }
}

/// Next bundle of an active reader; never resolves without one.
async fn recv_media(reader: Option<&mut RingReader>) -> Option<RingData> {
    match reader {
        Some(reader) => reader.recv().await,
        None => std::future::pending().await,
    }
}

/// Address of the host's primary interface for the socket's family,
/// loopback if the host has none.
fn detect_local_ip(ipv6: bool) -> IpAddr {
    let (detected, loopback) = if ipv6 {
        (local_ipv6(), IpAddr::V6(Ipv6Addr::LOCALHOST))
    } else {
        (local_ip(), IpAddr::V4(Ipv4Addr::LOCALHOST))
    };

    match detected {
        Ok(ip) => ip,
        Err(err) => {
            warn!("[udp] no local interface address ({err}), announcing {loopback}");
            loopback
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::TransportConfigBuilder;
    use shared::error::Error;
    use stun::attributes::*;
    use stun::fingerprint::*;
    use stun::ice_attrs::*;
    use stun::integrity::*;
    use stun::message::*;
    use stun::textattrs::*;

    const SOURCE_SDP: &str = "v=0\r\n\
    o=- 0 0 IN IP4 127.0.0.1\r\n\
    s=Live\r\n\
    t=0 0\r\n\
    m=video 0 RTP/AVP 96\r\n\
    a=rtpmap:96 H264/90000\r\n\
    a=ssrc:1234 cname:live\r\n";

    /// Comprehension-optional attribute the server ignores, used to inflate
    /// a request.
    struct Padding(usize);

    impl Setter for Padding {
        fn add_to(&self, m: &mut Message) -> Result<()> {
            if self.0 > 0 {
                m.add(AttrType(0x8050), &vec![0u8; self.0]);
            }
            Ok(())
        }
    }

    fn loopback_config() -> TransportConfigBuilder {
        TransportConfigBuilder::new().with_bind_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
    }

    fn binding_request(ufrag: &str, pwd: &str, padding: usize) -> Result<Message> {
        let setters: Vec<Box<dyn Setter>> = vec![
            Box::new(TransactionId::new()),
            Box::new(BINDING_REQUEST),
            Box::new(TextAttribute::new(ATTR_USERNAME, format!("{ufrag}:peer"))),
            Box::new(AttrControlling(7)),
            Box::new(PriorityAttr(1853824767)),
            Box::new(Padding(padding)),
            Box::new(MessageIntegrity::new_short_term_integrity(pwd.to_owned())),
            Box::new(FINGERPRINT),
        ];
        let mut request = Message::new();
        request.build(&setters)?;
        Ok(request)
    }

    #[tokio::test]
    async fn test_bind_announces_socket_address() -> Result<()> {
        let source = Arc::new(MediaSource::new(SOURCE_SDP, 4)?);
        let mut transport = UdpWebRtcTransport::bind(loopback_config().build(), source).await?;
        let port = transport.local_addr()?.port();

        let sdp = transport.local_sdp()?;
        assert!(sdp.contains(&format!("m=video {port} RTP/SAVPF 96\r\n")));
        assert!(sdp.contains(&format!(
            "a=candidate:4 1 udp 2130706431 127.0.0.1 {port} typ host\r\n"
        )));

        Ok(())
    }

    #[tokio::test]
    async fn test_bind_with_announced_ip() -> Result<()> {
        let source = Arc::new(MediaSource::new(SOURCE_SDP, 4)?);
        let config = loopback_config()
            .with_announced_ip(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7)))
            .build();
        let mut transport = UdpWebRtcTransport::bind(config, source).await?;

        let sdp = transport.local_sdp()?;
        assert!(sdp.contains("c=IN IP4 203.0.113.7\r\n"));

        Ok(())
    }

    #[tokio::test]
    async fn test_run_answers_binding_request() -> Result<()> {
        let source = Arc::new(MediaSource::new(SOURCE_SDP, 4)?);
        let mut transport = UdpWebRtcTransport::bind(loopback_config().build(), source).await?;
        let server_addr = transport.local_addr()?;
        let ufrag = transport.transport().local_ufrag().to_owned();
        let pwd = transport.transport().local_pwd().to_owned();

        let client = UdpSocket::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).await?;
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let exchange = async {
            let request = binding_request(&ufrag, &pwd, 0)?;
            client.send_to(&request.raw, server_addr).await?;

            let mut buf = vec![0u8; RECEIVE_MTU];
            let (n, from) = tokio::time::timeout(Duration::from_secs(5), client.recv_from(&mut buf))
                .await
                .map_err(|elapsed| Error::Other(elapsed.to_string()))??;

            let mut response = Message::new();
            response.unmarshal_binary(&buf[..n])?;
            Ok::<_, Error>((response, from))
        };
        let peer = async {
            let result = exchange.await;
            let _ = shutdown_tx.send(());
            result
        };

        let (run_result, peer_result) = tokio::join!(transport.run(shutdown_rx), peer);
        run_result?;
        let (response, from) = peer_result?;

        assert_eq!(from, server_addr);
        assert_eq!(response.typ, BINDING_SUCCESS);
        assert_eq!(
            transport.transport().state(),
            crate::transport::state::RTCTransportState::Closed
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_oversized_datagram_is_dropped() -> Result<()> {
        let source = Arc::new(MediaSource::new(SOURCE_SDP, 4)?);
        let mut transport = UdpWebRtcTransport::bind(loopback_config().build(), source).await?;
        let server_addr = transport.local_addr()?;
        let ufrag = transport.transport().local_ufrag().to_owned();
        let pwd = transport.transport().local_pwd().to_owned();

        let client = UdpSocket::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).await?;
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let exchange = async {
            // valid, but beyond the receive MTU
            let oversized = binding_request(&ufrag, &pwd, RECEIVE_MTU)?;
            assert!(oversized.raw.len() > RECEIVE_MTU);
            let request = binding_request(&ufrag, &pwd, 0)?;
            client.send_to(&oversized.raw, server_addr).await?;
            client.send_to(&request.raw, server_addr).await?;

            let mut buf = vec![0u8; RECEIVE_MTU];
            let (n, _) = tokio::time::timeout(Duration::from_secs(5), client.recv_from(&mut buf))
                .await
                .map_err(|elapsed| Error::Other(elapsed.to_string()))??;

            let mut response = Message::new();
            response.unmarshal_binary(&buf[..n])?;
            Ok::<_, Error>((response, request.transaction_id))
        };
        let peer = async {
            let result = exchange.await;
            let _ = shutdown_tx.send(());
            result
        };

        let (run_result, peer_result) = tokio::join!(transport.run(shutdown_rx), peer);
        run_result?;
        let (response, transaction_id) = peer_result?;

        assert_eq!(response.typ, BINDING_SUCCESS);
        assert_eq!(
            response.transaction_id, transaction_id,
            "first answer must be for the request that fit"
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_bind_unspecified_announces_interface_address() -> Result<()> {
        let source = Arc::new(MediaSource::new(SOURCE_SDP, 4)?);
        let config = TransportConfigBuilder::new()
            .with_bind_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
            .build();
        let transport = UdpWebRtcTransport::bind(config, source).await?;

        let announced = transport.transport().local_addr();
        assert!(!announced.ip().is_unspecified());
        assert_eq!(announced.ip(), detect_local_ip(false));
        assert_eq!(announced.port(), transport.local_addr()?.port());

        Ok(())
    }
}
