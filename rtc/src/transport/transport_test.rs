use super::*;
use dtls::SrtpCryptoSuite;

const SOURCE_SDP: &str = "v=0\r\n\
o=- 0 0 IN IP4 127.0.0.1\r\n\
s=Live\r\n\
t=0 0\r\n\
m=video 0 RTP/AVP 96\r\n\
c=IN IP4 0.0.0.0\r\n\
a=rtpmap:96 H264/90000\r\n\
a=ssrc:1234 cname:live\r\n";

fn local_addr() -> SocketAddr {
    SocketAddr::from(([192, 0, 2, 1], 40000))
}

fn peer_tuple() -> TransportContext {
    TransportContext::udp(local_addr(), SocketAddr::from(([192, 0, 2, 2], 50000)))
}

fn new_transport() -> Result<WebRtcTransport> {
    WebRtcTransport::new(TransportConfig::default(), local_addr())
}

fn tagged(message: &[u8]) -> TaggedBytesMut {
    TransportMessage {
        now: Instant::now(),
        transport: peer_tuple(),
        message: BytesMut::from(message),
    }
}

fn keying_material() -> SrtpKeyingMaterial {
    SrtpKeyingMaterial {
        suite: SrtpCryptoSuite::AesCm128HmacSha1_80,
        local_key: vec![1u8; 30],
        remote_key: vec![2u8; 30],
        remote_fingerprint: Fingerprint::empty(),
    }
}

fn rtp_packet() -> BytesMut {
    let mut pkt = BytesMut::from(&[0x80, 96, 0, 1, 0, 0, 0, 1, 0, 0, 0x04, 0xd2][..]);
    pkt.extend_from_slice(&[0xaa; 20]);
    pkt
}

#[test]
fn test_new_transport_is_ice_connecting() -> Result<()> {
    let mut transport = new_transport()?;

    assert_eq!(transport.state(), RTCTransportState::IceConnecting);
    assert_eq!(transport.ice_state(), IceState::New);
    assert_eq!(transport.dtls_state(), DtlsState::Idle);
    assert_eq!(transport.selected_tuple(), None);
    assert!(!transport.has_srtp_session());
    assert_eq!(transport.local_ufrag().len(), 4);
    assert_eq!(transport.local_pwd().len(), 24);
    assert_eq!(
        transport.poll_event(),
        Some(RTCTransportEvent::StateChange(
            RTCTransportState::IceConnecting
        ))
    );
    assert_eq!(transport.poll_event(), None);
    assert_eq!(transport.poll_timeout(), None);

    Ok(())
}

#[test]
fn test_short_datagram_is_dropped() -> Result<()> {
    let mut transport = new_transport()?;

    transport.handle_read(tagged(&[0x80, 0x60][..1]))?;
    transport.handle_read(tagged(&[0x16, 0xfe]))?;
    transport.handle_read(tagged(&[]))?;

    assert!(transport.poll_write().is_none());
    assert!(transport.poll_read().is_none());
    assert_eq!(transport.state(), RTCTransportState::IceConnecting);

    Ok(())
}

#[test]
fn test_inbound_rtp_and_rtcp_are_surfaced() -> Result<()> {
    let mut transport = new_transport()?;

    transport.handle_read(tagged(&rtp_packet()))?;
    // receiver report, no report blocks
    transport.handle_read(tagged(&[0x80, 201, 0, 1, 0, 0, 0, 7]))?;
    // RTP-shaped but truncated before the SSRC
    transport.handle_read(tagged(&[0x80, 96, 0, 1, 0, 0]))?;

    match transport.poll_read() {
        Some(InboundPacket::Rtp { header, packet }) => {
            assert_eq!(header.payload_type, 96);
            assert_eq!(header.ssrc, 1234);
            assert_eq!(packet.transport, peer_tuple());
        }
        other => panic!("expected RTP, got {other:?}"),
    }
    match transport.poll_read() {
        Some(InboundPacket::Rtcp { header, .. }) => assert_eq!(header.packet_type, 201),
        other => panic!("expected RTCP, got {other:?}"),
    }
    assert!(transport.poll_read().is_none());
    assert!(transport.poll_write().is_none());

    Ok(())
}

#[test]
fn test_no_egress_without_srtp_session() -> Result<()> {
    let mut transport = new_transport()?;
    transport.handle_event(TransportEvent::IceSelectedTuple(peer_tuple()))?;

    transport.handle_write(rtp_packet())?;

    assert!(transport.poll_write().is_none());
    Ok(())
}

#[test]
fn test_dtls_connected_before_ice_is_ignored() -> Result<()> {
    let mut transport = new_transport()?;
    transport.handle_event(TransportEvent::IceSelectedTuple(peer_tuple()))?;

    transport.handle_event(TransportEvent::DtlsConnected(keying_material()))?;

    assert!(!transport.has_srtp_session());
    assert_eq!(transport.state(), RTCTransportState::IceConnecting);
    transport.handle_write(rtp_packet())?;
    assert!(transport.poll_write().is_none());

    Ok(())
}

#[test]
fn test_ice_connected_starts_passive_dtls() -> Result<()> {
    let mut transport = new_transport()?;
    transport.handle_event(TransportEvent::IceSelectedTuple(peer_tuple()))?;
    transport.handle_event(TransportEvent::IceConnected)?;

    assert_eq!(transport.state(), RTCTransportState::DtlsHandshaking);
    assert_eq!(transport.dtls_state(), DtlsState::Handshaking);
    // the passive side waits for the ClientHello
    assert!(transport.poll_write().is_none());

    // a repeated connected notification does not restart the handshake
    transport.handle_event(TransportEvent::IceConnected)?;
    assert_eq!(transport.state(), RTCTransportState::DtlsHandshaking);

    // handshake completion installs the outbound session
    transport.handle_event(TransportEvent::DtlsConnected(keying_material()))?;
    assert!(transport.has_srtp_session());
    assert_eq!(transport.srtp_overhead(), Some(10));
    assert_eq!(transport.state(), RTCTransportState::SrtpActive);

    let plain = rtp_packet();
    transport.handle_write(plain.clone())?;
    let out = transport.poll_write().expect("one encrypted packet");
    assert_eq!(out.transport, peer_tuple());
    assert_eq!(out.message.len(), plain.len() + 10);
    assert_ne!(&out.message[12..plain.len()], &plain[12..]);

    Ok(())
}

#[test]
fn test_send_without_selected_tuple_is_error() -> Result<()> {
    let mut transport = new_transport()?;

    let result = transport.handle_event(TransportEvent::DtlsSendData(BytesMut::from(
        &[0x16, 0xfe, 0xfd][..],
    )));

    assert_eq!(result, Err(Error::ErrNoSelectedTuple));
    assert!(transport.poll_write().is_none());
    Ok(())
}

#[test]
fn test_selected_tuple_follows_latest() -> Result<()> {
    let mut transport = new_transport()?;
    let first = peer_tuple();
    let second = TransportContext::udp(local_addr(), SocketAddr::from(([192, 0, 2, 3], 50001)));

    transport.handle_event(TransportEvent::IceSelectedTuple(first))?;
    transport.handle_event(TransportEvent::IceSelectedTuple(second))?;
    transport.handle_event(TransportEvent::DtlsSendData(BytesMut::from(&b"flight"[..])))?;

    assert_eq!(transport.selected_tuple(), Some(second));
    let out = transport.poll_write().expect("flight");
    assert_eq!(out.transport, second);

    Ok(())
}

#[test]
fn test_local_sdp_requires_media_source() -> Result<()> {
    let mut transport = new_transport()?;
    assert_eq!(transport.local_sdp(), Err(Error::ErrNoMediaSource));

    transport.attach(Arc::new(MediaSource::new(SOURCE_SDP, 4)?))?;
    let sdp = transport.local_sdp()?;
    assert!(sdp.contains("m=video 40000 RTP/SAVPF 96\r\n"));
    assert!(sdp.contains("a=ssrc:1234 cname:janusvideo\r\n"));
    assert!(sdp.contains(&format!("a=ice-ufrag:{}\r\n", transport.local_ufrag())));
    assert!(sdp.contains("a=candidate:4 1 udp 2130706431 192.0.2.1 40000 typ host\r\n"));

    Ok(())
}

#[test]
fn test_local_sdp_resets_remote_fingerprint() -> Result<()> {
    let mut transport = new_transport()?;
    transport.attach(Arc::new(MediaSource::new(SOURCE_SDP, 4)?))?;
    transport.set_remote_fingerprint(Fingerprint::of_der(
        FingerprintAlgorithm::Sha256,
        b"previous session",
    ))?;

    transport.local_sdp()?;

    let dtls = transport.dtls.as_ref().expect("dtls engine");
    assert!(dtls.remote_fingerprint().is_empty());
    Ok(())
}

#[test]
fn test_announced_ip_replaces_local_ip() -> Result<()> {
    let config = crate::config::TransportConfigBuilder::new()
        .with_announced_ip("203.0.113.7".parse()?)
        .build();
    let mut transport = WebRtcTransport::new(config, local_addr())?;
    transport.attach(Arc::new(MediaSource::new(SOURCE_SDP, 4)?))?;

    let sdp = transport.local_sdp()?;
    assert!(sdp.contains("c=IN IP4 203.0.113.7\r\n"));
    assert!(sdp.contains("a=candidate:4 1 udp 2130706431 203.0.113.7 40000 typ host\r\n"));
    assert!(!sdp.contains("192.0.2.1"));

    Ok(())
}

#[test]
fn test_close_ignores_later_input() -> Result<()> {
    let mut transport = new_transport()?;
    transport.attach(Arc::new(MediaSource::new(SOURCE_SDP, 4)?))?;
    transport.handle_event(TransportEvent::IceSelectedTuple(peer_tuple()))?;
    transport.handle_event(TransportEvent::IceConnected)?;
    transport.handle_event(TransportEvent::DtlsConnected(keying_material()))?;
    assert!(transport.is_media_active());

    transport.close()?;
    assert_eq!(transport.state(), RTCTransportState::Closed);
    assert!(!transport.has_srtp_session());
    assert!(!transport.is_media_active());
    assert!(transport.media_reader_mut().is_none());
    while transport.poll_write().is_some() {}

    transport.handle_read(tagged(&rtp_packet()))?;
    transport.handle_write(rtp_packet())?;
    transport.handle_event(TransportEvent::IceConnected)?;
    transport.handle_timeout(Instant::now())?;

    assert!(transport.poll_write().is_none());
    assert!(transport.poll_read().is_none());
    assert_eq!(transport.state(), RTCTransportState::Closed);
    assert_eq!(transport.local_sdp(), Err(Error::ErrTransportClosed));
    assert!(transport.attach(Arc::new(MediaSource::new(SOURCE_SDP, 4)?)).is_err());

    // closing twice is harmless
    transport.close()?;
    Ok(())
}

/// Drains a component through nothing but the `sansio::Protocol` interface.
fn drain_writes<Rin, Win, Ein, P>(protocol: &mut P) -> Vec<P::Wout>
where
    P: Protocol<Rin, Win, Ein>,
{
    let mut writes = vec![];
    while let Some(out) = protocol.poll_write() {
        writes.push(out);
    }
    writes
}

#[test]
fn test_driven_through_sansio_protocol() -> Result<()> {
    let mut transport = new_transport()?;
    transport.handle_event(TransportEvent::IceSelectedTuple(peer_tuple()))?;
    transport.handle_event(TransportEvent::DtlsSendData(BytesMut::from(&b"flight"[..])))?;

    let writes = drain_writes(&mut transport);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].transport, peer_tuple());
    assert_eq!(&writes[0].message[..], b"flight");

    let mut ice = IceServer::new(ice::ServerConfig::default());
    assert!(drain_writes(&mut ice).is_empty());
    let mut dtls = DtlsTransport::new(dtls::DtlsConfig::default())?;
    dtls.run(DtlsRole::Client)?;
    assert!(!drain_writes(&mut dtls).is_empty(), "ClientHello expected");

    Ok(())
}
