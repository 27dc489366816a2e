#[cfg(test)]
mod transport_test;

pub(crate) mod binding;
pub mod event;
pub mod state;

use bytes::BytesMut;
use dtls::{
    DtlsEvent, DtlsRole, DtlsState, DtlsTransport, Fingerprint, FingerprintAlgorithm,
    SrtpKeyingMaterial,
};
use ice::{IceServer, IceState};
use log::{debug, error, info, trace, warn};
use media::{MediaSource, RingData, RingReader, TrackType};
use rtp::{RtcpHeader, RtpHeader};
use shared::error::{Error, Result, flatten_errs};
use sansio::Protocol;
use shared::{TaggedBytesMut, TransportContext, TransportMessage};
use srtp::ProtectionProfile;
use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use crate::classifier::{PacketKind, classify};
use crate::config::TransportConfig;
use crate::sdp::SdpAnswer;
use binding::MediaTrackBinding;
use event::{InboundPacket, RTCTransportEvent, TransportEvent};
use state::RTCTransportState;

/// One peer's WebRTC session over one UDP socket.
///
/// Every inbound datagram goes through [`Protocol::handle_read`], which
/// classifies it and routes it to the ICE-lite server, the DTLS engine or the
/// RTP/RTCP path. Neither component calls back into the transport: their
/// outputs are drained after each input and dispatched through
/// [`Protocol::handle_event`]. Datagrams to send come out of
/// [`Protocol::poll_write`], already addressed.
///
/// Plain RTP handed to [`Protocol::handle_write`] is encrypted with the
/// outbound SRTP session and sent to the selected tuple. Until DTLS has
/// completed there is no session and such packets are dropped.
pub struct WebRtcTransport {
    local_addr: SocketAddr,
    announced_ip: Option<IpAddr>,
    state: RTCTransportState,

    ice: Option<IceServer>,
    ice_state: IceState,
    dtls: Option<DtlsTransport>,
    dtls_state: DtlsState,
    srtp: Option<srtp::Context>,
    media: Option<MediaTrackBinding>,
    selected_tuple: Option<TransportContext>,

    reads: VecDeque<InboundPacket>,
    writes: VecDeque<TaggedBytesMut>,
    events: VecDeque<RTCTransportEvent>,
}

impl WebRtcTransport {
    /// Creates a transport reachable at `local_addr`, the address and port
    /// announced in the host candidate unless the config overrides the IP.
    pub fn new(config: TransportConfig, local_addr: SocketAddr) -> Result<Self> {
        let ice = IceServer::new(config.ice);
        let dtls = DtlsTransport::new(config.dtls)?;

        let mut transport = Self {
            local_addr,
            announced_ip: config.announced_ip,
            state: RTCTransportState::Idle,

            ice_state: ice.state(),
            ice: Some(ice),
            dtls_state: dtls.state(),
            dtls: Some(dtls),
            srtp: None,
            media: None,
            selected_tuple: None,

            reads: VecDeque::new(),
            writes: VecDeque::new(),
            events: VecDeque::new(),
        };
        transport.state_change(RTCTransportState::IceConnecting);

        Ok(transport)
    }

    /// Binds the video track of `source`. Once SRTP is active the ring
    /// reader is attached right away, otherwise when DTLS completes.
    pub fn attach(&mut self, source: Arc<MediaSource>) -> Result<()> {
        if self.state == RTCTransportState::Closed {
            return Err(Error::ErrTransportClosed);
        }

        let mut binding = MediaTrackBinding::new(source)?;
        if self.state == RTCTransportState::SrtpActive {
            binding.activate();
        }
        self.media = Some(binding);

        Ok(())
    }

    /// Forwards the video packets of one ring bundle through the SRTP gate.
    pub fn write_media(&mut self, data: &RingData) -> Result<()> {
        for packet in data.iter() {
            if packet.track_type != TrackType::Video {
                trace!("[webrtc] skipping {} packet", packet.track_type);
                continue;
            }
            self.handle_write(BytesMut::from(packet.rtp()))?;
        }
        Ok(())
    }

    /// Renders the local SDP answer.
    ///
    /// Resets the expected remote DTLS fingerprint to the empty placeholder
    /// first, so the remote description applied afterwards starts clean.
    pub fn local_sdp(&mut self) -> Result<String> {
        let dtls = self.dtls.as_mut().ok_or(Error::ErrTransportClosed)?;
        dtls.set_remote_fingerprint(Fingerprint::empty());
        let fingerprint = dtls
            .get_local_fingerprints()
            .into_iter()
            .find(|fingerprint| fingerprint.algorithm == FingerprintAlgorithm::Sha256)
            .ok_or(Error::ErrInvalidFingerprint)?;

        let ice = self.ice.as_ref().ok_or(Error::ErrTransportClosed)?;
        let media = self.media.as_ref().ok_or(Error::ErrNoMediaSource)?;

        SdpAnswer {
            ip: self.announced_ip.unwrap_or(self.local_addr.ip()),
            port: self.local_addr.port(),
            payload_type: media.payload_type,
            ssrc: media.ssrc(),
            ice_ufrag: ice.local_ufrag().to_owned(),
            ice_pwd: ice.local_pwd().to_owned(),
            fingerprint,
        }
        .render()
    }

    /// Sets the fingerprint the peer's DTLS certificate must match, as taken
    /// from its `a=fingerprint` attribute.
    pub fn set_remote_fingerprint(&mut self, fingerprint: Fingerprint) -> Result<()> {
        let dtls = self.dtls.as_mut().ok_or(Error::ErrTransportClosed)?;
        dtls.set_remote_fingerprint(fingerprint);
        Ok(())
    }

    pub fn state(&self) -> RTCTransportState {
        self.state
    }

    pub fn ice_state(&self) -> IceState {
        self.ice_state
    }

    pub fn dtls_state(&self) -> DtlsState {
        self.dtls_state
    }

    /// The tuple all egress currently goes to.
    pub fn selected_tuple(&self) -> Option<TransportContext> {
        self.selected_tuple
    }

    pub fn has_srtp_session(&self) -> bool {
        self.srtp.is_some()
    }

    /// Bytes the SRTP session adds to every RTP packet.
    pub fn srtp_overhead(&self) -> Option<usize> {
        self.srtp.as_ref().map(|srtp| srtp.rtp_overhead())
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn local_ufrag(&self) -> &str {
        self.ice
            .as_ref()
            .map(|ice| ice.local_ufrag())
            .unwrap_or_default()
    }

    pub fn local_pwd(&self) -> &str {
        self.ice
            .as_ref()
            .map(|ice| ice.local_pwd())
            .unwrap_or_default()
    }

    pub fn local_fingerprint(&self) -> Option<Fingerprint> {
        self.dtls
            .as_ref()
            .map(|dtls| dtls.certificate().fingerprint())
    }

    /// The ring subscription, once media is active.
    pub fn media_reader_mut(&mut self) -> Option<&mut RingReader> {
        self.media.as_mut().and_then(|media| media.reader.as_mut())
    }

    pub fn is_media_active(&self) -> bool {
        self.media.as_ref().is_some_and(|media| media.is_active())
    }

    fn state_change(&mut self, state: RTCTransportState) {
        if self.state == state {
            return;
        }
        info!("[webrtc] state changed {} -> {}", self.state, state);
        self.state = state;
        self.events.push_back(RTCTransportEvent::StateChange(state));
    }

    fn send_to_selected(&mut self, message: BytesMut) -> Result<()> {
        let Some(transport) = self.selected_tuple else {
            error!(
                "[webrtc] {} bytes to send but no tuple is selected",
                message.len()
            );
            return Err(Error::ErrNoSelectedTuple);
        };

        self.writes.push_back(TransportMessage {
            now: Instant::now(),
            transport,
            message,
        });
        Ok(())
    }

    /// Routes whatever the ICE server produced: responses go out as they
    /// are, lifecycle events through `handle_event`.
    fn drain_ice(&mut self) -> Result<()> {
        let Some(ice) = self.ice.as_mut() else {
            return Ok(());
        };

        let mut events = vec![];
        while let Some(transmit) = ice.poll_write() {
            self.writes.push_back(transmit);
        }
        while let Some(event) = ice.poll_event() {
            events.push(TransportEvent::from(event));
        }

        let ice_state = ice.state();
        if self.ice_state != ice_state {
            self.ice_state = ice_state;
            self.events
                .push_back(RTCTransportEvent::IceStateChange(ice_state));
        }

        self.dispatch(events)
    }

    /// Routes whatever the DTLS engine produced: flights as `DtlsSendData`,
    /// completion as `DtlsConnected`.
    fn drain_dtls(&mut self) -> Result<()> {
        let Some(dtls) = self.dtls.as_mut() else {
            return Ok(());
        };

        let mut events = vec![];
        while let Some(flight) = dtls.poll_write() {
            events.push(TransportEvent::DtlsSendData(flight));
        }
        while let Some(event) = dtls.poll_event() {
            match event {
                DtlsEvent::StateChange(dtls_state) => {
                    self.dtls_state = dtls_state;
                    self.events
                        .push_back(RTCTransportEvent::DtlsStateChange(dtls_state));
                }
                DtlsEvent::Connected(material) => {
                    events.push(TransportEvent::DtlsConnected(material));
                }
            }
        }
        // Application data is not expected on a media-only association.
        while let Some(data) = dtls.poll_read() {
            debug!("[webrtc] dropping {} bytes of DTLS application data", data.len());
        }

        self.dispatch(events)
    }

    /// Handles every event, returning the first error.
    fn dispatch(&mut self, events: Vec<TransportEvent>) -> Result<()> {
        let mut result = Ok(());
        for event in events {
            if let Err(err) = self.handle_event(event) {
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }

    fn on_ice_connected(&mut self) -> Result<()> {
        let Some(dtls) = self.dtls.as_mut() else {
            return Ok(());
        };
        if dtls.state() != DtlsState::Idle {
            debug!("[webrtc] ICE connected again, DTLS is {}", dtls.state());
            return Ok(());
        }

        dtls.run(DtlsRole::Server)?;
        self.state_change(RTCTransportState::DtlsHandshaking);
        self.drain_dtls()
    }

    fn on_dtls_connected(&mut self, material: SrtpKeyingMaterial) -> Result<()> {
        if self.state != RTCTransportState::DtlsHandshaking {
            warn!(
                "[webrtc] ignoring DTLS completion in state {}",
                self.state
            );
            return Ok(());
        }

        let profile = ProtectionProfile::from(material.suite);
        let key_len = profile.key_len().min(material.local_key.len());
        let (master_key, master_salt) = material.local_key.split_at(key_len);
        let context = match srtp::Context::new(master_key, master_salt, profile) {
            Ok(context) => context,
            Err(err) => {
                error!("[webrtc] creating outbound SRTP session failed: {err}");
                return Err(err);
            }
        };
        info!(
            "[webrtc] outbound SRTP session installed, profile {profile}, peer {}",
            material.remote_fingerprint
        );
        self.srtp = Some(context);
        self.state_change(RTCTransportState::SrtpActive);

        match self.media.as_mut() {
            Some(media) => media.activate(),
            None => warn!("[webrtc] SRTP active but no media source attached"),
        }

        Ok(())
    }

    fn handle_rtp(&mut self, msg: TaggedBytesMut) {
        match RtpHeader::unmarshal(&msg.message) {
            Ok(header) => {
                trace!("[webrtc] inbound {header}");
                self.reads.push_back(InboundPacket::Rtp {
                    header,
                    packet: msg,
                });
            }
            Err(err) => debug!(
                "[webrtc] dropping malformed RTP from {}: {err}",
                msg.transport.peer_addr
            ),
        }
    }

    fn handle_rtcp(&mut self, msg: TaggedBytesMut) {
        match RtcpHeader::unmarshal(&msg.message) {
            Ok(header) => {
                trace!(
                    "[webrtc] inbound RTCP pt {} from {}",
                    header.packet_type, msg.transport.peer_addr
                );
                self.reads.push_back(InboundPacket::Rtcp {
                    header,
                    packet: msg,
                });
            }
            Err(err) => debug!(
                "[webrtc] dropping malformed RTCP from {}: {err}",
                msg.transport.peer_addr
            ),
        }
    }
}

impl Protocol<TaggedBytesMut, BytesMut, TransportEvent> for WebRtcTransport {
    type Rout = InboundPacket;
    type Wout = TaggedBytesMut;
    type Eout = RTCTransportEvent;
    type Error = Error;
    type Time = Instant;

    /// Processes one datagram received on the socket.
    ///
    /// Malformed or unexpected input is logged and dropped; an `Err` only
    /// means the transport could not route something it produced itself.
    fn handle_read(&mut self, msg: TaggedBytesMut) -> Result<()> {
        if self.state == RTCTransportState::Closed {
            trace!("[webrtc] closed, ignoring {} bytes", msg.message.len());
            return Ok(());
        }

        let kind = classify(&msg.message);
        trace!(
            "[webrtc] {} bytes of {kind} from {}",
            msg.message.len(),
            msg.transport.peer_addr
        );
        match kind {
            PacketKind::Stun => {
                if let Some(ice) = self.ice.as_mut() {
                    let peer_addr = msg.transport.peer_addr;
                    if let Err(err) = ice.handle_read(msg) {
                        warn!("[webrtc] dropping STUN from {peer_addr}: {err}");
                    }
                }
                self.drain_ice()
            }
            PacketKind::Dtls => {
                if let Some(dtls) = self.dtls.as_mut() {
                    if let Err(err) = dtls.handle_read(msg.message) {
                        warn!(
                            "[webrtc] DTLS from {} failed: {err}",
                            msg.transport.peer_addr
                        );
                    }
                }
                self.drain_dtls()
            }
            PacketKind::Rtp => {
                self.handle_rtp(msg);
                Ok(())
            }
            PacketKind::Rtcp => {
                self.handle_rtcp(msg);
                Ok(())
            }
            PacketKind::Unrecognized => Ok(()),
        }
    }

    fn poll_read(&mut self) -> Option<Self::Rout> {
        self.reads.pop_front()
    }

    /// Encrypts one plain RTP packet and queues it for the selected tuple.
    ///
    /// Without an SRTP session, or if encryption fails, the packet is
    /// dropped: media is never sent in the clear and never retried.
    fn handle_write(&mut self, msg: BytesMut) -> Result<()> {
        let Some(srtp) = self.srtp.as_mut() else {
            trace!("[webrtc] no SRTP session, dropping {} bytes", msg.len());
            return Ok(());
        };

        match srtp.encrypt_rtp(&msg) {
            Ok(encrypted) => self.send_to_selected(encrypted),
            Err(err) => {
                debug!("[webrtc] dropping RTP packet, encryption failed: {err}");
                Ok(())
            }
        }
    }

    fn poll_write(&mut self) -> Option<Self::Wout> {
        self.writes.pop_front()
    }

    fn handle_event(&mut self, evt: TransportEvent) -> Result<()> {
        if self.state == RTCTransportState::Closed {
            return Ok(());
        }

        match evt {
            TransportEvent::IceSelectedTuple(transport) => {
                if self.selected_tuple != Some(transport) {
                    info!("[webrtc] selected tuple {transport}");
                    self.selected_tuple = Some(transport);
                    self.events
                        .push_back(RTCTransportEvent::SelectedTupleChange(transport));
                }
                Ok(())
            }
            TransportEvent::IceConnected => self.on_ice_connected(),
            TransportEvent::IceCompleted => {
                debug!("[webrtc] ICE completed");
                Ok(())
            }
            TransportEvent::IceDisconnected => {
                warn!("[webrtc] ICE disconnected, consent expired");
                Ok(())
            }
            TransportEvent::DtlsConnected(material) => self.on_dtls_connected(material),
            TransportEvent::DtlsSendData(flight) => self.send_to_selected(flight),
        }
    }

    fn poll_event(&mut self) -> Option<Self::Eout> {
        self.events.pop_front()
    }

    fn handle_timeout(&mut self, now: Instant) -> Result<()> {
        if self.state == RTCTransportState::Closed {
            return Ok(());
        }

        if let Some(ice) = self.ice.as_mut() {
            if let Err(err) = ice.handle_timeout(now) {
                warn!("[webrtc] ICE timeout handling failed: {err}");
            }
        }
        let ice_result = self.drain_ice();

        if let Some(dtls) = self.dtls.as_mut() {
            if let Err(err) = dtls.handle_timeout(now) {
                warn!("[webrtc] DTLS timeout handling failed: {err}");
            }
        }
        let dtls_result = self.drain_dtls();

        ice_result.and(dtls_result)
    }

    fn poll_timeout(&mut self) -> Option<Instant> {
        let ice_timeout = self.ice.as_mut().and_then(|ice| ice.poll_timeout());
        let dtls_timeout = self.dtls.as_mut().and_then(|dtls| dtls.poll_timeout());
        match (ice_timeout, dtls_timeout) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Tears the session down: ICE server, DTLS engine, SRTP session and
    /// media subscription are released in that order.
    ///
    /// A `close_notify` for an established association is the last datagram
    /// queued; nothing else is produced afterwards.
    fn close(&mut self) -> Result<()> {
        if self.state == RTCTransportState::Closed {
            return Ok(());
        }

        let mut errs = vec![];
        self.reads.clear();
        self.writes.clear();

        if let Some(mut ice) = self.ice.take() {
            if let Err(err) = ice.close() {
                errs.push(err);
            }
        }

        if let Some(mut dtls) = self.dtls.take() {
            if let Err(err) = dtls.close() {
                errs.push(err);
            }
            if let Some(transport) = self.selected_tuple {
                while let Some(message) = dtls.poll_write() {
                    self.writes.push_back(TransportMessage {
                        now: Instant::now(),
                        transport,
                        message,
                    });
                }
            }
        }

        self.srtp = None;
        if let Some(media) = self.media.take() {
            if let Some(reader) = media.reader {
                reader.detach();
            }
        }

        self.state_change(RTCTransportState::Closed);
        flatten_errs(errs)
    }
}
