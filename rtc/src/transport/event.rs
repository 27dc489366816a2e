use bytes::BytesMut;
use dtls::{DtlsState, SrtpKeyingMaterial};
use ice::{IceEvent, IceState};
use rtp::{RtcpHeader, RtpHeader};
use shared::{TaggedBytesMut, TransportContext};

use crate::transport::state::RTCTransportState;

/// Everything the ICE server and the DTLS engine report to the transport.
///
/// Both components queue these instead of calling back into the transport;
/// the transport drains them and feeds each one to `handle_event`, its single
/// dispatch point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    IceConnected,
    IceSelectedTuple(TransportContext),
    IceCompleted,
    IceDisconnected,
    /// Handshake complete; consumed once to build the SRTP session.
    DtlsConnected(SrtpKeyingMaterial),
    /// A DTLS flight to send to the selected tuple.
    DtlsSendData(BytesMut),
}

impl From<IceEvent> for TransportEvent {
    fn from(event: IceEvent) -> Self {
        match event {
            IceEvent::SelectedTuple(transport) => TransportEvent::IceSelectedTuple(transport),
            IceEvent::Connected => TransportEvent::IceConnected,
            IceEvent::Completed => TransportEvent::IceCompleted,
            IceEvent::Disconnected => TransportEvent::IceDisconnected,
        }
    }
}

/// Notifications for the owner of a transport, drained via `poll_event`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RTCTransportEvent {
    StateChange(RTCTransportState),
    IceStateChange(IceState),
    SelectedTupleChange(TransportContext),
    DtlsStateChange(DtlsState),
}

/// Inbound media, still SRTP/SRTCP protected, with its parsed clear header.
#[derive(Debug, Clone)]
pub enum InboundPacket {
    Rtp {
        header: RtpHeader,
        packet: TaggedBytesMut,
    },
    Rtcp {
        header: RtcpHeader,
        packet: TaggedBytesMut,
    },
}
