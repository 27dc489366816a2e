use std::fmt;

/// Lifecycle of one WebRtcTransport.
///
/// ```text
/// Idle → IceConnecting → DtlsHandshaking → SrtpActive
///   └──────────┴───────────────┴──────────────┴──→ Closed
/// ```
///
/// `SrtpActive` is only reachable through `DtlsHandshaking`, so media is
/// never sent before both ICE connected and DTLS completed, in that order.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCTransportState {
    #[default]
    Idle,

    /// Waiting for a valid connectivity check from the peer.
    IceConnecting,

    /// ICE connected; the DTLS handshake runs as the passive side.
    DtlsHandshaking,

    /// SRTP session installed, media reader active.
    SrtpActive,

    Closed,
}

impl fmt::Display for RTCTransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCTransportState::Idle => "idle",
            RTCTransportState::IceConnecting => "ice-connecting",
            RTCTransportState::DtlsHandshaking => "dtls-handshaking",
            RTCTransportState::SrtpActive => "srtp-active",
            RTCTransportState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_transport_state_string() {
        let tests = vec![
            (RTCTransportState::Idle, "idle"),
            (RTCTransportState::IceConnecting, "ice-connecting"),
            (RTCTransportState::DtlsHandshaking, "dtls-handshaking"),
            (RTCTransportState::SrtpActive, "srtp-active"),
            (RTCTransportState::Closed, "closed"),
        ];

        for (state, expected_string) in tests {
            assert_eq!(state.to_string(), expected_string);
        }
    }
}
