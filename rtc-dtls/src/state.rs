use std::fmt;

/// DtlsState indicates the DTLS transport establishment state.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DtlsState {
    /// Created, `run` not called yet.
    #[default]
    Idle,

    /// Handshake flights are being exchanged.
    Handshaking,

    /// Handshake finished and SRTP keying material was exported.
    Connected,

    /// Handshake failed or the peer could not be verified.
    Failed,

    /// Closed locally or by a close_notify alert from the peer.
    Closed,
}

impl fmt::Display for DtlsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            DtlsState::Idle => "idle",
            DtlsState::Handshaking => "handshaking",
            DtlsState::Connected => "connected",
            DtlsState::Failed => "failed",
            DtlsState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}
