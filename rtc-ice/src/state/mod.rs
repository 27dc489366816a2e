use std::fmt;

/// State of the ICE-lite server.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum IceState {
    /// No valid binding request received yet.
    #[default]
    New,

    /// A tuple was validated and selected; the peer has not nominated it yet.
    Connected,

    /// The peer nominated a tuple with USE-CANDIDATE.
    Completed,

    /// No valid binding request arrived within the consent timeout.
    Disconnected,

    /// The server was closed and handles no more requests.
    Closed,
}

impl fmt::Display for IceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Self::New => "new",
            Self::Connected => "connected",
            Self::Completed => "completed",
            Self::Disconnected => "disconnected",
            Self::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

impl IceState {
    /// Whether a tuple is usable for egress in this state.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected | Self::Completed)
    }
}
