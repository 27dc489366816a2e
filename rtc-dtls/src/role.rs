use std::fmt;

/// Which side of the DTLS handshake the local endpoint plays.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DtlsRole {
    /// Sends the ClientHello (`a=setup:active`).
    Client,

    /// Waits for the ClientHello (`a=setup:passive`). The edge transport
    /// always answers as the server.
    #[default]
    Server,
}

impl fmt::Display for DtlsRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DtlsRole::Client => write!(f, "client"),
            DtlsRole::Server => write!(f, "server"),
        }
    }
}
