use std::time::Duration;

use crate::certificate::Certificate;
use crate::crypto_suite::SrtpCryptoSuite;
use crate::fingerprint::Fingerprint;

/// Largest DTLS datagram the engine emits, below common path MTUs.
pub const DEFAULT_MTU: usize = 1200;

/// How often a pending handshake is re-driven so lost flights get retransmitted.
pub const DEFAULT_RETRANSMIT_INTERVAL: Duration = Duration::from_secs(1);

pub(crate) const MIN_MTU: usize = 256;

/// Collects the arguments to `DtlsTransport` construction into a single structure.
#[derive(Debug, Clone)]
pub struct DtlsConfig {
    /// Local identity; a self-signed certificate is generated when `None`.
    pub certificate: Option<Certificate>,
    pub mtu: usize,
    /// Offered in this order; the server picks its most preferred one.
    pub srtp_protection_profiles: Vec<SrtpCryptoSuite>,
    pub retransmit_interval: Duration,
    /// Expected peer certificate fingerprint; empty accepts any certificate.
    pub remote_fingerprint: Fingerprint,
}

impl Default for DtlsConfig {
    fn default() -> Self {
        Self {
            certificate: None,
            mtu: DEFAULT_MTU,
            srtp_protection_profiles: default_srtp_protection_profiles(),
            retransmit_interval: DEFAULT_RETRANSMIT_INTERVAL,
            remote_fingerprint: Fingerprint::empty(),
        }
    }
}

pub fn default_srtp_protection_profiles() -> Vec<SrtpCryptoSuite> {
    vec![
        SrtpCryptoSuite::AesCm128HmacSha1_80,
        SrtpCryptoSuite::AesCm128HmacSha1_32,
    ]
}
