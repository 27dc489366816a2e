use std::time::Duration;

use crate::rand::CredentialRng;

/// How long a selected tuple stays consented without a fresh valid binding
/// request before the server reports `Disconnected`.
pub const DEFAULT_CONSENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Collects the arguments to `IceServer` construction into a single structure.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Local username fragment; generated when empty.
    pub local_ufrag: String,
    /// Local password; generated when empty.
    pub local_pwd: String,
    /// If zero, the server never reports `Disconnected`.
    pub consent_timeout: Duration,
    /// Where generated credentials come from.
    pub credential_rng: CredentialRng,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            local_ufrag: String::new(),
            local_pwd: String::new(),
            consent_timeout: DEFAULT_CONSENT_TIMEOUT,
            credential_rng: CredentialRng::default(),
        }
    }
}
