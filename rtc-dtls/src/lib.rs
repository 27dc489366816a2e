#![warn(rust_2018_idioms)]

pub mod certificate;
pub mod config;
pub mod crypto_suite;
pub mod fingerprint;
mod io;
pub mod role;
pub mod state;
pub mod transport;

pub use certificate::Certificate;
pub use config::DtlsConfig;
pub use crypto_suite::SrtpCryptoSuite;
pub use fingerprint::{Fingerprint, FingerprintAlgorithm};
pub use role::DtlsRole;
pub use state::DtlsState;
pub use transport::{DtlsEvent, DtlsTransport, SrtpKeyingMaterial};

use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the TLS library for the whole process.
///
/// Safe to call any number of times from any thread; only the first call does
/// work. Every `DtlsTransport` constructor calls it, so calling it eagerly is
/// only useful to move the cost out of the first connection. Nothing has to
/// be torn down at exit.
pub fn init() {
    INIT.call_once(|| {
        openssl::init();
        log::debug!("[dtls] {} initialized", openssl::version::version());
    });
}
