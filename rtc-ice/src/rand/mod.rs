
use rand::SeedableRng;
use rand::rngs::SmallRng;
use shared::util::{generate_crypto_random_string, generate_random_string};

/// <https://tools.ietf.org/html/rfc5245#section-15.1>
/// ice-char = ALPHA / DIGIT / "+" / "/"; the slash and plus are left out
/// so credentials can be pasted into any signaling channel verbatim.
const RUNES_ICE_CHAR: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub(crate) const LEN_UFRAG: usize = 4;
pub(crate) const LEN_PWD: usize = 24;

/// Source of randomness for local ICE credentials.
///
/// Credentials only need to be unique among the sessions of one process, so
/// `General` draws them from a fast generator seeded once per server.
/// `Crypto` draws every character from the thread-local CSPRNG instead.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CredentialRng {
    #[default]
    General,
    Crypto,
}

/// Generates a (ufrag, pwd) pair from the given source.
pub fn generate_credentials(source: CredentialRng) -> (String, String) {
    match source {
        CredentialRng::General => {
            let mut rng = SmallRng::from_rng(&mut rand::rng());
            let ufrag = generate_random_string(&mut rng, LEN_UFRAG, RUNES_ICE_CHAR);
            let pwd = generate_random_string(&mut rng, LEN_PWD, RUNES_ICE_CHAR);
            (ufrag, pwd)
        }
        CredentialRng::Crypto => (
            generate_crypto_random_string(LEN_UFRAG, RUNES_ICE_CHAR),
            generate_crypto_random_string(LEN_PWD, RUNES_ICE_CHAR),
        ),
    }
}
