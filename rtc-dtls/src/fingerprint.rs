use sha2::{Digest, Sha256, Sha384, Sha512};
use shared::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Hash function of a certificate fingerprint, named as in the
/// 'Hash function Textual Names' registry of <https://tools.ietf.org/html/rfc4572>.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum FingerprintAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl FingerprintAlgorithm {
    fn digest(&self, der: &[u8]) -> Vec<u8> {
        match self {
            FingerprintAlgorithm::Sha256 => Sha256::digest(der).to_vec(),
            FingerprintAlgorithm::Sha384 => Sha384::digest(der).to_vec(),
            FingerprintAlgorithm::Sha512 => Sha512::digest(der).to_vec(),
        }
    }
}

impl fmt::Display for FingerprintAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            FingerprintAlgorithm::Sha256 => "sha-256",
            FingerprintAlgorithm::Sha384 => "sha-384",
            FingerprintAlgorithm::Sha512 => "sha-512",
        };
        write!(f, "{s}")
    }
}

impl FromStr for FingerprintAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha-256" => Ok(FingerprintAlgorithm::Sha256),
            "sha-384" => Ok(FingerprintAlgorithm::Sha384),
            "sha-512" => Ok(FingerprintAlgorithm::Sha512),
            _ => Err(Error::ErrUnsupportedFingerprintAlgorithm(s.to_owned())),
        }
    }
}

/// Fingerprint specifies the hash function algorithm and certificate
/// fingerprint as described in <https://tools.ietf.org/html/rfc4572>.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub algorithm: FingerprintAlgorithm,

    /// Lowercase colon separated hex, as in `a=fingerprint`.
    pub value: String,
}

impl Fingerprint {
    /// A sha-256 fingerprint without a value. As the remote fingerprint of a
    /// transport it means "not known yet".
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Fingerprint of a DER encoded certificate.
    pub fn of_der(algorithm: FingerprintAlgorithm, der: &[u8]) -> Self {
        let values: Vec<String> = algorithm
            .digest(der)
            .iter()
            .map(|x| format!("{x:02x}"))
            .collect();
        Self {
            algorithm,
            value: values.join(":"),
        }
    }

    /// Whether `der` hashes to this fingerprint, ignoring hex case.
    pub fn matches(&self, der: &[u8]) -> bool {
        let actual = Fingerprint::of_der(self.algorithm, der);
        actual.value.eq_ignore_ascii_case(&self.value)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.algorithm, self.value)
    }
}

impl TryFrom<&str> for Fingerprint {
    type Error = Error;

    /// Parses the value of an `a=fingerprint` attribute: `sha-256 AB:CD:...`.
    fn try_from(value: &str) -> Result<Self> {
        let fields: Vec<&str> = value.split_whitespace().collect();
        if fields.len() != 2 {
            return Err(Error::ErrInvalidFingerprint);
        }

        let algorithm = fields[0].parse()?;
        let valid = fields[1]
            .split(':')
            .all(|b| b.len() == 2 && b.bytes().all(|c| c.is_ascii_hexdigit()));
        if !valid {
            return Err(Error::ErrInvalidFingerprint);
        }

        Ok(Self {
            algorithm,
            value: fields[1].to_ascii_lowercase(),
        })
    }
}
