use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use rcgen::{CertificateParams, KeyPair};
use shared::error::Result;
use shared::util::math_rand_alpha;

use crate::fingerprint::{Fingerprint, FingerprintAlgorithm};

/// Certificate represents a x509Cert used to authenticate the local DTLS
/// endpoint, together with its private key.
#[derive(Clone)]
pub struct Certificate {
    pub(crate) x509: X509,
    pub(crate) private_key: PKey<Private>,
    der: Vec<u8>,
}

impl Certificate {
    /// Generates a self-signed ECDSA P-256 certificate with a random common name.
    pub fn generate() -> Result<Self> {
        let key_pair = KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)?;
        Self::from_key_pair(key_pair)
    }

    /// Self-signs a certificate for an existing key pair.
    pub fn from_key_pair(key_pair: KeyPair) -> Result<Self> {
        let params = CertificateParams::new(vec![math_rand_alpha(16)])?;
        let cert = params.self_signed(&key_pair)?;

        let der = cert.der().to_vec();
        let x509 = X509::from_der(&der)?;
        let private_key = PKey::private_key_from_pkcs8(&key_pair.serialize_der())?;

        Ok(Self {
            x509,
            private_key,
            der,
        })
    }

    /// DER encoding of the certificate.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// SHA-256 fingerprint, the one announced in the SDP answer.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_der(FingerprintAlgorithm::Sha256, &self.der)
    }

    /// Fingerprints for every algorithm the local endpoint announces.
    pub fn get_fingerprints(&self) -> Vec<Fingerprint> {
        vec![self.fingerprint()]
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("fingerprint", &self.fingerprint().value)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_generate_certificate_ecdsa() -> Result<()> {
        let cert = Certificate::generate()?;
        assert_eq!(cert.x509.to_der()?, cert.der());

        let fingerprints = cert.get_fingerprints();
        assert_eq!(fingerprints.len(), 1);
        assert_eq!(fingerprints[0].algorithm, FingerprintAlgorithm::Sha256);

        let bytes: Vec<&str> = fingerprints[0].value.split(':').collect();
        assert_eq!(bytes.len(), 32, "SHA-256 is 32 bytes");
        for byte in bytes {
            assert_eq!(byte.len(), 2);
            assert!(byte.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f')));
        }
        Ok(())
    }

    #[test]
    fn test_generated_certificates_differ() -> Result<()> {
        let a = Certificate::generate()?;
        let b = Certificate::generate()?;
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert!(a.fingerprint().matches(a.der()));
        Ok(())
    }
}
