use openssl::srtp::SrtpProfileId;
use srtp::ProtectionProfile;
use std::fmt;

/// SRTP protection profile negotiated through the DTLS `use_srtp`
/// extension, <https://tools.ietf.org/html/rfc5764#section-4.1.2>.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SrtpCryptoSuite {
    #[default]
    AesCm128HmacSha1_80,
    AesCm128HmacSha1_32,
    AeadAes128Gcm,
}

impl SrtpCryptoSuite {
    /// Profile name as the TLS library spells it in `use_srtp` lists.
    pub fn openssl_name(&self) -> &'static str {
        match *self {
            SrtpCryptoSuite::AesCm128HmacSha1_80 => "SRTP_AES128_CM_SHA1_80",
            SrtpCryptoSuite::AesCm128HmacSha1_32 => "SRTP_AES128_CM_SHA1_32",
            SrtpCryptoSuite::AeadAes128Gcm => "SRTP_AEAD_AES_128_GCM",
        }
    }

    pub(crate) fn from_profile_id(id: SrtpProfileId) -> Option<Self> {
        if id == SrtpProfileId::SRTP_AES128_CM_SHA1_80 {
            Some(SrtpCryptoSuite::AesCm128HmacSha1_80)
        } else if id == SrtpProfileId::SRTP_AES128_CM_SHA1_32 {
            Some(SrtpCryptoSuite::AesCm128HmacSha1_32)
        } else if id == SrtpProfileId::SRTP_AEAD_AES_128_GCM {
            Some(SrtpCryptoSuite::AeadAes128Gcm)
        } else {
            None
        }
    }

    /// Colon separated `use_srtp` list in preference order.
    pub(crate) fn openssl_list(suites: &[SrtpCryptoSuite]) -> String {
        suites
            .iter()
            .map(|suite| suite.openssl_name())
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl From<SrtpCryptoSuite> for ProtectionProfile {
    fn from(suite: SrtpCryptoSuite) -> Self {
        match suite {
            SrtpCryptoSuite::AesCm128HmacSha1_80 => ProtectionProfile::Aes128CmHmacSha1_80,
            SrtpCryptoSuite::AesCm128HmacSha1_32 => ProtectionProfile::Aes128CmHmacSha1_32,
            SrtpCryptoSuite::AeadAes128Gcm => ProtectionProfile::AeadAes128Gcm,
        }
    }
}

impl fmt::Display for SrtpCryptoSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.openssl_name())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_srtp_crypto_suite_mapping() {
        assert_eq!(
            SrtpCryptoSuite::from_profile_id(SrtpProfileId::SRTP_AES128_CM_SHA1_32),
            Some(SrtpCryptoSuite::AesCm128HmacSha1_32)
        );
        assert_eq!(
            SrtpCryptoSuite::from_profile_id(SrtpProfileId::SRTP_NULL_SHA1_80),
            None
        );
        assert_eq!(
            ProtectionProfile::from(SrtpCryptoSuite::AeadAes128Gcm),
            ProtectionProfile::AeadAes128Gcm
        );
        assert_eq!(
            SrtpCryptoSuite::openssl_list(&[
                SrtpCryptoSuite::AesCm128HmacSha1_80,
                SrtpCryptoSuite::AesCm128HmacSha1_32
            ]),
            "SRTP_AES128_CM_SHA1_80:SRTP_AES128_CM_SHA1_32"
        );
    }
}
