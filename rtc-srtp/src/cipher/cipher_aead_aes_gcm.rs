use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Nonce};
use bytes::BytesMut;
use rtp::RtpHeader;
use shared::error::{Error, Result};

use super::Cipher;
use crate::key_derivation::*;
use crate::protection_profile::ProtectionProfile;

pub(crate) const CIPHER_AEAD_AES_GCM_AUTH_TAG_LEN: usize = 16;

/// AEAD Cipher based on AES-128 GCM, RFC 7714.
pub(crate) struct CipherAeadAesGcm {
    profile: ProtectionProfile,
    srtp_cipher: Aes128Gcm,
    srtp_session_salt: Vec<u8>,
}

impl CipherAeadAesGcm {
    pub(crate) fn new(
        profile: ProtectionProfile,
        master_key: &[u8],
        master_salt: &[u8],
    ) -> Result<Self> {
        let srtp_session_key = aes_cm_key_derivation(
            LABEL_SRTP_ENCRYPTION,
            master_key,
            master_salt,
            0,
            master_key.len(),
        )?;

        let srtp_cipher = Aes128Gcm::new_from_slice(&srtp_session_key)?;

        let srtp_session_salt = aes_cm_key_derivation(
            LABEL_SRTP_SALT,
            master_key,
            master_salt,
            0,
            master_salt.len(),
        )?;

        Ok(CipherAeadAesGcm {
            profile,
            srtp_cipher,
            srtp_session_salt,
        })
    }

    /// The 12-octet IV used by AES-GCM SRTP is formed by first concatenating
    /// 2 octets of zeroes, the 4-octet SSRC, the 4-octet rollover counter
    /// (ROC), and the 2-octet sequence number (SEQ).  The resulting 12-octet
    /// value is then XORed to the 12-octet salt to form the 12-octet IV.
    ///
    /// https://tools.ietf.org/html/rfc7714#section-8.1
    fn rtp_initialization_vector(&self, header: &RtpHeader, roc: u32) -> [u8; 12] {
        let mut iv = [0u8; 12];
        iv[2..6].copy_from_slice(&header.ssrc.to_be_bytes());
        iv[6..10].copy_from_slice(&roc.to_be_bytes());
        iv[10..12].copy_from_slice(&header.sequence_number.to_be_bytes());

        for (i, v) in iv.iter_mut().enumerate() {
            *v ^= self.srtp_session_salt[i];
        }

        iv
    }
}

impl Cipher for CipherAeadAesGcm {
    fn rtp_auth_tag_len(&self) -> usize {
        self.profile.rtp_auth_tag_len()
    }

    fn encrypt_rtp(&mut self, plaintext: &[u8], header: &RtpHeader, roc: u32) -> Result<BytesMut> {
        // Grow the given buffer to fit the output.
        let mut writer = BytesMut::with_capacity(plaintext.len() + self.rtp_auth_tag_len());

        let header_size = header.header_size();
        writer.extend_from_slice(&plaintext[..header_size]);

        let nonce = self.rtp_initialization_vector(header, roc);

        let encrypted = self.srtp_cipher.encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &plaintext[header_size..],
                aad: &writer,
            },
        )?;

        writer.extend(encrypted);
        Ok(writer)
    }

    fn decrypt_rtp(
        &mut self,
        ciphertext: &[u8],
        header: &RtpHeader,
        roc: u32,
    ) -> Result<BytesMut> {
        let min_len = header.header_size() + CIPHER_AEAD_AES_GCM_AUTH_TAG_LEN;
        if ciphertext.len() < min_len {
            return Err(Error::SrtpTooSmall(ciphertext.len(), min_len));
        }

        let nonce = self.rtp_initialization_vector(header, roc);
        let payload_offset = header.header_size();
        let decrypted_msg: Vec<u8> = self
            .srtp_cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &ciphertext[payload_offset..],
                    aad: &ciphertext[..payload_offset],
                },
            )
            .map_err(|_| Error::RtpFailedToVerifyAuthTag)?;

        let mut writer = BytesMut::with_capacity(payload_offset + decrypted_msg.len());
        writer.extend_from_slice(&ciphertext[..payload_offset]);
        writer.extend(decrypted_msg);

        Ok(writer)
    }
}
