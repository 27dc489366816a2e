#[cfg(test)]
mod context_test;

use bytes::BytesMut;
use log::trace;
use rtp::RtpHeader;
use shared::error::{Error, Result};
use std::collections::HashMap;

use crate::cipher::Cipher;
use crate::cipher::cipher_aead_aes_gcm::CipherAeadAesGcm;
use crate::cipher::cipher_aes_cm_hmac_sha1::CipherAesCmHmacSha1;
use crate::protection_profile::ProtectionProfile;

const SEQ_NUM_MEDIAN: i32 = 1 << 15;

/// Rollover tracking for one SSRC, RFC 3711 Section 3.3.1.
#[derive(Default, Debug, Clone, Copy)]
pub(crate) struct SrtpSsrcState {
    rollover_counter: u32,
    last_sequence_number: u16,
    rollover_has_processed: bool,
}

impl SrtpSsrcState {
    /// Guesses the rollover counter of `sequence_number`, RFC 3711 Appendix A.
    pub(crate) fn estimate_roc(&self, sequence_number: u16) -> u32 {
        if !self.rollover_has_processed {
            return self.rollover_counter;
        }

        let s_l = self.last_sequence_number as i32;
        let seq = sequence_number as i32;
        if s_l < SEQ_NUM_MEDIAN {
            if seq - s_l > SEQ_NUM_MEDIAN {
                self.rollover_counter.saturating_sub(1)
            } else {
                self.rollover_counter
            }
        } else if s_l - SEQ_NUM_MEDIAN > seq {
            self.rollover_counter.wrapping_add(1)
        } else {
            self.rollover_counter
        }
    }

    /// Records a processed packet; only ever moves the index forward.
    pub(crate) fn update(&mut self, sequence_number: u16, roc: u32) {
        if !self.rollover_has_processed
            || roc > self.rollover_counter
            || (roc == self.rollover_counter && sequence_number > self.last_sequence_number)
        {
            self.rollover_counter = roc;
            self.last_sequence_number = sequence_number;
            self.rollover_has_processed = true;
        }
    }
}

/// Context represents a SRTP cryptographic context for one direction.
/// Context can only be used for one-way operations:
/// it must either be used ONLY for encryption or ONLY for decryption.
pub struct Context {
    cipher: Box<dyn Cipher + Send>,
    profile: ProtectionProfile,
    srtp_ssrc_states: HashMap<u32, SrtpSsrcState>,
}

impl Context {
    /// CreateContext creates a new SRTP Context.
    pub fn new(
        master_key: &[u8],
        master_salt: &[u8],
        profile: ProtectionProfile,
    ) -> Result<Context> {
        let key_len = profile.key_len();
        let salt_len = profile.salt_len();

        if master_key.len() != key_len {
            return Err(Error::SrtpMasterKeyLength(key_len, master_key.len()));
        } else if master_salt.len() != salt_len {
            return Err(Error::SrtpSaltLength(salt_len, master_salt.len()));
        }

        let cipher: Box<dyn Cipher + Send> = match profile {
            ProtectionProfile::Aes128CmHmacSha1_80 | ProtectionProfile::Aes128CmHmacSha1_32 => {
                Box::new(CipherAesCmHmacSha1::new(profile, master_key, master_salt)?)
            }
            ProtectionProfile::AeadAes128Gcm => {
                Box::new(CipherAeadAesGcm::new(profile, master_key, master_salt)?)
            }
        };

        Ok(Context {
            cipher,
            profile,
            srtp_ssrc_states: HashMap::new(),
        })
    }

    pub fn profile(&self) -> ProtectionProfile {
        self.profile
    }

    /// Bytes every protected RTP packet grows by.
    pub fn rtp_overhead(&self) -> usize {
        self.cipher.rtp_auth_tag_len()
    }

    /// Current rollover counter of `ssrc`, if a packet of it was processed.
    pub fn roc(&self, ssrc: u32) -> Option<u32> {
        self.srtp_ssrc_states
            .get(&ssrc)
            .filter(|state| state.rollover_has_processed)
            .map(|state| state.rollover_counter)
    }

    /// Encrypts one RTP packet; the result is `rtp_overhead()` bytes longer.
    pub fn encrypt_rtp(&mut self, plaintext: &[u8]) -> Result<BytesMut> {
        let header = RtpHeader::unmarshal(plaintext)?;
        self.encrypt_rtp_with_header(plaintext, &header)
    }

    /// Encrypts `plaintext` whose header was already parsed into `header`.
    pub fn encrypt_rtp_with_header(
        &mut self,
        plaintext: &[u8],
        header: &RtpHeader,
    ) -> Result<BytesMut> {
        let state = self.srtp_ssrc_states.entry(header.ssrc).or_default();
        let roc = state.estimate_roc(header.sequence_number);
        let encrypted = self.cipher.encrypt_rtp(plaintext, header, roc)?;
        state.update(header.sequence_number, roc);

        trace!(
            "srtp encrypted ssrc={} seq={} roc={} {} -> {} bytes",
            header.ssrc,
            header.sequence_number,
            roc,
            plaintext.len(),
            encrypted.len()
        );
        Ok(encrypted)
    }

    /// Verifies and decrypts one SRTP packet.
    pub fn decrypt_rtp(&mut self, encrypted: &[u8]) -> Result<BytesMut> {
        let header = RtpHeader::unmarshal(encrypted)?;
        self.decrypt_rtp_with_header(encrypted, &header)
    }

    /// Decrypts `encrypted` whose header was already parsed into `header`.
    pub fn decrypt_rtp_with_header(
        &mut self,
        encrypted: &[u8],
        header: &RtpHeader,
    ) -> Result<BytesMut> {
        let state = self.srtp_ssrc_states.entry(header.ssrc).or_default();
        let roc = state.estimate_roc(header.sequence_number);
        let decrypted = self.cipher.decrypt_rtp(encrypted, header, roc)?;
        state.update(header.sequence_number, roc);

        Ok(decrypted)
    }
}
