use crate::attributes::*;
use crate::checks::*;
use crate::message::*;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use shared::error::*;
use std::fmt;

pub const MESSAGE_INTEGRITY_SIZE: usize = 20;

/// MessageIntegrity represents MESSAGE-INTEGRITY attribute: an HMAC-SHA1
/// over the message up to the attribute, keyed with the short-term password.
///
/// RFC 5389 Section 15.4
#[derive(Default, Clone)]
pub struct MessageIntegrity(pub Vec<u8>);

fn new_hmac(key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key)
        .map_err(|err| Error::OtherStunErr(err.to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

impl fmt::Display for MessageIntegrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KEY: 0x{:x?}", self.0)
    }
}

impl fmt::Debug for MessageIntegrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageIntegrity(<{} byte key>)", self.0.len())
    }
}

impl Setter for MessageIntegrity {
    /// add_to adds MESSAGE-INTEGRITY attribute to message.
    ///
    /// CPU costly, see BenchmarkMessageIntegrity_AddTo.
    fn add_to(&self, m: &mut Message) -> Result<()> {
        if m.contains(ATTR_FINGERPRINT) {
            return Err(Error::ErrFingerprintBeforeIntegrity);
        }

        // The text used as input to HMAC is the STUN message,
        // including the header, up to and including the attribute preceding the
        // MESSAGE-INTEGRITY attribute.
        let length = m.length;
        // Adjusting m.Length to contain MESSAGE-INTEGRITY TLV.
        m.length += (MESSAGE_INTEGRITY_SIZE + ATTRIBUTE_HEADER_SIZE) as u32;
        m.write_length(); // writing length to m.Raw
        let v = new_hmac(&self.0, &m.raw[..MESSAGE_HEADER_SIZE + length as usize]);
        m.length = length; // changing m.Length back

        m.add(ATTR_MESSAGE_INTEGRITY, &v?);

        Ok(())
    }
}

impl Checker for MessageIntegrity {
    /// check checks MESSAGE-INTEGRITY attribute.
    ///
    /// The HMAC is recomputed over a copy of the message prefix whose length
    /// field is adjusted to end right after MESSAGE-INTEGRITY, so attributes
    /// following it (FINGERPRINT) are excluded.
    fn check(&self, m: &Message) -> Result<()> {
        let v = m.get(ATTR_MESSAGE_INTEGRITY)?;
        check_size(ATTR_MESSAGE_INTEGRITY, v.len(), MESSAGE_INTEGRITY_SIZE)?;

        let mut after_integrity = false;
        let mut size_reduced = 0;
        for a in &m.attributes.0 {
            if after_integrity {
                size_reduced += nearest_padded_value_length(a.length as usize);
                size_reduced += ATTRIBUTE_HEADER_SIZE;
            }
            if a.typ == ATTR_MESSAGE_INTEGRITY {
                after_integrity = true;
            }
        }

        let length = (m.length as usize)
            .checked_sub(size_reduced)
            .ok_or(Error::ErrAttributeSizeInvalid)?;
        // start_of_hmac should be first byte of integrity attribute.
        let start_of_hmac = (MESSAGE_HEADER_SIZE + length)
            .checked_sub(ATTRIBUTE_HEADER_SIZE + MESSAGE_INTEGRITY_SIZE)
            .ok_or(Error::ErrAttributeSizeInvalid)?;
        if start_of_hmac < MESSAGE_HEADER_SIZE || start_of_hmac > m.raw.len() {
            return Err(Error::ErrAttributeSizeInvalid);
        }

        let mut b = m.raw[..start_of_hmac].to_vec();
        b[2..4].copy_from_slice(&(length as u16).to_be_bytes());
        let expected = new_hmac(&self.0, &b)?;

        check_hmac(&v, &expected)
    }
}

impl MessageIntegrity {
    /// new_short_term_integrity returns new MessageIntegrity with key for short-term
    /// credentials. Password is SASL-prepared.
    pub fn new_short_term_integrity(password: String) -> Self {
        MessageIntegrity(password.into_bytes())
    }
}
