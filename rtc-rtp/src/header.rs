use shared::error::{Error, Result};
use std::fmt;

pub const HEADER_LENGTH: usize = 4;
pub const VERSION_SHIFT: u8 = 6;
pub const VERSION_MASK: u8 = 0x3;
pub const PADDING_SHIFT: u8 = 5;
pub const PADDING_MASK: u8 = 0x1;
pub const EXTENSION_SHIFT: u8 = 4;
pub const EXTENSION_MASK: u8 = 0x1;
pub const CC_MASK: u8 = 0xF;
pub const MARKER_SHIFT: u8 = 7;
pub const MARKER_MASK: u8 = 0x1;
pub const PT_MASK: u8 = 0x7F;
pub const SEQ_NUM_OFFSET: usize = 2;
pub const TIMESTAMP_OFFSET: usize = 4;
pub const SSRC_OFFSET: usize = 8;
pub const CSRC_OFFSET: usize = 12;
pub const CSRC_LENGTH: usize = 4;
pub const EXTENSION_HEADER_LENGTH: usize = 4;

/// Fixed RTP header size without CSRCs or extension.
pub const FIXED_HEADER_SIZE: usize = 12;

/// RTP fixed header, RFC 3550 §5.1.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       sequence number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |           synchronization source (SSRC) identifier            |
/// +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// |            contributing source (CSRC) identifiers             |
/// |                             ....                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Every field is copied out of the buffer after its bounds were checked,
/// so a truncated datagram yields an error instead of a short read.
#[derive(Debug, Eq, PartialEq, Default, Clone)]
pub struct RtpHeader {
    pub version: u8,
    pub padding: bool,
    pub extension: bool,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    pub extension_profile: u16,
    /// Extension payload length in bytes (the wire value is in 32-bit words)
    pub extension_length: usize,
}

impl RtpHeader {
    /// Parses the header at the start of `raw`.
    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        if raw.len() < HEADER_LENGTH {
            return Err(Error::ErrHeaderSizeInsufficient);
        }

        let b0 = raw[0];
        let version = (b0 >> VERSION_SHIFT) & VERSION_MASK;
        if version != 2 {
            return Err(Error::ErrBadVersion);
        }
        let padding = ((b0 >> PADDING_SHIFT) & PADDING_MASK) > 0;
        let extension = ((b0 >> EXTENSION_SHIFT) & EXTENSION_MASK) > 0;
        let cc = (b0 & CC_MASK) as usize;

        let mut curr_offset = CSRC_OFFSET + cc * CSRC_LENGTH;
        if raw.len() < curr_offset {
            return Err(Error::ErrTooShortRtp);
        }

        let b1 = raw[1];
        let marker = ((b1 >> MARKER_SHIFT) & MARKER_MASK) > 0;
        let payload_type = b1 & PT_MASK;

        let sequence_number = read_u16(raw, SEQ_NUM_OFFSET);
        let timestamp = read_u32(raw, TIMESTAMP_OFFSET);
        let ssrc = read_u32(raw, SSRC_OFFSET);

        let csrc = (0..cc)
            .map(|i| read_u32(raw, CSRC_OFFSET + i * CSRC_LENGTH))
            .collect();

        let (extension_profile, extension_length) = if extension {
            if raw.len() < curr_offset + EXTENSION_HEADER_LENGTH {
                return Err(Error::ErrHeaderSizeInsufficientForExtension);
            }
            let profile = read_u16(raw, curr_offset);
            let length = read_u16(raw, curr_offset + 2) as usize * 4;
            curr_offset += EXTENSION_HEADER_LENGTH;
            if raw.len() < curr_offset + length {
                return Err(Error::ErrHeaderSizeInsufficientForExtension);
            }
            (profile, length)
        } else {
            (0, 0)
        };

        Ok(RtpHeader {
            version,
            padding,
            extension,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc,
            extension_profile,
            extension_length,
        })
    }

    /// Size of the header on the wire, including CSRCs and extension.
    pub fn header_size(&self) -> usize {
        let mut size = FIXED_HEADER_SIZE + self.csrc.len() * CSRC_LENGTH;
        if self.extension {
            size += EXTENSION_HEADER_LENGTH + self.extension_length;
        }
        size
    }
}

impl fmt::Display for RtpHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RTP v{} pt={} seq={} ts={} ssrc={} marker={}",
            self.version,
            self.payload_type,
            self.sequence_number,
            self.timestamp,
            self.ssrc,
            self.marker
        )?;
        if !self.csrc.is_empty() {
            write!(f, " csrc={:?}", self.csrc)?;
        }
        if self.extension {
            write!(
                f,
                " ext=0x{:04x}/{}",
                self.extension_profile, self.extension_length
            )?;
        }
        if self.padding {
            write!(f, " padding")?;
        }
        Ok(())
    }
}

pub(crate) fn read_u16(raw: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([raw[offset], raw[offset + 1]])
}

pub(crate) fn read_u32(raw: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        raw[offset],
        raw[offset + 1],
        raw[offset + 2],
        raw[offset + 3],
    ])
}
