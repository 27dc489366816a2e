use crate::header::read_u16;
use shared::error::{Error, Result};
use std::fmt;

pub const RTCP_HEADER_LENGTH: usize = 4;
pub const RTCP_VERSION: u8 = 2;

/// RTCP packet types the transport recognises when tracing inbound control traffic.
pub const TYPE_SENDER_REPORT: u8 = 200;
pub const TYPE_RECEIVER_REPORT: u8 = 201;
pub const TYPE_SOURCE_DESCRIPTION: u8 = 202;
pub const TYPE_GOODBYE: u8 = 203;
pub const TYPE_APPLICATION_DEFINED: u8 = 204;
pub const TYPE_TRANSPORT_SPECIFIC_FEEDBACK: u8 = 205;
pub const TYPE_PAYLOAD_SPECIFIC_FEEDBACK: u8 = 206;

/// RTCP common header, RFC 3550 §6.4.1.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|    RC   |   PT=SR=200   |             length            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct RtcpHeader {
    pub padding: bool,
    /// Reception report count, or the feedback format for feedback packets
    pub count: u8,
    pub packet_type: u8,
    /// Length in 32-bit words minus one, as carried on the wire
    pub length: u16,
}

impl RtcpHeader {
    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        if raw.len() < RTCP_HEADER_LENGTH {
            return Err(Error::ErrTooShortRtcp);
        }

        let version = raw[0] >> 6;
        if version != RTCP_VERSION {
            return Err(Error::ErrBadVersion);
        }

        Ok(RtcpHeader {
            padding: (raw[0] >> 5) & 0x1 > 0,
            count: raw[0] & 0x1F,
            packet_type: raw[1],
            length: read_u16(raw, 2),
        })
    }

    /// Total packet size in bytes implied by the length field.
    pub fn packet_size(&self) -> usize {
        (self.length as usize + 1) * 4
    }
}

impl fmt::Display for RtcpHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.packet_type {
            TYPE_SENDER_REPORT => "SR",
            TYPE_RECEIVER_REPORT => "RR",
            TYPE_SOURCE_DESCRIPTION => "SDES",
            TYPE_GOODBYE => "BYE",
            TYPE_APPLICATION_DEFINED => "APP",
            TYPE_TRANSPORT_SPECIFIC_FEEDBACK => "RTPFB",
            TYPE_PAYLOAD_SPECIFIC_FEEDBACK => "PSFB",
            _ => "Unknown",
        };
        write!(
            f,
            "RTCP {}({}) count={} size={}",
            name,
            self.packet_type,
            self.count,
            self.packet_size()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_receiver_report_header() -> Result<()> {
        let raw = [0x81u8, 0xc9, 0x00, 0x07, 0x90, 0x2f, 0x9e, 0x2e];
        let header = RtcpHeader::unmarshal(&raw)?;
        assert_eq!(
            header,
            RtcpHeader {
                padding: false,
                count: 1,
                packet_type: TYPE_RECEIVER_REPORT,
                length: 7,
            }
        );
        assert_eq!(header.packet_size(), 32);
        assert_eq!(header.to_string(), "RTCP RR(201) count=1 size=32");
        Ok(())
    }

    #[test]
    fn test_short_and_bad_version() {
        assert_eq!(RtcpHeader::unmarshal(&[0x81, 0xc9]), Err(Error::ErrTooShortRtcp));
        assert_eq!(
            RtcpHeader::unmarshal(&[0x01, 0xc9, 0x00, 0x07]),
            Err(Error::ErrBadVersion)
        );
    }
}
