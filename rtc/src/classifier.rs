use shared::util::{is_rtcp, match_dtls, match_srtp_or_srtcp};
use std::fmt;

/// Protocol a datagram arriving on the shared socket belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PacketKind {
    Stun,
    Dtls,
    Rtp,
    Rtcp,
    Unrecognized,
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            PacketKind::Stun => "stun",
            PacketKind::Dtls => "dtls",
            PacketKind::Rtp => "rtp",
            PacketKind::Rtcp => "rtcp",
            PacketKind::Unrecognized => "unrecognized",
        };
        write!(f, "{s}")
    }
}

/// Classifies a datagram by its leading bytes.
///
/// The checks run in a fixed order: the STUN signature first, then the
/// DTLS content-type range `[20, 63]`, then the RTP/RTCP split on the
/// second byte, where payload types in `[64, 96)` are RTCP (RFC 5761).
/// Anything shorter than two bytes, or not RTP version 2, is
/// [`PacketKind::Unrecognized`].
pub fn classify(buf: &[u8]) -> PacketKind {
    if stun::message::is_message(buf) {
        PacketKind::Stun
    } else if match_dtls(buf) {
        PacketKind::Dtls
    } else if buf.len() < 2 || !match_srtp_or_srtcp(buf) {
        PacketKind::Unrecognized
    } else if is_rtcp(buf) {
        PacketKind::Rtcp
    } else {
        PacketKind::Rtp
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn stun_header(first: u8) -> Vec<u8> {
        let mut b = vec![first, 0x01, 0x00, 0x00, 0x21, 0x12, 0xa4, 0x42];
        b.extend_from_slice(&[0u8; 12]);
        b
    }

    #[test]
    fn test_classify_stun_before_dtls() {
        assert_eq!(classify(&stun_header(0x00)), PacketKind::Stun);

        // Bad magic cookie: no longer STUN, and 0x00 is outside every other range.
        let mut b = stun_header(0x00);
        b[4] = 0;
        assert_eq!(classify(&b), PacketKind::Unrecognized);
    }

    #[test]
    fn test_classify_dtls_range() {
        for first in 20u8..=63 {
            assert_eq!(
                classify(&[first, 0xfe, 0xfd, 0, 0]),
                PacketKind::Dtls,
                "first byte {first}"
            );
        }
        assert_eq!(classify(&[19, 0xfe, 0xfd]), PacketKind::Unrecognized);
        assert_eq!(classify(&[64, 0xfe, 0xfd]), PacketKind::Unrecognized);
    }

    #[test]
    fn test_classify_rtp_rtcp_split() {
        for pt in 0u8..128 {
            let expected = if (64..96).contains(&pt) {
                PacketKind::Rtcp
            } else {
                PacketKind::Rtp
            };
            assert_eq!(classify(&[0x80, pt]), expected, "pt {pt}");
            assert_eq!(classify(&[0x80, 0x80 | pt]), expected, "pt {pt} with marker");
        }
    }

    #[test]
    fn test_classify_noise() {
        assert_eq!(classify(&[]), PacketKind::Unrecognized);
        assert_eq!(classify(&[0x80]), PacketKind::Unrecognized);
        assert_eq!(classify(&[0x40, 96]), PacketKind::Unrecognized);
        assert_eq!(classify(&[0xc0, 96]), PacketKind::Unrecognized);
        assert_eq!(classify(&[0xff; 2]), PacketKind::Unrecognized);
    }

    #[test]
    fn test_classify_rtp_version_bounds() {
        for first in 0x80u8..=0xbf {
            assert_eq!(classify(&[first, 96]), PacketKind::Rtp, "first byte {first:#x}");
        }
        assert_eq!(classify(&[0x7f, 96]), PacketKind::Unrecognized);
        assert_eq!(classify(&[0xc0, 96]), PacketKind::Unrecognized);
    }
}
