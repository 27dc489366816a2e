use bytes::{BufMut, Bytes, BytesMut};
use shared::error::{Error, Result};

use crate::track::TrackType;

/// Size of the RTP-over-TCP interleaved prefix (RFC 2326 Section 10.12):
/// `'$'`, channel, 16-bit length.
pub const RTP_TCP_HEADER_SIZE: usize = 4;

/// One RTP packet of a media source, stored the way the RTSP pipeline keeps
/// it: behind the interleaved prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPacket {
    pub track_type: TrackType,
    pub data: Bytes,
}

impl MediaPacket {
    /// Wraps a bare RTP packet, adding the interleaved prefix.
    ///
    /// The prefix length field is 16 bits wide, so larger packets are
    /// rejected.
    pub fn from_rtp(track_type: TrackType, rtp: &[u8]) -> Result<Self> {
        let len = u16::try_from(rtp.len())
            .map_err(|_| Error::ErrMediaPacketTooLarge(rtp.len(), u16::MAX as usize))?;
        let channel = match track_type {
            TrackType::Video => 0,
            TrackType::Audio => 2,
        };

        let mut data = BytesMut::with_capacity(RTP_TCP_HEADER_SIZE + rtp.len());
        data.put_u8(b'$');
        data.put_u8(channel);
        data.put_u16(len);
        data.extend_from_slice(rtp);

        Ok(Self {
            track_type,
            data: data.freeze(),
        })
    }

    /// The RTP packet after the interleaved prefix.
    pub fn rtp(&self) -> &[u8] {
        self.data.get(RTP_TCP_HEADER_SIZE..).unwrap_or_default()
    }

    /// Length of the RTP packet alone.
    pub fn rtp_len(&self) -> usize {
        self.rtp().len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_interleaved_prefix() -> Result<()> {
        let rtp = [0x80u8, 96, 0, 1, 0, 0, 0, 0, 0, 0, 0, 42, 0xaa];
        let packet = MediaPacket::from_rtp(TrackType::Video, &rtp)?;
        assert_eq!(&packet.data[..4], &[b'$', 0, 0, 13]);
        assert_eq!(packet.rtp(), &rtp[..]);
        assert_eq!(packet.rtp_len(), 13);

        let audio = MediaPacket::from_rtp(TrackType::Audio, &rtp)?;
        assert_eq!(audio.data[1], 2);

        let truncated = MediaPacket {
            track_type: TrackType::Video,
            data: Bytes::from_static(b"$\x00"),
        };
        assert!(truncated.rtp().is_empty());
        Ok(())
    }

    #[test]
    fn test_oversized_packet_is_rejected() -> Result<()> {
        let largest = vec![0x80u8; u16::MAX as usize];
        let packet = MediaPacket::from_rtp(TrackType::Video, &largest)?;
        assert_eq!(&packet.data[2..4], &[0xff, 0xff]);
        assert_eq!(packet.rtp_len(), largest.len());

        let oversized = vec![0x80u8; u16::MAX as usize + 1];
        assert_eq!(
            MediaPacket::from_rtp(TrackType::Video, &oversized),
            Err(Error::ErrMediaPacketTooLarge(65536, 65535))
        );
        Ok(())
    }
}
