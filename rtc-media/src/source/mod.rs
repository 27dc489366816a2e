#[cfg(test)]
mod source_test;

use log::debug;
use rtp::RtpHeader;
use sdp::description::media::MediaDescription;
use sdp::description::session::{ATTR_KEY_SSRC, SessionDescription};
use shared::error::{Error, Result};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, PoisonError};

use crate::packet::MediaPacket;
use crate::ring::{Ring, RingReader};
use crate::track::TrackType;

/// Ring size used when the caller has no preference.
pub const DEFAULT_RING_SIZE: usize = 512;

/// An upstream media source: its SDP and a ring of RTP packets shared,
/// read only, by every transport that forwards it.
pub struct MediaSource {
    sdp: String,
    description: SessionDescription,
    ssrcs: Mutex<HashMap<TrackType, u32>>,
    ring: Ring,
}

impl MediaSource {
    /// Creates a source described by `sdp`, whose ring keeps `ring_size` bundles.
    pub fn new(sdp: &str, ring_size: usize) -> Result<Self> {
        let mut reader = Cursor::new(sdp.as_bytes());
        let description = SessionDescription::unmarshal(&mut reader)
            .map_err(|err| Error::OtherSdpErr(err.to_string()))?;

        let mut ssrcs = HashMap::new();
        for media in &description.media_descriptions {
            let track_type = match media.media_name.media.parse::<TrackType>() {
                Ok(track_type) => track_type,
                Err(_) => continue,
            };
            if let Some(ssrc) = first_ssrc(media) {
                ssrcs.entry(track_type).or_insert(ssrc);
            }
        }
        debug!(
            "[media] source with {} media sections, ssrcs {:?}",
            description.media_descriptions.len(),
            ssrcs
        );

        Ok(Self {
            sdp: sdp.to_owned(),
            description,
            ssrcs: Mutex::new(ssrcs),
            ring: Ring::new(ring_size),
        })
    }

    /// The SDP the source was created from.
    pub fn sdp(&self) -> &str {
        &self.sdp
    }

    fn media(&self, track_type: TrackType) -> Option<&MediaDescription> {
        self.description
            .media_descriptions
            .iter()
            .find(|media| media.media_name.media.parse::<TrackType>().ok() == Some(track_type))
    }

    pub fn has_track(&self, track_type: TrackType) -> bool {
        self.media(track_type).is_some()
    }

    /// Payload type of a track: the first format of its `m=` line.
    pub fn payload_type(&self, track_type: TrackType) -> Result<u8> {
        let media = self
            .media(track_type)
            .ok_or_else(|| Error::ErrNoSuchTrack(track_type.to_string()))?;
        media
            .media_name
            .formats
            .first()
            .and_then(|format| format.parse::<u8>().ok())
            .ok_or_else(|| Error::ErrNoPayloadType(track_type.to_string()))
    }

    /// SSRC of a track, from `a=ssrc` or else from the first packet written.
    pub fn ssrc(&self, track_type: TrackType) -> Option<u32> {
        self.ssrcs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&track_type)
            .copied()
    }

    /// Publishes one bundle to every attached reader.
    pub fn write(&self, packets: Vec<MediaPacket>) {
        {
            let mut ssrcs = self.ssrcs.lock().unwrap_or_else(PoisonError::into_inner);
            for packet in &packets {
                if ssrcs.contains_key(&packet.track_type) {
                    continue;
                }
                if let Ok(header) = RtpHeader::unmarshal(packet.rtp()) {
                    debug!(
                        "[media] learned {} ssrc {} from the first packet",
                        packet.track_type, header.ssrc
                    );
                    ssrcs.insert(packet.track_type, header.ssrc);
                }
            }
        }

        self.ring.write(Arc::new(packets));
    }

    /// Subscribes a new reader; it sees bundles written from now on.
    pub fn attach(&self) -> RingReader {
        self.ring.attach()
    }

    /// Readers currently attached.
    pub fn reader_count(&self) -> usize {
        self.ring.reader_count()
    }
}

fn first_ssrc(media: &MediaDescription) -> Option<u32> {
    media
        .attributes
        .iter()
        .filter(|attr| attr.key == ATTR_KEY_SSRC)
        .filter_map(|attr| attr.value.as_deref())
        .find_map(|value| value.split_whitespace().next()?.parse::<u32>().ok())
}
