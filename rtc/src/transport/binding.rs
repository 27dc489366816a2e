use log::{debug, warn};
use media::{MediaSource, RingReader, TrackType};
use shared::error::Result;
use std::sync::Arc;

/// The video track a transport forwards: its source, payload type and,
/// once the SRTP session exists, the ring subscription.
pub(crate) struct MediaTrackBinding {
    pub(crate) source: Arc<MediaSource>,
    pub(crate) payload_type: u8,
    pub(crate) reader: Option<RingReader>,
}

impl MediaTrackBinding {
    pub(crate) fn new(source: Arc<MediaSource>) -> Result<Self> {
        let payload_type = source.payload_type(TrackType::Video)?;
        Ok(Self {
            source,
            payload_type,
            reader: None,
        })
    }

    /// SSRC of the video track; 0 until the source knows it.
    pub(crate) fn ssrc(&self) -> u32 {
        self.source.ssrc(TrackType::Video).unwrap_or_else(|| {
            warn!("[media] video ssrc not known yet, announcing 0");
            0
        })
    }

    /// Subscribes to the source ring. Idempotent.
    pub(crate) fn activate(&mut self) {
        if self.reader.is_none() {
            self.reader = Some(self.source.attach());
            debug!(
                "[media] reader attached, {} readers on source",
                self.source.reader_count()
            );
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.reader.is_some()
    }
}
