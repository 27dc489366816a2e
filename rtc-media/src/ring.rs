use log::{trace, warn};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::packet::MediaPacket;

/// One bundle of packets published to every reader at once, usually all
/// packets of one frame.
pub type RingData = Arc<Vec<MediaPacket>>;

/// Fan-out ring of packet bundles. Writers never block; a reader that falls
/// more than the ring size behind loses the oldest bundles.
pub(crate) struct Ring {
    sender: broadcast::Sender<RingData>,
}

impl Ring {
    pub(crate) fn new(size: usize) -> Self {
        let (sender, _) = broadcast::channel(size.max(1));
        Self { sender }
    }

    pub(crate) fn write(&self, data: RingData) {
        if self.sender.send(data).is_err() {
            trace!("[ring] no reader attached, bundle dropped");
        }
    }

    pub(crate) fn attach(&self) -> RingReader {
        RingReader {
            receiver: self.sender.subscribe(),
            skipped: 0,
        }
    }

    pub(crate) fn reader_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A cancellable subscription to a media source ring.
///
/// The reader only sees bundles written after it attached. It is polled by
/// whichever task owns it, so attaching from a transport's event loop binds
/// the subscription to that loop. Dropping the reader, or calling
/// [`RingReader::detach`], ends the subscription.
pub struct RingReader {
    receiver: broadcast::Receiver<RingData>,
    skipped: u64,
}

impl RingReader {
    /// Waits for the next bundle; `None` once the source is gone.
    ///
    /// Cancel safe, so it can be one branch of a `tokio::select!`.
    pub async fn recv(&mut self) -> Option<RingData> {
        loop {
            match self.receiver.recv().await {
                Ok(data) => return Some(data),
                Err(RecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next bundle if one is already waiting.
    pub fn try_recv(&mut self) -> Option<RingData> {
        loop {
            match self.receiver.try_recv() {
                Ok(data) => return Some(data),
                Err(TryRecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Bundles lost because this reader fell behind.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Ends the subscription.
    pub fn detach(self) {}

    fn lagged(&mut self, skipped: u64) {
        warn!("[ring] reader fell behind, skipped {skipped} bundles");
        self.skipped += skipped;
    }
}
