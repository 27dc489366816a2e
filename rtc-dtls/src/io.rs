use bytes::BytesMut;
use std::collections::VecDeque;
use std::io::{self, Read, Write};

/// In-memory datagram pipe the TLS library reads records from and writes
/// records to. Each `read` yields at most one queued datagram and each
/// `write` produces exactly one outbound datagram.
#[derive(Debug, Default)]
pub(crate) struct DatagramBuffer {
    pub(crate) incoming: VecDeque<BytesMut>,
    pub(crate) outgoing: VecDeque<BytesMut>,
}

impl Read for DatagramBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.incoming.pop_front() {
            Some(datagram) => {
                let n = buf.len().min(datagram.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                Ok(n)
            }
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }
}

impl Write for DatagramBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.outgoing.push_back(BytesMut::from(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
