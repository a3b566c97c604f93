use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use bytes::{Buf, BytesMut};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// One end of an in-process, full-duplex byte pipe.
///
/// Each `write_bytes` call travels as one chunk, so wrappers that want to
/// drop or corrupt whole frames can do so by intercepting writes.
#[derive(Debug)]
pub struct MemoryTransport {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    pending: BytesMut,
}

impl MemoryTransport {
    /// Create two connected ends.
    pub fn pair() -> (Self, Self) {
        let (left_tx, right_rx) = mpsc::channel();
        let (right_tx, left_rx) = mpsc::channel();
        (
            Self {
                tx: left_tx,
                rx: left_rx,
                pending: BytesMut::new(),
            },
            Self {
                tx: right_tx,
                rx: right_rx,
                pending: BytesMut::new(),
            },
        )
    }
}

impl Transport for MemoryTransport {
    fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if self.pending.is_empty() {
            match self.rx.recv_timeout(timeout) {
                Ok(chunk) => self.pending.extend_from_slice(&chunk),
                Err(RecvTimeoutError::Timeout) => return Ok(0),
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Shutdown),
            }
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        self.tx
            .send(data.to_vec())
            .map_err(|_| TransportError::Shutdown)?;
        Ok(data.len())
    }
}
