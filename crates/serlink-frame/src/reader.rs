use std::time::Instant;

use bytes::{Buf, BytesMut};
use serlink_transport::Transport;
use tracing::trace;

use crate::codec::DEFAULT_MAX_PAYLOAD;
use crate::receiver::{FrameReceiver, ReceiveEvent};

const READ_CHUNK_SIZE: usize = 256;

/// Pulls bytes from a [`Transport`] through a [`FrameReceiver`].
///
/// Bytes read past the end of a frame are kept for the next call, so
/// frames that arrive back to back in one read are not lost.
#[derive(Debug)]
pub struct FrameReader {
    receiver: FrameReceiver,
    backlog: BytesMut,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            receiver: FrameReceiver::with_max_payload(max_payload),
            backlog: BytesMut::with_capacity(READ_CHUNK_SIZE),
        }
    }

    /// Wait for the next frame or frame error, up to `deadline`.
    ///
    /// Returns `Ok(None)` once the deadline passes. Never returns
    /// [`ReceiveEvent::Continue`].
    pub fn next_event<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        deadline: Instant,
    ) -> serlink_transport::Result<Option<ReceiveEvent>> {
        loop {
            while self.backlog.has_remaining() {
                match self.receiver.feed(self.backlog.get_u8()) {
                    ReceiveEvent::Continue => {}
                    event => return Ok(Some(event)),
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let n = transport.read_bytes(&mut chunk, deadline - now)?;
            if n > 0 {
                trace!(bytes = ?&chunk[..n], "rx");
                self.backlog.extend_from_slice(&chunk[..n]);
            }
        }
    }

    /// Drop unread bytes and any partial frame.
    pub fn clear(&mut self) {
        self.backlog.clear();
        self.receiver.reset();
    }

    /// Borrow the underlying state machine.
    pub fn receiver(&self) -> &FrameReceiver {
        &self.receiver
    }
}
