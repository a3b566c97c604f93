use std::io::ErrorKind;

use bytes::BytesMut;
use serlink_transport::{Transport, TransportError};
use tracing::trace;

use crate::codec::{encode_into, Frame};

const INITIAL_BUFFER_CAPACITY: usize = 2 * 1024;

/// Encodes frames and writes them out in full.
#[derive(Debug)]
pub struct FrameWriter {
    buf: BytesMut,
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameWriter {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Encode `frame` and write every byte of it, then flush.
    ///
    /// Returns the number of bytes put on the wire.
    pub fn write_frame<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        frame: &Frame,
    ) -> serlink_transport::Result<usize> {
        self.buf.clear();
        encode_into(frame, &mut self.buf);
        trace!(control = %frame.control, bytes = ?&self.buf[..], "tx");

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match transport.write_bytes(&self.buf[offset..]) {
                Ok(0) => return Err(TransportError::Shutdown),
                Ok(n) => offset += n,
                // Transports block until they make progress; a WouldBlock
                // leaking out is reported rather than spun on.
                Err(TransportError::Io(err)) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        transport.flush()?;
        Ok(self.buf.len())
    }

    /// The wire bytes of the most recently written frame.
    pub fn last_written(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serlink_transport::MemoryTransport;

    use super::*;
    use crate::codec::{decode, FLAG};
    use crate::control::{Control, Seq, ADDRESS_INITIATOR};

    #[test]
    fn writes_decodable_frame() {
        let (mut left, mut right) = MemoryTransport::pair();
        let frame = Frame::information(ADDRESS_INITIATOR, Seq::One, &b"payload"[..]);

        let mut writer = FrameWriter::new();
        let written = writer.write_frame(&mut left, &frame).unwrap();

        let mut buf = [0u8; 64];
        let n = right.read_bytes(&mut buf, Duration::from_secs(1)).unwrap();
        assert_eq!(n, written);
        assert_eq!(decode(&buf[..n]).unwrap(), frame);
        assert_eq!(writer.last_written(), &buf[..n]);
    }

    #[test]
    fn retries_short_and_interrupted_writes() {
        let mut sink = ChoppyWriter::default();
        let frame = Frame::supervisory(ADDRESS_INITIATOR, Control::Disc);

        let mut writer = FrameWriter::new();
        writer.write_frame(&mut sink, &frame).unwrap();

        assert_eq!(sink.written, vec![FLAG, 0x03, 0x0B, 0x08, FLAG]);
        assert!(sink.flushed);
        assert!(sink.interruptions > 0);
    }

    #[test]
    fn zero_length_write_is_shutdown() {
        let mut sink = ClosedWriter;
        let frame = Frame::supervisory(ADDRESS_INITIATOR, Control::Set);
        let err = FrameWriter::new().write_frame(&mut sink, &frame).unwrap_err();
        assert!(matches!(err, TransportError::Shutdown));
    }

    #[test]
    fn would_block_is_reported_not_retried() {
        let mut sink = StalledWriter::default();
        let frame = Frame::supervisory(ADDRESS_INITIATOR, Control::Set);

        let err = FrameWriter::new().write_frame(&mut sink, &frame).unwrap_err();

        assert!(
            matches!(&err, TransportError::Io(io) if io.kind() == ErrorKind::WouldBlock),
            "{err:?}"
        );
        assert_eq!(sink.calls, 1);
    }

    /// Accepts one byte per call and interrupts every other call.
    #[derive(Default)]
    struct ChoppyWriter {
        written: Vec<u8>,
        interruptions: usize,
        calls: usize,
        flushed: bool,
    }

    impl Transport for ChoppyWriter {
        fn read_bytes(
            &mut self,
            _buf: &mut [u8],
            _timeout: Duration,
        ) -> serlink_transport::Result<usize> {
            Ok(0)
        }

        fn write_bytes(&mut self, data: &[u8]) -> serlink_transport::Result<usize> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                self.interruptions += 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted).into());
            }
            self.written.push(data[0]);
            Ok(1)
        }

        fn flush(&mut self) -> serlink_transport::Result<()> {
            self.flushed = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct StalledWriter {
        calls: usize,
    }

    impl Transport for StalledWriter {
        fn read_bytes(
            &mut self,
            _buf: &mut [u8],
            _timeout: Duration,
        ) -> serlink_transport::Result<usize> {
            Ok(0)
        }

        fn write_bytes(&mut self, _data: &[u8]) -> serlink_transport::Result<usize> {
            self.calls += 1;
            Err(std::io::Error::from(ErrorKind::WouldBlock).into())
        }
    }

    struct ClosedWriter;

    impl Transport for ClosedWriter {
        fn read_bytes(
            &mut self,
            _buf: &mut [u8],
            _timeout: Duration,
        ) -> serlink_transport::Result<usize> {
            Ok(0)
        }

        fn write_bytes(&mut self, _data: &[u8]) -> serlink_transport::Result<usize> {
            Ok(0)
        }
    }
}
