use std::time::Duration;

use crate::error::Result;

/// A raw byte stream with timed reads and unbuffered writes.
///
/// Implementations must not apply any line discipline: every byte written
/// by the peer is delivered as-is, in order.
pub trait Transport {
    /// Read whatever bytes are available, waiting at most `timeout`.
    ///
    /// Returns `Ok(0)` when the timeout elapses with nothing to read. A
    /// timeout is not an error at this layer.
    fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Write bytes, returning how many were accepted.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize>;

    /// Wait until written bytes have left the local buffers.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        (**self).read_bytes(buf, timeout)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write_bytes(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        (**self).read_bytes(buf, timeout)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write_bytes(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Socket streams cannot take a zero read timeout.
#[cfg(unix)]
const MIN_SOCKET_TIMEOUT: Duration = Duration::from_millis(1);

#[cfg(unix)]
impl Transport for std::os::unix::net::UnixStream {
    fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        use std::io::{ErrorKind, Read};

        if buf.is_empty() {
            return Ok(0);
        }
        self.set_read_timeout(Some(timeout.max(MIN_SOCKET_TIMEOUT)))?;
        match self.read(buf) {
            Ok(0) => Err(crate::TransportError::Shutdown),
            Ok(n) => Ok(n),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        std::io::Write::write(self, data).map_err(Into::into)
    }

    fn flush(&mut self) -> Result<()> {
        std::io::Write::flush(self).map_err(Into::into)
    }
}
