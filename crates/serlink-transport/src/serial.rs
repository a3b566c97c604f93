use std::io::{self, ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits, TTYPort};
use tracing::info;

use crate::baud::BaudRate;
use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Upper bound on one blocked write before it is reported as an error.
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// A serial device in raw 8N1 mode.
///
/// The port is opened in exclusive mode and additionally holds an advisory
/// lock, so a second handle on the same port fails fast with
/// [`TransportError::Busy`] instead of interleaving bytes.
pub struct SerialDevice {
    port: TTYPort,
    path: PathBuf,
    baud_rate: BaudRate,
}

impl SerialDevice {
    /// Open `path` and switch it to raw 8N1 at `baud_rate`.
    pub fn open(path: impl AsRef<Path>, baud_rate: BaudRate) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let builder = serialport::new(path.to_string_lossy(), baud_rate.bits_per_second())
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(WRITE_TIMEOUT);
        let port = TTYPort::open(&builder).map_err(|err| open_error(&path, err))?;

        lock_exclusive(&port).map_err(|err| {
            if err.kind() == ErrorKind::WouldBlock {
                TransportError::Busy { path: path.clone() }
            } else {
                TransportError::Open {
                    path: path.clone(),
                    source: err,
                }
            }
        })?;

        port.clear(ClearBuffer::All).map_err(|err| TransportError::Configure {
            path: path.clone(),
            source: err.into(),
        })?;

        info!(?path, %baud_rate, "serial device configured");

        Ok(Self {
            port,
            path,
            baud_rate,
        })
    }

    /// The device path this handle was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configured line speed.
    pub fn baud_rate(&self) -> BaudRate {
        self.baud_rate
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|err| TransportError::Io(err.into()))
    }
}

impl Transport for SerialDevice {
    fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.set_timeout(timeout)?;
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        self.set_timeout(WRITE_TIMEOUT)?;
        loop {
            match self.port.write(data) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        // Waits until the driver has put every byte on the line.
        self.port.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for SerialDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDevice")
            .field("path", &self.path)
            .field("baud_rate", &self.baud_rate)
            .finish()
    }
}

/// Sort a failed open into missing node, busy port, or a device that
/// refused the line settings.
fn open_error(path: &Path, err: serialport::Error) -> TransportError {
    let path = path.to_path_buf();
    match err.kind() {
        serialport::ErrorKind::NoDevice => TransportError::Open {
            path,
            source: io::Error::new(ErrorKind::NotFound, err.description),
        },
        serialport::ErrorKind::Io(ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
            TransportError::Open {
                path,
                source: err.into(),
            }
        }
        _ if is_busy(&err) => TransportError::Busy { path },
        _ => TransportError::Configure {
            path,
            source: err.into(),
        },
    }
}

// TIOCEXCL refusals surface as EBUSY, which serialport leaves unclassified.
fn is_busy(err: &serialport::Error) -> bool {
    matches!(
        err.kind(),
        serialport::ErrorKind::Io(ErrorKind::ResourceBusy | ErrorKind::WouldBlock)
    ) || err.description.to_ascii_lowercase().contains("busy")
}

fn lock_exclusive(handle: &impl AsRawFd) -> io::Result<()> {
    // SAFETY: `handle` owns an open descriptor for the duration of the call.
    let rc = unsafe { libc::flock(handle.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
