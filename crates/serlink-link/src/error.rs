use serlink_transport::TransportError;

/// Errors surfaced by link operations.
///
/// Frame corruption never shows up here; it is absorbed by retransmission.
/// Apart from usage errors, callers see either a setup failure or an
/// exhausted retry budget.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The serial device could not be opened or configured.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(#[source] TransportError),

    /// The SET/UA or DISC handshake got no answer.
    #[error("handshake timed out after {attempts} attempt(s)")]
    ConnectionTimeout { attempts: u32 },

    /// An information frame was never acknowledged.
    #[error("frame not acknowledged after {attempts} transmission(s)")]
    RetransmissionLimitExceeded { attempts: u32 },

    /// I/O failure on an already configured transport.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The operation needs an open connection.
    #[error("connection is not open")]
    NotOpen,

    /// `open` called on a connection that is not closed.
    #[error("connection is already open")]
    AlreadyOpen,

    /// The payload does not fit in one information frame.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The peer asked to disconnect.
    #[error("peer disconnected")]
    Disconnected,

    /// The connection's cancel token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LinkError>;
