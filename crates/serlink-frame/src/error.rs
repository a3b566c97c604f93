/// Errors that can occur during frame decoding or reception.
///
/// None of these are fatal: the receiver drops the frame and resynchronizes
/// on the next flag, and the link layer recovers by retransmission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The header checksum (A ^ C) did not match.
    #[error("header checksum mismatch")]
    BccMismatch,

    /// A header or payload checksum did not match.
    #[error("frame checksum mismatch")]
    ChecksumMismatch,

    /// The byte sequence is not a well-formed frame.
    #[error("malformed frame: {0}")]
    Malformed(&'static str),

    /// The payload exceeds the configured maximum size.
    #[error("payload overrun ({size} bytes, max {max})")]
    Overrun { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
