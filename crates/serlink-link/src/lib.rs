//! Reliable, ordered delivery over an unreliable serial byte stream.
//!
//! This is the link control layer. It opens a connection with a SET/UA
//! handshake, moves payloads as numbered information frames with
//! stop-and-wait acknowledgment (RR/REJ), and tears down with
//! DISC/DISC/UA. Lost or corrupted frames are recovered by timeout-driven
//! retransmission; only an exhausted retry budget reaches the caller.

pub mod cancel;
pub mod config;
pub mod connection;
#[cfg(unix)]
pub mod connector;
pub mod error;
mod handshake;
pub mod retry;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use cancel::CancelToken;
pub use config::{LinkConfig, Role, MAX_RETRANSMISSIONS_DEFAULT, TIMEOUT_DEFAULT};
pub use connection::{Connection, ConnectionState};
#[cfg(unix)]
pub use connector::{open, open_with_cancel};
pub use error::{LinkError, Result};
pub use retry::RetryTimer;
pub use stats::LinkStats;
