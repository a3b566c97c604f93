//! Reliable point-to-point data link over serial lines.
//!
//! serlink turns a raw serial byte stream into a connection with ordered,
//! exactly-once delivery: HDLC-style framing with byte stuffing and XOR
//! checksums, a SET/UA handshake, and stop-and-wait retransmission.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte transports (serial devices, in-memory pairs)
//! - [`frame`]: frame codec and byte-level receiver state machine
//! - [`link`]: connection lifecycle, acknowledgment, and retransmission
//!
//! ```no_run
//! use serlink::link::{LinkConfig, Role};
//!
//! let config = LinkConfig::new("/dev/ttyS0", Role::Initiator);
//! let mut conn = serlink::link::open(config)?;
//! conn.send(b"hello")?;
//! conn.close()?;
//! # Ok::<(), serlink::link::LinkError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use serlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serlink_frame::*;
}

/// Re-export link types.
pub mod link {
    pub use serlink_link::*;
}
