//! HDLC-style framing for the serlink data-link layer.
//!
//! Every frame on the wire looks like:
//! ```text
//! FLAG | A | C | BCC1 | [ stuffed(payload ++ BCC2) ] | FLAG
//! 0x7E                                                 0x7E
//! ```
//! - `A` identifies which peer sent the frame, `C` its type
//! - `BCC1 = A ^ C`; `BCC2` is the running XOR of the payload
//! - only information frames carry a payload; inside it `0x7E`/`0x7D`
//!   are escaped as `0x7D 0x5E` / `0x7D 0x5D`
//!
//! [`FrameReceiver`] reassembles frames one byte at a time and resynchronizes
//! on the next flag after any corruption.

pub mod codec;
pub mod control;
pub mod error;
pub mod reader;
pub mod receiver;
pub mod writer;

pub use codec::{
    bcc, decode, encode, encode_into, Frame, DEFAULT_MAX_PAYLOAD, ESC, ESC_ESC, ESC_FLAG, FLAG,
    MAX_PAYLOAD_LIMIT, SUPERVISORY_FRAME_SIZE,
};
pub use control::{Control, Seq, ADDRESS_INITIATOR, ADDRESS_RESPONDER};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use receiver::{FrameReceiver, ReceiveEvent, ReceiverState};
pub use writer::FrameWriter;
