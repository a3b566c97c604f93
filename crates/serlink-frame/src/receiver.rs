use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::codec::{bcc, unstuff, Frame, DEFAULT_MAX_PAYLOAD, ESC, FLAG, MAX_PAYLOAD_LIMIT};
use crate::control::Control;
use crate::error::FrameError;

/// Parse position inside the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Hunting for an opening flag.
    Start,
    /// Saw one or more flags; next non-flag byte is the address.
    FlagReceived,
    /// Address stored; next byte is the control byte.
    AddressReceived,
    /// Control stored; next byte must be BCC1.
    ControlReceived,
    /// Header verified; expecting the closing flag or payload bytes.
    ChecksumReceived,
}

/// Outcome of feeding one byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveEvent {
    /// Need more bytes.
    Continue,
    /// A complete, checksum-verified frame.
    FrameReady(Frame),
    /// A started frame was corrupted and has been dropped.
    Error(FrameError),
}

/// Byte-at-a-time frame reassembler.
///
/// Bytes outside a frame (line noise, idle flags) are skipped silently;
/// only a frame that started and then went wrong yields
/// [`ReceiveEvent::Error`]. After any error or delivered frame the machine
/// is back at [`ReceiverState::Start`], so callers just keep feeding.
#[derive(Debug)]
pub struct FrameReceiver {
    state: ReceiverState,
    address: u8,
    control_byte: u8,
    control: Control,
    data: BytesMut,
    escaped: bool,
    max_payload: usize,
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReceiver {
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    /// Create a receiver that drops information frames larger than
    /// `max_payload` bytes, clamped to [`MAX_PAYLOAD_LIMIT`].
    pub fn with_max_payload(max_payload: usize) -> Self {
        let max_payload = max_payload.min(MAX_PAYLOAD_LIMIT);
        Self {
            state: ReceiverState::Start,
            address: 0,
            control_byte: 0,
            control: Control::Set,
            // Grows on demand past the default frame size.
            data: BytesMut::with_capacity(max_payload.min(DEFAULT_MAX_PAYLOAD) + 1),
            escaped: false,
            max_payload,
        }
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Drop any partial frame and hunt for the next flag.
    pub fn reset(&mut self) {
        self.state = ReceiverState::Start;
        self.data.clear();
        self.escaped = false;
    }

    /// Advance the machine by one byte.
    pub fn feed(&mut self, byte: u8) -> ReceiveEvent {
        match self.state {
            ReceiverState::Start => {
                if byte == FLAG {
                    self.state = ReceiverState::FlagReceived;
                }
                ReceiveEvent::Continue
            }
            ReceiverState::FlagReceived => {
                if byte != FLAG {
                    self.address = byte;
                    self.state = ReceiverState::AddressReceived;
                }
                ReceiveEvent::Continue
            }
            ReceiverState::AddressReceived => {
                if byte == FLAG {
                    return self.restart(FrameError::Malformed("flag in place of control byte"));
                }
                self.control_byte = byte;
                self.state = ReceiverState::ControlReceived;
                ReceiveEvent::Continue
            }
            ReceiverState::ControlReceived => {
                if byte == FLAG {
                    return self.restart(FrameError::BccMismatch);
                }
                if byte != self.address ^ self.control_byte {
                    return self.fail(FrameError::BccMismatch);
                }
                let Some(control) = Control::from_byte(self.control_byte) else {
                    return self.fail(FrameError::Malformed("unknown control byte"));
                };
                self.control = control;
                self.data.clear();
                self.escaped = false;
                self.state = ReceiverState::ChecksumReceived;
                ReceiveEvent::Continue
            }
            ReceiverState::ChecksumReceived if self.control.is_information() => {
                self.feed_information(byte)
            }
            ReceiverState::ChecksumReceived => {
                if byte != FLAG {
                    return self.fail(FrameError::Malformed("supervisory frame not terminated"));
                }
                let frame = Frame::supervisory(self.address, self.control);
                self.reset();
                ReceiveEvent::FrameReady(frame)
            }
        }
    }

    fn feed_information(&mut self, byte: u8) -> ReceiveEvent {
        if self.escaped {
            self.escaped = false;
            if byte == FLAG {
                return self.fail(FrameError::Malformed("frame ends inside escape"));
            }
            let Some(byte) = unstuff(byte) else {
                return self.fail(FrameError::Malformed("invalid escape sequence"));
            };
            return self.push(byte);
        }

        match byte {
            FLAG => self.finish_information(),
            ESC => {
                self.escaped = true;
                ReceiveEvent::Continue
            }
            _ => self.push(byte),
        }
    }

    fn push(&mut self, byte: u8) -> ReceiveEvent {
        // One extra byte for the trailing BCC2.
        if self.data.len() > self.max_payload {
            return self.fail(FrameError::Overrun {
                size: self.data.len() + 1,
                max: self.max_payload,
            });
        }
        self.data.put_u8(byte);
        ReceiveEvent::Continue
    }

    fn finish_information(&mut self) -> ReceiveEvent {
        let Some(&bcc2) = self.data.last() else {
            return self.fail(FrameError::Malformed("missing payload checksum"));
        };
        let payload_len = self.data.len() - 1;
        if bcc(&self.data[..payload_len]) != bcc2 {
            return self.fail(FrameError::ChecksumMismatch);
        }

        let mut payload = self.data.split();
        payload.truncate(payload_len);
        let frame = Frame {
            address: self.address,
            control: self.control,
            payload: payload.freeze(),
        };
        self.reset();
        ReceiveEvent::FrameReady(frame)
    }

    fn fail(&mut self, err: FrameError) -> ReceiveEvent {
        trace!(state = ?self.state, %err, "dropping frame");
        self.reset();
        ReceiveEvent::Error(err)
    }

    /// Drop the truncated header and take the flag as the opener of the
    /// next frame.
    fn restart(&mut self, err: FrameError) -> ReceiveEvent {
        let event = self.fail(err);
        self.state = ReceiverState::FlagReceived;
        event
    }
}
