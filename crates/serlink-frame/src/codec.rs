use bytes::{BufMut, Bytes, BytesMut};

use crate::control::{Control, Seq};
use crate::error::{FrameError, Result};

/// Frame delimiter.
pub const FLAG: u8 = 0x7E;
/// Escape byte used for stuffing.
pub const ESC: u8 = 0x7D;
/// Second byte of an escaped FLAG.
pub const ESC_FLAG: u8 = 0x5E;
/// Second byte of an escaped ESC.
pub const ESC_ESC: u8 = 0x5D;

/// Wire size of a supervisory frame: FLAG A C BCC1 FLAG.
pub const SUPERVISORY_FRAME_SIZE: usize = 5;

/// Default maximum payload of one information frame.
pub const DEFAULT_MAX_PAYLOAD: usize = 1000;

/// Largest payload a link may be configured for.
pub const MAX_PAYLOAD_LIMIT: usize = 64 * 1024;

/// A link-layer frame.
///
/// Supervisory frames (SET, UA, DISC, RR, REJ) have an empty payload; use
/// the constructors to keep that invariant. Checksums are computed on
/// encode and verified on decode, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Which peer sent the frame.
    pub address: u8,
    /// The frame type.
    pub control: Control,
    /// The payload (information frames only).
    pub payload: Bytes,
}

impl Frame {
    /// Create a supervisory frame.
    ///
    /// An `Info` control yields an information frame with an empty payload.
    pub fn supervisory(address: u8, control: Control) -> Self {
        Self {
            address,
            control,
            payload: Bytes::new(),
        }
    }

    /// Create a numbered information frame.
    pub fn information(address: u8, seq: Seq, payload: impl Into<Bytes>) -> Self {
        Self {
            address,
            control: Control::Info(seq),
            payload: payload.into(),
        }
    }

    /// BCC1: address XOR control.
    pub fn header_checksum(&self) -> u8 {
        self.address ^ self.control.to_byte()
    }

    /// BCC2: running XOR of the payload.
    pub fn payload_checksum(&self) -> u8 {
        bcc(&self.payload)
    }

    /// Upper bound of the encoded size (every payload byte escaped).
    pub fn max_wire_size(&self) -> usize {
        if self.control.is_information() {
            SUPERVISORY_FRAME_SIZE + 2 * (self.payload.len() + 1)
        } else {
            SUPERVISORY_FRAME_SIZE
        }
    }
}

/// Running XOR of `data`.
pub fn bcc(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, byte| acc ^ byte)
}

/// Encode a frame into a fresh buffer.
pub fn encode(frame: &Frame) -> BytesMut {
    let mut dst = BytesMut::with_capacity(frame.max_wire_size());
    encode_into(frame, &mut dst);
    dst
}

/// Append the wire form of `frame` to `dst`.
///
/// Wire format:
/// ```text
/// ┌──────┬─────┬─────┬──────────┬──────────────────────────┬──────┐
/// │ FLAG │  A  │  C  │ BCC1=A^C │ stuffed(payload ++ BCC2) │ FLAG │
/// │ 0x7E │     │     │          │ (information only)       │ 0x7E │
/// └──────┴─────┴─────┴──────────┴──────────────────────────┴──────┘
/// ```
pub fn encode_into(frame: &Frame, dst: &mut BytesMut) {
    dst.reserve(frame.max_wire_size());
    dst.put_u8(FLAG);
    dst.put_u8(frame.address);
    dst.put_u8(frame.control.to_byte());
    dst.put_u8(frame.header_checksum());

    if frame.control.is_information() {
        for &byte in frame.payload.iter() {
            put_stuffed(dst, byte);
        }
        put_stuffed(dst, frame.payload_checksum());
    }

    dst.put_u8(FLAG);
}

fn put_stuffed(dst: &mut BytesMut, byte: u8) {
    match byte {
        FLAG => dst.put_slice(&[ESC, ESC_FLAG]),
        ESC => dst.put_slice(&[ESC, ESC_ESC]),
        _ => dst.put_u8(byte),
    }
}

pub(crate) fn unstuff(byte: u8) -> Option<u8> {
    match byte {
        ESC_FLAG => Some(FLAG),
        ESC_ESC => Some(ESC),
        _ => None,
    }
}

/// Decode one complete frame, delimiters included.
///
/// Fails with [`FrameError::ChecksumMismatch`] when either checksum is wrong
/// and with [`FrameError::Malformed`] when the bytes are not a frame.
pub fn decode(raw: &[u8]) -> Result<Frame> {
    if raw.len() < SUPERVISORY_FRAME_SIZE {
        return Err(FrameError::Malformed("frame too short"));
    }
    if raw[0] != FLAG || raw[raw.len() - 1] != FLAG {
        return Err(FrameError::Malformed("missing flag delimiter"));
    }

    let (address, control_byte, bcc1) = (raw[1], raw[2], raw[3]);
    if bcc1 != address ^ control_byte {
        return Err(FrameError::ChecksumMismatch);
    }
    let control =
        Control::from_byte(control_byte).ok_or(FrameError::Malformed("unknown control byte"))?;

    let body = &raw[4..raw.len() - 1];
    if !control.is_information() {
        if !body.is_empty() {
            return Err(FrameError::Malformed("supervisory frame carries data"));
        }
        return Ok(Frame::supervisory(address, control));
    }

    let mut data = BytesMut::with_capacity(body.len());
    let mut escaped = false;
    for &byte in body {
        if escaped {
            let byte = unstuff(byte).ok_or(FrameError::Malformed("invalid escape sequence"))?;
            data.put_u8(byte);
            escaped = false;
            continue;
        }
        match byte {
            FLAG => return Err(FrameError::Malformed("unescaped flag inside frame")),
            ESC => escaped = true,
            _ => data.put_u8(byte),
        }
    }
    if escaped {
        return Err(FrameError::Malformed("frame ends inside escape"));
    }

    let Some(&bcc2) = data.last() else {
        return Err(FrameError::Malformed("missing payload checksum"));
    };
    data.truncate(data.len() - 1);
    if bcc(&data) != bcc2 {
        return Err(FrameError::ChecksumMismatch);
    }

    Ok(Frame {
        address,
        control,
        payload: data.freeze(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{ADDRESS_INITIATOR, ADDRESS_RESPONDER};

    #[test]
    fn set_frame_wire_bytes() {
        let wire = encode(&Frame::supervisory(ADDRESS_INITIATOR, Control::Set));
        assert_eq!(wire.as_ref(), &[FLAG, 0x03, 0x03, 0x00, FLAG]);
    }

    #[test]
    fn ua_frame_wire_bytes() {
        let wire = encode(&Frame::supervisory(ADDRESS_RESPONDER, Control::Ua));
        assert_eq!(wire.as_ref(), &[FLAG, 0x01, 0x07, 0x06, FLAG]);
    }

    #[test]
    fn information_frame_wire_bytes() {
        let frame = Frame::information(ADDRESS_INITIATOR, Seq::One, &b"\x01\x02"[..]);
        let wire = encode(&frame);
        assert_eq!(wire.as_ref(), &[FLAG, 0x03, 0x80, 0x83, 0x01, 0x02, 0x03, FLAG]);
    }

    #[test]
    fn roundtrip_all_frame_types() {
        let frames = [
            Frame::supervisory(ADDRESS_INITIATOR, Control::Set),
            Frame::supervisory(ADDRESS_RESPONDER, Control::Ua),
            Frame::supervisory(ADDRESS_INITIATOR, Control::Disc),
            Frame::supervisory(ADDRESS_RESPONDER, Control::Rr(Seq::One)),
            Frame::supervisory(ADDRESS_RESPONDER, Control::Rej(Seq::Zero)),
            Frame::information(ADDRESS_INITIATOR, Seq::Zero, &b"hello, link"[..]),
            Frame::information(ADDRESS_RESPONDER, Seq::One, Bytes::new()),
        ];
        for frame in frames {
            let wire = encode(&frame);
            assert_eq!(decode(&wire).unwrap(), frame, "{}", frame.control);
        }
    }

    #[test]
    fn stuffing_escapes_flag_and_escape_bytes() {
        let payload = vec![FLAG, 0x00, ESC, ESC, FLAG, 0x5E, 0x5D];
        let frame = Frame::information(ADDRESS_INITIATOR, Seq::Zero, payload.clone());
        let wire = encode(&frame);

        let inner = &wire[1..wire.len() - 1];
        assert!(!inner.contains(&FLAG), "unescaped flag in {wire:02x?}");
        assert_eq!(
            &wire[4..14],
            &[ESC, ESC_FLAG, 0x00, ESC, ESC_ESC, ESC, ESC_ESC, ESC, ESC_FLAG, 0x5E]
        );

        let decoded = decode(&wire).unwrap();
        assert_eq!(decoded.payload.as_ref(), payload.as_slice());
    }

    #[test]
    fn checksum_byte_is_stuffed_too() {
        // XOR of the payload is 0x7E, so BCC2 itself needs escaping.
        let frame = Frame::information(ADDRESS_INITIATOR, Seq::Zero, vec![0x7F, 0x01]);
        assert_eq!(frame.payload_checksum(), FLAG);

        let wire = encode(&frame);
        assert_eq!(&wire[wire.len() - 3..], &[ESC, ESC_FLAG, FLAG]);
        assert_eq!(decode(&wire).unwrap(), frame);
    }

    #[test]
    fn every_single_bit_flip_is_detected() {
        let frame = Frame::information(ADDRESS_INITIATOR, Seq::Zero, &b"hello"[..]);
        let wire = encode(&frame);

        // Header (A, C, BCC1) and payload + BCC2; the delimiters are excluded.
        for index in 1..wire.len() - 1 {
            for bit in 0..8 {
                let mut corrupted = wire.to_vec();
                corrupted[index] ^= 1 << bit;
                assert_eq!(
                    decode(&corrupted),
                    Err(FrameError::ChecksumMismatch),
                    "flip of bit {bit} in byte {index}"
                );
            }
        }
    }

    #[test]
    fn missing_delimiters_are_malformed() {
        let wire = encode(&Frame::supervisory(ADDRESS_INITIATOR, Control::Set));
        assert!(matches!(decode(&wire[1..]), Err(FrameError::Malformed(_))));
        assert!(matches!(
            decode(&wire[..wire.len() - 1]),
            Err(FrameError::Malformed(_))
        ));

        let mut no_close = wire.to_vec();
        no_close[4] = 0x00;
        assert!(matches!(decode(&no_close), Err(FrameError::Malformed(_))));
    }

    #[test]
    fn invalid_escape_successor_is_malformed() {
        let raw = [FLAG, 0x03, 0x00, 0x03, ESC, 0x11, 0x00, FLAG];
        assert_eq!(
            decode(&raw),
            Err(FrameError::Malformed("invalid escape sequence"))
        );

        let dangling = [FLAG, 0x03, 0x00, 0x03, 0x01, ESC, FLAG];
        assert_eq!(
            decode(&dangling),
            Err(FrameError::Malformed("frame ends inside escape"))
        );
    }

    #[test]
    fn unknown_control_and_trailing_data_are_malformed() {
        let unknown = [FLAG, 0x03, 0x42, 0x41, FLAG];
        assert_eq!(
            decode(&unknown),
            Err(FrameError::Malformed("unknown control byte"))
        );

        let long_set = [FLAG, 0x03, 0x03, 0x00, 0x00, FLAG];
        assert_eq!(
            decode(&long_set),
            Err(FrameError::Malformed("supervisory frame carries data"))
        );

        let no_bcc2 = [FLAG, 0x03, 0x00, 0x03, FLAG];
        assert_eq!(
            decode(&no_bcc2),
            Err(FrameError::Malformed("missing payload checksum"))
        );
    }

    #[test]
    fn max_wire_size_bounds_encoding() {
        let frame = Frame::information(ADDRESS_INITIATOR, Seq::Zero, vec![FLAG; 32]);
        let wire = encode(&frame);
        assert!(wire.len() <= frame.max_wire_size());
        assert_eq!(
            Frame::supervisory(ADDRESS_INITIATOR, Control::Ua).max_wire_size(),
            SUPERVISORY_FRAME_SIZE
        );
    }
}
