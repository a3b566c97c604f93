use std::fmt;

/// Address byte on every frame sent by the initiator.
pub const ADDRESS_INITIATOR: u8 = 0x03;
/// Address byte on every frame sent by the responder.
pub const ADDRESS_RESPONDER: u8 = 0x01;

const C_SET: u8 = 0x03;
const C_UA: u8 = 0x07;
const C_DISC: u8 = 0x0B;
const C_INFO_0: u8 = 0x00;
const C_INFO_1: u8 = 0x80;
const C_RR_0: u8 = 0xAA;
const C_RR_1: u8 = 0xAB;
const C_REJ_0: u8 = 0x54;
const C_REJ_1: u8 = 0x55;

/// Stop-and-wait sequence bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Seq {
    #[default]
    Zero,
    One,
}

impl Seq {
    /// The other sequence number.
    pub fn next(self) -> Self {
        match self {
            Seq::Zero => Seq::One,
            Seq::One => Seq::Zero,
        }
    }

    /// The sequence number as 0 or 1.
    pub fn bit(self) -> u8 {
        match self {
            Seq::Zero => 0,
            Seq::One => 1,
        }
    }
}

impl fmt::Display for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bit())
    }
}

/// Frame type carried in the control byte.
///
/// `Rr(n)` and `Rej(n)` carry the sequence number the receiver expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// Connection setup request.
    Set,
    /// Unnumbered acknowledgment of SET or DISC.
    Ua,
    /// Disconnect request.
    Disc,
    /// Numbered information frame.
    Info(Seq),
    /// Receiver ready: positive acknowledgment.
    Rr(Seq),
    /// Reject: negative acknowledgment, asks for retransmission.
    Rej(Seq),
}

impl Control {
    pub fn to_byte(self) -> u8 {
        match self {
            Control::Set => C_SET,
            Control::Ua => C_UA,
            Control::Disc => C_DISC,
            Control::Info(Seq::Zero) => C_INFO_0,
            Control::Info(Seq::One) => C_INFO_1,
            Control::Rr(Seq::Zero) => C_RR_0,
            Control::Rr(Seq::One) => C_RR_1,
            Control::Rej(Seq::Zero) => C_REJ_0,
            Control::Rej(Seq::One) => C_REJ_1,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        let control = match byte {
            C_SET => Control::Set,
            C_UA => Control::Ua,
            C_DISC => Control::Disc,
            C_INFO_0 => Control::Info(Seq::Zero),
            C_INFO_1 => Control::Info(Seq::One),
            C_RR_0 => Control::Rr(Seq::Zero),
            C_RR_1 => Control::Rr(Seq::One),
            C_REJ_0 => Control::Rej(Seq::Zero),
            C_REJ_1 => Control::Rej(Seq::One),
            _ => return None,
        };
        Some(control)
    }

    /// Whether frames of this type carry a payload and BCC2.
    pub fn is_information(self) -> bool {
        matches!(self, Control::Info(_))
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::Set => write!(f, "SET"),
            Control::Ua => write!(f, "UA"),
            Control::Disc => write!(f, "DISC"),
            Control::Info(seq) => write!(f, "I({seq})"),
            Control::Rr(seq) => write!(f, "RR({seq})"),
            Control::Rej(seq) => write!(f, "REJ({seq})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ESC, FLAG};

    const ALL: [Control; 9] = [
        Control::Set,
        Control::Ua,
        Control::Disc,
        Control::Info(Seq::Zero),
        Control::Info(Seq::One),
        Control::Rr(Seq::Zero),
        Control::Rr(Seq::One),
        Control::Rej(Seq::Zero),
        Control::Rej(Seq::One),
    ];

    #[test]
    fn control_bytes_are_distinct_and_reversible() {
        let mut seen = std::collections::HashSet::new();
        for control in ALL {
            assert!(seen.insert(control.to_byte()), "duplicate byte for {control}");
            assert_eq!(Control::from_byte(control.to_byte()), Some(control));
        }
        assert_eq!(Control::from_byte(0x42), None);
    }

    #[test]
    fn header_never_needs_stuffing() {
        for address in [ADDRESS_INITIATOR, ADDRESS_RESPONDER] {
            for control in ALL {
                let c = control.to_byte();
                for byte in [address, c, address ^ c] {
                    assert_ne!(byte, FLAG, "{control} from {address:#04x}");
                    assert_ne!(byte, ESC, "{control} from {address:#04x}");
                }
            }
        }
    }

    #[test]
    fn seq_alternates() {
        assert_eq!(Seq::Zero.next(), Seq::One);
        assert_eq!(Seq::One.next(), Seq::Zero);
        assert_eq!(Seq::default(), Seq::Zero);
    }

    #[test]
    fn display_names() {
        assert_eq!(Control::Rr(Seq::One).to_string(), "RR(1)");
        assert_eq!(Control::Info(Seq::Zero).to_string(), "I(0)");
        assert_eq!(Control::Disc.to_string(), "DISC");
    }
}
