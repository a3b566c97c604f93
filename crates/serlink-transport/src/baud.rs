use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Supported line speeds.
///
/// Serialized as the plain bits-per-second number (`9600`), which is also
/// what [`FromStr`] accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    B1200,
    B2400,
    B4800,
    #[default]
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl BaudRate {
    /// All supported rates, slowest first.
    pub const ALL: [BaudRate; 8] = [
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
    ];

    /// Line speed in bits per second.
    pub fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::B1200 => 1_200,
            BaudRate::B2400 => 2_400,
            BaudRate::B4800 => 4_800,
            BaudRate::B9600 => 9_600,
            BaudRate::B19200 => 19_200,
            BaudRate::B38400 => 38_400,
            BaudRate::B57600 => 57_600,
            BaudRate::B115200 => 115_200,
        }
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = TransportError;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        BaudRate::ALL
            .into_iter()
            .find(|rate| rate.bits_per_second() == bps)
            .ok_or(TransportError::UnsupportedBaudRate(bps))
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        rate.bits_per_second()
    }
}

impl FromStr for BaudRate {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bps = s
            .trim()
            .parse::<u32>()
            .map_err(|_| TransportError::UnsupportedBaudRate(0))?;
        BaudRate::try_from(bps)
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits_per_second())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_9600() {
        assert_eq!(BaudRate::default(), BaudRate::B9600);
        assert_eq!(BaudRate::default().bits_per_second(), 9600);
    }

    #[test]
    fn parse_known_and_unknown_rates() {
        assert_eq!("115200".parse::<BaudRate>().unwrap(), BaudRate::B115200);
        assert_eq!(" 2400 ".parse::<BaudRate>().unwrap(), BaudRate::B2400);
        assert!(matches!(
            "9601".parse::<BaudRate>(),
            Err(TransportError::UnsupportedBaudRate(9601))
        ));
        assert!("fast".parse::<BaudRate>().is_err());
    }

    #[test]
    fn serializes_as_number() {
        let json = serde_json::to_string(&BaudRate::B38400).unwrap();
        assert_eq!(json, "38400");
        let back: BaudRate = serde_json::from_str("57600").unwrap();
        assert_eq!(back, BaudRate::B57600);
        assert!(serde_json::from_str::<BaudRate>("1234").is_err());
    }
}
