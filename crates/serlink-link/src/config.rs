use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serlink_frame::{
    ADDRESS_INITIATOR, ADDRESS_RESPONDER, DEFAULT_MAX_PAYLOAD, MAX_PAYLOAD_LIMIT,
};
use serlink_transport::BaudRate;

use crate::error::{LinkError, Result};

/// Transmissions of one frame before giving up.
pub const MAX_RETRANSMISSIONS_DEFAULT: u32 = 3;
/// How long to wait for a reply before retransmitting.
pub const TIMEOUT_DEFAULT: Duration = Duration::from_secs(3);

/// Which end of the link this process is.
///
/// The initiator sends SET to open the connection; the responder waits for
/// it. Both sides may send and receive data once the link is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    /// Address byte this side puts on every frame it sends.
    pub fn local_address(self) -> u8 {
        match self {
            Role::Initiator => ADDRESS_INITIATOR,
            Role::Responder => ADDRESS_RESPONDER,
        }
    }

    /// Address byte expected on frames from the other side.
    pub fn peer_address(self) -> u8 {
        match self {
            Role::Initiator => ADDRESS_RESPONDER,
            Role::Responder => ADDRESS_INITIATOR,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => f.write_str("initiator"),
            Role::Responder => f.write_str("responder"),
        }
    }
}

impl FromStr for Role {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "initiator" | "tx" | "transmitter" => Ok(Role::Initiator),
            "responder" | "rx" | "receiver" => Ok(Role::Responder),
            other => Err(LinkError::InvalidConfig(format!("unknown role '{other}'"))),
        }
    }
}

/// Connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Serial device path, e.g. `/dev/ttyS0`.
    pub device: String,
    pub role: Role,
    #[serde(default)]
    pub baud_rate: BaudRate,
    /// Total transmissions of one frame, the first one included.
    #[serde(default = "default_max_retransmissions")]
    pub max_retransmissions: u32,
    /// Wait for a reply before retransmitting.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
    /// Bound on how long a responder waits for SET. `None` waits until
    /// cancelled.
    #[serde(default)]
    pub accept_timeout: Option<Duration>,
    /// Largest payload accepted by `send` and by the receiver.
    #[serde(default = "default_max_payload")]
    pub max_payload: usize,
}

fn default_max_retransmissions() -> u32 {
    MAX_RETRANSMISSIONS_DEFAULT
}

fn default_timeout() -> Duration {
    TIMEOUT_DEFAULT
}

fn default_max_payload() -> usize {
    DEFAULT_MAX_PAYLOAD
}

impl LinkConfig {
    /// Configuration with default baud rate, retries, and timeout.
    pub fn new(device: impl Into<String>, role: Role) -> Self {
        Self {
            device: device.into(),
            role,
            baud_rate: BaudRate::default(),
            max_retransmissions: MAX_RETRANSMISSIONS_DEFAULT,
            timeout: TIMEOUT_DEFAULT,
            accept_timeout: None,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: BaudRate) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_max_retransmissions(mut self, max_retransmissions: u32) -> Self {
        self.max_retransmissions = max_retransmissions;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_accept_timeout(mut self, accept_timeout: Option<Duration>) -> Self {
        self.accept_timeout = accept_timeout;
        self
    }

    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Reject values the link cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.device.is_empty() {
            return Err(LinkError::InvalidConfig("device path is empty".into()));
        }
        if self.max_retransmissions == 0 {
            return Err(LinkError::InvalidConfig(
                "max_retransmissions must be at least 1".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(LinkError::InvalidConfig("timeout must be non-zero".into()));
        }
        if self.accept_timeout.is_some_and(|t| t.is_zero()) {
            return Err(LinkError::InvalidConfig(
                "accept_timeout must be non-zero when set".into(),
            ));
        }
        if self.max_payload == 0 {
            return Err(LinkError::InvalidConfig(
                "max_payload must be at least 1".into(),
            ));
        }
        if self.max_payload > MAX_PAYLOAD_LIMIT {
            return Err(LinkError::InvalidConfig(format!(
                "max_payload must be at most {MAX_PAYLOAD_LIMIT}"
            )));
        }
        Ok(())
    }
}
