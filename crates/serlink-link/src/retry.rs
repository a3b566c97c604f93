use std::time::{Duration, Instant};

/// Attempt counter and reply deadline for one retransmitted frame.
///
/// Pure state: callers pass the current time in, which keeps the retry
/// policy testable without sleeping.
#[derive(Debug, Clone)]
pub struct RetryTimer {
    max_attempts: u32,
    timeout: Duration,
    attempts: u32,
}

impl RetryTimer {
    pub fn new(max_attempts: u32, timeout: Duration) -> Self {
        Self {
            max_attempts,
            timeout,
            attempts: 0,
        }
    }

    /// Start the next transmission at `now`.
    ///
    /// Returns the reply deadline, or `None` once every attempt is used.
    pub fn begin(&mut self, now: Instant) -> Option<Instant> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(now + self.timeout)
    }

    /// Transmissions started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether the current attempt is the last one allowed.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Whether the current attempt is a retransmission.
    pub fn is_retry(&self) -> bool {
        self.attempts > 1
    }
}
