use serde::Serialize;

/// Counters for one connection, cumulative across reopenings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub frames_sent: u64,
    pub frames_received: u64,
    /// Transmissions beyond the first for any frame.
    pub retransmissions: u64,
    /// Reply deadlines that passed with nothing usable received.
    pub timeouts: u64,
    pub rejects_sent: u64,
    pub rejects_received: u64,
    /// Information frames received again and acknowledged without delivery.
    pub duplicates: u64,
    /// Frames dropped for a checksum or structure error.
    pub corrupted_frames: u64,
    /// Payload bytes handed to the caller by `receive`.
    pub bytes_delivered: u64,
    /// Payload bytes acknowledged by the peer.
    pub bytes_acknowledged: u64,
}

impl LinkStats {
    /// Every counter as a `(name, value)` pair, in declaration order.
    pub fn entries(&self) -> [(&'static str, u64); 10] {
        [
            ("frames_sent", self.frames_sent),
            ("frames_received", self.frames_received),
            ("retransmissions", self.retransmissions),
            ("timeouts", self.timeouts),
            ("rejects_sent", self.rejects_sent),
            ("rejects_received", self.rejects_received),
            ("duplicates", self.duplicates),
            ("corrupted_frames", self.corrupted_frames),
            ("bytes_delivered", self.bytes_delivered),
            ("bytes_acknowledged", self.bytes_acknowledged),
        ]
    }
}
