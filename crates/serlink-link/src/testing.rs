//! A hand-driven far end for unit tests.

use std::time::{Duration, Instant};

use serlink_frame::{Control, Frame, FrameReader, FrameWriter, ReceiveEvent, Seq};
use serlink_transport::{MemoryTransport, Transport};

use crate::config::{LinkConfig, Role};
use crate::connection::{Connection, ConnectionState};

const EXPECT_WAIT: Duration = Duration::from_secs(2);

pub(crate) fn test_config(role: Role) -> LinkConfig {
    LinkConfig::new("memory", role).with_timeout(Duration::from_millis(100))
}

/// A closed connection wired to a scripted peer.
pub(crate) fn pair(config: LinkConfig) -> (Connection<MemoryTransport>, ScriptedPeer) {
    let (local, remote) = MemoryTransport::pair();
    let address = config.role.peer_address();
    let conn = Connection::new(config, local).expect("test config should be valid");
    (conn, ScriptedPeer::new(remote, address))
}

/// An open connection; the handshake frames are already consumed.
pub(crate) fn open_pair(role: Role) -> (Connection<MemoryTransport>, ScriptedPeer) {
    let (mut conn, mut peer) = pair(test_config(role));
    match role {
        Role::Initiator => {
            peer.send(Control::Ua);
            conn.open().expect("initiator should open");
            assert_eq!(peer.expect_frame().control, Control::Set);
        }
        Role::Responder => {
            peer.send(Control::Set);
            conn.open().expect("responder should open");
            assert_eq!(peer.expect_frame().control, Control::Ua);
        }
    }
    assert_eq!(conn.state(), ConnectionState::Open);
    (conn, peer)
}

pub(crate) struct ScriptedPeer {
    transport: MemoryTransport,
    reader: FrameReader,
    writer: FrameWriter,
    address: u8,
}

impl ScriptedPeer {
    fn new(transport: MemoryTransport, address: u8) -> Self {
        Self {
            transport,
            reader: FrameReader::new(),
            writer: FrameWriter::new(),
            address,
        }
    }

    pub(crate) fn information(&self, seq: Seq, payload: &[u8]) -> Frame {
        Frame::information(self.address, seq, payload.to_vec())
    }

    pub(crate) fn send(&mut self, control: Control) {
        let frame = Frame::supervisory(self.address, control);
        self.send_frame(&frame);
    }

    pub(crate) fn send_info(&mut self, seq: Seq, payload: &[u8]) {
        let frame = self.information(seq, payload);
        self.send_frame(&frame);
    }

    pub(crate) fn send_frame(&mut self, frame: &Frame) {
        self.writer
            .write_frame(&mut self.transport, frame)
            .expect("scripted peer write should succeed");
    }

    pub(crate) fn send_raw(&mut self, bytes: &[u8]) {
        self.transport
            .write_bytes(bytes)
            .expect("scripted peer write should succeed");
    }

    /// Next well-formed frame from the connection under test.
    pub(crate) fn expect_frame(&mut self) -> Frame {
        let deadline = Instant::now() + EXPECT_WAIT;
        match self.reader.next_event(&mut self.transport, deadline) {
            Ok(Some(ReceiveEvent::FrameReady(frame))) => frame,
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    pub(crate) fn expect_silence(&mut self, wait: Duration) {
        let deadline = Instant::now() + wait;
        match self.reader.next_event(&mut self.transport, deadline) {
            Ok(None) => {}
            other => panic!("expected silence, got {other:?}"),
        }
    }
}
