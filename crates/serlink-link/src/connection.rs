use std::fmt;
use std::time::Instant;

use bytes::Bytes;
use serlink_frame::{Control, Frame, FrameError, FrameReader, FrameWriter, ReceiveEvent, Seq};
use serlink_transport::Transport;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::{LinkConfig, Role};
use crate::error::{LinkError, Result};
use crate::retry::RetryTimer;
use crate::stats::LinkStats;

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    /// Initiator sent SET and waits for UA.
    AwaitingUa,
    /// Responder waits for SET.
    AwaitingSet,
    Open,
    /// DISC exchange in progress.
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Closed => "closed",
            ConnectionState::AwaitingUa => "awaiting-ua",
            ConnectionState::AwaitingSet => "awaiting-set",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// How a frame received during an exchange is handled.
pub(crate) enum Reply {
    /// The awaited reply arrived.
    Done,
    /// Keep waiting until the current deadline.
    Ignore,
    /// Send the frame again now, using up an attempt.
    Retransmit,
}

pub(crate) enum Outcome {
    Acknowledged,
    Exhausted { attempts: u32 },
}

/// One end of a point-to-point link.
///
/// Owns the transport and drives it in stop-and-wait fashion: at most one
/// information frame is outstanding in each direction, and every operation
/// blocks until it is acknowledged or its retry budget runs out. Operations
/// are meant to be driven half-duplex, one side sending while the other
/// receives.
#[derive(Debug)]
pub struct Connection<T> {
    pub(crate) config: LinkConfig,
    pub(crate) transport: T,
    reader: FrameReader,
    writer: FrameWriter,
    pub(crate) state: ConnectionState,
    send_seq: Seq,
    recv_seq: Seq,
    /// The peer sent DISC and expects our DISC in return.
    pub(crate) disc_pending: bool,
    cancel: CancelToken,
    pub(crate) stats: LinkStats,
}

impl<T: Transport> Connection<T> {
    /// Wrap `transport` in a closed connection.
    pub fn new(config: LinkConfig, transport: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            reader: FrameReader::with_max_payload(config.max_payload),
            writer: FrameWriter::new(),
            state: ConnectionState::Closed,
            send_seq: Seq::Zero,
            recv_seq: Seq::Zero,
            disc_pending: false,
            cancel: CancelToken::new(),
            stats: LinkStats::default(),
            config,
            transport,
        })
    }

    /// Replace the connection's cancel token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that cancels this connection's blocking operations.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn role(&self) -> Role {
        self.config.role
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Send one payload and block until the peer acknowledges it.
    ///
    /// The frame is retransmitted on timeout and on REJ. When the retry
    /// budget runs out the connection stays open and the sequence number is
    /// not advanced.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if payload.len() > self.config.max_payload {
            return Err(LinkError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload,
            });
        }

        let seq = self.send_seq;
        let frame = Frame::information(
            self.config.role.local_address(),
            seq,
            Bytes::copy_from_slice(payload),
        );

        match self.exchange(&frame, |conn, reply| conn.on_data_reply(seq, reply))? {
            Outcome::Acknowledged => {
                self.send_seq = seq.next();
                self.stats.bytes_acknowledged += payload.len() as u64;
                debug!(%seq, len = payload.len(), "frame acknowledged");
                Ok(())
            }
            Outcome::Exhausted { attempts } => {
                warn!(%seq, attempts, "frame never acknowledged");
                Err(LinkError::RetransmissionLimitExceeded { attempts })
            }
        }
    }

    /// Block until the next new payload arrives.
    ///
    /// Every in-sequence frame is acknowledged with RR before it is
    /// returned. Duplicates are acknowledged again but not returned, and
    /// frames with a bad payload checksum are answered with REJ. Returns
    /// [`LinkError::Disconnected`] once the peer sends DISC; call
    /// [`close`](Self::close) next.
    pub fn receive(&mut self) -> Result<Bytes> {
        self.ensure_open()?;
        if self.disc_pending {
            return Err(LinkError::Disconnected);
        }

        loop {
            let deadline = Instant::now() + self.config.timeout;
            match self.next_event(deadline)? {
                Some(ReceiveEvent::FrameReady(frame)) => match frame.control {
                    Control::Info(seq) if seq == self.recv_seq => {
                        self.recv_seq = seq.next();
                        self.send_supervisory(Control::Rr(self.recv_seq))?;
                        self.stats.bytes_delivered += frame.payload.len() as u64;
                        debug!(%seq, len = frame.payload.len(), "frame delivered");
                        return Ok(frame.payload);
                    }
                    Control::Disc => {
                        info!("peer requested disconnect");
                        self.disc_pending = true;
                        return Err(LinkError::Disconnected);
                    }
                    _ => self.answer_housekeeping(&frame)?,
                },
                Some(ReceiveEvent::Error(FrameError::ChecksumMismatch)) => {
                    debug!(expected = %self.recv_seq, "payload corrupted, rejecting");
                    self.stats.rejects_sent += 1;
                    self.send_supervisory(Control::Rej(self.recv_seq))?;
                }
                Some(_) | None => {}
            }
        }
    }

    fn on_data_reply(&mut self, seq: Seq, reply: &Frame) -> Result<Reply> {
        let reply = match reply.control {
            Control::Rr(next) if next == seq.next() => Reply::Done,
            Control::Rej(expected) if expected == seq => {
                debug!(%seq, "peer rejected frame");
                self.stats.rejects_received += 1;
                Reply::Retransmit
            }
            Control::Rr(_) | Control::Rej(_) => {
                debug!(control = %reply.control, "stale acknowledgment ignored");
                Reply::Ignore
            }
            Control::Disc => {
                info!("peer requested disconnect during send");
                self.disc_pending = true;
                return Err(LinkError::Disconnected);
            }
            _ => {
                self.answer_housekeeping(reply)?;
                Reply::Ignore
            }
        };
        Ok(reply)
    }

    /// Write `frame` and wait for the reply `on_reply` accepts.
    ///
    /// Each transmission gets a fresh timeout; silence until the deadline
    /// or a [`Reply::Retransmit`] starts the next attempt.
    pub(crate) fn exchange<F>(&mut self, frame: &Frame, mut on_reply: F) -> Result<Outcome>
    where
        F: FnMut(&mut Self, &Frame) -> Result<Reply>,
    {
        let mut timer = RetryTimer::new(self.config.max_retransmissions, self.config.timeout);

        'transmit: while let Some(deadline) = timer.begin(Instant::now()) {
            if timer.is_retry() {
                self.stats.retransmissions += 1;
                warn!(
                    control = %frame.control,
                    attempt = timer.attempts(),
                    max = self.config.max_retransmissions,
                    "retransmitting"
                );
            }
            self.write_frame(frame)?;

            loop {
                match self.next_event(deadline)? {
                    Some(ReceiveEvent::FrameReady(reply)) => match on_reply(self, &reply)? {
                        Reply::Done => return Ok(Outcome::Acknowledged),
                        Reply::Retransmit => continue 'transmit,
                        Reply::Ignore => {}
                    },
                    Some(_) => {}
                    None => {
                        self.stats.timeouts += 1;
                        if timer.is_exhausted() {
                            warn!(
                                control = %frame.control,
                                attempts = timer.attempts(),
                                "no reply to final attempt"
                            );
                        } else {
                            debug!(
                                control = %frame.control,
                                attempt = timer.attempts(),
                                "no reply before deadline"
                            );
                        }
                        continue 'transmit;
                    }
                }
            }
        }

        Ok(Outcome::Exhausted {
            attempts: timer.attempts(),
        })
    }

    /// Next frame from the peer or frame error, up to `deadline`.
    ///
    /// Frames carrying any address other than the peer's are dropped here.
    pub(crate) fn next_event(&mut self, deadline: Instant) -> Result<Option<ReceiveEvent>> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(LinkError::Cancelled);
            }
            let event = self.reader.next_event(&mut self.transport, deadline)?;
            if self.cancel.is_cancelled() {
                return Err(LinkError::Cancelled);
            }

            match event {
                Some(ReceiveEvent::FrameReady(frame)) => {
                    if frame.address != self.config.role.peer_address() {
                        debug!(
                            address = frame.address,
                            control = %frame.control,
                            "frame from unexpected address dropped"
                        );
                        continue;
                    }
                    self.stats.frames_received += 1;
                    return Ok(Some(ReceiveEvent::FrameReady(frame)));
                }
                Some(ReceiveEvent::Error(err)) => {
                    debug!(error = %err, "corrupted frame dropped");
                    self.stats.corrupted_frames += 1;
                    return Ok(Some(ReceiveEvent::Error(err)));
                }
                Some(ReceiveEvent::Continue) => continue,
                None => return Ok(None),
            }
        }
    }

    /// Answer peer retransmissions caused by a lost reply of ours.
    ///
    /// A repeated SET means our UA was lost; an out-of-sequence I frame
    /// means our RR was.
    pub(crate) fn answer_housekeeping(&mut self, frame: &Frame) -> Result<()> {
        match frame.control {
            Control::Set if self.config.role == Role::Responder => {
                debug!("repeated SET, answering UA again");
                self.send_supervisory(Control::Ua)
            }
            Control::Info(seq) if seq != self.recv_seq => {
                debug!(%seq, "duplicate frame, acknowledging again");
                self.stats.duplicates += 1;
                self.send_supervisory(Control::Rr(self.recv_seq))
            }
            control => {
                debug!(%control, state = %self.state, "unexpected frame ignored");
                Ok(())
            }
        }
    }

    pub(crate) fn supervisory(&self, control: Control) -> Frame {
        Frame::supervisory(self.config.role.local_address(), control)
    }

    pub(crate) fn send_supervisory(&mut self, control: Control) -> Result<()> {
        let frame = self.supervisory(control);
        self.write_frame(&frame)
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.writer.write_frame(&mut self.transport, frame)?;
        self.stats.frames_sent += 1;
        Ok(())
    }

    /// Forget sequence state and buffered bytes before a new session.
    pub(crate) fn reset_session(&mut self) {
        self.reader.clear();
        self.send_seq = Seq::Zero;
        self.recv_seq = Seq::Zero;
        self.disc_pending = false;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == ConnectionState::Open {
            Ok(())
        } else {
            Err(LinkError::NotOpen)
        }
    }
}
