//! Link establishment (SET/UA) and termination (DISC/DISC/UA).

use std::time::Instant;

use serlink_frame::{Control, ReceiveEvent};
use serlink_transport::Transport;
use tracing::{debug, info, warn};

use crate::config::Role;
use crate::connection::{Connection, ConnectionState, Outcome, Reply};
use crate::error::{LinkError, Result};

impl<T: Transport> Connection<T> {
    /// Establish the link.
    ///
    /// The initiator sends SET and retransmits it until UA arrives or the
    /// retry budget runs out. The responder waits for SET, bounded by
    /// `accept_timeout` if set, and answers UA. A connection that is not
    /// closed fails immediately with [`LinkError::AlreadyOpen`]; a failed
    /// open leaves it closed and may be retried.
    pub fn open(&mut self) -> Result<()> {
        if self.state != ConnectionState::Closed {
            return Err(LinkError::AlreadyOpen);
        }
        self.reset_session();

        let role = self.config.role;
        info!(device = %self.config.device, %role, "opening link");
        let result = match role {
            Role::Initiator => self.open_initiator(),
            Role::Responder => self.open_responder(),
        };

        match result {
            Ok(()) => {
                self.state = ConnectionState::Open;
                info!(%role, "link established");
                Ok(())
            }
            Err(err) => {
                self.state = ConnectionState::Closed;
                warn!(%role, error = %err, "link establishment failed");
                Err(err)
            }
        }
    }

    fn open_initiator(&mut self) -> Result<()> {
        self.state = ConnectionState::AwaitingUa;
        let set = self.supervisory(Control::Set);
        let outcome = self.exchange(&set, |_, reply| {
            Ok(if reply.control == Control::Ua {
                Reply::Done
            } else {
                debug!(control = %reply.control, "ignored while awaiting UA");
                Reply::Ignore
            })
        })?;

        match outcome {
            Outcome::Acknowledged => Ok(()),
            Outcome::Exhausted { attempts } => Err(LinkError::ConnectionTimeout { attempts }),
        }
    }

    fn open_responder(&mut self) -> Result<()> {
        self.state = ConnectionState::AwaitingSet;
        let give_up = self.config.accept_timeout.map(|limit| Instant::now() + limit);

        loop {
            let now = Instant::now();
            let mut deadline = now + self.config.timeout;
            if let Some(give_up) = give_up {
                if now >= give_up {
                    return Err(LinkError::ConnectionTimeout { attempts: 1 });
                }
                deadline = deadline.min(give_up);
            }

            match self.next_event(deadline)? {
                Some(ReceiveEvent::FrameReady(frame)) if frame.control == Control::Set => break,
                Some(ReceiveEvent::FrameReady(frame)) => {
                    debug!(control = %frame.control, "ignored while awaiting SET");
                }
                _ => {}
            }
        }

        self.send_supervisory(Control::Ua)
    }

    /// Tear the link down.
    ///
    /// Without a pending DISC from the peer this side sends DISC, waits for
    /// the peer's DISC, and answers UA. After [`LinkError::Disconnected`]
    /// it answers the peer's DISC with its own and waits for UA. Both paths
    /// retransmit like [`send`](Self::send). The connection is closed
    /// afterwards whatever the outcome.
    pub fn close(&mut self) -> Result<()> {
        if self.state != ConnectionState::Open {
            return Err(LinkError::NotOpen);
        }
        self.state = ConnectionState::Closing;

        let result = if self.disc_pending {
            self.answer_disconnect()
        } else {
            self.request_disconnect()
        };

        self.state = ConnectionState::Closed;
        self.disc_pending = false;
        match &result {
            Ok(()) => info!(stats = ?self.stats, "link closed"),
            Err(err) => warn!(error = %err, "link closed without a clean disconnect"),
        }
        result
    }

    fn request_disconnect(&mut self) -> Result<()> {
        let disc = self.supervisory(Control::Disc);
        let outcome = self.exchange(&disc, |conn, reply| {
            if reply.control == Control::Disc {
                return Ok(Reply::Done);
            }
            conn.answer_housekeeping(reply)?;
            Ok(Reply::Ignore)
        })?;

        match outcome {
            Outcome::Acknowledged => self.send_supervisory(Control::Ua),
            Outcome::Exhausted { attempts } => Err(LinkError::ConnectionTimeout { attempts }),
        }
    }

    fn answer_disconnect(&mut self) -> Result<()> {
        let disc = self.supervisory(Control::Disc);
        let outcome = self.exchange(&disc, |conn, reply| match reply.control {
            Control::Ua => Ok(Reply::Done),
            // Our DISC was lost and the peer asks again.
            Control::Disc => Ok(Reply::Retransmit),
            _ => {
                conn.answer_housekeeping(reply)?;
                Ok(Reply::Ignore)
            }
        })?;

        match outcome {
            Outcome::Acknowledged => Ok(()),
            Outcome::Exhausted { attempts } => Err(LinkError::ConnectionTimeout { attempts }),
        }
    }
}
