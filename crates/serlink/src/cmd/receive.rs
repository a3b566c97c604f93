use std::fs::File;
use std::io::{self, Write};

use serlink_link::{Connection, LinkError};
use serlink_transport::Transport;
use tracing::{info, warn};

use crate::cmd::{open_link, parse_duration, ReceiveArgs};
use crate::exit::{io_error, link_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat, TransferReport};

pub fn run(args: ReceiveArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = args.link.config(args.role)?;
    if let Some(limit) = &args.accept_timeout {
        config = config.with_accept_timeout(Some(parse_duration(limit)?));
    }

    let mut sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path)
                .map_err(|err| io_error(&format!("failed creating {}", path.display()), err))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    let mut conn = open_link(config)?;
    let (messages, bytes) = receive_into(&mut conn, &mut sink)?;
    sink.flush()
        .map_err(|err| io_error("failed flushing output", err))?;
    close_after_transfer(&mut conn)?;
    info!(messages, bytes, "transfer complete");

    let report = TransferReport {
        device: &args.link.device,
        role: args.role,
        messages,
        bytes,
        stats: *conn.stats(),
    };
    // Received data owns stdout unless it went to a file.
    if args.output.is_some() {
        print_report(&mut io::stdout(), &report, format);
    } else {
        print_report(&mut io::stderr(), &report, format);
    }
    Ok(SUCCESS)
}

/// Copy payloads to `sink` until the peer disconnects.
fn receive_into<T: Transport>(
    conn: &mut Connection<T>,
    sink: &mut dyn Write,
) -> CliResult<(usize, u64)> {
    let mut messages = 0usize;
    let mut bytes = 0u64;
    loop {
        match conn.receive() {
            Ok(payload) => {
                sink.write_all(&payload)
                    .map_err(|err| io_error("failed writing output", err))?;
                messages += 1;
                bytes += payload.len() as u64;
            }
            Err(LinkError::Disconnected) => return Ok((messages, bytes)),
            Err(err) => return Err(link_error("receive failed", err)),
        }
    }
}

/// Answer the peer's DISC.
///
/// Every payload is already delivered and flushed at this point, so a lost
/// final UA only costs a warning.
fn close_after_transfer<T: Transport>(conn: &mut Connection<T>) -> CliResult<()> {
    match conn.close() {
        Ok(()) => Ok(()),
        Err(LinkError::ConnectionTimeout { attempts }) => {
            warn!(attempts, "peer never acknowledged the disconnect");
            Ok(())
        }
        Err(err) => Err(link_error("close failed", err)),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::net::UnixStream;
    use std::thread;
    use std::time::{Duration, Instant};

    use serlink_frame::{
        encode, Control, Frame, FrameReader, ReceiveEvent, Seq, ADDRESS_INITIATOR,
    };
    use serlink_link::{ConnectionState, LinkConfig, Role};

    use super::*;
    use crate::exit::CANCELLED;

    fn config(role: Role) -> LinkConfig {
        LinkConfig::new("socket", role).with_timeout(Duration::from_millis(100))
    }

    #[test]
    fn writes_payloads_in_order_until_disconnect() {
        let (left, right) = UnixStream::pair().unwrap();

        let sender = thread::spawn(move || {
            let mut conn = Connection::new(config(Role::Initiator), left).unwrap();
            conn.open().unwrap();
            conn.send(b"hello, ").unwrap();
            conn.send(b"world").unwrap();
            conn.close().unwrap();
        });

        let mut conn = Connection::new(config(Role::Responder), right).unwrap();
        conn.open().unwrap();
        let mut sink = Vec::new();
        let (messages, bytes) = receive_into(&mut conn, &mut sink).unwrap();
        conn.close().unwrap();
        sender.join().unwrap();

        assert_eq!(sink, b"hello, world");
        assert_eq!((messages, bytes), (2, 12));
    }

    #[test]
    fn lost_final_ua_still_completes_the_transfer() {
        let (left, right) = UnixStream::pair().unwrap();

        // Plays the sending side by hand and never answers the responder's DISC.
        let sender = thread::spawn(move || {
            let mut stream = left;
            let mut reader = FrameReader::new();
            let mut exchange = |stream: &mut UnixStream, frame: Frame| {
                stream.write_all(&encode(&frame)).unwrap();
                let deadline = Instant::now() + Duration::from_secs(2);
                loop {
                    match reader.next_event(stream, deadline).unwrap() {
                        Some(ReceiveEvent::FrameReady(reply)) => return reply.control,
                        Some(_) => {}
                        None => panic!("responder should reply to {}", frame.control),
                    }
                }
            };

            let set = Frame::supervisory(ADDRESS_INITIATOR, Control::Set);
            assert_eq!(exchange(&mut stream, set), Control::Ua);
            let data = Frame::information(ADDRESS_INITIATOR, Seq::Zero, &b"payload"[..]);
            assert_eq!(exchange(&mut stream, data), Control::Rr(Seq::One));
            let disc = Frame::supervisory(ADDRESS_INITIATOR, Control::Disc);
            assert_eq!(exchange(&mut stream, disc), Control::Disc);
            stream
        });

        let mut conn = Connection::new(config(Role::Responder), right).unwrap();
        conn.open().unwrap();
        let mut sink = Vec::new();
        let (messages, bytes) = receive_into(&mut conn, &mut sink).unwrap();

        close_after_transfer(&mut conn).expect("a lost UA should not fail the command");
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(conn.stats().retransmissions > 0);
        drop(sender.join().unwrap());

        assert_eq!(sink, b"payload");
        assert_eq!((messages, bytes), (1, 7));
    }

    #[test]
    fn cancellation_maps_to_cancelled_exit_code() {
        let (_left, right) = UnixStream::pair().unwrap();
        let mut conn = Connection::new(config(Role::Responder), right).unwrap();
        conn.cancel_token().cancel();

        let err = conn.open().unwrap_err();
        assert!(matches!(err, LinkError::Cancelled));
        assert_eq!(link_error("open failed", err).code, CANCELLED);
    }
}
