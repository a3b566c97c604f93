use std::fs;
use std::io;

use serlink_link::{Connection, LinkError};
use serlink_transport::Transport;
use tracing::{info, warn};

use crate::cmd::{open_link, SendArgs};
use crate::exit::{io_error, link_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat, TransferReport};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let config = args.link.config(args.role)?;
    let mut conn = open_link(config)?;

    let messages = match send_chunks(&mut conn, &payload) {
        Ok(messages) => messages,
        Err(err) => {
            abandon(&mut conn, &err);
            return Err(link_error("send failed", err));
        }
    };
    conn.close().map_err(|err| link_error("close failed", err))?;
    info!(messages, bytes = payload.len(), "transfer complete");

    let report = TransferReport {
        device: &args.link.device,
        role: args.role,
        messages,
        bytes: payload.len() as u64,
        stats: *conn.stats(),
    };
    print_report(&mut io::stdout(), &report, format);
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

/// Send `payload` as consecutive frames of at most `max_payload` bytes.
fn send_chunks<T: Transport>(
    conn: &mut Connection<T>,
    payload: &[u8],
) -> Result<usize, LinkError> {
    let chunk_size = conn.config().max_payload;
    let mut sent = 0usize;
    for chunk in payload.chunks(chunk_size) {
        conn.send(chunk)?;
        sent += 1;
    }
    Ok(sent)
}

/// Best-effort disconnect after a failed transfer.
fn abandon<T: Transport>(conn: &mut Connection<T>, cause: &LinkError) {
    if matches!(cause, LinkError::Cancelled) || !conn.is_open() {
        return;
    }
    if let Err(err) = conn.close() {
        warn!(error = %err, "disconnect after failed transfer did not complete");
    }
}
