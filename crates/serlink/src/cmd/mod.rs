use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Args, Subcommand};
use serlink_frame::DEFAULT_MAX_PAYLOAD;
use serlink_link::{CancelToken, Connection, LinkConfig, Role, MAX_RETRANSMISSIONS_DEFAULT};
use serlink_transport::{BaudRate, SerialDevice};
use tracing::debug;

use crate::exit::{link_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod receive;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send data to the peer, then disconnect.
    Send(SendArgs),
    /// Receive data until the peer disconnects.
    Receive(ReceiveArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Receive(args) => receive::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Line and retry settings shared by `send` and `receive`.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial device path (e.g. /dev/ttyS0).
    #[arg(env = "SERLINK_DEVICE")]
    pub device: String,
    /// Line speed in bits per second.
    #[arg(long, short = 'b', env = "SERLINK_BAUD", default_value = "9600")]
    pub baud: BaudRate,
    /// Transmissions of one frame before giving up.
    #[arg(long, env = "SERLINK_RETRIES", default_value_t = MAX_RETRANSMISSIONS_DEFAULT)]
    pub retries: u32,
    /// Reply timeout before retransmitting (e.g. 3s, 500ms).
    #[arg(long, env = "SERLINK_TIMEOUT", default_value = "3s")]
    pub timeout: String,
    /// Largest payload per frame in bytes.
    #[arg(long, env = "SERLINK_MAX_PAYLOAD", default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["data", "file"])))]
pub struct SendArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Which end of the link to play.
    #[arg(long, default_value = "initiator")]
    pub role: Role,
    /// Raw string payload.
    #[arg(long)]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Which end of the link to play.
    #[arg(long, default_value = "responder")]
    pub role: Role,
    /// Write received data to a file instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
    /// Give up if no connection request arrives in time (e.g. 30s).
    #[arg(long, env = "SERLINK_ACCEPT_TIMEOUT")]
    pub accept_timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

impl LinkArgs {
    pub fn config(&self, role: Role) -> CliResult<LinkConfig> {
        let config = LinkConfig::new(self.device.clone(), role)
            .with_baud_rate(self.baud)
            .with_max_retransmissions(self.retries)
            .with_timeout(parse_duration(&self.timeout)?)
            .with_max_payload(self.max_payload);
        config
            .validate()
            .map_err(|err| link_error("invalid settings", err))?;
        Ok(config)
    }
}

/// Open the device and run the handshake. Ctrl-C cancels the connection.
pub fn open_link(config: LinkConfig) -> CliResult<Connection<SerialDevice>> {
    let cancel = CancelToken::new();
    install_ctrlc_handler(cancel.clone())?;
    debug!(?config, "opening link");
    serlink_link::open_with_cancel(config, cancel).map_err(|err| link_error("open failed", err))
}

fn install_ctrlc_handler(cancel: CancelToken) -> CliResult<()> {
    ctrlc::set_handler(move || cancel.cancel()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
