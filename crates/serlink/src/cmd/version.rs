use serlink_frame::DEFAULT_MAX_PAYLOAD;
use serlink_link::{MAX_RETRANSMISSIONS_DEFAULT, TIMEOUT_DEFAULT};
use serlink_transport::BaudRate;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("serlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let rates: Vec<String> = BaudRate::ALL.iter().map(ToString::to_string).collect();

    println!("name: serlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("SERLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("baud_rates: {}", rates.join(", "));
    println!(
        "defaults: baud={} retries={} timeout={}s max_payload={}",
        BaudRate::default(),
        MAX_RETRANSMISSIONS_DEFAULT,
        TIMEOUT_DEFAULT.as_secs(),
        DEFAULT_MAX_PAYLOAD
    );

    Ok(SUCCESS)
}
