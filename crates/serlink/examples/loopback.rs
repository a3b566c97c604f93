//! Two link endpoints over an in-process socket pair.
//!
//! Run with: `cargo run -p serlink --example loopback`

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::os::unix::net::UnixStream;
    use std::thread;

    use serlink::link::{Connection, LinkConfig, LinkError, Role};

    let (left, right) = UnixStream::pair()?;

    let responder = thread::spawn(move || -> Result<Vec<String>, LinkError> {
        let mut conn = Connection::new(LinkConfig::new("loopback", Role::Responder), right)?;
        conn.open()?;
        let mut lines = Vec::new();
        loop {
            match conn.receive() {
                Ok(payload) => lines.push(String::from_utf8_lossy(&payload).into_owned()),
                Err(LinkError::Disconnected) => break,
                Err(err) => return Err(err),
            }
        }
        conn.close()?;
        Ok(lines)
    });

    let mut conn = Connection::new(LinkConfig::new("loopback", Role::Initiator), left)?;
    conn.open()?;
    for line in ["first frame", "~ flag and } escape bytes ~", "last frame"] {
        conn.send(line.as_bytes())?;
    }
    conn.close()?;

    let lines = responder
        .join()
        .map_err(|_| "responder thread panicked")??;
    for line in &lines {
        println!("received: {line}");
    }
    println!("initiator stats: {:?}", conn.stats());
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("loopback example requires Unix domain sockets");
}
