//! Byte-stream transport abstraction for the serlink data-link layer.
//!
//! The link layer only needs two things from the wire: a read that gives up
//! after a timeout, and an unbuffered write. This crate provides:
//! - [`SerialDevice`]: a raw 8N1 serial port (Unix, via `serialport`)
//! - `UnixStream`: socket pairs, handy for running both peers in one process
//! - [`MemoryTransport`]: an in-process pipe pair for tests and harnesses
//!
//! This is the lowest layer of serlink. Everything else builds on top of
//! the [`Transport`] trait provided here.

pub mod baud;
pub mod error;
pub mod memory;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use baud::BaudRate;
pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use traits::Transport;

#[cfg(unix)]
pub use serial::SerialDevice;
