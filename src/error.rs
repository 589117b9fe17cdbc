//! Error taxonomy for the link core.
//!
//! Pairing failures are deliberately absent: bonding is best-effort and the
//! connection manager logs and swallows them.

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LinkError>;

#[derive(Error, Debug)]
pub enum LinkError {
    /// Handshake or stream-open failure. Fatal to the current attempt; the
    /// manager resets the link to Disconnected before surfacing this.
    #[error("connection error: {0}")]
    Connection(#[source] io::Error),

    /// I/O failure on the writable half. Surfaced to the caller, no retry.
    #[error("stream write error: {0}")]
    StreamWrite(#[source] io::Error),

    /// I/O failure on the readable half (including the flow-control gate).
    /// Terminates the read loop permanently.
    #[error("stream read error: {0}")]
    StreamRead(#[source] io::Error),

    /// Rejected before any I/O was attempted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A stream half was requested before a connection was opened, or after
    /// it was already handed out.
    #[error("link is not connected")]
    NotConnected,

    #[error("configuration error: {0}")]
    Config(String),
}
