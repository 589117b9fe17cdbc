//! Receiver-driven flow control.
//!
//! The "ready for next packet" signal is derived from bytes the receiver
//! sends back on the readable half, but the acknowledgment byte protocol is
//! the receiver's business, not ours. The gate is therefore a pluggable
//! capability: packetized writes poll it between chunks and implementors
//! decide what "ready" means on the wire.

use async_trait::async_trait;
use std::io;

/// Gate queried by [`LinkWriter::write_packets`] before each chunk after the
/// first. Returning `Ok(false)` makes the writer sleep one flow tick and ask
/// again; an error aborts the packetized write with the payload partially
/// sent.
///
/// [`LinkWriter::write_packets`]: crate::protocol::writer::LinkWriter::write_packets
#[async_trait]
pub trait FlowControl: Send {
    async fn ready_to_send_next(&mut self) -> io::Result<bool>;
}

/// Gate that is always ready, for links whose receiver needs no pacing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unthrottled;

#[async_trait]
impl FlowControl for Unthrottled {
    async fn ready_to_send_next(&mut self) -> io::Result<bool> {
        Ok(true)
    }
}
