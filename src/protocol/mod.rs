//! Serial framing protocol and write path.
//!
//! A transmission on the wire:
//!
//! ```text
//! +-----+-----+== payload ==+-----+-----+
//! | SOH | STX |  raw bytes  | ETX | EOT |
//! +-----+-----+=============+-----+-----+
//! ```
//!
//! Payloads too large for the receiver's input buffer go through
//! [`LinkWriter::write_packets`], which splits them into bounded chunks and
//! waits for the receiver's ready signal at each chunk boundary.

pub mod flow;
pub mod framing;
pub mod writer;

pub use flow::{FlowControl, Unthrottled};
pub use framing::{control_name, EOT, ETX, NUL, SOH, STX};
pub use writer::LinkWriter;
