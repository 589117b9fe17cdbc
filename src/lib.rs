//! Minimal point-to-point serial transport over an already-established,
//! unreliable byte stream (originally a Bluetooth RFCOMM socket).
//!
//! # Architecture
//!
//! ```text
//! +---------------+  opens   +--------------+
//! |  LinkManager  | -------> | OpenStream   |  (platform StreamProvider)
//! | (lifecycle)   |          | read | write |
//! +---------------+          +--------------+
//!        |                      |        |
//!        | starts               v        v
//!        |               +----------+  +------------+
//!        +-------------> | ReadLoop |  | LinkWriter |
//!                        | (poll)   |  | (framing,  |
//!                        +----------+  |  packets)  |
//!                                      +------------+
//! ```
//!
//! The manager drives the handshake (radio enable, best-effort pairing,
//! stream open) and owns the duplex stream; the read loop drains single
//! bytes in the background, and the writer composes framed transmissions
//! and flow-controlled packetized sends. Everything platform-specific sits
//! behind the traits in [`platform`].

pub mod config;
pub mod error;
pub mod link;
pub mod platform;
pub mod protocol;

pub use config::LinkConfig;
pub use error::{LinkError, Result};
pub use link::{LinkManager, LinkState, LinkStatus, ReadLoop, ReaderHandle};
pub use platform::{
    Endpoint, LivenessProbe, OpenStream, Pairing, RadioControl, StreamProvider,
    SERIAL_PORT_SERVICE,
};
pub use protocol::{control_name, FlowControl, LinkWriter, Unthrottled, EOT, ETX, NUL, SOH, STX};
