//! Platform collaborator seams.
//!
//! The link core never talks to a radio directly. Everything
//! platform-specific sits behind three trait objects: a stream provider that
//! opens the duplex byte channel, radio control, and best-effort pairing.
//! Implementations for a real Bluetooth stack live outside this crate; tests
//! plug in in-memory duplex pipes.

use async_trait::async_trait;
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use uuid::Uuid;

/// Bluetooth Serial Port Profile service UUID, the usual service a serial
/// slave advertises.
pub const SERIAL_PORT_SERVICE: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805f9b34fb);

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

// =============================================================================
// Endpoint
// =============================================================================

/// A remote device address plus the service identifier it advertises.
/// Immutable once constructed; the provider resolves it to a live stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    address: String,
    service: Uuid,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, service: Uuid) -> Self {
        Self {
            address: address.into(),
            service,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn service(&self) -> Uuid {
        self.service
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.service)
    }
}

// =============================================================================
// Duplex stream
// =============================================================================

/// An established duplex byte stream: independent readable and writable
/// halves plus a probe for live connectivity checks. The connection manager
/// owns this once opened; dropping it closes the stream exactly once.
pub struct OpenStream {
    pub reader: BoxedReader,
    pub writer: BoxedWriter,
    pub probe: Box<dyn LivenessProbe>,
}

/// Live connectivity query against the underlying transport, as opposed to
/// the cached lifecycle state. The two can transiently disagree when the
/// stream drops asynchronously.
pub trait LivenessProbe: Send + Sync {
    fn is_connected(&self) -> bool;
}

// =============================================================================
// Collaborator traits
// =============================================================================

/// Opens a duplex byte stream to a named remote endpoint, scoped to the
/// endpoint's advertised service.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    async fn open(&self, endpoint: &Endpoint) -> io::Result<OpenStream>;
}

/// Local radio on/off control.
#[async_trait]
pub trait RadioControl: Send + Sync {
    async fn enable(&self) -> io::Result<()>;
    async fn disable(&self) -> io::Result<()>;
    fn is_enabled(&self) -> bool;
}

/// Platform trust establishment. Bonding is treated as optional and
/// idempotent; callers log failures and proceed unpaired.
#[async_trait]
pub trait Pairing: Send + Sync {
    async fn pair(&self, endpoint: &Endpoint) -> io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_display() {
        let ep = Endpoint::new("10:14:06:26:04:87", SERIAL_PORT_SERVICE);
        assert_eq!(
            ep.to_string(),
            "10:14:06:26:04:87 (00001101-0000-1000-8000-00805f9b34fb)"
        );
    }

    #[test]
    fn test_endpoint_accessors() {
        let ep = Endpoint::new("AA:BB:CC:DD:EE:FF", SERIAL_PORT_SERVICE);
        assert_eq!(ep.address(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(ep.service(), SERIAL_PORT_SERVICE);
    }
}
