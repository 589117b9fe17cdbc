//! Connection lifecycle management.
//!
//! The manager owns the duplex stream once opened and hands its halves out:
//! the readable half to the background read loop, the writable half to a
//! [`LinkWriter`]. Lifecycle state lives in a shared [`LinkStatus`] so the
//! write path and read loop observe transitions without reaching into the
//! manager.

pub mod reader;
pub mod state;

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::platform::{
    BoxedReader, BoxedWriter, Endpoint, LivenessProbe, Pairing, RadioControl, StreamProvider,
};
use crate::protocol::flow::FlowControl;
use crate::protocol::writer::LinkWriter;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

pub use reader::{ReadLoop, ReaderHandle};
pub use state::{LinkState, LinkStatus};

/// Halves of the open stream, present until handed out, plus the liveness
/// probe. Dropping this closes the stream, exactly once.
struct Connection {
    reader: Option<BoxedReader>,
    writer: Option<BoxedWriter>,
    probe: Box<dyn LivenessProbe>,
}

/// Manages the single point-to-point connection.
pub struct LinkManager {
    provider: Arc<dyn StreamProvider>,
    radio: Arc<dyn RadioControl>,
    pairing: Arc<dyn Pairing>,
    status: Arc<LinkStatus>,
    conn: Mutex<Option<Connection>>,
    config: LinkConfig,
}

impl LinkManager {
    pub fn new(
        provider: Arc<dyn StreamProvider>,
        radio: Arc<dyn RadioControl>,
        pairing: Arc<dyn Pairing>,
        config: LinkConfig,
    ) -> Self {
        Self {
            provider,
            radio,
            pairing,
            status: Arc::new(LinkStatus::new()),
            conn: Mutex::new(None),
            config,
        }
    }

    /// Cached lifecycle state.
    pub fn state(&self) -> LinkState {
        self.status.get()
    }

    /// Shared handle to the lifecycle state holder.
    pub fn status(&self) -> Arc<LinkStatus> {
        Arc::clone(&self.status)
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub async fn enable_radio(&self) -> Result<()> {
        self.radio.enable().await.map_err(LinkError::Connection)
    }

    pub async fn disable_radio(&self) -> Result<()> {
        self.radio.disable().await.map_err(LinkError::Connection)
    }

    /// Open a duplex stream to the endpoint.
    ///
    /// Enables the radio if it is off and polls until it reports enabled (a
    /// deliberate non-interactive auto-enable). Pairing is best-effort: a
    /// failure is logged and the attempt proceeds unpaired. On success the
    /// halves are stored and the state stays at Connecting; the transition
    /// to Connected is driven by [`on_connected`](Self::on_connected) once a
    /// liveness check passes. A failed open resets the state to Disconnected
    /// and is not retried.
    pub async fn connect(&self, endpoint: &Endpoint) -> Result<()> {
        self.status.advance(LinkState::Connecting);

        if !self.radio.is_enabled() {
            self.radio.enable().await.map_err(|e| self.fail(e))?;
            while !self.radio.is_enabled() {
                sleep(self.config.connect_poll()).await;
            }
        }

        tracing::info!("connecting to device: {}", endpoint);

        if let Err(e) = self.pairing.pair(endpoint).await {
            tracing::warn!("error pairing, proceeding unpaired: {}", e);
        } else {
            tracing::info!("pairing finished");
        }

        match self.provider.open(endpoint).await {
            Ok(stream) => {
                *self.conn.lock() = Some(Connection {
                    reader: Some(stream.reader),
                    writer: Some(stream.writer),
                    probe: stream.probe,
                });
                tracing::info!("connection successful");
                Ok(())
            }
            Err(e) => {
                tracing::error!("connection error: {}", e);
                Err(self.fail(e))
            }
        }
    }

    /// Live connectivity of the underlying stream, not the cached state.
    /// The two can diverge when the stream drops asynchronously; the cached
    /// state catches up when the read loop notices.
    pub fn is_connected(&self) -> bool {
        self.conn
            .lock()
            .as_ref()
            .map(|c| c.probe.is_connected())
            .unwrap_or(false)
    }

    /// Complete the handshake: transition to Connected and start the read
    /// loop. Called exactly once by the driver after it has observed
    /// [`is_connected`](Self::is_connected).
    pub fn on_connected(&self) -> Result<ReaderHandle> {
        let reader = self
            .conn
            .lock()
            .as_mut()
            .and_then(|c| c.reader.take())
            .ok_or(LinkError::NotConnected)?;

        self.status.advance(LinkState::Connected);
        Ok(reader::spawn(
            reader,
            Arc::clone(&self.status),
            self.config.read_poll(),
        ))
    }

    /// Hand out the writable half, wired to the given flow-control gate.
    /// Available once per connection; the single-writer constraint is by
    /// construction.
    pub fn writer<F: FlowControl>(&self, flow: F) -> Result<LinkWriter<BoxedWriter, F>> {
        let writer = self
            .conn
            .lock()
            .as_mut()
            .and_then(|c| c.writer.take())
            .ok_or(LinkError::NotConnected)?;

        Ok(LinkWriter::new(writer, flow, self.config.flow_poll()))
    }

    /// Drop the stored stream (closing whatever halves were never handed
    /// out) and reset the lifecycle state.
    pub fn disconnect(&self) {
        if self.conn.lock().take().is_some() {
            tracing::info!("link disconnected");
        }
        self.status.advance(LinkState::Disconnected);
    }

    /// Background handshake driver: connect, poll liveness at the connect
    /// tick, then complete via [`on_connected`](Self::on_connected).
    ///
    /// Resolves to the read-loop handle. Runs until the handshake finishes
    /// or fails; like the rest of the core it polls rather than waits on
    /// events, so a stream that never reports live keeps the task polling
    /// until it is aborted.
    pub fn establish(self: Arc<Self>, endpoint: Endpoint) -> JoinHandle<Result<ReaderHandle>> {
        tokio::spawn(async move {
            self.connect(&endpoint).await?;

            while !self.is_connected() {
                sleep(self.config.connect_poll()).await;
            }

            let handle = self.on_connected()?;
            tracing::info!("connect task complete");
            Ok(handle)
        })
    }

    fn fail(&self, cause: io::Error) -> LinkError {
        self.status.advance(LinkState::Disconnected);
        LinkError::Connection(cause)
    }
}
