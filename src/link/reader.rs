//! Background read loop.
//!
//! Polls the readable half for one byte at a time and hands each byte to the
//! caller's sink. Pausing via the read-enable flag defers consumption without
//! closing the stream; the transport keeps buffering, so re-enabling surfaces
//! everything in arrival order.

use crate::error::{LinkError, Result};
use crate::link::state::{LinkState, LinkStatus};
use crate::platform::BoxedReader;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// Byte-oriented polling loop over the readable half of a connection.
pub struct ReadLoop<R> {
    reader: R,
    status: Arc<LinkStatus>,
    enabled: Arc<AtomicBool>,
    poll: Duration,
}

impl<R: AsyncRead + Unpin> ReadLoop<R> {
    /// The loop starts with reading enabled.
    pub fn new(reader: R, status: Arc<LinkStatus>, poll: Duration) -> Self {
        tracing::info!("read loop created");
        Self {
            reader,
            status,
            enabled: Arc::new(AtomicBool::new(true)),
            poll,
        }
    }

    /// Shared handle to the read-enable flag.
    pub fn enable_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.enabled)
    }

    /// Drive the loop until the surrounding task is cancelled, the stream
    /// closes, or a read fails. A sink error stops the loop cleanly.
    ///
    /// Stream close and read errors both cascade the shared status back to
    /// Disconnected; a read error is additionally surfaced to the owner. The
    /// loop is one-way: it cannot be restarted against the same stream.
    pub async fn run<F>(mut self, mut on_byte: F) -> Result<()>
    where
        F: FnMut(u8) -> anyhow::Result<()>,
    {
        tracing::info!("read loop running");
        let mut buf = [0u8; 1];

        loop {
            // only read if enabled
            if !self.enabled.load(Ordering::Acquire) {
                sleep(self.poll).await;
                continue;
            }

            // wait at most one tick for a byte, then recheck the flag
            match timeout(self.poll, self.reader.read(&mut buf)).await {
                Err(_) => continue,
                Ok(Ok(0)) => {
                    tracing::info!("stream closed, read loop stopped");
                    self.status.advance(LinkState::Disconnected);
                    return Ok(());
                }
                Ok(Ok(_)) => {
                    tracing::trace!("byte read: {:#04x}", buf[0]);
                    if on_byte(buf[0]).is_err() {
                        tracing::info!("byte sink dropped, read loop stopped");
                        return Ok(());
                    }
                }
                Ok(Err(e)) => {
                    tracing::error!("error reading data: {}", e);
                    self.status.advance(LinkState::Disconnected);
                    return Err(LinkError::StreamRead(e));
                }
            }
        }
    }
}

/// Spawn a read loop emitting into an unbounded channel.
pub(crate) fn spawn(reader: BoxedReader, status: Arc<LinkStatus>, poll: Duration) -> ReaderHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let read_loop = ReadLoop::new(reader, status, poll);
    let enabled = read_loop.enable_flag();

    let task = tokio::spawn(async move {
        read_loop
            .run(|byte| {
                tx.send(byte)
                    .map_err(|_| anyhow::anyhow!("byte channel closed"))
            })
            .await
    });

    ReaderHandle { bytes: rx, enabled, task }
}

/// Owner-side handle to a running read loop.
#[derive(Debug)]
pub struct ReaderHandle {
    bytes: mpsc::UnboundedReceiver<u8>,
    enabled: Arc<AtomicBool>,
    task: JoinHandle<Result<()>>,
}

impl ReaderHandle {
    /// Receive the next byte; `None` once the loop has stopped and the
    /// channel drained.
    pub async fn recv(&mut self) -> Option<u8> {
        self.bytes.recv().await
    }

    /// Pause or resume consumption. Pausing never closes the stream; the
    /// transport keeps receiving and buffering.
    pub fn set_reading(&self, reading: bool) {
        self.enabled.store(reading, Ordering::Release);
    }

    pub fn is_reading(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// One-way teardown of the loop task. A new loop requires a new
    /// connection.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Await loop completion. Cancellation counts as a clean stop; a read
    /// failure comes back as [`LinkError::StreamRead`].
    pub async fn stopped(self) -> Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(LinkError::StreamRead(io::Error::other(e))),
        }
    }
}
