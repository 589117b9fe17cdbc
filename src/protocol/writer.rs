//! Write path: verbatim writes, framing ops, and packetized sends.
//!
//! Packetized writes chunk a payload for receivers with small input buffers
//! and gate each chunk boundary on the flow-control signal. A packetized
//! write is not atomic: a gate failure aborts the loop with the payload
//! partially sent.

use crate::error::{LinkError, Result};
use crate::protocol::flow::FlowControl;
use crate::protocol::framing::{EOT, ETX, NUL, SOH, STX};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::sleep;

/// Writer over the writable half of an established link.
///
/// The half is handed out once by the connection manager; one writer at a
/// time keeps chunk ordering strict.
pub struct LinkWriter<W, F> {
    writer: W,
    flow: F,
    flow_poll: Duration,
}

impl<W, F> std::fmt::Debug for LinkWriter<W, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkWriter").finish_non_exhaustive()
    }
}

impl<W, F> LinkWriter<W, F>
where
    W: AsyncWrite + Unpin,
    F: FlowControl,
{
    pub fn new(writer: W, flow: F, flow_poll: Duration) -> Self {
        Self {
            writer,
            flow,
            flow_poll,
        }
    }

    /// Write the payload bytes verbatim, or a single NUL when the payload is
    /// absent. NUL here is a "no data" sentinel, not a terminator.
    pub async fn write(&mut self, payload: Option<&[u8]>) -> Result<()> {
        match payload {
            Some(bytes) => self.put(bytes).await,
            None => self.put(&[NUL]).await,
        }
    }

    /// Write exactly one byte.
    pub async fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.put(&[byte]).await
    }

    /// Write the payload in chunks of at most `max_chunk_len` bytes, waiting
    /// for the receiver's ready signal between consecutive chunks (never
    /// after the last). A payload no longer than `max_chunk_len` degenerates
    /// to a single [`write`](Self::write).
    pub async fn write_packets(
        &mut self,
        payload: Option<&[u8]>,
        max_chunk_len: usize,
    ) -> Result<()> {
        if max_chunk_len == 0 {
            return Err(LinkError::InvalidArgument(
                "max_chunk_len must be positive".to_string(),
            ));
        }

        let bytes = match payload {
            Some(bytes) => bytes,
            None => return self.put(&[NUL]).await,
        };

        if bytes.len() <= max_chunk_len {
            return self.write(Some(bytes)).await;
        }

        let mut chunks = bytes.chunks(max_chunk_len).peekable();
        while let Some(chunk) = chunks.next() {
            self.put(chunk).await?;

            // wait for the receiver to request the next packet
            if chunks.peek().is_some() {
                self.wait_ready().await?;
            }
        }

        Ok(())
    }

    // =========================================================================
    // Framing ops
    // =========================================================================

    /// Write SOH, marking the start of a transmission header.
    pub async fn begin_transmission(&mut self) -> Result<()> {
        self.put(&[SOH]).await
    }

    /// Write STX, marking the beginning of a block of text.
    pub async fn begin_text(&mut self) -> Result<()> {
        self.put(&[STX]).await
    }

    /// Write ETX, marking the end of a block of text.
    pub async fn end_text(&mut self) -> Result<()> {
        self.put(&[ETX]).await
    }

    /// Write EOT, marking the end of a transmission.
    pub async fn end_transmission(&mut self) -> Result<()> {
        self.put(&[EOT]).await
    }

    /// Emit one complete framed transmission: SOH, STX, payload, ETX, EOT.
    pub async fn transmit(&mut self, payload: &[u8]) -> Result<()> {
        self.begin_transmission().await?;
        self.begin_text().await?;
        self.write(Some(payload)).await?;
        self.end_text().await?;
        self.end_transmission().await
    }

    async fn wait_ready(&mut self) -> Result<()> {
        loop {
            match self.flow.ready_to_send_next().await {
                Ok(true) => return Ok(()),
                Ok(false) => sleep(self.flow_poll).await,
                Err(e) => {
                    tracing::warn!("flow control check failed, aborting packetized write: {}", e);
                    return Err(LinkError::StreamRead(e));
                }
            }
        }
    }

    async fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer
            .write_all(bytes)
            .await
            .map_err(LinkError::StreamWrite)?;
        self.writer.flush().await.map_err(LinkError::StreamWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::flow::Unthrottled;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::io;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};

    /// Records each write call separately, preserving chunk boundaries.
    #[derive(Clone, Default)]
    struct RecordingWriter {
        writes: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl RecordingWriter {
        fn writes(&self) -> Vec<Vec<u8>> {
            self.writes.lock().unwrap().clone()
        }

        fn concat(&self) -> Vec<u8> {
            self.writes.lock().unwrap().concat()
        }
    }

    impl AsyncWrite for RecordingWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.writes.lock().unwrap().push(buf.to_vec());
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    struct FailingWriter;

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::other("output stream failed")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Always ready; counts how many times the gate was asked.
    #[derive(Clone, Default)]
    struct CountingGate {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FlowControl for CountingGate {
        async fn ready_to_send_next(&mut self) -> io::Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    /// Not ready for the first `stalls` checks, ready afterwards.
    #[derive(Clone)]
    struct StallingGate {
        stalls: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
    }

    impl StallingGate {
        fn new(stalls: usize) -> Self {
            Self {
                stalls: Arc::new(AtomicUsize::new(stalls)),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl FlowControl for StallingGate {
        async fn ready_to_send_next(&mut self) -> io::Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.stalls.load(Ordering::SeqCst);
            if remaining > 0 {
                self.stalls.store(remaining - 1, Ordering::SeqCst);
                Ok(false)
            } else {
                Ok(true)
            }
        }
    }

    struct BrokenGate;

    #[async_trait]
    impl FlowControl for BrokenGate {
        async fn ready_to_send_next(&mut self) -> io::Result<bool> {
            Err(io::Error::other("ack channel lost"))
        }
    }

    fn writer_with_gate<F: FlowControl>(flow: F) -> (LinkWriter<RecordingWriter, F>, RecordingWriter) {
        let sink = RecordingWriter::default();
        let writer = LinkWriter::new(sink.clone(), flow, Duration::from_millis(1));
        (writer, sink)
    }

    #[tokio::test]
    async fn test_write_none_writes_nul() {
        let (mut writer, sink) = writer_with_gate(CountingGate::default());
        writer.write(None).await.unwrap();
        assert_eq!(sink.concat(), vec![0x00]);
    }

    #[tokio::test]
    async fn test_write_bytes_verbatim() {
        let (mut writer, sink) = writer_with_gate(CountingGate::default());
        writer.write(Some(b"G0 X10\n")).await.unwrap();
        assert_eq!(sink.concat(), b"G0 X10\n".to_vec());
    }

    #[tokio::test]
    async fn test_write_byte() {
        let (mut writer, sink) = writer_with_gate(CountingGate::default());
        writer.write_byte(0x42).await.unwrap();
        assert_eq!(sink.concat(), vec![0x42]);
    }

    #[tokio::test]
    async fn test_framing_sequence() {
        let (mut writer, sink) = writer_with_gate(CountingGate::default());
        writer.begin_transmission().await.unwrap();
        writer.begin_text().await.unwrap();
        writer.write(Some(b"HI")).await.unwrap();
        writer.end_text().await.unwrap();
        writer.end_transmission().await.unwrap();
        assert_eq!(sink.concat(), vec![0x01, 0x02, b'H', b'I', 0x03, 0x04]);
    }

    #[tokio::test]
    async fn test_transmit_matches_manual_framing() {
        let (mut writer, sink) = writer_with_gate(CountingGate::default());
        writer.transmit(b"HI").await.unwrap();
        assert_eq!(sink.concat(), vec![0x01, 0x02, b'H', b'I', 0x03, 0x04]);
    }

    #[tokio::test]
    async fn test_write_packets_none_writes_nul() {
        let gate = CountingGate::default();
        let (mut writer, sink) = writer_with_gate(gate.clone());
        writer.write_packets(None, 8).await.unwrap();
        assert_eq!(sink.concat(), vec![0x00]);
        assert_eq!(gate.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_write_packets_zero_chunk_len_rejected_before_io() {
        let gate = CountingGate::default();
        let (mut writer, sink) = writer_with_gate(gate.clone());
        let err = writer.write_packets(Some(b"DATA"), 0).await.unwrap_err();
        assert!(matches!(err, LinkError::InvalidArgument(_)));
        assert!(sink.writes().is_empty());
        assert_eq!(gate.calls.load(Ordering::SeqCst), 0);

        // the guard also wins over the absent-payload sentinel
        let err = writer.write_packets(None, 0).await.unwrap_err();
        assert!(matches!(err, LinkError::InvalidArgument(_)));
        assert!(sink.writes().is_empty());
    }

    #[tokio::test]
    async fn test_write_packets_within_limit_is_single_write() {
        let gate = CountingGate::default();
        let (mut writer, sink) = writer_with_gate(gate.clone());
        writer.write_packets(Some(b"HELLO"), 5).await.unwrap();
        assert_eq!(sink.writes(), vec![b"HELLO".to_vec()]);
        assert_eq!(gate.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_write_packets_chunks_and_gates() {
        let gate = CountingGate::default();
        let (mut writer, sink) = writer_with_gate(gate.clone());
        writer.write_packets(Some(b"HELLOWORLD"), 3).await.unwrap();

        let expected: Vec<Vec<u8>> = vec![
            b"HEL".to_vec(),
            b"LOW".to_vec(),
            b"ORL".to_vec(),
            b"D".to_vec(),
        ];
        assert_eq!(sink.writes(), expected);
        // one gate check per chunk boundary, none after the last chunk
        assert_eq!(gate.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_write_packets_polls_until_ready() {
        let gate = StallingGate::new(2);
        let (mut writer, sink) = writer_with_gate(gate.clone());
        writer.write_packets(Some(b"ABCD"), 2).await.unwrap();

        assert_eq!(sink.concat(), b"ABCD".to_vec());
        // one boundary: two not-ready polls plus the ready one
        assert_eq!(gate.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_write_packets_gate_error_aborts_partially_sent() {
        let (mut writer, sink) = writer_with_gate(BrokenGate);
        let err = writer.write_packets(Some(b"ABCDEF"), 2).await.unwrap_err();
        assert!(matches!(err, LinkError::StreamRead(_)));
        // first chunk went out before the gate failed
        assert_eq!(sink.writes(), vec![b"AB".to_vec()]);
    }

    #[tokio::test]
    async fn test_write_error_surfaces() {
        let mut writer = LinkWriter::new(FailingWriter, Unthrottled, Duration::from_millis(1));
        let err = writer.write(Some(b"X")).await.unwrap_err();
        assert!(matches!(err, LinkError::StreamWrite(_)));
    }

    proptest! {
        #[test]
        fn packetized_writes_reassemble(
            payload in proptest::collection::vec(any::<u8>(), 1..256),
            max_chunk_len in 1usize..32,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();

            let gate = CountingGate::default();
            let (mut writer, sink) = writer_with_gate(gate.clone());
            rt.block_on(writer.write_packets(Some(&payload), max_chunk_len))
                .unwrap();

            let writes = sink.writes();
            let expected_chunks = payload.len().div_ceil(max_chunk_len);
            prop_assert_eq!(writes.len(), expected_chunks);
            prop_assert!(writes.iter().all(|w| w.len() <= max_chunk_len));
            prop_assert_eq!(sink.concat(), payload);
            prop_assert_eq!(gate.calls.load(Ordering::SeqCst), expected_chunks - 1);
        }
    }
}
