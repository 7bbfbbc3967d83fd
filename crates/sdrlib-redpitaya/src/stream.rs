//! Sample stream on the data connection.
//!
//! The server writes sample records back to back with no framing, so a
//! single `receive()` can end in the middle of a record. [`SampleReader`]
//! keeps the partial tail in a buffer and only ever hands out whole samples.

use bytes::BytesMut;

use sdrlib_core::Sample;
use sdrlib_core::error::Result;
use sdrlib_core::transport::Transport;

use crate::protocol::{self, SAMPLE_SIZE};

/// Upper bound on bytes pulled from the transport per read.
const MAX_READ_BYTES: usize = 64 * 1024;

/// Reads whole complex samples from the data transport.
pub struct SampleReader {
    transport: Box<dyn Transport>,
    pending: BytesMut,
    scratch: Vec<u8>,
}

impl SampleReader {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        SampleReader {
            transport,
            pending: BytesMut::with_capacity(MAX_READ_BYTES),
            scratch: vec![0u8; MAX_READ_BYTES],
        }
    }

    /// Fill `out` with whole samples, waiting until at least one is
    /// available. Returns the number written.
    pub async fn read_samples(&mut self, out: &mut [Sample]) -> Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }

        while self.pending.len() < SAMPLE_SIZE {
            let wanted = (out.len() * SAMPLE_SIZE)
                .saturating_sub(self.pending.len())
                .clamp(SAMPLE_SIZE, MAX_READ_BYTES);
            let n = self.transport.receive(&mut self.scratch[..wanted]).await?;
            self.pending.extend_from_slice(&self.scratch[..n]);
        }

        let whole = (self.pending.len() / SAMPLE_SIZE).min(out.len());
        let records = self.pending.split_to(whole * SAMPLE_SIZE);
        let count = protocol::decode_samples(&records, out);

        tracing::trace!(
            samples = count,
            buffered_bytes = self.pending.len(),
            "Read samples"
        );

        Ok(count)
    }

    /// Bytes received but not yet returned as samples.
    pub fn buffered_bytes(&self) -> usize {
        self.pending.len()
    }

    /// Close the data transport. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        self.pending.clear();
        self.transport.close().await
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }
}
