//! Transport trait for backend communication.
//!
//! The [`Transport`] trait abstracts over one byte-stream connection to a
//! remote device. Network backends hold one transport per socket role
//! (control, data) and never share a transport across driver instances.
//!
//! Drivers operate on `Box<dyn Transport>` rather than directly on a TCP
//! stream, which allows deterministic unit testing with `MockTransport`
//! from the `sdrlib-test-harness` crate.

use async_trait::async_trait;

use crate::error::Result;

/// Asynchronous byte-level transport to a device.
///
/// No method applies a timeout. Callers that need one wrap the future in
/// `tokio::time::timeout`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the device.
    ///
    /// Completes once all bytes have been handed to the underlying
    /// transport.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the device into the provided buffer.
    ///
    /// Returns the number of bytes read, which is at least one. A peer that
    /// closed the connection yields
    /// [`Error::ConnectionLost`](crate::error::Error::ConnectionLost).
    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// Idempotent. After `close()`, `send()` and `receive()` return
    /// [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
