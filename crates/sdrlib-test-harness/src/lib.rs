//! sdrlib-test-harness: Test utilities and mock transports for sdrlib.
//!
//! This crate provides [`MockTransport`] for deterministic in-memory testing
//! of backend drivers, and [`MockStreamServer`] for testing drivers that
//! open a control and a data connection over real loopback TCP.

pub mod mock_server;
pub mod mock_transport;

pub use mock_server::{MockStreamServer, Recording};
pub use mock_transport::{Journal, MockHandle, MockTransport};
