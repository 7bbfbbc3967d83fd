//! Transport implementations for sdrlib.
//!
//! This crate provides concrete implementations of the
//! [`Transport`](sdrlib_core::Transport) trait from `sdrlib-core`:
//!
//! - [`TcpTransport`]: one TCP connection to a network-attached tuner or
//!   streaming server
//!
//! # Example
//!
//! ```no_run
//! use sdrlib_transport::TcpTransport;
//! use sdrlib_core::transport::Transport;
//!
//! # async fn example() -> sdrlib_core::Result<()> {
//! let mut transport = TcpTransport::connect("192.168.1.100:1001").await?;
//! transport.send(&0u32.to_be_bytes()).await?;
//!
//! let mut buf = [0u8; 4096];
//! let n = transport.receive(&mut buf).await?;
//! # Ok(())
//! # }
//! ```

pub mod tcp;

pub use tcp::TcpTransport;
