//! Red Pitaya network source backend for sdrlib.
//!
//! This crate talks to the Red Pitaya SDR transceiver server, a TCP service
//! that streams complex baseband samples from the board's ADC. It provides:
//!
//! - **Wire protocol** ([`protocol`]) -- handshake, sample-rate and
//!   frequency command words, sample record decoding.
//! - **Sample stream** ([`stream`]) -- whole-sample reads from the data
//!   connection.
//! - **RedPitayaSource** ([`source`]) -- the [`SdrDevice`](sdrlib_core::SdrDevice)
//!   and [`SampleSource`](sdrlib_core::SampleSource) implementations.
//! - **RedPitayaBuilder** ([`builder`]) -- configuration from a device
//!   address and connection setup.
//!
//! # Architecture
//!
//! The server is reached over two TCP connections to the same port. The
//! first word sent on each tells the server its role: `0` for control,
//! `1` for data. Tuning commands are single big-endian words on the control
//! connection and are never acknowledged.
//!
//! # Example
//!
//! ```no_run
//! use sdrlib_core::{DeviceArgs, SdrDevice, SampleSource, Sample};
//! use sdrlib_redpitaya::RedPitayaSource;
//!
//! # async fn example() -> sdrlib_core::Result<()> {
//! let args = DeviceArgs::parse("redpitaya=192.168.1.100:1001")?;
//! let source = RedPitayaSource::open(&args).await?;
//! source.set_sample_rate(250_000.0).await?;
//! source.set_center_freq(7_100_000.0, 0).await?;
//!
//! let mut buf = vec![Sample::default(); 4096];
//! let n = source.read_samples(&mut buf).await?;
//! source.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod protocol;
pub mod source;
pub mod stream;

pub use builder::{ARG_KEY, RedPitayaBuilder, RedPitayaTransports};
pub use source::{RedPitayaSource, SessionState, get_devices};
