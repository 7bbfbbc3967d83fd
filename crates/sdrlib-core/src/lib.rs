//! sdrlib-core: Core traits, types, and error definitions for sdrlib.
//!
//! This crate defines the vendor-agnostic pieces that every sdrlib backend
//! depends on. Applications that select and configure radios depend on
//! these types without pulling in any specific driver.
//!
//! # Key types
//!
//! - [`DeviceArgs`] -- parsed `key=value` device address
//! - [`Range`] / [`MetaRange`] -- achievable rates, frequencies and gains
//! - [`SdrDevice`] / [`SampleSource`] -- the capability interface
//! - [`Transport`] -- byte-level communication channel
//! - [`Error`] / [`Result`] -- error handling

pub mod args;
pub mod device;
pub mod error;
pub mod range;
pub mod transport;

// Re-export key types at crate root for ergonomic `use sdrlib_core::*`.
pub use args::{DeviceArgs, EMPTY_ADDRESS};
pub use device::{SampleSource, Sample, SdrDevice, SourceDevice, check_channel};
pub use error::{Error, Result};
pub use range::{MetaRange, Range};
pub use transport::Transport;
