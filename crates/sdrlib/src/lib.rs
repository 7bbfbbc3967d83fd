//! # sdrlib -- Unified access to SDR front ends
//!
//! `sdrlib` gives applications one way to name, discover, open, and tune
//! software-defined radio receivers, whatever driver backs them. A device
//! is addressed with a flat key/value string; the key that names a backend
//! selects the driver.
//!
//! ```no_run
//! use sdrlib::{DeviceArgs, SampleSource, SdrDevice};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = DeviceArgs::parse("redpitaya=192.168.1.100:1001")?;
//!     let device = sdrlib::open(&args).await?;
//!     device.set_sample_rate(250_000.0).await?;
//!     device.set_center_freq(7_100_000.0, 0).await?;
//!
//!     let mut buf = vec![sdrlib::Sample::default(); 4096];
//!     let n = device.read_samples(&mut buf).await?;
//!     println!("read {n} samples");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                | Purpose                                          |
//! |----------------------|--------------------------------------------------|
//! | `sdrlib-core`        | Address grammar, ranges, device traits, errors   |
//! | `sdrlib-transport`   | TCP transport                                    |
//! | `sdrlib-redpitaya`   | Red Pitaya network source driver                 |
//! | **`sdrlib`**         | This facade crate -- registry and re-exports     |
//!
//! ## Feature Flags
//!
//! | Feature     | Enables                                  | Default |
//! |-------------|------------------------------------------|---------|
//! | `redpitaya` | [`redpitaya`] module and its registry entry | yes   |
//! | `full`      | All backends                             | no      |

pub mod registry;

pub use registry::{Backend, DeviceRegistry, ProbeFn, find};
pub use sdrlib_core::*;

/// Red Pitaya network source backend.
///
/// Provides [`RedPitayaSource`](redpitaya::RedPitayaSource) and
/// [`RedPitayaBuilder`](redpitaya::RedPitayaBuilder) for streaming I/Q
/// samples from a Red Pitaya running the SDR transceiver server.
#[cfg(feature = "redpitaya")]
pub mod redpitaya {
    pub use sdrlib_redpitaya::*;
}

/// Open the device described by `args`.
///
/// The first key in `args` that names a compiled-in backend selects the
/// driver. Addresses naming no known backend are rejected with
/// [`Error::InvalidParameter`].
pub async fn open(args: &DeviceArgs) -> Result<Box<dyn SourceDevice>> {
    for key in args.keys() {
        match key {
            #[cfg(feature = "redpitaya")]
            sdrlib_redpitaya::ARG_KEY => {
                let source = sdrlib_redpitaya::RedPitayaSource::open(args).await?;
                return Ok(Box::new(source));
            }
            _ => {}
        }
    }

    Err(Error::InvalidParameter(format!(
        "no compiled-in backend accepts '{args}'"
    )))
}
