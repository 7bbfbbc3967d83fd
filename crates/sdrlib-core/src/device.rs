//! The capability interface every backend implements.
//!
//! [`SdrDevice`] covers tuning and configuration; [`SampleSource`] covers
//! the sample stream of receive-capable backends. Consumers program against
//! `dyn SdrDevice` / `dyn SourceDevice` and never name a concrete backend.
//!
//! # Setter contract
//!
//! Every setter applies the request and returns the value now in effect,
//! which always equals what the matching getter reports afterwards. A
//! request the backend cannot honor (a rate not in its table, a frequency
//! outside its range) leaves state unchanged and returns the previous value.
//! Only transport failures and invalid channel indices are errors.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::range::{MetaRange, Range};

/// One complex baseband sample, interleaved I/Q as 32-bit floats.
pub type Sample = num_complex::Complex32;

/// Unified asynchronous interface for configuring a radio front end.
#[async_trait]
pub trait SdrDevice: Send + Sync {
    /// Human-readable backend name, e.g. `"Red Pitaya Source"`.
    fn name(&self) -> &str;

    /// Number of independent channels. Channel arguments must be below this.
    fn get_num_channels(&self) -> usize;

    /// Achievable sample rates in samples per second.
    fn get_sample_rates(&self) -> MetaRange;

    /// Current sample rate in samples per second.
    async fn get_sample_rate(&self) -> Result<f64>;

    /// Request a sample rate; returns the rate now in effect.
    async fn set_sample_rate(&self, rate: f64) -> Result<f64>;

    /// Tunable center frequency range of `chan` in hertz.
    async fn get_freq_range(&self, chan: usize) -> Result<Range>;

    /// Current center frequency of `chan` in hertz.
    async fn get_center_freq(&self, chan: usize) -> Result<f64>;

    /// Request a center frequency; returns the frequency now in effect.
    async fn set_center_freq(&self, freq: f64, chan: usize) -> Result<f64>;

    /// Current frequency correction in parts per million.
    async fn get_freq_corr(&self, chan: usize) -> Result<f64>;

    /// Set the frequency correction applied to subsequent tuning commands.
    async fn set_freq_corr(&self, ppm: f64, chan: usize) -> Result<f64>;

    /// Names of the individual gain stages of `chan`.
    fn get_gain_names(&self, _chan: usize) -> Vec<String> {
        Vec::new()
    }

    /// Achievable gain values in dB, overall or for the stage `name`.
    fn get_gain_range(&self, _name: Option<&str>, _chan: usize) -> MetaRange {
        MetaRange::new()
    }

    /// Current gain in dB, overall or for the stage `name`.
    async fn get_gain(&self, name: Option<&str>, chan: usize) -> Result<f64>;

    /// Request a gain; returns the gain now in effect.
    async fn set_gain(&self, gain: f64, name: Option<&str>, chan: usize) -> Result<f64>;

    /// Antenna ports selectable on `chan`.
    fn get_antennas(&self, chan: usize) -> Vec<String>;

    /// Currently selected antenna port.
    async fn get_antenna(&self, chan: usize) -> Result<String>;

    /// Request an antenna port; returns the port now in effect.
    async fn set_antenna(&self, antenna: &str, chan: usize) -> Result<String>;

    /// Release the device's connections. Idempotent.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A backend that produces a continuous stream of complex samples.
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Fill `buf` with as many whole samples as are available, waiting for
    /// at least one. Returns the number of samples written.
    async fn read_samples(&self, buf: &mut [Sample]) -> Result<usize>;
}

/// A receive backend: configuration plus sample stream.
pub trait SourceDevice: SdrDevice + SampleSource {}
impl<T: SdrDevice + SampleSource> SourceDevice for T {}

/// Reject a channel index the device does not have.
pub fn check_channel(device: &(impl SdrDevice + ?Sized), chan: usize) -> Result<()> {
    let count = device.get_num_channels();
    if chan >= count {
        return Err(Error::InvalidParameter(format!(
            "channel {chan} out of range ({count} channel(s))"
        )));
    }
    Ok(())
}
