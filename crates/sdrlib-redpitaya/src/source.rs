//! RedPitayaSource -- the [`SdrDevice`] and [`SampleSource`] implementation
//! for the Red Pitaya SDR transceiver server.
//!
//! The driver owns two connections to the same server: a control connection
//! carrying tuning commands and a data connection carrying samples. Tuning
//! is optimistic: a command is written and the cached state updated without
//! any acknowledgement from the server, so getters report what was last
//! requested, never a value read back from the hardware.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use sdrlib_core::device::check_channel;
use sdrlib_core::error::{Error, Result};
use sdrlib_core::transport::Transport;
use sdrlib_core::{DeviceArgs, MetaRange, Range, Sample, SampleSource, SdrDevice};

use crate::builder::{ARG_KEY, RedPitayaBuilder};
use crate::protocol::{self, DEFAULT_HOST, DEFAULT_PORT, MAX_FREQ_HZ, SAMPLE_RATES};
use crate::stream::SampleReader;

/// Name reported by [`SdrDevice::name`].
pub const NAME: &str = "Red Pitaya Source";

/// The only antenna port.
pub const ANTENNA: &str = "RX";

/// Center frequency assumed after connecting, in hertz.
const INITIAL_FREQ_HZ: f64 = 6.0e5;

/// Sample rate assumed after connecting.
const INITIAL_RATE: f64 = 1.0e5;

/// Lifecycle of a driver session.
///
/// Construction walks `Disconnected -> Connecting -> Handshaking ->
/// Streaming`; a constructed driver is `Streaming` until closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Handshaking,
    Streaming,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Handshaking => "handshaking",
            SessionState::Streaming => "streaming",
            SessionState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// Control connection plus the cached tuning state it drives.
struct Control {
    transport: Box<dyn Transport>,
    freq_hz: f64,
    rate: f64,
    corr_ppm: f64,
    state: SessionState,
}

impl Control {
    async fn send_command(&mut self, word: u32) -> Result<()> {
        tracing::trace!(word, "Sending command");
        self.transport.send(&protocol::encode(word)).await
    }
}

/// A connected Red Pitaya receive stream.
///
/// Constructed via [`RedPitayaBuilder`] or [`RedPitayaSource::open`].
pub struct RedPitayaSource {
    addr: String,
    // Declared before `control` so that dropping the driver releases the
    // data connection first.
    data: Mutex<SampleReader>,
    control: Mutex<Control>,
    /// Cancelled by `close()` to release a reader blocked on the data socket.
    shutdown: CancellationToken,
}

impl RedPitayaSource {
    pub(crate) fn new(
        addr: String,
        control: Box<dyn Transport>,
        data: Box<dyn Transport>,
    ) -> Self {
        RedPitayaSource {
            addr,
            data: Mutex::new(SampleReader::new(data)),
            control: Mutex::new(Control {
                transport: control,
                freq_hz: INITIAL_FREQ_HZ,
                rate: INITIAL_RATE,
                corr_ppm: 0.0,
                state: SessionState::Streaming,
            }),
            shutdown: CancellationToken::new(),
        }
    }

    /// Connect to the server named by `args` (see
    /// [`RedPitayaBuilder::from_args`]).
    pub async fn open(args: &DeviceArgs) -> Result<Self> {
        RedPitayaBuilder::from_args(args)?.build().await
    }

    /// The `host:port` this source is connected to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Current session state.
    pub async fn state(&self) -> SessionState {
        self.control.lock().await.state
    }
}

/// Device addresses this backend can offer.
///
/// The server cannot be discovered on the network, so a default address is
/// only reported when `fake` is requested.
pub fn get_devices(fake: bool) -> Result<Vec<String>> {
    if !fake {
        return Ok(Vec::new());
    }

    let args = DeviceArgs::from_pairs([
        (ARG_KEY, format!("{DEFAULT_HOST}:{DEFAULT_PORT}")),
        ("label", "Red Pitaya Transceiver Server".to_string()),
    ])?;
    Ok(vec![args.to_string()])
}

#[async_trait]
impl SdrDevice for RedPitayaSource {
    fn name(&self) -> &str {
        NAME
    }

    fn get_num_channels(&self) -> usize {
        1
    }

    fn get_sample_rates(&self) -> MetaRange {
        SAMPLE_RATES
            .iter()
            .map(|&rate| Range::point(f64::from(rate)))
            .collect()
    }

    async fn get_sample_rate(&self) -> Result<f64> {
        Ok(self.control.lock().await.rate)
    }

    async fn set_sample_rate(&self, rate: f64) -> Result<f64> {
        let mut control = self.control.lock().await;

        let Some(index) = protocol::rate_index(rate) else {
            tracing::warn!(
                requested = rate,
                current = control.rate,
                "Unsupported sample rate, keeping current"
            );
            return Ok(control.rate);
        };

        control.send_command(protocol::rate_command(index)).await?;
        control.rate = rate;
        tracing::debug!(rate, index, "Sample rate set");

        Ok(control.rate)
    }

    async fn get_freq_range(&self, chan: usize) -> Result<Range> {
        check_channel(self, chan)?;
        let rate = self.control.lock().await.rate;
        Ok(Range::continuous(protocol::min_freq_hz(rate), MAX_FREQ_HZ))
    }

    async fn get_center_freq(&self, chan: usize) -> Result<f64> {
        check_channel(self, chan)?;
        Ok(self.control.lock().await.freq_hz)
    }

    async fn set_center_freq(&self, freq: f64, chan: usize) -> Result<f64> {
        check_channel(self, chan)?;
        let mut control = self.control.lock().await;

        let tunable = protocol::min_freq_hz(control.rate)..=MAX_FREQ_HZ;
        if !tunable.contains(&freq) {
            tracing::warn!(
                requested_hz = freq,
                min_hz = tunable.start(),
                max_hz = tunable.end(),
                "Frequency out of range, keeping current"
            );
            return Ok(control.freq_hz);
        }

        let Some(word) = protocol::freq_command(freq, control.corr_ppm) else {
            tracing::warn!(
                requested_hz = freq,
                corr_ppm = control.corr_ppm,
                "Corrected frequency does not fit a command word, keeping current"
            );
            return Ok(control.freq_hz);
        };

        control.send_command(word).await?;
        control.freq_hz = freq;
        tracing::debug!(freq_hz = freq, word, "Center frequency set");

        Ok(control.freq_hz)
    }

    async fn get_freq_corr(&self, chan: usize) -> Result<f64> {
        check_channel(self, chan)?;
        Ok(self.control.lock().await.corr_ppm)
    }

    async fn set_freq_corr(&self, ppm: f64, chan: usize) -> Result<f64> {
        check_channel(self, chan)?;
        let mut control = self.control.lock().await;
        control.corr_ppm = ppm;
        tracing::debug!(corr_ppm = ppm, "Frequency correction set");
        Ok(control.corr_ppm)
    }

    async fn get_gain(&self, _name: Option<&str>, chan: usize) -> Result<f64> {
        check_channel(self, chan)?;
        Ok(0.0)
    }

    async fn set_gain(&self, gain: f64, name: Option<&str>, chan: usize) -> Result<f64> {
        check_channel(self, chan)?;
        tracing::debug!(requested_db = gain, stage = ?name, "No gain stages, ignoring");
        Ok(0.0)
    }

    fn get_antennas(&self, _chan: usize) -> Vec<String> {
        vec![ANTENNA.to_string()]
    }

    async fn get_antenna(&self, chan: usize) -> Result<String> {
        check_channel(self, chan)?;
        Ok(ANTENNA.to_string())
    }

    async fn set_antenna(&self, antenna: &str, chan: usize) -> Result<String> {
        check_channel(self, chan)?;
        if antenna != ANTENNA {
            tracing::warn!(requested = antenna, "Unknown antenna, keeping {ANTENNA}");
        }
        Ok(ANTENNA.to_string())
    }

    /// Close the data connection, then the control connection.
    ///
    /// May be called while another task is blocked in `read_samples`; that
    /// read returns [`Error::NotConnected`].
    async fn close(&self) -> Result<()> {
        self.shutdown.cancel();
        let data_result = self.data.lock().await.close().await;

        let mut control = self.control.lock().await;
        let control_result = control.transport.close().await;
        if control.state != SessionState::Closed {
            control.state = SessionState::Closed;
            tracing::info!(addr = %self.addr, "Red Pitaya source closed");
        }

        data_result.and(control_result)
    }
}

#[async_trait]
impl SampleSource for RedPitayaSource {
    async fn read_samples(&self, buf: &mut [Sample]) -> Result<usize> {
        tokio::select! {
            biased;

            _ = self.shutdown.cancelled() => Err(Error::NotConnected),
            result = async { self.data.lock().await.read_samples(buf).await } => result,
        }
    }
}

impl Drop for RedPitayaSource {
    fn drop(&mut self) {
        if self.control.get_mut().state != SessionState::Closed {
            tracing::debug!(addr = %self.addr, "RedPitayaSource dropped, releasing connections");
        }
    }
}
