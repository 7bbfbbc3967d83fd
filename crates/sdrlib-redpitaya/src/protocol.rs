//! Wire protocol of the Red Pitaya SDR transceiver server.
//!
//! Every command is one big-endian `u32` word on the control connection.
//! Commands are fire-and-forget: the server never acknowledges them.
//!
//! | Word                      | Meaning                                   |
//! |---------------------------|-------------------------------------------|
//! | `0` / `1` (first word)    | handshake: this socket is control / data  |
//! | `RATE_FLAG \| index`      | select sample rate `SAMPLE_RATES[index]`  |
//! | `freq` (bit 28 clear)     | tune to `freq` Hz (after ppm correction)  |
//!
//! Because bit 28 alone distinguishes the two command classes, frequency
//! words must stay below `1 << 28` (about 268 MHz). That ceiling is part
//! of the wire contract and is enforced here rather than extended.
//!
//! The data connection carries raw sample records: 8 bytes each, the I and
//! Q components as little-endian IEEE-754 `f32`, with no framing.

use sdrlib_core::Sample;

/// Default server host.
pub const DEFAULT_HOST: &str = "192.168.1.100";

/// Default server TCP port.
pub const DEFAULT_PORT: u16 = 1001;

/// Flag marking a command word as a sample-rate selection.
pub const RATE_FLAG: u32 = 1 << 28;

/// Sample rates selectable by index, in samples per second.
pub const SAMPLE_RATES: [u32; 6] = [20_000, 50_000, 100_000, 250_000, 500_000, 1_250_000];

/// Highest tunable center frequency in hertz.
pub const MAX_FREQ_HZ: f64 = 6.0e7;

/// Size of one sample record on the data connection.
pub const SAMPLE_SIZE: usize = 8;

/// Role announced by the handshake word on each connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketRole {
    /// Carries tuning commands.
    Control,
    /// Carries the sample stream.
    Data,
}

impl SocketRole {
    /// The handshake word for this role.
    pub fn word(self) -> u32 {
        match self {
            SocketRole::Control => 0,
            SocketRole::Data => 1,
        }
    }
}

impl std::fmt::Display for SocketRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SocketRole::Control => write!(f, "control"),
            SocketRole::Data => write!(f, "data"),
        }
    }
}

/// Serialize a command word for the wire.
pub fn encode(word: u32) -> [u8; 4] {
    word.to_be_bytes()
}

/// Table index of `rate`, if it is one of [`SAMPLE_RATES`].
pub fn rate_index(rate: f64) -> Option<u32> {
    SAMPLE_RATES
        .iter()
        .position(|&r| f64::from(r) == rate)
        .map(|i| i as u32)
}

/// Command word selecting the sample rate at `index`.
pub fn rate_command(index: u32) -> u32 {
    RATE_FLAG | index
}

/// Lowest tunable center frequency at the given sample rate.
pub fn min_freq_hz(rate: f64) -> f64 {
    rate / 2.0
}

/// Command word tuning to `freq_hz`, scaled by the `ppm` correction and
/// rounded to the nearest hertz.
///
/// Returns `None` when the corrected value is negative or would need
/// bit 28 or above, since such a word would be misread as a rate command.
pub fn freq_command(freq_hz: f64, ppm: f64) -> Option<u32> {
    let corrected = (freq_hz * (1.0 + ppm * 1.0e-6)).round();
    if (0.0..f64::from(RATE_FLAG)).contains(&corrected) {
        Some(corrected as u32)
    } else {
        None
    }
}

/// Decode whole sample records from `bytes` into `out`.
///
/// Returns the number of samples written: the smaller of the whole records
/// in `bytes` and `out.len()`.
pub fn decode_samples(bytes: &[u8], out: &mut [Sample]) -> usize {
    let mut count = 0;
    for (record, slot) in bytes.chunks_exact(SAMPLE_SIZE).zip(out.iter_mut()) {
        let re = f32::from_le_bytes([record[0], record[1], record[2], record[3]]);
        let im = f32::from_le_bytes([record[4], record[5], record[6], record[7]]);
        *slot = Sample::new(re, im);
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_words() {
        assert_eq!(encode(SocketRole::Control.word()), [0, 0, 0, 0]);
        assert_eq!(encode(SocketRole::Data.word()), [0, 0, 0, 1]);
    }

    #[test]
    fn rate_table_indices() {
        assert_eq!(rate_index(20_000.0), Some(0));
        assert_eq!(rate_index(100_000.0), Some(2));
        assert_eq!(rate_index(500_000.0), Some(4));
        assert_eq!(rate_index(1_250_000.0), Some(5));
        assert_eq!(rate_index(12_345.0), None);
        assert_eq!(rate_index(f64::NAN), None);
    }

    #[test]
    fn rate_command_sets_flag_bit() {
        let word = rate_command(4);
        assert_eq!(word, 0x1000_0004);
        assert_eq!(encode(word), [0x10, 0x00, 0x00, 0x04]);
    }

    #[test]
    fn freq_command_without_correction() {
        let word = freq_command(1_000_000.0, 0.0).unwrap();
        assert_eq!(word, 1_000_000);
        assert_eq!(word & RATE_FLAG, 0);
        assert_eq!(encode(word), [0x00, 0x0F, 0x42, 0x40]);
    }

    #[test]
    fn freq_command_applies_ppm_and_rounds() {
        // 10 MHz * (1 + 2.5e-6) = 10_000_025
        assert_eq!(freq_command(10_000_000.0, 2.5), Some(10_000_025));
        assert_eq!(freq_command(1_000_000.0, -1.0), Some(999_999));
        assert_eq!(freq_command(1_000_000.4, 0.0), Some(1_000_000));
        assert_eq!(freq_command(1_000_000.6, 0.0), Some(1_000_001));
    }

    #[test]
    fn freq_command_refuses_words_that_collide_with_flag() {
        assert_eq!(freq_command(f64::from(RATE_FLAG), 0.0), None);
        // 60 MHz with an absurd correction would cross 2^28.
        assert_eq!(freq_command(MAX_FREQ_HZ, 4.0e6), None);
        assert_eq!(freq_command(1_000.0, -2.0e6), None);
    }

    #[test]
    fn min_freq_is_half_rate() {
        assert_eq!(min_freq_hz(100_000.0), 50_000.0);
    }

    #[test]
    fn decode_whole_records_only() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        bytes.extend_from_slice(&(-0.5f32).to_le_bytes());
        bytes.extend_from_slice(&0.25f32.to_le_bytes());
        bytes.extend_from_slice(&2.0f32.to_le_bytes());
        bytes.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        let mut out = [Sample::default(); 4];
        let n = decode_samples(&bytes, &mut out);
        assert_eq!(n, 2);
        assert_eq!(out[0], Sample::new(1.0, -0.5));
        assert_eq!(out[1], Sample::new(0.25, 2.0));
    }

    #[test]
    fn decode_limited_by_output_len() {
        let bytes = [0u8; SAMPLE_SIZE * 3];
        let mut out = [Sample::new(9.0, 9.0); 2];
        assert_eq!(decode_samples(&bytes, &mut out), 2);
        assert_eq!(out[1], Sample::new(0.0, 0.0));
    }
}
