// sdrlib test application -- CLI tool for discovering, tuning, and reading
// samples from any compiled-in sdrlib backend.
//
// Usage:
//   sdrlib-test-app find
//   sdrlib-test-app find --hint "fake=1"
//   sdrlib-test-app --args "redpitaya=192.168.1.100:1001" info
//   sdrlib-test-app --args "redpitaya=192.168.1.100" freq set 7100000
//   sdrlib-test-app --args "redpitaya=192.168.1.100" rate set 250000
//   sdrlib-test-app --args "redpitaya=192.168.1.100" capture --count 65536 --output iq.cf32
//   sdrlib-test-app --args "redpitaya=192.168.1.100" stress --count 200
//
// Set RUST_LOG=sdrlib_redpitaya=trace to see every command word on the wire.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::Rng;
use tracing_subscriber::EnvFilter;

use sdrlib::{DeviceArgs, MetaRange, Sample, SampleSource, SdrDevice, SourceDevice};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// sdrlib test application -- exercises SDR backends from the command line.
#[derive(Parser)]
#[command(name = "sdrlib-test-app", version, about)]
struct Cli {
    /// Device address, e.g. "redpitaya=192.168.1.100:1001".
    /// Required for all commands except `find`.
    #[arg(long)]
    args: Option<String>,

    /// Channel index.
    #[arg(long, default_value_t = 0)]
    chan: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enumerate devices from every compiled-in backend.
    Find {
        /// Hint address, e.g. "fake=1" or "redpitaya=".
        #[arg(long, default_value = "")]
        hint: String,
    },

    /// Print device name and capabilities.
    Info,

    /// Center frequency operations.
    Freq {
        #[command(subcommand)]
        action: FreqAction,
    },

    /// Sample rate operations.
    Rate {
        #[command(subcommand)]
        action: RateAction,
    },

    /// Frequency correction operations.
    Corr {
        #[command(subcommand)]
        action: CorrAction,
    },

    /// Read samples and report their power.
    Capture {
        /// Number of complex samples to read.
        #[arg(long, default_value_t = 65_536)]
        count: usize,

        /// Write interleaved little-endian f32 I/Q to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Stress test: rapid-fire tune and read-back cycles.
    Stress {
        /// Number of tune cycles.
        #[arg(long, default_value_t = 100)]
        count: u32,
    },
}

#[derive(Subcommand)]
enum FreqAction {
    /// Read the center frequency.
    Get,
    /// Tune to a center frequency.
    Set {
        /// Frequency in hertz (e.g. 7100000).
        freq_hz: f64,
    },
}

#[derive(Subcommand)]
enum RateAction {
    /// Read the sample rate.
    Get,
    /// Request a sample rate; unsupported rates are rejected and the
    /// current rate is kept.
    Set {
        /// Rate in samples per second (e.g. 250000).
        rate: f64,
    },
}

#[derive(Subcommand)]
enum CorrAction {
    /// Read the frequency correction.
    Get,
    /// Set the frequency correction.
    Set {
        /// Correction in parts per million.
        ppm: f64,
    },
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Format a frequency in hertz as a human-readable MHz string.
fn format_freq(hz: f64) -> String {
    let mhz = hz / 1_000_000.0;
    format!("{mhz:.6} MHz")
}

fn format_rates(rates: &MetaRange) -> String {
    rates
        .iter()
        .map(|r| format!("{}", r.start()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Mean power of a block of samples in dBFS.
fn power_dbfs(samples: &[Sample]) -> f64 {
    if samples.is_empty() {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = samples.iter().map(|s| s.norm_sqr() as f64).sum();
    10.0 * (sum / samples.len() as f64).log10()
}

async fn open_device(cli: &Cli) -> Result<Box<dyn SourceDevice>> {
    let Some(text) = cli.args.as_deref() else {
        bail!("--args is required for this command");
    };
    let args = DeviceArgs::parse(text).context("invalid --args")?;
    println!("Opening {}", args.to_pretty_string().trim_end());

    sdrlib::open(&args)
        .await
        .with_context(|| format!("failed to open '{args}'"))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_find(hint: &str) -> Result<()> {
    let hint = DeviceArgs::parse(hint).context("invalid --hint")?;
    let devices = sdrlib::find(&hint);

    if devices.is_empty() {
        println!("No devices found.");
        return Ok(());
    }

    for (i, device) in devices.iter().enumerate() {
        println!("[{i}] {device}");
    }
    Ok(())
}

async fn cmd_info(device: &dyn SourceDevice, chan: usize) -> Result<()> {
    println!("Device Information");
    println!("  Name:           {}", device.name());
    println!("  Channels:       {}", device.get_num_channels());
    println!();
    println!("Capabilities");
    println!("  Sample rates:   {}", format_rates(&device.get_sample_rates()));
    println!("  Sample rate:    {}", device.get_sample_rate().await?);

    let range = device.get_freq_range(chan).await?;
    println!(
        "  Freq range:     {} - {}",
        format_freq(range.start()),
        format_freq(range.stop())
    );
    println!("  Center freq:    {}", format_freq(device.get_center_freq(chan).await?));
    println!("  Correction:     {} ppm", device.get_freq_corr(chan).await?);

    let gains = device.get_gain_names(chan);
    println!(
        "  Gains:          {}",
        if gains.is_empty() { "none".to_string() } else { gains.join(", ") }
    );
    println!("  Antennas:       {}", device.get_antennas(chan).join(", "));
    println!("  Antenna:        {}", device.get_antenna(chan).await?);
    Ok(())
}

async fn cmd_freq(device: &dyn SourceDevice, chan: usize, action: &FreqAction) -> Result<()> {
    match action {
        FreqAction::Get => {
            println!("{}", format_freq(device.get_center_freq(chan).await?));
        }
        FreqAction::Set { freq_hz } => {
            let applied = device.set_center_freq(*freq_hz, chan).await?;
            if applied != *freq_hz {
                println!(
                    "Requested {} rejected, still at {}",
                    format_freq(*freq_hz),
                    format_freq(applied)
                );
            } else {
                println!("Tuned to {}", format_freq(applied));
            }
        }
    }
    Ok(())
}

async fn cmd_rate(device: &dyn SourceDevice, action: &RateAction) -> Result<()> {
    match action {
        RateAction::Get => println!("{} S/s", device.get_sample_rate().await?),
        RateAction::Set { rate } => {
            let applied = device.set_sample_rate(*rate).await?;
            println!("Requested {rate} S/s, applied {applied} S/s");
        }
    }
    Ok(())
}

async fn cmd_corr(device: &dyn SourceDevice, chan: usize, action: &CorrAction) -> Result<()> {
    match action {
        CorrAction::Get => println!("{} ppm", device.get_freq_corr(chan).await?),
        CorrAction::Set { ppm } => {
            let applied = device.set_freq_corr(*ppm, chan).await?;
            println!("Correction set to {applied} ppm");
        }
    }
    Ok(())
}

async fn cmd_capture(device: &dyn SourceDevice, count: usize, output: Option<&PathBuf>) -> Result<()> {
    let mut writer = match output {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => None,
    };

    let mut buf = vec![Sample::default(); 4096];
    let mut total = 0usize;
    let mut energy = 0.0f64;
    let start = Instant::now();

    while total < count {
        let want = (count - total).min(buf.len());
        let n = device.read_samples(&mut buf[..want]).await?;
        let block = &buf[..n];

        energy += block.iter().map(|s| s.norm_sqr() as f64).sum::<f64>();
        if let Some(w) = writer.as_mut() {
            for s in block {
                w.write_all(&s.re.to_le_bytes())?;
                w.write_all(&s.im.to_le_bytes())?;
            }
        }

        tracing::debug!(block = n, power_dbfs = power_dbfs(block), "Block read");
        total += n;
    }

    if let Some(mut w) = writer {
        w.flush()?;
    }

    let elapsed = start.elapsed();
    let mean_db = 10.0 * (energy / total.max(1) as f64).log10();
    println!("Captured {total} samples in {:.2}s", elapsed.as_secs_f64());
    println!(
        "  Throughput:     {:.0} S/s",
        total as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
    println!("  Mean power:     {mean_db:.1} dBFS");
    Ok(())
}

async fn cmd_stress(device: &dyn SourceDevice, chan: usize, count: u32) -> Result<()> {
    let range = device.get_freq_range(chan).await?;
    let base_freq = device.get_center_freq(chan).await?;
    println!("Stress test: {count} cycles on channel {chan}");
    println!("Base frequency: {}", format_freq(base_freq));

    let mut rng = rand::thread_rng();
    let mut success = 0u32;
    let mut failures = 0u32;
    let start = Instant::now();

    for i in 1..=count {
        let target = rng.gen_range(range.start()..=range.stop()).round();

        let applied = match device.set_center_freq(target, chan).await {
            Ok(applied) => applied,
            Err(e) => {
                eprintln!("[{i}/{count}] set_center_freq failed: {e}");
                failures += 1;
                continue;
            }
        };

        match device.get_center_freq(chan).await {
            Ok(readback) if readback == applied && applied == target => success += 1,
            Ok(readback) => {
                eprintln!(
                    "[{i}/{count}] mismatch: set {} but read back {}",
                    format_freq(target),
                    format_freq(readback)
                );
                failures += 1;
            }
            Err(e) => {
                eprintln!("[{i}/{count}] get_center_freq failed: {e}");
                failures += 1;
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("Results: {success} passed, {failures} failed in {:.2}s", elapsed.as_secs_f64());
    if count > 0 {
        println!(
            "  Avg cycle:      {:.1} ms",
            elapsed.as_secs_f64() * 1000.0 / count as f64
        );
    }

    device.set_center_freq(base_freq, chan).await?;
    if failures > 0 {
        bail!("{failures} of {count} cycles failed");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // The `find` command does not require a device connection.
    if let Command::Find { hint } = &cli.command {
        return cmd_find(hint);
    }

    let device = open_device(&cli).await?;
    let chan = cli.chan;

    let result = match &cli.command {
        Command::Info => cmd_info(device.as_ref(), chan).await,
        Command::Freq { action } => cmd_freq(device.as_ref(), chan, action).await,
        Command::Rate { action } => cmd_rate(device.as_ref(), action).await,
        Command::Corr { action } => cmd_corr(device.as_ref(), chan, action).await,
        Command::Capture { count, output } => {
            cmd_capture(device.as_ref(), *count, output.as_ref()).await
        }
        Command::Stress { count } => cmd_stress(device.as_ref(), chan, *count).await,
        Command::Find { .. } => unreachable!("find handled above"),
    };

    device.close().await.ok();
    result
}
