//! # Pitchtrack - Command Line Pitch Tracker
//!
//! Prints the nearest note and tuning deviation for live microphone input or
//! for a recorded WAV file.
//!
//! ## Architecture
//! - **Main Thread**: drains readings from the session and prints them
//! - **Worker Thread**: owned by the core session, runs the estimator per frame
//! - **Input Thread**: waits for Enter and signals the main thread to stop

mod display;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use crossbeam_channel::Sender;
use display::{DEFAULT_SMOOTHING, OutputFormat, Printer};
use log::{error, info, warn};
use pitchtrack_core::audio::{CaptureConfig, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE, Microphone};
use pitchtrack_core::{Session, analysis, wav};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

/// Pitchtrack - real-time pitch and tuning readout
#[derive(Parser)]
#[command(name = "pitchtrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track the pitch of the default input device
    Listen {
        /// Samples per analysis frame
        #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
        buffer_size: usize,

        /// Preferred device sample rate in Hz
        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        /// Stop after this many seconds instead of waiting for Enter
        #[arg(long)]
        seconds: Option<f64>,

        /// Number of readings averaged for the displayed cents
        #[arg(long, default_value_t = DEFAULT_SMOOTHING)]
        smoothing: usize,

        /// Print one JSON object per reading
        #[arg(long)]
        json: bool,
    },

    /// Analyse a WAV file frame by frame
    File {
        /// Path to the WAV file
        path: PathBuf,

        /// Samples per analysis frame
        #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
        buffer_size: usize,

        /// Print one JSON object per frame
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Listen {
            buffer_size,
            sample_rate,
            seconds,
            smoothing,
            json,
        } => listen(
            CaptureConfig {
                buffer_size,
                sample_rate,
            },
            seconds,
            smoothing,
            output_format(json),
        ),
        Commands::File {
            path,
            buffer_size,
            json,
        } => analyze_file(&path, buffer_size, output_format(json)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn output_format(json: bool) -> OutputFormat {
    if json { OutputFormat::Json } else { OutputFormat::Text }
}

/// Runs a microphone session until Enter is pressed, the time limit
/// expires, or capture ends.
fn listen(
    config: CaptureConfig,
    seconds: Option<f64>,
    smoothing: usize,
    format: OutputFormat,
) -> Result<()> {
    let deadline = match seconds {
        Some(s) if s.is_finite() && s > 0.0 => crossbeam_channel::after(Duration::from_secs_f64(s)),
        Some(s) => bail!("--seconds must be a positive number, got {}", s),
        None => crossbeam_channel::never(),
    };

    let microphone = Microphone::new(config)?;
    let mut session = Session::start(microphone)?;

    let (enter_tx, enter_rx) = crossbeam_channel::bounded(1);
    // Held here so a closed stdin does not disconnect the channel.
    let _enter_keepalive = enter_tx.clone();
    spawn_enter_listener(enter_tx);

    if seconds.is_none() {
        eprintln!("Listening at {} Hz. Press Enter to stop.", session.sample_rate());
    }

    let readings = session.readings().clone();
    let mut printer = Printer::new(format, smoothing);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    loop {
        crossbeam_channel::select! {
            recv(readings) -> msg => match msg {
                Ok(reading) => writeln!(out, "{}", printer.line(&reading)?)?,
                Err(_) => {
                    warn!("Capture ended unexpectedly");
                    break;
                }
            },
            recv(enter_rx) -> _ => {
                info!("Stop requested");
                break;
            },
            recv(deadline) -> _ => {
                info!("Time limit reached");
                break;
            },
        }
    }

    session.stop()
}

fn spawn_enter_listener(stop: Sender<()>) {
    thread::spawn(move || {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => {}
            Ok(_) => {
                let _ = stop.send(());
            }
            Err(e) => warn!("Failed to read stdin: {}", e),
        }
    });
}

/// Analyses a WAV file and prints one line per frame.
fn analyze_file(path: &Path, buffer_size: usize, format: OutputFormat) -> Result<()> {
    CaptureConfig {
        buffer_size,
        ..CaptureConfig::default()
    }
    .validate()?;

    let (samples, sample_rate) = wav::read_mono(path)?;
    info!(
        "Read {} samples at {} Hz from {}",
        samples.len(),
        sample_rate,
        path.display()
    );

    let readings = analysis::analyze_signal(&samples, sample_rate, buffer_size)?;
    if samples.len() < buffer_size {
        warn!("{} is shorter than one frame", path.display());
    } else if readings.is_empty() {
        warn!("No usable frames in {}", path.display());
    }

    // Recorded frames are independent, so no smoothing across them.
    let mut printer = Printer::new(format, 1);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (start, reading) in &readings {
        let time = *start as f64 / sample_rate as f64;
        writeln!(out, "{}", printer.timed_line(time, reading)?)?;
    }
    Ok(())
}
