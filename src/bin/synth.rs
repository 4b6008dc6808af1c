//! Synthetic Machine Energy Series
//!
//! Generates a periodic energy-consumption signal for exercising the
//! analyzer. Every cycle runs through four phases:
//! - Startup: linear ramp from base load to full load
//! - Production: full load with Gaussian noise
//! - Shutdown: linear ramp back down
//! - Idle: base load with light noise
//!
//! # Usage
//! ```bash
//! ./synth --hours 4 --seed 42 -o energy.csv
//! ./machine-analyzer analyze energy.csv --production-threshold 120
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use std::io::{self, Write};
use std::path::PathBuf;

// ============================================================================
// Signal Constants
// ============================================================================

/// Phase boundaries as fractions of one cycle
const STARTUP_END: f64 = 0.3;
const PRODUCTION_END: f64 = 0.7;
const SHUTDOWN_END: f64 = 0.9;

/// Noise standard deviations (energy units)
const PRODUCTION_NOISE: f64 = 5.0;
const IDLE_NOISE: f64 = 2.0;
const MEASUREMENT_NOISE: f64 = 3.0;

/// Readings never drop below this floor
const MIN_READING: f64 = 10.0;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "synth")]
#[command(about = "Synthetic machine energy series generator")]
#[command(version)]
struct Args {
    /// Series length in hours
    #[arg(short = 'H', long, default_value = "4")]
    hours: f64,

    /// Seconds between samples
    #[arg(short, long, default_value = "60")]
    interval_secs: u32,

    /// Cycle period in minutes
    #[arg(short, long, default_value = "15")]
    cycle_minutes: f64,

    /// Idle consumption
    #[arg(long, default_value = "50")]
    base_load: f64,

    /// Extra consumption at full load
    #[arg(long, default_value = "100")]
    amplitude: f64,

    /// Scale the production load of every Nth cycle by --anomaly-factor (0 = never)
    #[arg(long, default_value = "0")]
    anomaly_every: usize,

    #[arg(long, default_value = "3.0")]
    anomaly_factor: f64,

    /// Start timestamp (UTC, "%Y-%m-%d %H:%M:%S")
    #[arg(long, default_value = "2024-01-01 08:00:00")]
    start: String,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

// ============================================================================
// Signal Generation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Startup,
    Production,
    Shutdown,
    Idle,
}

impl Phase {
    fn from_progress(progress: f64) -> Self {
        match progress {
            p if p < STARTUP_END => Phase::Startup,
            p if p < PRODUCTION_END => Phase::Production,
            p if p < SHUTDOWN_END => Phase::Shutdown,
            _ => Phase::Idle,
        }
    }
}

struct Generator {
    rng: StdRng,
    production_noise: Normal<f64>,
    idle_noise: Normal<f64>,
    measurement_noise: Normal<f64>,
    base_load: f64,
    amplitude: f64,
    cycle_secs: f64,
    anomaly_every: usize,
    anomaly_factor: f64,
}

impl Generator {
    fn new(args: &Args) -> Result<Self> {
        let rng = match args.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            rng,
            production_noise: Normal::new(0.0, PRODUCTION_NOISE).context("production noise")?,
            idle_noise: Normal::new(0.0, IDLE_NOISE).context("idle noise")?,
            measurement_noise: Normal::new(0.0, MEASUREMENT_NOISE).context("measurement noise")?,
            base_load: args.base_load,
            amplitude: args.amplitude,
            cycle_secs: args.cycle_minutes * 60.0,
            anomaly_every: args.anomaly_every,
            anomaly_factor: args.anomaly_factor,
        })
    }

    fn reading(&mut self, elapsed_secs: f64) -> f64 {
        let cycle = (elapsed_secs / self.cycle_secs).floor() as usize;
        let progress = (elapsed_secs % self.cycle_secs) / self.cycle_secs;

        let mut amplitude = self.amplitude;
        if self.anomaly_every > 0 && cycle % self.anomaly_every == self.anomaly_every - 1 {
            amplitude *= self.anomaly_factor;
        }

        let energy = match Phase::from_progress(progress) {
            Phase::Startup => self.base_load + amplitude * progress / STARTUP_END,
            Phase::Production => self.base_load + amplitude + self.production_noise.sample(&mut self.rng),
            Phase::Shutdown => {
                let ramp = (progress - PRODUCTION_END) / (SHUTDOWN_END - PRODUCTION_END);
                self.base_load + amplitude * (1.0 - ramp)
            }
            Phase::Idle => self.base_load + self.idle_noise.sample(&mut self.rng),
        };
        (energy + self.measurement_noise.sample(&mut self.rng)).max(MIN_READING)
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    let args = Args::parse();
    anyhow::ensure!(args.hours > 0.0, "--hours must be positive");
    anyhow::ensure!(args.interval_secs > 0, "--interval-secs must be positive");
    anyhow::ensure!(args.cycle_minutes > 0.0, "--cycle-minutes must be positive");

    let start: DateTime<Utc> = NaiveDateTime::parse_from_str(&args.start, "%Y-%m-%d %H:%M:%S")
        .with_context(|| format!("Invalid --start '{}'", args.start))?
        .and_utc();

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            std::fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut wtr = csv::Writer::from_writer(io::BufWriter::new(sink));
    wtr.write_record(["timestamp", "value"])?;

    let mut generator = Generator::new(&args)?;
    let total_secs = (args.hours * 3600.0).round() as i64;
    let step = i64::from(args.interval_secs);
    let mut elapsed = 0i64;
    let mut rows = 0usize;
    while elapsed <= total_secs {
        let timestamp = start + Duration::seconds(elapsed);
        let value = generator.reading(elapsed as f64);
        wtr.write_record([
            timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            format!("{value:.3}"),
        ])?;
        rows += 1;
        elapsed += step;
    }
    wtr.flush()?;

    if let Some(path) = &args.output {
        eprintln!("Wrote {rows} samples to {}", path.display());
    }
    Ok(())
}
