//! machine-analyzer - Machine Energy Cycle Analysis
//!
//! Loads an energy-consumption series, detects production cycles and grades
//! each cycle against the rest of the run.
//!
//! # Usage
//!
//! ```bash
//! # Analyse one file and write reports to ./reports
//! machine-analyzer analyze energy.csv
//!
//! # Override thresholds and print the JSON summary
//! machine-analyzer analyze energy.csv --production-threshold 120 --json
//!
//! # Analyse many files in parallel
//! machine-analyzer batch data/*.csv
//!
//! # Check a config file / print defaults
//! machine-analyzer config check analyzer.toml
//! machine-analyzer config defaults > analyzer.toml
//! ```
//!
//! # Environment Variables
//!
//! - `MACHINE_ANALYZER_CONFIG`: Path to analyzer.toml
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use machine_analyzer::batch;
use machine_analyzer::config::{validation, AnalyzerConfig};
use machine_analyzer::pipeline::PipelineCoordinator;
use machine_analyzer::report::{recommendations, ReportWriter, SummaryStatistics};
use machine_analyzer::state::WindowSize;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "machine-analyzer")]
#[command(about = "Machine energy cycle and quality analysis")]
#[command(version)]
struct CliArgs {
    /// Config file (overrides MACHINE_ANALYZER_CONFIG and ./analyzer.toml)
    #[arg(short, long, global = true, env = "MACHINE_ANALYZER_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Per-run overrides applied on top of the loaded config.
#[derive(clap::Args, Debug, Default)]
struct Overrides {
    /// Production threshold (energy units)
    #[arg(long)]
    production_threshold: Option<f64>,

    /// Standby threshold (energy units)
    #[arg(long)]
    standby_threshold: Option<f64>,

    /// Smoothing window in seconds
    #[arg(long, conflicts_with = "window_samples")]
    window_secs: Option<f64>,

    /// Smoothing window in samples
    #[arg(long)]
    window_samples: Option<usize>,

    /// Shortest cycle kept, seconds
    #[arg(long)]
    min_duration: Option<f64>,

    /// Longest regular cycle, seconds
    #[arg(long)]
    max_duration: Option<f64>,

    /// Output directory for reports
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Skip writing report files
    #[arg(long)]
    no_reports: bool,
}

impl Overrides {
    fn apply(&self, config: &mut AnalyzerConfig) {
        if let Some(v) = self.production_threshold {
            config.state.production_threshold = v;
        }
        if let Some(v) = self.standby_threshold {
            config.state.standby_threshold = Some(v);
        }
        if let Some(v) = self.window_secs {
            config.state.window_size = WindowSize::Seconds(v);
        }
        if let Some(v) = self.window_samples {
            config.state.window_size = WindowSize::Samples(v);
        }
        if let Some(v) = self.min_duration {
            config.segmentation.min_duration_secs = v;
        }
        if let Some(v) = self.max_duration {
            config.segmentation.max_duration_secs = Some(v);
        }
        if let Some(dir) = &self.output_dir {
            config.report.output_dir = dir.clone();
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse one energy series and write reports
    Analyze {
        input: PathBuf,

        #[command(flatten)]
        overrides: Overrides,

        /// Print the JSON summary to stdout
        #[arg(long)]
        json: bool,
    },

    /// Analyse several files in parallel
    Batch {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,

        /// Print the batch summary as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Validate a config file and list the keys it sets
    Check { path: PathBuf },
    /// Print the built-in defaults as TOML
    Defaults,
}

// ============================================================================
// Commands
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig> {
    match path {
        Some(p) => AnalyzerConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(AnalyzerConfig::load()),
    }
}

fn finalize(mut config: AnalyzerConfig, overrides: &Overrides) -> Result<AnalyzerConfig> {
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration after overrides")?;
    Ok(config)
}

fn run_analyze(config: &AnalyzerConfig, input: &Path, write_reports: bool, json: bool) -> Result<()> {
    let coordinator = PipelineCoordinator::new(&config.pipeline_config())?;
    let file = batch::analyze_file(input, config, &coordinator)
        .with_context(|| format!("Failed to analyse {}", input.display()))?;
    if !file.validation.valid {
        warn!(
            path = %input.display(),
            reason = file.validation.error.as_deref().unwrap_or("unknown"),
            "Input failed validation, results may be unreliable"
        );
    }

    let generated_at = Utc::now();
    if write_reports {
        let written = ReportWriter::new(&config.report, &config.machine)
            .write(&file.report, Some(&file.validation), generated_at)
            .context("Failed to write reports")?;
        for path in written.paths() {
            info!(path = %path.display(), "Report written");
        }
    }

    let summary = &file.report.quality.summary;
    if json {
        let stats = SummaryStatistics::new(&file.report, &config.machine, generated_at, Some(&file.validation));
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", input.display());
        println!("  Cycles:            {}", file.report.segmentation.statistics.total_cycles);
        println!("  Anomalous units:   {}", summary.anomalous_cycles);
        println!("  Average quality:   {:.2}", summary.average_quality_score);
        for rec in recommendations(summary) {
            println!("  - {rec}");
        }
    }
    Ok(())
}

fn run_batch(config: &AnalyzerConfig, inputs: &[PathBuf], write_reports: bool, json: bool) -> Result<()> {
    let result = batch::analyze_files(inputs, config).context("Batch analysis failed")?;

    if write_reports {
        let generated_at = Utc::now();
        for outcome in &result.outcomes {
            let Ok(file) = &outcome.result else { continue };
            let label = outcome
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "input".to_string());
            ReportWriter::new(&config.report, &config.machine)
                .with_label(label)
                .write(&file.report, Some(&file.validation), generated_at)
                .with_context(|| format!("Failed to write reports for {}", outcome.path.display()))?;
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result.summary)?);
    } else {
        for outcome in &result.outcomes {
            match &outcome.result {
                Ok(file) => println!(
                    "{}: {} cycles, {} anomalous, quality {:.2}",
                    outcome.path.display(),
                    file.report.quality.summary.total_cycles,
                    file.report.quality.summary.anomalous_cycles,
                    file.report.quality.summary.average_quality_score,
                ),
                Err(e) => println!("{}: FAILED ({e})", outcome.path.display()),
            }
        }
        let s = &result.summary;
        println!();
        println!(
            "{} files ({} ok, {} failed), {} cycles, {} anomalous, quality {:.2}",
            s.files, s.succeeded, s.failed, s.total_cycles, s.anomalous_cycles, s.average_quality_score
        );
    }

    if result.summary.failed > 0 {
        anyhow::bail!("{} of {} files failed", result.summary.failed, result.summary.files);
    }
    Ok(())
}

fn run_config(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Check { path } => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let warnings = validation::validate_unknown_keys(&contents);
            let (_config, provenance) = AnalyzerConfig::parse_with_provenance(&contents, path)?;

            println!("{}: OK", path.display());
            let mut keys: Vec<_> = provenance.explicit_keys.iter().collect();
            keys.sort();
            for key in keys {
                println!("  set: {key}");
            }
            for w in &warnings {
                println!("  warning: {w}");
            }
        }
        ConfigAction::Defaults => {
            print!("{}", AnalyzerConfig::default().to_toml()?);
        }
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    match &args.command {
        Command::Analyze { input, overrides, json } => {
            let config = finalize(load_config(args.config.as_deref())?, overrides)?;
            info!(input = %input.display(), machine = %config.machine.name, "Starting analysis");
            run_analyze(&config, input, !overrides.no_reports, *json)
        }
        Command::Batch { inputs, overrides, json } => {
            let config = finalize(load_config(args.config.as_deref())?, overrides)?;
            info!(files = inputs.len(), "Starting batch analysis");
            run_batch(&config, inputs, !overrides.no_reports, *json)
        }
        Command::Config { action } => run_config(action),
    }
}
