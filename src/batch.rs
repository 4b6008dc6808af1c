//! Batch analysis of independent input files
//!
//! Files are loaded and analysed in parallel on the rayon pool. A failing
//! file never aborts the batch; its error is kept in its outcome.

use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AnalyzerConfig;
use crate::error::{AnalysisError, Result};
use crate::loader::{self, DataValidation, LoaderError};
use crate::pipeline::{AnalysisReport, PipelineCoordinator};

#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Load(#[from] LoaderError),

    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
}

/// Analysis of one successfully processed file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub validation: DataValidation,
    pub report: AnalysisReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: std::result::Result<FileReport, String>,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Totals over the successful files of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_cycles: usize,
    pub anomalous_cycles: usize,
    /// Mean quality score over every cycle of every file
    pub average_quality_score: f64,
    pub total_energy: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    /// In the order the paths were given
    pub outcomes: Vec<FileOutcome>,
    pub summary: BatchSummary,
}

/// Load and analyse one file with an already validated coordinator.
pub fn analyze_file(
    path: &Path,
    config: &AnalyzerConfig,
    coordinator: &PipelineCoordinator,
) -> std::result::Result<FileReport, FileError> {
    let loaded = loader::load_series(path, &config.loader)?;
    if let Some(warning) = &loaded.validation.warning {
        warn!(path = %path.display(), "{warning}");
    }
    let report = coordinator.run(&loaded.series)?;
    Ok(FileReport {
        validation: loaded.validation,
        report,
    })
}

/// Analyse every file in parallel.
///
/// Fails only when the configuration itself is invalid; per-file failures are
/// reported in the outcomes.
pub fn analyze_files(paths: &[PathBuf], config: &AnalyzerConfig) -> Result<BatchResult> {
    let coordinator = PipelineCoordinator::new(&config.pipeline_config())?;
    let started = Instant::now();

    let outcomes: Vec<FileOutcome> = paths
        .par_iter()
        .map(|path| {
            let result = analyze_file(path, config, &coordinator).map_err(|e| {
                warn!(path = %path.display(), error = %e, "File analysis failed");
                e.to_string()
            });
            FileOutcome {
                path: path.clone(),
                result,
            }
        })
        .collect();

    let summary = summarize(&outcomes);
    info!(
        files = summary.files,
        succeeded = summary.succeeded,
        failed = summary.failed,
        cycles = summary.total_cycles,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Batch complete"
    );
    Ok(BatchResult { outcomes, summary })
}

fn summarize(outcomes: &[FileOutcome]) -> BatchSummary {
    let mut summary = BatchSummary {
        files: outcomes.len(),
        ..BatchSummary::default()
    };
    let mut score_sum = 0.0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(file) => {
                let quality = &file.report.quality;
                summary.succeeded += 1;
                summary.total_cycles += quality.summary.total_cycles;
                summary.anomalous_cycles += quality.summary.anomalous_cycles;
                summary.total_energy += file.report.profile.total_energy;
                score_sum += quality.metrics.iter().map(|m| m.quality_score).sum::<f64>();
            }
            Err(_) => summary.failed += 1,
        }
    }
    if summary.total_cycles > 0 {
        summary.average_quality_score = score_sum / summary.total_cycles as f64;
    }
    summary
}
