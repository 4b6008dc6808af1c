//! Report Generation
//!
//! Renders an [`AnalysisReport`] into three artifacts:
//!
//! | Artifact | File name                                    | Content                    |
//! |----------|----------------------------------------------|----------------------------|
//! | text     | `machine_analysis_report_<ts>.txt`           | human-readable summary     |
//! | csv      | `cycle_quality_report_<ts>.csv`              | one row per cycle          |
//! | json     | `analysis_summary_<ts>.json`                 | [`SummaryStatistics`]      |
//!
//! `<ts>` is the generation time as `%Y%m%d_%H%M%S`. An optional label is
//! prepended so batch runs writing into one directory do not collide.

mod cycle_table;
mod summary;
mod text;

use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::config::{MachineInfo, ReportConfig};
use crate::error::AnalysisError;
use crate::loader::DataValidation;
use crate::pipeline::AnalysisReport;

pub use cycle_table::write_cycle_table;
pub use summary::{DataPeriod, EnergyStatistics, ProductionSummary, SummaryStatistics};
pub use text::{recommendations, render_text};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error writing {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error writing {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Paths of the artifacts written by one [`ReportWriter::write`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenReports {
    pub text: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

impl WrittenReports {
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        [&self.text, &self.csv, &self.json]
            .into_iter()
            .filter_map(|p| p.as_deref())
    }
}

pub struct ReportWriter {
    config: ReportConfig,
    machine: MachineInfo,
    label: Option<String>,
}

impl ReportWriter {
    pub fn new(config: &ReportConfig, machine: &MachineInfo) -> Self {
        Self {
            config: config.clone(),
            machine: machine.clone(),
            label: None,
        }
    }

    /// Prefix every file name with `label`.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    fn file_name(&self, base: &str, generated_at: DateTime<Utc>, ext: &str) -> PathBuf {
        let ts = generated_at.format("%Y%m%d_%H%M%S");
        let name = match &self.label {
            Some(label) => format!("{label}_{base}_{ts}.{ext}"),
            None => format!("{base}_{ts}.{ext}"),
        };
        self.config.output_dir.join(name)
    }

    /// Write every enabled artifact; the output directory is created if needed.
    pub fn write(
        &self,
        report: &AnalysisReport,
        validation: Option<&DataValidation>,
        generated_at: DateTime<Utc>,
    ) -> Result<WrittenReports, ReportError> {
        let dir = &self.config.output_dir;
        fs::create_dir_all(dir).map_err(|e| ReportError::Io {
            path: dir.clone(),
            source: e,
        })?;

        let mut written = WrittenReports::default();

        if self.config.text {
            let path = self.file_name("machine_analysis_report", generated_at, "txt");
            let body = render_text(report, &self.machine, generated_at);
            fs::write(&path, body).map_err(|e| ReportError::Io {
                path: path.clone(),
                source: e,
            })?;
            written.text = Some(path);
        }

        if self.config.csv {
            let path = self.file_name("cycle_quality_report", generated_at, "csv");
            let file = create(&path)?;
            write_cycle_table(BufWriter::new(file), report).map_err(|e| ReportError::Csv {
                path: path.clone(),
                source: e,
            })?;
            written.csv = Some(path);
        }

        if self.config.json {
            let path = self.file_name("analysis_summary", generated_at, "json");
            let summary = SummaryStatistics::new(report, &self.machine, generated_at, validation);
            let file = create(&path)?;
            serde_json::to_writer_pretty(BufWriter::new(file), &summary).map_err(|e| ReportError::Json {
                path: path.clone(),
                source: e,
            })?;
            written.json = Some(path);
        }

        info!(
            dir = %dir.display(),
            files = written.paths().count(),
            "Reports written"
        );
        Ok(written)
    }
}

fn create(path: &Path) -> Result<File, ReportError> {
    File::create(path).map_err(|e| ReportError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
