//! Analysis Pipeline Module
//!
//! ## Stage Sequence
//!
//! ```text
//! STAGE 1: StateClassifier   Series            -> StateMask (+ cleaned Series)
//! STAGE 2: CycleSegmenter    Series, StateMask -> Cycles, CycleStatistics
//! STAGE 3: QualityScorer     Cycles, Stats     -> QualityMetrics, QualitySummary
//! ```
//!
//! All three stage configurations are validated before stage 1 runs, so a
//! bad parameter never leaves a half-finished analysis behind.

mod coordinator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::Result;
use crate::quality::QualityConfig;
use crate::segmentation::{Segmentation, SegmentationConfig};
use crate::state::{StateClassification, StateConfig};
use crate::types::{QualityReport, Series};

pub use coordinator::PipelineCoordinator;

/// Configuration of the three analysis stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub quality: QualityConfig,
}

/// Shape of the input series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesProfile {
    pub sample_count: usize,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub span_secs: f64,
    pub sampling_interval_secs: f64,
    pub total_energy: f64,
    pub mean_energy: f64,
    pub peak_energy: f64,
    pub min_energy: f64,
}

impl SeriesProfile {
    pub fn of(series: &Series) -> Self {
        let values = series.values();
        let (mean_energy, peak_energy, min_energy) = if values.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (
                values.iter().mean(),
                Statistics::max(values.iter()),
                Statistics::min(values.iter()),
            )
        };
        Self {
            sample_count: series.len(),
            start: series.start(),
            end: series.end(),
            span_secs: series.span_secs(),
            sampling_interval_secs: series.sampling_interval_secs(),
            total_energy: values.iter().sum(),
            mean_energy,
            peak_energy,
            min_energy,
        }
    }
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub profile: SeriesProfile,
    pub classification: StateClassification,
    pub segmentation: Segmentation,
    pub quality: QualityReport,
}

impl AnalysisReport {
    /// Share of production samples in the series.
    pub fn production_fraction(&self) -> f64 {
        self.classification
            .distribution
            .fraction(crate::types::MachineState::Production)
    }
}

/// Run classify, segment and score on one series.
pub fn analyze(series: &Series, config: &PipelineConfig) -> Result<AnalysisReport> {
    PipelineCoordinator::new(config)?.run(series)
}
