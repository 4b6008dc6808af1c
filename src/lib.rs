//! machine-analyzer: Machine Energy Cycle Analysis
//!
//! Turns a machine's energy-consumption time series into production cycles
//! and per-cycle quality grades.
//!
//! ## Architecture
//!
//! - **State**: classify every sample as off / standby / production
//! - **Segmentation**: cut production runs into cycles with statistics
//! - **Quality**: score each cycle against the population and grade it
//! - **Pipeline**: the three stages above behind one validated entry point
//! - **Loader / Report / Batch**: file input, report output, parallel runs

pub mod batch;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod quality;
pub mod report;
pub mod segmentation;
pub mod state;
pub mod types;

// Re-export configuration
pub use config::{AnalyzerConfig, ConfigError};

pub use error::{AnalysisError, Result};

// Re-export the stage components
pub use pipeline::{analyze, AnalysisReport, PipelineConfig, PipelineCoordinator};
pub use quality::{QualityConfig, QualityScorer};
pub use segmentation::{CycleSegmenter, Segmentation, SegmentationConfig};
pub use state::{StateClassification, StateClassifier, StateConfig, WindowSize};

// Re-export commonly used types
pub use types::{
    Cycle, CycleStatistics, MachineState, QualityGrade, QualityMetric, QualityReport,
    QualitySummary, Sample, Series, StateMask,
};
