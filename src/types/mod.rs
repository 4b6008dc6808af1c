//! Shared data structures for cycle analysis
//!
//! - Series / Sample: validated input signal
//! - StateMask: per-sample operating state (StateClassifier output)
//! - Cycle / CycleStatistics: production intervals (CycleSegmenter output)
//! - QualityMetric / QualitySummary: conformity scores (QualityScorer output)
//!
//! All of these are plain values: produced once per run, read-only afterwards.

mod cycle;
mod quality;
mod series;
mod state;

pub use cycle::*;
pub use quality::*;
pub use series::*;
pub use state::*;
