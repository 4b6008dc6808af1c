//! CycleSegmenter: production runs to bounded, filtered cycles
//!
//! Candidates are maximal runs of production samples. Short candidates are
//! discarded. Over-long candidates are split at their sharpest energy
//! discontinuity when one is strong enough, and otherwise kept whole with
//! `is_abnormal` set. Nothing is truncated.

mod statistics;

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, info, warn};

use crate::config::defaults::{DEFAULT_MIN_DURATION_SECS, DEFAULT_SPLIT_MIN_DELTA_RATIO};
use crate::error::{AnalysisError, Result};
use crate::types::{Cycle, CycleStatistics, MachineState, Series, StateMask};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    #[serde(default = "default_min_duration_secs")]
    pub min_duration_secs: f64,

    /// Unbounded when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_secs: Option<f64>,

    /// Split over-long runs at energy discontinuities
    #[serde(default = "default_detect_abnormal")]
    pub detect_abnormal: bool,

    /// Minimum split delta as a fraction of the run's mean energy
    #[serde(default = "default_split_min_delta_ratio")]
    pub split_min_delta_ratio: f64,
}

fn default_min_duration_secs() -> f64 {
    DEFAULT_MIN_DURATION_SECS
}

fn default_detect_abnormal() -> bool {
    true
}

fn default_split_min_delta_ratio() -> f64 {
    DEFAULT_SPLIT_MIN_DELTA_RATIO
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: DEFAULT_MIN_DURATION_SECS,
            max_duration_secs: None,
            detect_abnormal: true,
            split_min_delta_ratio: DEFAULT_SPLIT_MIN_DELTA_RATIO,
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.min_duration_secs.is_finite() || self.min_duration_secs < 0.0 {
            return Err(AnalysisError::invalid_parameter(
                "min_duration_secs",
                self.min_duration_secs,
                "must be a non-negative finite number of seconds",
            ));
        }
        if let Some(max) = self.max_duration_secs {
            if !max.is_finite() || max < 0.0 {
                return Err(AnalysisError::invalid_parameter(
                    "max_duration_secs",
                    max,
                    "must be a non-negative finite number of seconds",
                ));
            }
            if self.min_duration_secs > max {
                return Err(AnalysisError::invalid_parameter(
                    "min_duration_secs",
                    self.min_duration_secs,
                    format!("must not exceed max_duration_secs ({max})"),
                ));
            }
        }
        if !self.split_min_delta_ratio.is_finite() || self.split_min_delta_ratio <= 0.0 {
            return Err(AnalysisError::invalid_parameter(
                "split_min_delta_ratio",
                self.split_min_delta_ratio,
                "must be a positive finite number",
            ));
        }
        Ok(())
    }

    fn is_too_long(&self, duration_secs: f64) -> bool {
        self.max_duration_secs.is_some_and(|max| duration_secs > max)
    }
}

// ============================================================================
// Output
// ============================================================================

/// Counters describing how candidates were filtered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationDiagnostics {
    pub candidate_runs: usize,
    pub discarded_short: usize,
    pub splits: usize,
    pub abnormal_cycles: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    /// Chronological; `cycle_id` equals the position in this list
    pub cycles: Vec<Cycle>,
    pub statistics: CycleStatistics,
    pub diagnostics: SegmentationDiagnostics,
}

// ============================================================================
// Segmenter
// ============================================================================

#[derive(Debug, Clone)]
pub struct CycleSegmenter {
    config: SegmentationConfig,
}

/// Inclusive index range awaiting a keep / discard / split decision.
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
}

impl CycleSegmenter {
    /// Validates the configuration eagerly.
    pub fn new(config: SegmentationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Segment `series` using the production flags of `mask`.
    ///
    /// `series` supplies the energy values; pass the cleaned series when
    /// state cleaning produced one.
    pub fn segment(&self, series: &Series, mask: &StateMask) -> Result<Segmentation> {
        if mask.len() != series.len() {
            return Err(AnalysisError::invalid_input(
                format!("mask has {} rows, series has {} samples", mask.len(), series.len()),
                None,
            ));
        }

        let values = series.values();
        let candidates = mask.runs(MachineState::Production);
        let mut diagnostics = SegmentationDiagnostics {
            candidate_runs: candidates.len(),
            ..SegmentationDiagnostics::default()
        };

        let mut kept: Vec<(Span, bool)> = Vec::new();
        for (start, end) in candidates {
            self.settle(series, &values, Span { start, end }, &mut kept, &mut diagnostics);
        }

        let cycles: Vec<Cycle> = kept
            .into_iter()
            .enumerate()
            .map(|(cycle_id, (span, is_abnormal))| build_cycle(series, &values, cycle_id, span, is_abnormal))
            .collect();
        diagnostics.abnormal_cycles = cycles.iter().filter(|c| c.is_abnormal).count();
        let statistics = CycleStatistics::from_cycles(&cycles);

        info!(
            candidates = diagnostics.candidate_runs,
            cycles = cycles.len(),
            discarded_short = diagnostics.discarded_short,
            splits = diagnostics.splits,
            abnormal = diagnostics.abnormal_cycles,
            "cycles segmented"
        );

        Ok(Segmentation {
            cycles,
            statistics,
            diagnostics,
        })
    }

    /// Resolve one candidate into zero or more kept spans, in order.
    fn settle(
        &self,
        series: &Series,
        values: &[f64],
        candidate: Span,
        kept: &mut Vec<(Span, bool)>,
        diagnostics: &mut SegmentationDiagnostics,
    ) {
        let mut pending = vec![candidate];
        while let Some(span) = pending.pop() {
            let duration = span_duration(series, span);
            if duration < self.config.min_duration_secs {
                debug!(start = span.start, end = span.end, duration, "discarding short run");
                diagnostics.discarded_short += 1;
                continue;
            }
            if !self.config.is_too_long(duration) {
                kept.push((span, false));
                continue;
            }
            let split = if self.config.detect_abnormal {
                self.split_point(values, span)
            } else {
                None
            };
            match split {
                Some(at) => {
                    diagnostics.splits += 1;
                    // Right half pushed first so the left half settles first.
                    pending.push(Span { start: at, end: span.end });
                    pending.push(Span {
                        start: span.start,
                        end: at - 1,
                    });
                }
                None => {
                    warn!(
                        start = span.start,
                        end = span.end,
                        duration,
                        "over-long production run kept whole and flagged abnormal"
                    );
                    kept.push((span, true));
                }
            }
        }
    }

    /// Index of the first sample after the largest energy jump in `span`,
    /// if that jump is strong enough to split on.
    fn split_point(&self, values: &[f64], span: Span) -> Option<usize> {
        if span.end <= span.start {
            return None;
        }
        let run = &values[span.start..=span.end];
        let mut best: Option<(usize, f64)> = None;
        for (offset, pair) in run.windows(2).enumerate() {
            let delta = (pair[1] - pair[0]).abs();
            if best.map_or(true, |(_, d)| delta > d) {
                best = Some((span.start + offset + 1, delta));
            }
        }
        let (at, delta) = best?;
        let mean = run.iter().mean();
        (delta > 0.0 && delta >= self.config.split_min_delta_ratio * mean).then_some(at)
    }
}

fn span_duration(series: &Series, span: Span) -> f64 {
    series.elapsed_secs(span.start, span.end) + series.sampling_interval_secs()
}

fn build_cycle(series: &Series, values: &[f64], cycle_id: usize, span: Span, is_abnormal: bool) -> Cycle {
    let run = &values[span.start..=span.end];
    let samples = series.samples();
    Cycle {
        cycle_id,
        start_index: span.start,
        end_index: span.end,
        start_time: samples[span.start].timestamp,
        end_time: samples[span.end].timestamp,
        duration_secs: span_duration(series, span),
        sample_count: run.len(),
        energy_sum: run.iter().sum(),
        energy_mean: run.iter().mean(),
        energy_peak: Statistics::max(run.iter()),
        energy_stddev: run.iter().population_std_dev(),
        is_abnormal,
    }
}
