//! QualityScorer: conformity of each cycle to the cycle population
//!
//! Each cycle is compared with the population on three metrics: variation
//! (coefficient of variation of energy within the cycle), duration and energy
//! sum. A metric outside `mean ± factor · std_dev` marks the cycle anomalous.
//!
//! ## Scoring
//!
//! Per metric, conformity is `clamp(1 - (|z| / factor)², 0, 1)`. Variation is
//! one-sided: only the excess above the population mean counts and only a
//! high coefficient of variation is flagged, so a steadier than average cycle
//! is never penalised. The score is the mean conformity,
//! capped for anomalous cycles so that one anomalous metric already lands in
//! grade D:
//!
//! ```text
//! cap = 0.45 - 0.15 * (anomalous_metrics - 1)
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::defaults::{ANOMALOUS_SCORE_CEILING, ANOMALOUS_SCORE_STEP, DEFAULT_THRESHOLD_FACTOR};
use crate::error::{AnalysisError, Result};
use crate::types::{
    AnomalyReason, Cycle, CycleStatistics, DistributionStats, QualityGrade, QualityMetric, QualityReport,
    QualitySummary,
};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Standard-deviation multipliers keyed by `variation`, `duration`,
    /// `energy`. Missing keys take the default.
    #[serde(default)]
    pub threshold_factors: BTreeMap<String, f64>,

    /// Fail on an empty cycle list instead of returning an empty summary
    #[serde(default)]
    pub require_cycles: bool,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            threshold_factors: AnomalyReason::ALL
                .into_iter()
                .map(|r| (r.key().to_string(), DEFAULT_THRESHOLD_FACTOR))
                .collect(),
            require_cycles: false,
        }
    }
}

impl QualityConfig {
    pub fn validate(&self) -> Result<()> {
        ThresholdFactors::from_map(&self.threshold_factors).map(|_| ())
    }
}

/// Validated threshold factors, one per metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdFactors {
    pub variation: f64,
    pub duration: f64,
    pub energy: f64,
}

impl Default for ThresholdFactors {
    fn default() -> Self {
        Self {
            variation: DEFAULT_THRESHOLD_FACTOR,
            duration: DEFAULT_THRESHOLD_FACTOR,
            energy: DEFAULT_THRESHOLD_FACTOR,
        }
    }
}

impl ThresholdFactors {
    /// Reject unknown keys and non-positive or non-finite factors.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Result<Self> {
        let mut factors = Self::default();
        for (key, value) in map {
            let Some(reason) = AnomalyReason::from_key(key) else {
                return Err(AnalysisError::invalid_parameter(
                    format!("threshold_factors.{key}"),
                    value,
                    "unknown metric (expected variation, duration or energy)",
                ));
            };
            if !value.is_finite() || *value <= 0.0 {
                return Err(AnalysisError::invalid_parameter(
                    format!("threshold_factors.{key}"),
                    value,
                    "must be a positive finite number",
                ));
            }
            *factors.get_mut(reason) = *value;
        }
        Ok(factors)
    }

    pub fn get(&self, reason: AnomalyReason) -> f64 {
        match reason {
            AnomalyReason::Variation => self.variation,
            AnomalyReason::Duration => self.duration,
            AnomalyReason::Energy => self.energy,
        }
    }

    fn get_mut(&mut self, reason: AnomalyReason) -> &mut f64 {
        match reason {
            AnomalyReason::Variation => &mut self.variation,
            AnomalyReason::Duration => &mut self.duration,
            AnomalyReason::Energy => &mut self.energy,
        }
    }
}

// ============================================================================
// Scorer
// ============================================================================

#[derive(Debug, Clone)]
pub struct QualityScorer {
    factors: ThresholdFactors,
    require_cycles: bool,
}

fn metric_value(cycle: &Cycle, reason: AnomalyReason) -> f64 {
    match reason {
        AnomalyReason::Variation => cycle.variation(),
        AnomalyReason::Duration => cycle.duration_secs,
        AnomalyReason::Energy => cycle.energy_sum,
    }
}

fn population(stats: &CycleStatistics, reason: AnomalyReason) -> &DistributionStats {
    match reason {
        AnomalyReason::Variation => &stats.variation,
        AnomalyReason::Duration => &stats.duration,
        AnomalyReason::Energy => &stats.energy,
    }
}

/// Score ceiling for a cycle anomalous on `count` metrics.
pub fn anomalous_ceiling(count: usize) -> f64 {
    if count == 0 {
        return 1.0;
    }
    (ANOMALOUS_SCORE_CEILING - ANOMALOUS_SCORE_STEP * (count - 1) as f64).max(0.0)
}

impl QualityScorer {
    /// Validates the configuration eagerly.
    pub fn new(config: &QualityConfig) -> Result<Self> {
        Ok(Self {
            factors: ThresholdFactors::from_map(&config.threshold_factors)?,
            require_cycles: config.require_cycles,
        })
    }

    pub fn factors(&self) -> &ThresholdFactors {
        &self.factors
    }

    /// Score every cycle against the population.
    ///
    /// `statistics` is recomputed from `cycles` when not supplied.
    pub fn score(&self, cycles: &[Cycle], statistics: Option<&CycleStatistics>) -> Result<QualityReport> {
        if cycles.is_empty() {
            if self.require_cycles {
                return Err(AnalysisError::empty_input("no cycles to score"));
            }
            warn!("no cycles to score, returning empty quality summary");
            return Ok(QualityReport {
                metrics: Vec::new(),
                summary: QualitySummary::empty(),
            });
        }

        let computed;
        let stats = match statistics {
            Some(s) if s.total_cycles != cycles.len() => {
                return Err(AnalysisError::invalid_input(
                    format!(
                        "statistics cover {} cycles, {} supplied",
                        s.total_cycles,
                        cycles.len()
                    ),
                    None,
                ));
            }
            Some(s) => s,
            None => {
                computed = CycleStatistics::from_cycles(cycles);
                &computed
            }
        };

        let metrics: Vec<QualityMetric> = if cycles.len() < 2 {
            cycles.iter().map(|c| Self::unscored(c.cycle_id)).collect()
        } else {
            cycles.iter().map(|c| self.score_cycle(c, stats)).collect()
        };
        let summary = summarize(&metrics);

        info!(
            cycles = summary.total_cycles,
            anomalous = summary.anomalous_cycles,
            average = summary.average_quality_score,
            "quality scored"
        );
        Ok(QualityReport { metrics, summary })
    }

    /// A lone cycle has no population to deviate from.
    fn unscored(cycle_id: usize) -> QualityMetric {
        QualityMetric {
            cycle_id,
            quality_score: 1.0,
            quality_grade: QualityGrade::A,
            is_anomalous: false,
            anomaly_reasons: BTreeSet::new(),
            issues: Vec::new(),
        }
    }

    fn score_cycle(&self, cycle: &Cycle, stats: &CycleStatistics) -> QualityMetric {
        let mut reasons = BTreeSet::new();
        let mut issues = Vec::new();
        let mut conformity_total = 0.0;

        for reason in AnomalyReason::ALL {
            let factor = self.factors.get(reason);
            let z = population(stats, reason).z_score(metric_value(cycle, reason));
            let counted = match reason {
                AnomalyReason::Variation => z.max(0.0),
                _ => z.abs(),
            };

            if counted > factor {
                reasons.insert(reason);
                issues.push(reason.describe(z > 0.0).to_string());
            }
            conformity_total += (1.0 - (counted / factor).powi(2)).clamp(0.0, 1.0);
        }

        let mean_conformity = conformity_total / AnomalyReason::ALL.len() as f64;
        let quality_score = mean_conformity.min(anomalous_ceiling(reasons.len()));

        QualityMetric {
            cycle_id: cycle.cycle_id,
            quality_score,
            quality_grade: QualityGrade::from_score(quality_score),
            is_anomalous: !reasons.is_empty(),
            anomaly_reasons: reasons,
            issues,
        }
    }
}

fn summarize(metrics: &[QualityMetric]) -> QualitySummary {
    let mut summary = QualitySummary::empty();
    if metrics.is_empty() {
        return summary;
    }
    summary.has_cycles = true;
    summary.total_cycles = metrics.len();
    summary.average_quality_score =
        metrics.iter().map(|m| m.quality_score).sum::<f64>() / metrics.len() as f64;

    for m in metrics {
        *summary.grade_distribution.entry(m.quality_grade).or_insert(0) += 1;
        if m.is_anomalous {
            summary.anomalous_cycles += 1;
            summary.anomalous_cycle_ids.push(m.cycle_id);
        }
        for reason in &m.anomaly_reasons {
            *summary.reason_counts.entry(*reason).or_insert(0) += 1;
        }
    }
    summary
}
