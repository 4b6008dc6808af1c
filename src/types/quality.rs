//! Quality scoring results

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Minimum score for grade A.
pub const GRADE_A_MIN_SCORE: f64 = 0.9;
/// Minimum score for grade B.
pub const GRADE_B_MIN_SCORE: f64 = 0.75;
/// Minimum score for grade C.
pub const GRADE_C_MIN_SCORE: f64 = 0.5;

/// Letter grade derived from a quality score.
///
/// The bands are fixed so grades stay comparable across runs and machines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QualityGrade {
    A,
    B,
    C,
    D,
}

impl QualityGrade {
    pub const ALL: [QualityGrade; 4] = [
        QualityGrade::A,
        QualityGrade::B,
        QualityGrade::C,
        QualityGrade::D,
    ];

    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= GRADE_A_MIN_SCORE => QualityGrade::A,
            s if s >= GRADE_B_MIN_SCORE => QualityGrade::B,
            s if s >= GRADE_C_MIN_SCORE => QualityGrade::C,
            _ => QualityGrade::D,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityGrade::A => "A",
            QualityGrade::B => "B",
            QualityGrade::C => "C",
            QualityGrade::D => "D",
        }
    }
}

impl std::fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metric on which a cycle deviated from the population.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyReason {
    Variation,
    Duration,
    Energy,
}

impl AnomalyReason {
    pub const ALL: [AnomalyReason; 3] = [
        AnomalyReason::Variation,
        AnomalyReason::Duration,
        AnomalyReason::Energy,
    ];

    /// Key used in the threshold-factor map.
    pub fn key(&self) -> &'static str {
        match self {
            AnomalyReason::Variation => "variation",
            AnomalyReason::Duration => "duration",
            AnomalyReason::Energy => "energy",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.key() == key)
    }

    /// Human-readable issue text for a deviation above or below the band.
    pub fn describe(&self, above: bool) -> &'static str {
        match (self, above) {
            (AnomalyReason::Variation, true) => "Variation is too high",
            (AnomalyReason::Variation, false) => "Variation is too low",
            (AnomalyReason::Duration, true) => "Duration is too long",
            (AnomalyReason::Duration, false) => "Duration is too short",
            (AnomalyReason::Energy, true) => "Energy consumption is too high",
            (AnomalyReason::Energy, false) => "Energy consumption is too low",
        }
    }
}

impl std::fmt::Display for AnomalyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Quality assessment of one cycle, joined to it by `cycle_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetric {
    pub cycle_id: usize,
    /// 0 = worst, 1 = best
    pub quality_score: f64,
    pub quality_grade: QualityGrade,
    pub is_anomalous: bool,
    pub anomaly_reasons: BTreeSet<AnomalyReason>,
    pub issues: Vec<String>,
}

/// Aggregate over all quality metrics of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    /// False when no cycles were scored; `average_quality_score` is then 0
    pub has_cycles: bool,
    pub total_cycles: usize,
    pub anomalous_cycles: usize,
    pub average_quality_score: f64,
    pub grade_distribution: BTreeMap<QualityGrade, usize>,
    pub anomalous_cycle_ids: Vec<usize>,
    pub reason_counts: BTreeMap<AnomalyReason, usize>,
}

impl QualitySummary {
    /// Explicit "no cycles" summary.
    pub fn empty() -> Self {
        Self {
            has_cycles: false,
            total_cycles: 0,
            anomalous_cycles: 0,
            average_quality_score: 0.0,
            grade_distribution: QualityGrade::ALL.into_iter().map(|g| (g, 0)).collect(),
            anomalous_cycle_ids: Vec::new(),
            reason_counts: AnomalyReason::ALL.into_iter().map(|r| (r, 0)).collect(),
        }
    }

    /// Share of scored cycles flagged anomalous.
    pub fn anomaly_rate(&self) -> f64 {
        if self.total_cycles == 0 {
            0.0
        } else {
            self.anomalous_cycles as f64 / self.total_cycles as f64
        }
    }
}

/// QualityScorer output: one metric per cycle plus the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub metrics: Vec<QualityMetric>,
    pub summary: QualitySummary,
}
