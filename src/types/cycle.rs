//! Production cycle records and their population statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bounded production interval.
///
/// `cycle_id` values start at 0 and follow chronological order of
/// `start_time`. Indices are inclusive and refer to the source series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub cycle_id: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// `end_time - start_time` plus one sampling interval
    pub duration_secs: f64,
    pub sample_count: usize,
    pub energy_sum: f64,
    pub energy_mean: f64,
    pub energy_peak: f64,
    /// Population standard deviation over the interval
    pub energy_stddev: f64,
    /// Longer than the configured maximum and kept whole
    pub is_abnormal: bool,
}

impl Cycle {
    /// Coefficient of variation of energy within the cycle.
    pub fn variation(&self) -> f64 {
        if self.energy_mean > 0.0 {
            self.energy_stddev / self.energy_mean
        } else {
            0.0
        }
    }

    pub fn contains_index(&self, index: usize) -> bool {
        (self.start_index..=self.end_index).contains(&index)
    }
}

/// Summary of one metric across all cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub median: f64,
}

/// Aggregate statistics over the cycle list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleStatistics {
    pub total_cycles: usize,
    pub abnormal_cycles: usize,
    pub total_energy: f64,
    /// Duration in seconds
    pub duration: DistributionStats,
    /// Per-cycle energy_sum
    pub energy: DistributionStats,
    pub peak_energy: DistributionStats,
    /// Per-cycle coefficient of variation
    pub variation: DistributionStats,
}

impl CycleStatistics {
    pub fn is_empty(&self) -> bool {
        self.total_cycles == 0
    }
}
