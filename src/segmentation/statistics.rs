//! Population statistics over cycle lists

use statrs::statistics::{Data, Median, Statistics};

use crate::types::{Cycle, CycleStatistics, DistributionStats};

/// Spread below this fraction of the mean is rounding noise, not variation.
const RELATIVE_SPREAD_FLOOR: f64 = 1e-9;

impl DistributionStats {
    /// Summarise `values`; all zeros when empty.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        Self {
            min: Statistics::min(values.iter()),
            max: Statistics::max(values.iter()),
            mean: values.iter().mean(),
            std_dev: values.iter().population_std_dev(),
            median: Data::new(values.to_vec()).median(),
        }
    }

    /// Standard score of `value`; zero when the population has no spread.
    pub fn z_score(&self, value: f64) -> f64 {
        if self.std_dev > 0.0 && self.std_dev > self.mean.abs() * RELATIVE_SPREAD_FLOOR {
            (value - self.mean) / self.std_dev
        } else {
            0.0
        }
    }
}

impl CycleStatistics {
    pub fn from_cycles(cycles: &[Cycle]) -> Self {
        if cycles.is_empty() {
            return Self::default();
        }
        let column = |f: fn(&Cycle) -> f64| cycles.iter().map(f).collect::<Vec<_>>();

        Self {
            total_cycles: cycles.len(),
            abnormal_cycles: cycles.iter().filter(|c| c.is_abnormal).count(),
            total_energy: cycles.iter().map(|c| c.energy_sum).sum(),
            duration: DistributionStats::from_values(&column(|c| c.duration_secs)),
            energy: DistributionStats::from_values(&column(|c| c.energy_sum)),
            peak_energy: DistributionStats::from_values(&column(|c| c.energy_peak)),
            variation: DistributionStats::from_values(&column(Cycle::variation)),
        }
    }
}
