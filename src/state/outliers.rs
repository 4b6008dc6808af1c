//! Local-sigma outlier pre-filter and time-linear gap filling

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use super::smoothing::window_bounds;
use crate::config::defaults::{DEFAULT_OUTLIER_SIGMA, DEFAULT_OUTLIER_WINDOW_SAMPLES, OUTLIER_STD_FLOOR};
use crate::types::secs_between;

/// Replaces isolated spikes before smoothing so a single bad reading
/// cannot push a window over the production threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierFilterConfig {
    /// Local window in samples (centre excluded from the statistics)
    #[serde(default = "default_window_samples")]
    pub window_samples: usize,
    /// Deviation beyond `sigma` local standard deviations is an outlier
    #[serde(default = "default_sigma")]
    pub sigma: f64,
}

fn default_window_samples() -> usize {
    DEFAULT_OUTLIER_WINDOW_SAMPLES
}

fn default_sigma() -> f64 {
    DEFAULT_OUTLIER_SIGMA
}

impl Default for OutlierFilterConfig {
    fn default() -> Self {
        Self {
            window_samples: DEFAULT_OUTLIER_WINDOW_SAMPLES,
            sigma: DEFAULT_OUTLIER_SIGMA,
        }
    }
}

/// Flag samples deviating more than `sigma` local standard deviations from
/// the mean of their neighbours.
///
/// The standard deviation is floored at `max(|mean| * floor, floor)` so a
/// perfectly flat neighbourhood does not flag every tiny wobble.
pub fn local_sigma_outliers(values: &[f64], window: usize, sigma: f64) -> Vec<bool> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let window = window.clamp(1, n);
    (0..n)
        .map(|i| {
            let (lo, hi) = window_bounds(i, n, window);
            let neighbours: Vec<f64> = (lo..=hi).filter(|&j| j != i).map(|j| values[j]).collect();
            if neighbours.len() < 2 {
                return false;
            }
            let mean = neighbours.iter().mean();
            let std = neighbours.iter().population_std_dev();
            let floor = (mean.abs() * OUTLIER_STD_FLOOR).max(OUTLIER_STD_FLOOR);
            (values[i] - mean).abs() > sigma * std.max(floor)
        })
        .collect()
}

/// Fill `None` entries by linear interpolation on the time axis.
///
/// Leading and trailing gaps take the nearest known value. Returns `None`
/// when no value is known at all.
pub fn interpolate_gaps(timestamps: &[DateTime<Utc>], values: &[Option<f64>]) -> Option<Vec<f64>> {
    let known: Vec<usize> = (0..values.len()).filter(|&i| values[i].is_some()).collect();
    let (&first, &last) = (known.first()?, known.last()?);

    let mut out = Vec::with_capacity(values.len());
    let mut next_known = 0usize;
    for (i, value) in values.iter().enumerate() {
        if let Some(v) = value {
            out.push(*v);
            next_known += 1;
            continue;
        }
        let filled = if i < first {
            values[first].unwrap_or_default()
        } else if i > last {
            values[last].unwrap_or_default()
        } else {
            let (a, b) = (known[next_known - 1], known[next_known]);
            let (va, vb) = (values[a].unwrap_or_default(), values[b].unwrap_or_default());
            let span = secs_between(timestamps[a], timestamps[b]);
            if span > 0.0 {
                va + (vb - va) * secs_between(timestamps[a], timestamps[i]) / span
            } else {
                va
            }
        };
        out.push(filled);
    }
    Some(out)
}

/// Apply the filter, returning the repaired values and the replacement count.
pub fn filter_outliers(
    timestamps: &[DateTime<Utc>],
    values: &[f64],
    config: &OutlierFilterConfig,
) -> (Vec<f64>, usize) {
    let flags = local_sigma_outliers(values, config.window_samples, config.sigma);
    let replaced = flags.iter().filter(|f| **f).count();
    if replaced == 0 {
        return (values.to_vec(), 0);
    }
    let masked: Vec<Option<f64>> = values
        .iter()
        .zip(&flags)
        .map(|(v, flagged)| if *flagged { None } else { Some(*v) })
        .collect();
    match interpolate_gaps(timestamps, &masked) {
        Some(repaired) => (repaired, replaced),
        None => (values.to_vec(), 0),
    }
}
