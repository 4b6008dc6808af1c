//! Per-state IQR cleaning of the raw signal
//!
//! Within each non-off state, values outside the fences
//! `[Q1 - IQR * lower_coef, Q3 + IQR * upper_coef]` are treated as outliers
//! and re-interpolated from the other samples of the same state.
//!
//! The fences are Tukey fences anchored on the quartiles. They are not
//! centred on the state mean (`mean ± IQR * coef`), so a tight state keeps
//! its in-quartile samples even when its mean sits between them.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics};

use super::outliers::interpolate_gaps;
use crate::types::{MachineState, Series, StateMask};

/// Bound coefficients for one state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IqrBounds {
    pub lower_coef: f64,
    pub upper_coef: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateCleaningConfig {
    #[serde(default = "default_standby_bounds")]
    pub standby: IqrBounds,
    #[serde(default = "default_production_bounds")]
    pub production: IqrBounds,
}

fn default_standby_bounds() -> IqrBounds {
    IqrBounds {
        lower_coef: 1.5,
        upper_coef: 1.5,
    }
}

fn default_production_bounds() -> IqrBounds {
    IqrBounds {
        lower_coef: 1.5,
        upper_coef: 1.5,
    }
}

impl Default for StateCleaningConfig {
    fn default() -> Self {
        Self {
            standby: default_standby_bounds(),
            production: default_production_bounds(),
        }
    }
}

impl StateCleaningConfig {
    fn bounds_for(&self, state: MachineState) -> Option<IqrBounds> {
        match state {
            MachineState::Off => None,
            MachineState::Standby => Some(self.standby),
            MachineState::Production => Some(self.production),
        }
    }
}

/// Clean `values` in place of the series values; returns the new values and
/// the number of replaced samples.
pub fn clean_by_state(
    series: &Series,
    values: &[f64],
    mask: &StateMask,
    config: &StateCleaningConfig,
) -> (Vec<f64>, usize) {
    let timestamps = series.timestamps();
    let mut out = values.to_vec();
    let mut replaced = 0;

    for state in [MachineState::Standby, MachineState::Production] {
        let Some(bounds) = config.bounds_for(state) else {
            continue;
        };
        let idx: Vec<usize> = (0..mask.len()).filter(|&i| mask.state(i) == Some(state)).collect();
        if idx.len() < 4 {
            continue;
        }
        let state_values: Vec<f64> = idx.iter().map(|&i| values[i]).collect();
        let mut data = Data::new(state_values.clone());
        let (q1, q3) = (data.lower_quartile(), data.upper_quartile());
        let iqr = q3 - q1;
        let (lo, hi) = (q1 - iqr * bounds.lower_coef, q3 + iqr * bounds.upper_coef);

        let masked: Vec<Option<f64>> = state_values
            .iter()
            .map(|v| if *v < lo || *v > hi { None } else { Some(*v) })
            .collect();
        let flagged = masked.iter().filter(|v| v.is_none()).count();
        if flagged == 0 {
            continue;
        }
        let state_ts: Vec<_> = idx.iter().map(|&i| timestamps[i]).collect();
        if let Some(filled) = interpolate_gaps(&state_ts, &masked) {
            for (k, &i) in idx.iter().enumerate() {
                out[i] = filled[k];
            }
            replaced += flagged;
        }
    }
    (out, replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use MachineState::{Off, Production};

    #[test]
    fn test_production_outlier_is_replaced() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut values = vec![0.0, 0.0];
        values.extend([20.0, 21.0, 19.0, 20.0, 90.0, 20.0, 21.0, 19.0]);
        let series = Series::from_values(t0, 1.0, values.clone()).unwrap();
        let mut states = vec![Off, Off];
        states.extend(vec![Production; 8]);
        let mask = StateMask::new(states);

        let (cleaned, n) = clean_by_state(&series, &values, &mask, &StateCleaningConfig::default());
        assert_eq!(n, 1);
        assert!((cleaned[6] - 20.0).abs() < 1e-9);
        assert_eq!(cleaned[0], 0.0);
    }

    #[test]
    fn test_constant_state_is_untouched() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let values = vec![10.0; 8];
        let series = Series::from_values(t0, 1.0, values.clone()).unwrap();
        let mask = StateMask::new(vec![Production; 8]);
        let (cleaned, n) = clean_by_state(&series, &values, &mask, &StateCleaningConfig::default());
        assert_eq!(n, 0);
        assert_eq!(cleaned, values);
    }

    #[test]
    fn test_fences_anchor_on_quartiles() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut values = vec![10.0; 21];
        values[10] = 11.0;
        let series = Series::from_values(t0, 1.0, values.clone()).unwrap();
        let mask = StateMask::new(vec![Production; 21]);

        // Zero IQR: only the off-quartile sample is outside the fences
        let (cleaned, n) = clean_by_state(&series, &values, &mask, &StateCleaningConfig::default());
        assert_eq!(n, 1);
        assert!(cleaned.iter().all(|v| (*v - 10.0).abs() < 1e-12));
    }
}
