//! StateClassifier: per-sample off / standby / production labelling
//!
//! ## Pipeline
//!
//! 1. Optional local-sigma outlier pre-filter ([`outliers`])
//! 2. Centered rolling smoothing over the resolved window ([`smoothing`])
//! 3. Two-threshold classification of the smoothed signal, with readings
//!    below the standby threshold held at off
//! 4. Minimum-run hysteresis against flicker ([`hysteresis`])
//! 5. Optional per-state IQR cleaning of the signal ([`cleaning`])
//!
//! The classifier holds only its validated configuration; every call to
//! [`StateClassifier::classify`] is independent.

pub mod cleaning;
pub mod hysteresis;
pub mod outliers;
pub mod smoothing;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::defaults::{
    DEFAULT_HYSTERESIS_WINDOW_FRACTION, DEFAULT_PRODUCTION_THRESHOLD, DEFAULT_SENSITIVITY_FACTOR,
    DEFAULT_STANDBY_FRACTION, DEFAULT_WINDOW_SECS,
};
use crate::error::{AnalysisError, Result};
use crate::types::{MachineState, Series, StateDistribution, StateMask};

pub use cleaning::{IqrBounds, StateCleaningConfig};
pub use outliers::OutlierFilterConfig;
pub use smoothing::Smoothing;

// ============================================================================
// Configuration
// ============================================================================

/// Smoothing window, either a fixed sample count or a duration resolved
/// against the series' sampling interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSize {
    Samples(usize),
    Seconds(f64),
}

impl Default for WindowSize {
    fn default() -> Self {
        WindowSize::Seconds(DEFAULT_WINDOW_SECS)
    }
}

impl WindowSize {
    fn check(&self) -> Result<()> {
        match *self {
            WindowSize::Samples(0) => Err(AnalysisError::invalid_parameter(
                "window_size",
                "0 samples",
                "window must cover at least one sample",
            )),
            WindowSize::Seconds(s) if !s.is_finite() || s <= 0.0 => Err(
                AnalysisError::invalid_parameter("window_size", format!("{s} s"), "must be a positive duration"),
            ),
            _ => Ok(()),
        }
    }

    /// Window length in samples for a series sampled every `interval_secs`.
    ///
    /// A duration is rounded to the nearest whole sample. Series with fewer
    /// than two samples have no interval; any window covers them entirely.
    pub fn resolve(&self, interval_secs: f64) -> Result<usize> {
        self.check()?;
        match *self {
            WindowSize::Samples(n) => Ok(n),
            WindowSize::Seconds(_) if interval_secs <= 0.0 => Ok(1),
            WindowSize::Seconds(s) => {
                let samples = (s / interval_secs).round();
                if samples < 1.0 {
                    Err(AnalysisError::invalid_parameter(
                        "window_size",
                        format!("{s} s"),
                        format!("resolves to zero samples at a sampling interval of {interval_secs} s"),
                    ))
                } else {
                    Ok(samples as usize)
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default)]
    pub window_size: WindowSize,

    #[serde(default = "default_production_threshold")]
    pub production_threshold: f64,

    /// Defaults to a fixed fraction of `production_threshold`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standby_threshold: Option<f64>,

    #[serde(default = "default_sensitivity_factor")]
    pub sensitivity_factor: f64,

    #[serde(default)]
    pub smoothing: Smoothing,

    /// Hysteresis minimum run; derived from the window when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_state_samples: Option<usize>,

    /// Retain the smoothed signal in the output
    #[serde(default)]
    pub keep_threshold_column: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlier_filter: Option<OutlierFilterConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_cleaning: Option<StateCleaningConfig>,
}

fn default_production_threshold() -> f64 {
    DEFAULT_PRODUCTION_THRESHOLD
}

fn default_sensitivity_factor() -> f64 {
    DEFAULT_SENSITIVITY_FACTOR
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            window_size: WindowSize::default(),
            production_threshold: DEFAULT_PRODUCTION_THRESHOLD,
            standby_threshold: None,
            sensitivity_factor: DEFAULT_SENSITIVITY_FACTOR,
            smoothing: Smoothing::default(),
            min_state_samples: None,
            keep_threshold_column: false,
            outlier_filter: None,
            state_cleaning: None,
        }
    }
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::invalid_parameter(name, value, "must be a positive finite number"))
    }
}

impl StateConfig {
    /// Check every parameter that can be checked without a series.
    pub fn validate(&self) -> Result<()> {
        self.window_size.check()?;
        require_positive("production_threshold", self.production_threshold)?;
        require_positive("sensitivity_factor", self.sensitivity_factor)?;

        if let Some(standby) = self.standby_threshold {
            require_positive("standby_threshold", standby)?;
        }
        let thresholds = self.thresholds();
        if thresholds.standby >= thresholds.production {
            return Err(AnalysisError::invalid_parameter(
                "standby_threshold",
                thresholds.standby,
                format!(
                    "must be below the effective production threshold ({})",
                    thresholds.production
                ),
            ));
        }

        if self.min_state_samples == Some(0) {
            return Err(AnalysisError::invalid_parameter(
                "min_state_samples",
                0,
                "must be at least 1",
            ));
        }

        if let Some(filter) = &self.outlier_filter {
            if filter.window_samples < 3 {
                return Err(AnalysisError::invalid_parameter(
                    "outlier_filter.window_samples",
                    filter.window_samples,
                    "needs at least 3 samples",
                ));
            }
            require_positive("outlier_filter.sigma", filter.sigma)?;
        }

        if let Some(cleaning) = &self.state_cleaning {
            for (name, bounds) in [("standby", cleaning.standby), ("production", cleaning.production)] {
                require_positive(&format!("state_cleaning.{name}.lower_coef"), bounds.lower_coef)?;
                require_positive(&format!("state_cleaning.{name}.upper_coef"), bounds.upper_coef)?;
            }
        }
        Ok(())
    }

    /// Thresholds actually compared against the smoothed signal.
    pub fn thresholds(&self) -> ResolvedThresholds {
        ResolvedThresholds {
            standby: self
                .standby_threshold
                .unwrap_or(self.production_threshold * DEFAULT_STANDBY_FRACTION),
            production: self.production_threshold * self.sensitivity_factor,
        }
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedThresholds {
    /// Smoothed values below this are off
    pub standby: f64,
    /// Smoothed values at or above this are production
    pub production: f64,
}

impl ResolvedThresholds {
    pub fn classify(&self, smoothed: f64) -> MachineState {
        if smoothed < self.standby {
            MachineState::Off
        } else if smoothed < self.production {
            MachineState::Standby
        } else {
            MachineState::Production
        }
    }

    /// Label from the smoothed value, except that a raw reading below the
    /// standby threshold is always off. Keeps a centred window from
    /// spreading a production block onto the idle samples at its edges.
    pub fn classify_sample(&self, smoothed: f64, raw: f64) -> MachineState {
        if raw < self.standby {
            MachineState::Off
        } else {
            self.classify(smoothed)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateClassification {
    pub mask: StateMask,
    pub thresholds: ResolvedThresholds,
    /// Smoothing window after resolution and clipping to the series length
    pub window_samples: usize,
    pub min_state_samples: usize,
    /// Present when `keep_threshold_column` is set
    pub smoothed: Option<Vec<f64>>,
    /// Present when the outlier filter or state cleaning ran
    pub cleaned: Option<Series>,
    pub outliers_replaced: usize,
    pub cleaned_samples: usize,
    pub hysteresis_relabeled: usize,
    pub distribution: StateDistribution,
}

impl StateClassification {
    /// Series that cycle statistics should be computed from.
    pub fn effective_series<'a>(&'a self, raw: &'a Series) -> &'a Series {
        self.cleaned.as_ref().unwrap_or(raw)
    }
}

// ============================================================================
// Classifier
// ============================================================================

#[derive(Debug, Clone)]
pub struct StateClassifier {
    config: StateConfig,
}

impl StateClassifier {
    /// Validates the configuration eagerly.
    pub fn new(config: StateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    pub fn classify(&self, series: &Series) -> Result<StateClassification> {
        if series.is_empty() {
            return Err(AnalysisError::empty_input("cannot classify an empty series"));
        }

        let interval = series.sampling_interval_secs();
        let window = self.config.window_size.resolve(interval)?.min(series.len());
        let min_run = self.config.min_state_samples.unwrap_or_else(|| {
            ((window as f64 * DEFAULT_HYSTERESIS_WINDOW_FRACTION).ceil() as usize).max(1)
        });
        let thresholds = self.config.thresholds();

        let timestamps = series.timestamps();
        let mut values = series.values();

        let mut outliers_replaced = 0;
        if let Some(filter) = &self.config.outlier_filter {
            let (repaired, replaced) = outliers::filter_outliers(&timestamps, &values, filter);
            values = repaired;
            outliers_replaced = replaced;
            debug!(replaced, "outlier pre-filter applied");
        }

        let smoothed = self.config.smoothing.apply(&values, window);
        let raw_labels: Vec<MachineState> = smoothed
            .iter()
            .zip(&values)
            .map(|(s, v)| thresholds.classify_sample(*s, *v))
            .collect();
        let (labels, hysteresis_relabeled) = hysteresis::apply_hysteresis(&raw_labels, min_run);
        let mask = StateMask::new(labels);

        let mut cleaned_samples = 0;
        if let Some(cleaning) = &self.config.state_cleaning {
            let (cleaned, replaced) = cleaning::clean_by_state(series, &values, &mask, cleaning);
            values = cleaned;
            cleaned_samples = replaced;
        }
        let cleaned = if self.config.outlier_filter.is_some() || self.config.state_cleaning.is_some() {
            Some(series.with_values(values)?)
        } else {
            None
        };

        let distribution = mask.distribution();
        info!(
            samples = series.len(),
            window,
            min_run,
            off = distribution.off,
            standby = distribution.standby,
            production = distribution.production,
            relabeled = hysteresis_relabeled,
            "states classified"
        );

        Ok(StateClassification {
            mask,
            thresholds,
            window_samples: window,
            min_state_samples: min_run,
            smoothed: self.config.keep_threshold_column.then_some(smoothed),
            cleaned,
            outliers_replaced,
            cleaned_samples,
            hysteresis_relabeled,
            distribution,
        })
    }
}
