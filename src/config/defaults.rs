//! System-wide default constants.
//!
//! Every hand-tuned number used by the analysis stages lives here, grouped
//! by subsystem, so behaviour stays auditable and testable.

// ============================================================================
// State Classification
// ============================================================================

/// Default smoothing window (seconds). 5 s spans several samples at 1 Hz.
pub const DEFAULT_WINDOW_SECS: f64 = 5.0;

/// Default production threshold (energy units).
pub const DEFAULT_PRODUCTION_THRESHOLD: f64 = 5.0;

/// Standby threshold as a fraction of the production threshold when the
/// caller does not supply one. Smoothed values below it are "off".
pub const DEFAULT_STANDBY_FRACTION: f64 = 0.1;

/// Default multiplier on the production threshold.
pub const DEFAULT_SENSITIVITY_FACTOR: f64 = 1.0;

/// Hysteresis minimum run length as a fraction of the smoothing window.
///
/// `min_state_samples = max(1, ceil(window_samples * fraction))`
pub const DEFAULT_HYSTERESIS_WINDOW_FRACTION: f64 = 0.5;

/// Local window for the optional outlier pre-filter (samples).
pub const DEFAULT_OUTLIER_WINDOW_SAMPLES: usize = 21;

/// Sigma multiplier for the optional outlier pre-filter.
pub const DEFAULT_OUTLIER_SIGMA: f64 = 3.0;

/// Relative/absolute floor on the local standard deviation in the outlier
/// pre-filter (fraction of |mean|, and absolute minimum).
pub const OUTLIER_STD_FLOOR: f64 = 0.001;

// ============================================================================
// Cycle Segmentation
// ============================================================================

/// Default minimum cycle duration (seconds). Zero keeps every run.
pub const DEFAULT_MIN_DURATION_SECS: f64 = 0.0;

/// Largest single-sample delta must reach this fraction of a run's mean
/// energy before an over-long run is split there.
pub const DEFAULT_SPLIT_MIN_DELTA_RATIO: f64 = 0.5;

// ============================================================================
// Quality Scoring
// ============================================================================

/// Default standard-deviation multiplier for every anomaly metric.
pub const DEFAULT_THRESHOLD_FACTOR: f64 = 2.0;

/// Score ceiling for a cycle anomalous on one metric (grade D).
pub const ANOMALOUS_SCORE_CEILING: f64 = 0.45;

/// Ceiling reduction for every additional anomalous metric.
pub const ANOMALOUS_SCORE_STEP: f64 = 0.15;

// ============================================================================
// Loader
// ============================================================================

/// Default resampling frequency (seconds).
pub const DEFAULT_RESAMPLE_SECS: f64 = 1.0;

/// Share of missing values above which a dataset is reported invalid.
pub const MAX_MISSING_FRACTION: f64 = 0.1;

// ============================================================================
// Reporting
// ============================================================================

/// Anomalous-cycle rate above which the report recommends a root-cause
/// investigation.
pub const HIGH_ANOMALY_RATE: f64 = 0.1;

/// Average quality score below which the report recommends a process review.
pub const LOW_AVERAGE_QUALITY: f64 = 0.7;

/// Default directory for written reports.
pub const DEFAULT_REPORT_DIR: &str = "reports";

/// Environment variable holding an explicit config path.
pub const CONFIG_ENV_VAR: &str = "MACHINE_ANALYZER_CONFIG";

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "analyzer.toml";
