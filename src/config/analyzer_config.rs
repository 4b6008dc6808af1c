//! Analyzer Configuration - every tunable of a run as TOML values
//!
//! Each section has serde defaults, so an empty file (or no file at all)
//! reproduces the built-in behaviour exactly.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults::{
    CONFIG_ENV_VAR, CONFIG_FILE_NAME, DEFAULT_REPORT_DIR, DEFAULT_RESAMPLE_SECS, MAX_MISSING_FRACTION,
};
use crate::loader::InputFormat;
use crate::pipeline::PipelineConfig;
use crate::quality::QualityConfig;
use crate::segmentation::SegmentationConfig;
use crate::state::StateConfig;

// ============================================================================
// Config Provenance
// ============================================================================

/// Dotted key paths explicitly present in the user's TOML file.
///
/// Deserialization fills every missing field with its default; this keeps
/// the distinction so command-line overrides and `config check` can tell
/// user choices from defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigProvenance {
    pub explicit_keys: HashSet<String>,
}

impl ConfigProvenance {
    /// Example: `provenance.is_user_set("state.production_threshold")`
    pub fn is_user_set(&self, dotted_key: &str) -> bool {
        self.explicit_keys.contains(dotted_key)
    }
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one machine / dataset.
///
/// Load with `AnalyzerConfig::load()` which searches:
/// 1. `$MACHINE_ANALYZER_CONFIG`
/// 2. `./analyzer.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Machine identification
    #[serde(default)]
    pub machine: MachineInfo,

    /// Input parsing and resampling
    #[serde(default)]
    pub loader: LoaderConfig,

    /// State classification
    #[serde(default)]
    pub state: StateConfig,

    /// Cycle segmentation
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Quality scoring
    #[serde(default)]
    pub quality: QualityConfig,

    /// Report output
    #[serde(default)]
    pub report: ReportConfig,
}

impl AnalyzerConfig {
    /// Load configuration using the standard search order, falling back to
    /// defaults when no candidate loads cleanly.
    pub fn load() -> Self {
        Self::load_with_provenance().0
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let (config, _provenance) = Self::load_from_file_with_provenance(path)?;
        Ok(config)
    }

    /// Load from a specific TOML file path, also returning provenance.
    pub fn load_from_file_with_provenance(path: &Path) -> Result<(Self, ConfigProvenance), ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::parse_with_provenance(&contents, path)
    }

    /// Parse TOML text. `origin` is only used in error messages.
    pub fn parse_with_provenance(contents: &str, origin: &Path) -> Result<(Self, ConfigProvenance), ConfigError> {
        // Unknown keys only warn
        for w in &super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let provenance = ConfigProvenance {
            explicit_keys: super::validation::walk_toml_keys(
                &contents
                    .parse::<toml::Value>()
                    .unwrap_or(toml::Value::Table(Default::default())),
                "",
            )
            .into_iter()
            .collect(),
        };

        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::Parse(origin.to_path_buf(), e))?;
        config.validate()?;
        Ok((config, provenance))
    }

    /// Standard search order, returning provenance alongside the config.
    pub fn load_with_provenance() -> (Self, ConfigProvenance) {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file_with_provenance(&p) {
                    Ok((config, provenance)) => {
                        info!(path = %p.display(), machine = %config.machine.name, "Loaded analyzer config from {CONFIG_ENV_VAR}");
                        return (config, provenance);
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            match Self::load_from_file_with_provenance(&local) {
                Ok((config, provenance)) => {
                    info!(machine = %config.machine.name, "Loaded analyzer config from ./{CONFIG_FILE_NAME}");
                    return (config, provenance);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{CONFIG_FILE_NAME}, using defaults");
                }
            }
        }

        info!("No {CONFIG_FILE_NAME} found, using built-in defaults");
        (Self::default(), ConfigProvenance::default())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Analyzer config saved");
        Ok(())
    }

    /// The analysis-stage subset of this config.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            state: self.state.clone(),
            segmentation: self.segmentation.clone(),
            quality: self.quality.clone(),
        }
    }

    /// Validate every section, collecting all violations instead of stopping
    /// at the first one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if let Err(e) = self.state.validate() {
            errors.push(format!("state: {e}"));
        }
        if let Err(e) = self.segmentation.validate() {
            errors.push(format!("segmentation: {e}"));
        }
        if let Err(e) = self.quality.validate() {
            errors.push(format!("quality: {e}"));
        }

        let l = &self.loader;
        if l.resample && (!l.resample_secs.is_finite() || l.resample_secs <= 0.0) {
            errors.push(format!("loader.resample_secs ({}) must be > 0", l.resample_secs));
        }
        if !(0.0..=1.0).contains(&l.max_missing_fraction) {
            errors.push(format!(
                "loader.max_missing_fraction ({}) must be within 0-1",
                l.max_missing_fraction
            ));
        }
        if l.timestamp_column.trim().is_empty() || l.value_column.trim().is_empty() {
            errors.push("loader column names must not be empty".to_string());
        }

        if self.machine.name.trim().is_empty() {
            errors.push("machine.name must not be empty".to_string());
        }

        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Machine Info
// ============================================================================

/// Identification metadata; appears in logs and reports only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineInfo {
    #[serde(default = "default_machine_name")]
    pub name: String,

    #[serde(default)]
    pub location: String,

    /// Unit label printed next to energy figures
    #[serde(default = "default_energy_unit")]
    pub energy_unit: String,
}

fn default_machine_name() -> String {
    "machine".to_string()
}

fn default_energy_unit() -> String {
    "kWh".to_string()
}

impl Default for MachineInfo {
    fn default() -> Self {
        Self {
            name: default_machine_name(),
            location: String::new(),
            energy_unit: default_energy_unit(),
        }
    }
}

// ============================================================================
// Loader
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Detected from the file extension when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<InputFormat>,

    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,

    #[serde(default = "default_value_column")]
    pub value_column: String,

    /// Resample onto a fixed grid before analysis
    #[serde(default = "default_resample")]
    pub resample: bool,

    #[serde(default = "default_resample_secs")]
    pub resample_secs: f64,

    /// Datasets missing more than this share of values are flagged invalid
    #[serde(default = "default_max_missing_fraction")]
    pub max_missing_fraction: f64,
}

fn default_timestamp_column() -> String {
    "timestamp".to_string()
}
fn default_value_column() -> String {
    "value".to_string()
}
fn default_resample() -> bool {
    true
}
fn default_resample_secs() -> f64 {
    DEFAULT_RESAMPLE_SECS
}
fn default_max_missing_fraction() -> f64 {
    MAX_MISSING_FRACTION
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            format: None,
            timestamp_column: default_timestamp_column(),
            value_column: default_value_column(),
            resample: true,
            resample_secs: DEFAULT_RESAMPLE_SECS,
            max_missing_fraction: MAX_MISSING_FRACTION,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_true")]
    pub text: bool,

    #[serde(default = "default_true")]
    pub csv: bool,

    #[serde(default = "default_true")]
    pub json: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_REPORT_DIR)
}
fn default_true() -> bool {
    true
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            text: true,
            csv: true,
            json: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::WindowSize;

    #[test]
    fn test_default_config_validates() {
        let config = AnalyzerConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: AnalyzerConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config, AnalyzerConfig::default());
        assert_eq!(config.state.production_threshold, 5.0);
        assert_eq!(config.state.window_size, WindowSize::Seconds(5.0));
        assert_eq!(config.quality.threshold_factors["energy"], 2.0);
        assert_eq!(config.loader.resample_secs, 1.0);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[machine]
name = "press-7"

[state]
production_threshold = 12.5
window_size = { samples = 9 }

[segmentation]
min_duration_secs = 30.0
max_duration_secs = 900.0
"#;
        let config: AnalyzerConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.machine.name, "press-7");
        assert_eq!(config.state.production_threshold, 12.5);
        assert_eq!(config.state.window_size, WindowSize::Samples(9));
        assert_eq!(config.segmentation.max_duration_secs, Some(900.0));
        // Non-overridden values retain defaults
        assert_eq!(config.state.sensitivity_factor, 1.0);
        assert!(config.segmentation.detect_abnormal);
        assert!(config.report.csv);
    }

    #[test]
    fn test_validation_collects_every_section() {
        let mut config = AnalyzerConfig::default();
        config.segmentation.min_duration_secs = 60.0;
        config.segmentation.max_duration_secs = Some(10.0);
        config.state.production_threshold = -1.0;
        config.loader.max_missing_fraction = 2.0;
        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("expected validation errors");
        };
        assert!(errors.iter().any(|e| e.contains("min_duration_secs")));
        assert!(errors.iter().any(|e| e.contains("production_threshold")));
        assert!(errors.iter().any(|e| e.contains("max_missing_fraction")));
    }

    #[test]
    fn test_bad_threshold_factor_key_fails() {
        let toml_str = r#"
[quality.threshold_factors]
energy = 3.0
peak = 2.0
"#;
        let err = AnalyzerConfig::parse_with_provenance(toml_str, Path::new("inline.toml")).unwrap_err();
        assert!(err.to_string().contains("threshold_factors.peak"));
    }

    #[test]
    fn test_roundtrip_toml() {
        let mut original = AnalyzerConfig::default();
        original.segmentation.max_duration_secs = Some(600.0);
        original.state.outlier_filter = Some(crate::state::OutlierFilterConfig::default());
        let toml_str = original.to_toml().expect("serialization should work");
        let roundtripped: AnalyzerConfig = toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(original, roundtripped);
    }

    #[test]
    fn test_all_sections_serialize() {
        let toml_str = AnalyzerConfig::default().to_toml().expect("serialization should work");
        for section in ["[machine]", "[loader]", "[state]", "[segmentation]", "[quality]", "[report]"] {
            assert!(toml_str.contains(section), "Missing {section} section");
        }
        assert!(toml_str.contains("production_threshold"));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyzer.toml");
        let mut config = AnalyzerConfig::default();
        config.machine.name = "lathe-2".into();
        config.save_to_file(&path).unwrap();

        let (loaded, provenance) = AnalyzerConfig::load_from_file_with_provenance(&path).unwrap();
        assert_eq!(loaded.machine.name, "lathe-2");
        assert!(provenance.is_user_set("machine.name"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AnalyzerConfig::load_from_file(Path::new("/nonexistent/analyzer.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }

    // ========================================================================
    // ConfigProvenance tests
    // ========================================================================

    #[test]
    fn test_provenance_partial_toml() {
        let toml_str = r#"
[machine]
name = "press-7"

[state]
production_threshold = 8.0
"#;
        let (_, provenance) = AnalyzerConfig::parse_with_provenance(toml_str, Path::new("inline.toml")).unwrap();
        assert!(provenance.is_user_set("machine.name"));
        assert!(provenance.is_user_set("state.production_threshold"));
        assert!(provenance.is_user_set("state"));
        assert!(!provenance.is_user_set("state.sensitivity_factor"));
        assert!(!provenance.is_user_set("segmentation.min_duration_secs"));
    }

    #[test]
    fn test_provenance_default_has_zero_keys() {
        let provenance = ConfigProvenance::default();
        assert!(provenance.explicit_keys.is_empty());
    }
}
