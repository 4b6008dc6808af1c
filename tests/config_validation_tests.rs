//! Config Validation Tests
//!
//! Typo detection on raw TOML, range checks, and the eager validation that
//! rejects bad parameters before any analysis runs.

use std::path::Path;

use machine_analyzer::config::validation::{
    known_config_keys, suggest_correction, validate_physical_ranges, validate_unknown_keys,
};
use machine_analyzer::config::{AnalyzerConfig, ConfigError};
use machine_analyzer::state::WindowSize;

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_threshold_factor_warns_with_suggestion() {
    let toml_str = r#"
[quality.threshold_factors]
enrgy = 2.5
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("enrgy"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("quality.threshold_factors.energy")
    );
}

#[test]
fn typo_in_machine_section_warns() {
    let toml_str = r#"
[machine]
naem = "press-7"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].suggestion.as_deref(), Some("machine.name"));
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[machine]
name = "press-7"
location = "Hall B"
energy_unit = "Wh"

[loader]
timestamp_column = "time"
value_column = "kw"
resample = true
resample_secs = 60.0
max_missing_fraction = 0.2

[state]
production_threshold = 120.0
standby_threshold = 60.0
sensitivity_factor = 1.0
smoothing = "median"
min_state_samples = 3
keep_threshold_column = true
window_size = { samples = 5 }

[state.outlier_filter]
window_samples = 21
sigma = 3.0

[state.state_cleaning.production]
lower_coef = 1.5
upper_coef = 3.0

[segmentation]
min_duration_secs = 60.0
max_duration_secs = 1800.0
detect_abnormal = true
split_min_delta_ratio = 0.5

[quality]
require_cycles = false

[quality.threshold_factors]
variation = 2.0
duration = 2.0
energy = 2.0

[report]
output_dir = "out"
text = true
csv = false
json = true
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(
        warnings.is_empty(),
        "Valid config should produce 0 warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );
    let (config, _) = AnalyzerConfig::parse_with_provenance(toml_str, Path::new("inline")).unwrap();
    assert_eq!(config.state.window_size, WindowSize::Samples(5));
    assert_eq!(config.segmentation.max_duration_secs, Some(1800.0));
    assert!(!config.report.csv);
}

#[test]
fn multiple_typos_all_warned() {
    let toml_str = r#"
[machine]
naem = "Test"

[segmentation]
min_duraton_secs = 10.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 2, "Expected 2 warnings for 2 typos, got {}", warnings.len());
}

#[test]
fn empty_toml_produces_zero_warnings() {
    assert!(validate_unknown_keys("").is_empty());
}

#[test]
fn known_keys_set_is_complete() {
    let toml_str = AnalyzerConfig::default()
        .to_toml()
        .expect("Default config should serialize");
    let warnings = validate_unknown_keys(&toml_str);
    assert!(
        warnings.is_empty(),
        "Default config serialization should produce 0 unknown-key warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );
}

#[test]
fn suggest_correction_finds_close_match() {
    let known = known_config_keys();
    let s = suggest_correction("segmentation.max_duraton_secs", &known);
    assert_eq!(s.as_deref(), Some("segmentation.max_duration_secs"));
}

// ============================================================================
// Range and Constraint Validation
// ============================================================================

#[test]
fn min_duration_above_max_is_rejected() {
    let toml_str = r#"
[segmentation]
min_duration_secs = 600.0
max_duration_secs = 300.0
"#;
    let err = AnalyzerConfig::parse_with_provenance(toml_str, Path::new("inline")).unwrap_err();
    match err {
        ConfigError::Validation(errors) => {
            assert!(errors.iter().any(|e| e.contains("min_duration_secs")), "{errors:?}");
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn standby_at_or_above_production_is_rejected() {
    let mut config = AnalyzerConfig::default();
    config.state.production_threshold = 10.0;
    config.state.standby_threshold = Some(10.0);
    assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
}

#[test]
fn every_violation_is_reported() {
    let mut config = AnalyzerConfig::default();
    config.state.production_threshold = -1.0;
    config.segmentation.split_min_delta_ratio = 0.0;
    config.quality.threshold_factors.insert("energy".into(), -2.0);
    config.loader.max_missing_fraction = 1.5;
    let Err(ConfigError::Validation(errors)) = config.validate() else {
        panic!("expected validation errors");
    };
    assert!(errors.len() >= 4, "{errors:?}");
}

#[test]
fn long_window_is_a_warning_not_an_error() {
    let mut config = AnalyzerConfig::default();
    config.state.window_size = WindowSize::Seconds(7_200.0);
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.field == "state.window_size.seconds"));
    assert!(config.validate().is_ok());
}

#[test]
fn parse_error_names_origin() {
    let err = AnalyzerConfig::parse_with_provenance("[state\nbroken", Path::new("bad.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(..)));
    assert!(err.to_string().contains("bad.toml"));
}
