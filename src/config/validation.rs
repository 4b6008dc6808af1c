//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for AnalyzerConfig.
///
/// Maintained by hand to match the struct hierarchy; any new field added to
/// a config section must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [machine]
        "machine",
        "machine.name",
        "machine.location",
        "machine.energy_unit",
        // [loader]
        "loader",
        "loader.format",
        "loader.timestamp_column",
        "loader.value_column",
        "loader.resample",
        "loader.resample_secs",
        "loader.max_missing_fraction",
        // [state]
        "state",
        "state.window_size",
        "state.window_size.samples",
        "state.window_size.seconds",
        "state.production_threshold",
        "state.standby_threshold",
        "state.sensitivity_factor",
        "state.smoothing",
        "state.min_state_samples",
        "state.keep_threshold_column",
        "state.outlier_filter",
        "state.outlier_filter.window_samples",
        "state.outlier_filter.sigma",
        "state.state_cleaning",
        "state.state_cleaning.standby",
        "state.state_cleaning.standby.lower_coef",
        "state.state_cleaning.standby.upper_coef",
        "state.state_cleaning.production",
        "state.state_cleaning.production.lower_coef",
        "state.state_cleaning.production.upper_coef",
        // [segmentation]
        "segmentation",
        "segmentation.min_duration_secs",
        "segmentation.max_duration_secs",
        "segmentation.detect_abnormal",
        "segmentation.split_min_delta_ratio",
        // [quality]
        "quality",
        "quality.threshold_factors",
        "quality.threshold_factors.variation",
        "quality.threshold_factors.duration",
        "quality.threshold_factors.energy",
        "quality.require_cycles",
        // [report]
        "report",
        "report.output_dir",
        "report.text",
        "report.csv",
        "report.json",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.len();
    let b_len = b.len();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist <= 3 {
            if let Some((_, best_dist)) = best {
                if dist < best_dist {
                    best = Some((k, dist));
                }
            } else {
                best = Some((k, dist));
            }
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys — it only warns. Existing configs
/// always continue to work.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let found = walk_toml_keys(&value, "");
    let mut warnings = Vec::new();

    for key in &found {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(key, &known);
            let message = format!("Unknown config key '{key}'");
            warnings.push(ValidationWarning {
                field: key.clone(),
                message,
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Range checks on a parsed AnalyzerConfig.
///
/// Returns (errors, warnings): errors are values no machine can produce;
/// warnings are legal but almost certainly a mistake.
pub fn validate_physical_ranges(
    config: &super::AnalyzerConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Resampling finer than a millisecond or coarser than a day is not a
    // meter reading any more
    let l = &config.loader;
    if l.resample && l.resample_secs.is_finite() && !(0.001..=86_400.0).contains(&l.resample_secs) {
        errors.push(format!(
            "loader.resample_secs = {} is outside usable range (0.001-86400 s)",
            l.resample_secs
        ));
    }

    if let crate::state::WindowSize::Seconds(secs) = config.state.window_size {
        if secs.is_finite() && secs > 3_600.0 {
            warnings.push(ValidationWarning {
                field: "state.window_size.seconds".to_string(),
                message: format!("window_size = {secs} s smooths over more than an hour"),
                suggestion: None,
            });
        }
    }

    if let Some(max) = config.segmentation.max_duration_secs {
        if max.is_finite() && max > 0.0 && max < 1.0 {
            warnings.push(ValidationWarning {
                field: "segmentation.max_duration_secs".to_string(),
                message: format!("max_duration_secs = {max} is shorter than one second"),
                suggestion: None,
            });
        }
    }

    // Factors below 1 flag most of a normal population; above 6 flag nothing
    for (key, factor) in &config.quality.threshold_factors {
        if factor.is_finite() && (*factor < 1.0 || *factor > 6.0) {
            warnings.push(ValidationWarning {
                field: format!("quality.threshold_factors.{key}"),
                message: format!("threshold factor {key} = {factor} is outside typical range (1-6)"),
                suggestion: None,
            });
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("treshold", "threshold"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [state]
            production_threshold = 5.0
            [state.outlier_filter]
            sigma = 3.0
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"state".to_string()));
        assert!(keys.contains(&"state.production_threshold".to_string()));
        assert!(keys.contains(&"state.outlier_filter.sigma".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[state]
production_treshold = 5.0
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].field.contains("production_treshold"));
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("state.production_threshold")
        );
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[machine]
name = "press-7"

[state]
window_size = { seconds = 10.0 }
smoothing = "median"

[quality.threshold_factors]
energy = 2.5
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {:?}", warnings);
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let toml_str = r#"
[alerts]
email = "ops@example.com"
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.iter().any(|w| w.field == "alerts"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_known_keys_cover_all_sections() {
        let known = known_config_keys();
        for section in ["machine", "loader", "state", "segmentation", "quality", "report"] {
            assert!(known.contains(section), "missing {section}");
        }
        assert!(known.contains("quality.threshold_factors.variation"));
        assert!(known.contains("state.window_size.seconds"));
    }

    #[test]
    fn test_physical_range_defaults_clean() {
        let config = crate::config::AnalyzerConfig::default();
        let (errors, warnings) = validate_physical_ranges(&config);
        assert!(errors.is_empty(), "Defaults should produce no errors: {:?}", errors);
        assert!(warnings.is_empty(), "Defaults should produce no warnings: {:?}", warnings);
    }

    #[test]
    fn test_physical_range_resample_too_coarse() {
        let mut config = crate::config::AnalyzerConfig::default();
        config.loader.resample_secs = 100_000.0;
        let (errors, _) = validate_physical_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("resample_secs")));
    }

    #[test]
    fn test_physical_range_factor_suspicious() {
        let mut config = crate::config::AnalyzerConfig::default();
        config.quality.threshold_factors.insert("duration".into(), 0.5);
        let (_, warnings) = validate_physical_ranges(&config);
        assert!(warnings.iter().any(|w| w.field == "quality.threshold_factors.duration"));
    }
}
