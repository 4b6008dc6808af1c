//! Pipeline Scenario Tests
//!
//! End-to-end runs of classify -> segment -> score on hand-built series
//! whose expected cycles are known in advance.

use chrono::{TimeZone, Utc};

use machine_analyzer::pipeline::{analyze, PipelineConfig, PipelineCoordinator};
use machine_analyzer::quality::QualityScorer;
use machine_analyzer::segmentation::SegmentationConfig;
use machine_analyzer::state::{OutlierFilterConfig, Smoothing, StateConfig};
use machine_analyzer::types::{AnomalyReason, MachineState, QualityGrade, Series};
use machine_analyzer::AnalysisError;

// ============================================================================
// Helpers
// ============================================================================

fn series(values: Vec<f64>) -> Series {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap();
    Series::from_values(t0, 1.0, values).unwrap()
}

fn repeat(value: f64, n: usize) -> impl Iterator<Item = f64> {
    std::iter::repeat(value).take(n)
}

/// 1000 samples at 1 Hz: 25 for the first 100 seconds, then 0.
fn scenario_a_values() -> Vec<f64> {
    repeat(25.0, 100).chain(repeat(0.0, 900)).collect()
}

fn bounded(min: f64, max: f64) -> PipelineConfig {
    PipelineConfig {
        segmentation: SegmentationConfig {
            min_duration_secs: min,
            max_duration_secs: Some(max),
            ..SegmentationConfig::default()
        },
        ..PipelineConfig::default()
    }
}

// ============================================================================
// Scenario A: single production block
// ============================================================================

#[test]
fn scenario_a_single_block_is_one_cycle() {
    let report = analyze(&series(scenario_a_values()), &bounded(5.0, 300.0)).unwrap();

    assert_eq!(report.segmentation.cycles.len(), 1);
    let cycle = &report.segmentation.cycles[0];
    assert_eq!(cycle.cycle_id, 0);
    assert_eq!((cycle.start_index, cycle.end_index), (0, 99));
    assert!((cycle.duration_secs - 100.0).abs() < 1e-9, "duration {}", cycle.duration_secs);
    assert!((cycle.energy_sum - 2500.0).abs() < 1e-9, "energy {}", cycle.energy_sum);
    assert!((cycle.energy_mean - 25.0).abs() < 1e-12);
    assert!(cycle.energy_stddev.abs() < 1e-12);
    assert!(!cycle.is_abnormal);

    let mask = &report.classification.mask;
    assert_eq!(mask.runs(MachineState::Production), vec![(0, 99)]);
    for i in 100..1000 {
        assert!(mask.is_off(i), "sample {i}");
    }
}

#[test]
fn scenario_a_median_smoothing_keeps_exact_edges() {
    let mut config = bounded(5.0, 300.0);
    config.state.smoothing = Smoothing::Median;
    let report = analyze(&series(scenario_a_values()), &config).unwrap();

    let cycle = &report.segmentation.cycles[0];
    assert_eq!((cycle.start_index, cycle.end_index), (0, 99));
    assert!((cycle.duration_secs - 100.0).abs() < 1e-9);
    assert_eq!(report.classification.distribution.production, 100);
}

// ============================================================================
// Scenario B: two blocks separated by an off gap
// ============================================================================

#[test]
fn scenario_b_two_blocks_two_cycles() {
    let values: Vec<f64> = repeat(0.0, 10)
        .chain(repeat(25.0, 50))
        .chain(repeat(0.0, 20))
        .chain(repeat(25.0, 50))
        .chain(repeat(0.0, 30))
        .collect();
    let report = analyze(&series(values), &bounded(5.0, 300.0)).unwrap();

    let cycles = &report.segmentation.cycles;
    assert_eq!(cycles.len(), 2);
    assert_eq!(
        report.classification.mask.runs(MachineState::Production),
        vec![(10, 59), (80, 129)]
    );
    assert_eq!((cycles[0].start_index, cycles[0].end_index), (10, 59));
    assert_eq!((cycles[1].start_index, cycles[1].end_index), (80, 129));
    for cycle in cycles {
        assert!((cycle.duration_secs - 50.0).abs() < 1e-9, "duration {}", cycle.duration_secs);
        assert!((cycle.energy_sum - 1250.0).abs() < 1e-9);
        assert!(cycle.energy_stddev.abs() < 1e-12);
    }
    assert_eq!(report.segmentation.statistics.total_cycles, 2);
    assert!((report.segmentation.statistics.total_energy - 2500.0).abs() < 1e-9);
}

// ============================================================================
// Scenario C: one cycle with ten times the energy
// ============================================================================

#[test]
fn scenario_c_energy_outlier_is_graded_d() {
    let mut values: Vec<f64> = repeat(0.0, 10).collect();
    for i in 0..79 {
        let level = if i == 40 { 250.0 } else { 25.0 };
        values.extend(repeat(level, 20));
        values.extend(repeat(0.0, 10));
    }
    let report = analyze(&series(values), &PipelineConfig::default()).unwrap();

    assert_eq!(report.segmentation.cycles.len(), 79);
    let summary = &report.quality.summary;
    assert_eq!(summary.anomalous_cycles, 1);
    assert_eq!(summary.anomalous_cycle_ids, vec![40]);

    let outlier = &report.quality.metrics[40];
    assert_eq!(outlier.cycle_id, 40);
    assert_eq!(outlier.quality_grade, QualityGrade::D);
    assert!(outlier.anomaly_reasons.contains(&AnomalyReason::Energy));
    assert_eq!(outlier.anomaly_reasons.len(), 1);
    assert!(outlier.issues.iter().any(|s| s == "Energy consumption is too high"));

    for metric in report.quality.metrics.iter().filter(|m| m.cycle_id != 40) {
        assert_eq!(metric.quality_grade, QualityGrade::A, "cycle {}", metric.cycle_id);
        assert!(!metric.is_anomalous);
    }
}

// ============================================================================
// Scenario D: contradictory duration bounds
// ============================================================================

#[test]
fn scenario_d_min_above_max_rejected_before_any_stage() {
    let err = analyze(&series(scenario_a_values()), &bounded(600.0, 300.0)).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidParameter { .. }));
    assert_eq!(err.parameter_name(), Some("min_duration_secs"));

    let err = PipelineCoordinator::new(&bounded(600.0, 300.0)).unwrap_err();
    assert_eq!(err.parameter_name(), Some("min_duration_secs"));
}

// ============================================================================
// Degenerate inputs
// ============================================================================

#[test]
fn empty_series_is_empty_input() {
    let empty = Series::new(Vec::new()).unwrap();
    let err = analyze(&empty, &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyInput { .. }));
}

#[test]
fn all_below_standby_yields_no_cycles() {
    let report = analyze(&series(vec![0.1; 200]), &PipelineConfig::default()).unwrap();

    assert_eq!(report.classification.distribution.off, 200);
    assert!(report.segmentation.cycles.is_empty());
    assert!(report.segmentation.statistics.is_empty());

    let summary = &report.quality.summary;
    assert!(!summary.has_cycles);
    assert_eq!(summary.anomalous_cycles, 0);
    assert_eq!(summary.average_quality_score, 0.0);
    assert!(report.quality.metrics.is_empty());
}

#[test]
fn standby_plateau_is_not_production() {
    let values: Vec<f64> = repeat(0.0, 20).chain(repeat(2.0, 60)).chain(repeat(0.0, 20)).collect();
    let report = analyze(&series(values), &PipelineConfig::default()).unwrap();

    assert!(report.segmentation.cycles.is_empty());
    assert_eq!(report.classification.mask.state(50), Some(MachineState::Standby));
}

#[test]
fn single_cycle_scores_perfect() {
    let report = analyze(&series(scenario_a_values()), &PipelineConfig::default()).unwrap();
    assert_eq!(report.quality.metrics.len(), 1);
    assert_eq!(report.quality.metrics[0].quality_score, 1.0);
    assert_eq!(report.quality.metrics[0].quality_grade, QualityGrade::A);
}

// ============================================================================
// Pre-filtering
// ============================================================================

#[test]
fn isolated_spike_never_becomes_a_cycle() {
    let mut values = scenario_a_values();
    values[500] = 1000.0;

    let unfiltered = analyze(&series(values.clone()), &PipelineConfig::default()).unwrap();
    assert_eq!(unfiltered.segmentation.cycles.len(), 1);
    assert_eq!(unfiltered.classification.hysteresis_relabeled, 1);
    assert!(unfiltered.classification.mask.is_off(500));

    let config = PipelineConfig {
        state: StateConfig {
            outlier_filter: Some(OutlierFilterConfig::default()),
            ..StateConfig::default()
        },
        ..PipelineConfig::default()
    };
    let filtered = analyze(&series(values), &config).unwrap();
    assert_eq!(filtered.classification.outliers_replaced, 1);
    assert_eq!(filtered.classification.hysteresis_relabeled, 0);
    assert_eq!(filtered.segmentation.cycles.len(), 1);
    let cleaned = filtered.classification.cleaned.as_ref().unwrap();
    assert_eq!(cleaned.values()[500], 0.0);
}

// ============================================================================
// Stage reuse
// ============================================================================

#[test]
fn scoring_twice_gives_identical_reports() {
    let report = analyze(&series(scenario_a_values()), &PipelineConfig::default()).unwrap();
    let scorer = QualityScorer::new(&Default::default()).unwrap();
    let seg = &report.segmentation;
    let first = scorer.score(&seg.cycles, Some(&seg.statistics)).unwrap();
    let second = scorer.score(&seg.cycles, Some(&seg.statistics)).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, report.quality);
}

#[test]
fn coordinator_is_reusable_across_series() {
    let coordinator = PipelineCoordinator::new(&PipelineConfig::default()).unwrap();
    let a = coordinator.run(&series(scenario_a_values())).unwrap();
    let b = coordinator.run(&series(vec![0.0; 50])).unwrap();
    assert_eq!(a.segmentation.cycles.len(), 1);
    assert!(b.segmentation.cycles.is_empty());
}
